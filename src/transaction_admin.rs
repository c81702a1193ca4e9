//! Administrative endpoints for ledger entries: list, fetch, replace and
//! delete.
//!
//! Replace and delete exist for record correction and bypass the connection
//! check, so they are not a transfer API. The transfer endpoint in
//! [crate::send_money] is the only writer that goes through validation.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    ledger::{
        Transaction, TransactionID, delete_transaction, get_transaction_by_id, list_transactions,
        list_transactions_by_receiver, list_transactions_by_sender, replace_transaction,
    },
    user::UserID,
};

/// The state needed for the transaction admin endpoints.
#[derive(Debug, Clone)]
pub struct TransactionAdminState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionAdminState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The fields accepted when replacing a ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceTransactionRequest {
    /// The user the money came from.
    pub sender_id: i64,
    /// The user the money went to.
    pub receiver_id: i64,
    /// How much money was moved.
    pub amount: f64,
    /// Free-text note for the record.
    #[serde(default)]
    pub description: String,
}

/// Handler for listing all ledger entries.
pub async fn get_transactions(
    State(state): State<TransactionAdminState>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    Ok(Json(list_transactions(&connection)?))
}

/// Handler for fetching a single ledger entry by ID.
pub async fn get_transaction(
    State(state): State<TransactionAdminState>,
    Path(transaction_id): Path<TransactionID>,
) -> Result<Json<Transaction>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    Ok(Json(get_transaction_by_id(transaction_id, &connection)?))
}

/// Handler for listing the ledger entries sent by a user.
///
/// An unknown user ID answers 200 with an empty list.
pub async fn get_transactions_by_sender(
    State(state): State<TransactionAdminState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    Ok(Json(list_transactions_by_sender(
        UserID::new(user_id),
        &connection,
    )?))
}

/// Handler for listing the ledger entries received by a user.
///
/// An unknown user ID answers 200 with an empty list.
pub async fn get_transactions_by_receiver(
    State(state): State<TransactionAdminState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    Ok(Json(list_transactions_by_receiver(
        UserID::new(user_id),
        &connection,
    )?))
}

/// Handler for replacing every field of a ledger entry.
///
/// This is an administrative correction, the connection graph is not
/// consulted.
pub async fn put_transaction(
    State(state): State<TransactionAdminState>,
    Path(transaction_id): Path<TransactionID>,
    Json(request): Json<ReplaceTransactionRequest>,
) -> Result<Json<Transaction>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = replace_transaction(
        transaction_id,
        UserID::new(request.sender_id),
        UserID::new(request.receiver_id),
        request.amount,
        &request.description,
        &connection,
    )?;

    Ok(Json(transaction))
}

/// Handler for deleting a ledger entry by ID.
///
/// Deleting an entry that does not exist answers 204 as well, the delete is
/// idempotent from the client's point of view.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionAdminState>,
    Path(transaction_id): Path<TransactionID>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    match delete_transaction(transaction_id, &connection) {
        Ok(()) | Err(Error::DeleteMissingTransaction) => Ok(StatusCode::NO_CONTENT),
        Err(error) => Err(error),
    }
}
