//! The endpoint for sending money to a connection.
//!
//! The handler resolves the sender from the session and the recipient by
//! email, asks the transfer validator for a decision and only touches the
//! ledger when the transfer is accepted.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, error_response,
    endpoints::{self, format_endpoint},
    ledger::record_transfer,
    transfer::{RejectReason, TransferDecision, validate_transfer},
    user::{UserID, get_user_by_email, get_user_by_id},
};

/// The state needed for the transfer endpoint.
#[derive(Debug, Clone)]
pub struct TransferState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransferState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The data entered by the user when requesting a transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    /// The email address of the connection to send money to.
    pub connection_email: String,
    /// How much money to send.
    pub amount: f64,
    /// An optional note shown alongside the transfer.
    #[serde(default)]
    pub description: Option<String>,
}

/// The status code a rejected transfer answers with.
fn reject_status_code(reason: RejectReason) -> StatusCode {
    match reason {
        RejectReason::RecipientNotFound => StatusCode::NOT_FOUND,
        RejectReason::SelfTransfer | RejectReason::NotConnected => StatusCode::BAD_REQUEST,
        RejectReason::InvalidAmount => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Handler for transfer requests via the POST method.
///
/// A rejected transfer answers 4xx with the reason's message and writes
/// nothing. An accepted transfer is recorded and answered with status 201, a
/// `Location` header pointing at the new ledger entry and the entry itself.
pub async fn post_transfer(
    State(state): State<TransferState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<TransferRequest>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let sender = get_user_by_id(user_id, &connection)?;

    let receiver = match get_user_by_email(&request.connection_email, &connection) {
        Ok(user) => Some(user),
        Err(Error::NotFound) => None,
        Err(error) => return Err(error),
    };

    let decision = validate_transfer(&sender, receiver.as_ref(), request.amount, &connection)?;

    if let TransferDecision::Rejected(reason) = decision {
        tracing::debug!("rejected transfer from user {}: {reason:?}", sender.id);

        return Ok(error_response(
            reject_status_code(reason),
            &reason.to_string(),
        ));
    }

    // The validator rejects a missing recipient before accepting.
    let receiver = receiver.ok_or(Error::NotFound)?;

    let description = request.description.unwrap_or_default();
    let transaction = record_transfer(
        sender.id,
        receiver.id,
        request.amount,
        &description,
        &connection,
    )?;

    tracing::info!(
        "recorded transfer {} from user {} to user {}",
        transaction.id,
        sender.id,
        receiver.id
    );

    let location = format_endpoint(endpoints::TRANSACTION, transaction.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(transaction),
    )
        .into_response())
}

#[cfg(test)]
mod post_transfer_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Json, Router,
        extract::State,
        http::StatusCode,
        routing::post,
    };
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        connection::connect,
        endpoints,
        ledger::{Transaction, list_transactions, list_transactions_by_sender},
        user::{
            User,
            test_utils::{init_db, insert_test_user},
        },
    };

    use super::{TransferRequest, TransferState, post_transfer};

    fn get_test_setup(connected: bool) -> (TestServer, Arc<Mutex<Connection>>, User, User) {
        let connection = init_db();
        let alice = insert_test_user("alice", "alice@example.com", &connection);
        let bob = insert_test_user("bob", "bob@example.com", &connection);

        if connected {
            connect(alice.id, bob.id, &connection).unwrap();
        }

        let db_connection = Arc::new(Mutex::new(connection));
        let state = TransferState {
            db_connection: db_connection.clone(),
        };

        let alice_id = alice.id;
        let app = Router::new()
            .route(
                endpoints::TRANSFER,
                post(
                    move |state: State<TransferState>, request: Json<TransferRequest>| async move {
                        post_transfer(state, Extension(alice_id), request).await
                    },
                ),
            )
            .with_state(state);

        let server = TestServer::new(app).expect("Could not create test server.");

        (server, db_connection, alice, bob)
    }

    fn transfer_request(amount: f64) -> TransferRequest {
        TransferRequest {
            connection_email: "bob@example.com".to_string(),
            amount,
            description: Some("lunch".to_string()),
        }
    }

    #[tokio::test]
    async fn transfer_between_connected_users_is_recorded() {
        let (server, db_connection, alice, bob) = get_test_setup(true);

        let response = server
            .post(endpoints::TRANSFER)
            .json(&transfer_request(10.0))
            .await;

        response.assert_status(StatusCode::CREATED);

        let transaction: Transaction = response.json();
        assert!(transaction.id > 0);
        assert_eq!(transaction.sender_id, alice.id);
        assert_eq!(transaction.receiver_id, bob.id);
        assert_eq!(transaction.amount, 10.0);
        assert_eq!(transaction.description, "lunch");

        let location = response.header("location");
        assert_eq!(
            location,
            format!("/api/transactions/{}", transaction.id).as_str()
        );

        let connection = db_connection.lock().unwrap();
        assert_eq!(
            list_transactions_by_sender(alice.id, &connection).unwrap(),
            vec![transaction]
        );
    }

    #[tokio::test]
    async fn transfer_between_unconnected_users_is_rejected() {
        let (server, db_connection, _, _) = get_test_setup(false);

        let response = server
            .post(endpoints::TRANSFER)
            .json(&transfer_request(10.0))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);

        let connection = db_connection.lock().unwrap();
        assert_eq!(list_transactions(&connection).unwrap(), vec![]);
    }

    #[tokio::test]
    async fn transfer_to_unknown_email_is_rejected() {
        let (server, _, _, _) = get_test_setup(true);

        let response = server
            .post(endpoints::TRANSFER)
            .json(&TransferRequest {
                connection_email: "nobody@example.com".to_string(),
                amount: 10.0,
                description: None,
            })
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn transfer_to_self_is_rejected() {
        let (server, db_connection, _, _) = get_test_setup(true);

        let response = server
            .post(endpoints::TRANSFER)
            .json(&TransferRequest {
                connection_email: "alice@example.com".to_string(),
                amount: 10.0,
                description: None,
            })
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);

        let connection = db_connection.lock().unwrap();
        assert_eq!(list_transactions(&connection).unwrap(), vec![]);
    }

    #[tokio::test]
    async fn transfer_with_zero_amount_is_rejected() {
        let (server, db_connection, _, _) = get_test_setup(true);

        let response = server
            .post(endpoints::TRANSFER)
            .json(&transfer_request(0.0))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let connection = db_connection.lock().unwrap();
        assert_eq!(list_transactions(&connection).unwrap(), vec![]);
    }

    #[tokio::test]
    async fn transfer_with_minimum_amount_succeeds() {
        let (server, _, _, _) = get_test_setup(true);

        let response = server
            .post(endpoints::TRANSFER)
            .json(&TransferRequest {
                connection_email: "bob@example.com".to_string(),
                amount: 0.01,
                description: None,
            })
            .await;

        response.assert_status(StatusCode::CREATED);

        let transaction: Transaction = response.json();
        assert_eq!(transaction.amount, 0.01);
        assert_eq!(transaction.description, "");
    }
}
