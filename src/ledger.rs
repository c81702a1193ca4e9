//! The ledger: immutable records of completed transfers.
//!
//! Entries are written by [record_transfer] after the transfer validator has
//! accepted the transfer, the ledger itself never re-runs the connection
//! check. The only mutations are the administrative [replace_transaction] and
//! [delete_transaction], which exist for record correction and deliberately
//! bypass validation; callers that want invariant protection must re-validate
//! themselves.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, user::UserID};

/// Alias for the integer type used for ledger entry IDs.
pub type TransactionID = i64;

/// An immutable record of a completed transfer.
///
/// A transaction has exactly one state, recorded, from creation to deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the ledger entry in the application database.
    pub id: TransactionID,
    /// The user the money came from.
    pub sender_id: UserID,
    /// The user the money went to.
    pub receiver_id: UserID,
    /// How much money was moved.
    pub amount: f64,
    /// Free-text note entered by the sender. May be empty.
    pub description: String,
}

/// Create the ledger table.
///
/// Ledger entries reference users by ID and are removed along with either
/// participant.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_ledger_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS ledger_entry (
                id INTEGER PRIMARY KEY,
                sender_id INTEGER NOT NULL,
                receiver_id INTEGER NOT NULL,
                amount REAL NOT NULL,
                description TEXT NOT NULL,
                FOREIGN KEY (sender_id) REFERENCES user(id) ON DELETE CASCADE,
                FOREIGN KEY (receiver_id) REFERENCES user(id) ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn map_row_to_transaction(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        sender_id: UserID::new(row.get(1)?),
        receiver_id: UserID::new(row.get(2)?),
        amount: row.get(3)?,
        description: row.get(4)?,
    })
}

/// Record an accepted transfer as a new ledger entry.
///
/// This function must only be called after [crate::validate_transfer] returned
/// [crate::TransferDecision::Accepted]. The connection check is not repeated
/// here, the decision and the effect are kept separate.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn record_transfer(
    sender_id: UserID,
    receiver_id: UserID,
    amount: f64,
    description: &str,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection.execute(
        "INSERT INTO ledger_entry (sender_id, receiver_id, amount, description)
            VALUES (?1, ?2, ?3, ?4)",
        (sender_id.as_i64(), receiver_id.as_i64(), amount, description),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Transaction {
        id,
        sender_id,
        receiver_id,
        amount,
        description: description.to_owned(),
    })
}

/// Get the ledger entry with an ID equal to `id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `id` does not refer to a recorded transaction,
/// - there was an error trying to access the store.
pub fn get_transaction_by_id(
    id: TransactionID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "SELECT id, sender_id, receiver_id, amount, description
                FROM ledger_entry WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_row_to_transaction)
        .map_err(|error| error.into())
}

/// Get every ledger entry, ordered by ID.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn list_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, sender_id, receiver_id, amount, description
                FROM ledger_entry ORDER BY id",
        )?
        .query_map([], map_row_to_transaction)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Get the ledger entries sent by `user_id`, ordered by ID.
///
/// An unmatched query returns an empty vector, not an error.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn list_transactions_by_sender(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, sender_id, receiver_id, amount, description
                FROM ledger_entry WHERE sender_id = :sender_id ORDER BY id",
        )?
        .query_map(&[(":sender_id", &user_id.as_i64())], map_row_to_transaction)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Get the ledger entries received by `user_id`, ordered by ID.
///
/// An unmatched query returns an empty vector, not an error.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn list_transactions_by_receiver(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, sender_id, receiver_id, amount, description
                FROM ledger_entry WHERE receiver_id = :receiver_id ORDER BY id",
        )?
        .query_map(
            &[(":receiver_id", &user_id.as_i64())],
            map_row_to_transaction,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Overwrite every field of the ledger entry with ID `id`.
///
/// This is an administrative full-record update for correcting bad records.
/// It does not check the connection graph, callers wanting invariant
/// protection must run the validator first.
///
/// # Errors
///
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a recorded transaction,
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn replace_transaction(
    id: TransactionID,
    sender_id: UserID,
    receiver_id: UserID,
    amount: f64,
    description: &str,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let rows_updated = connection.execute(
        "UPDATE ledger_entry SET sender_id = ?1, receiver_id = ?2, amount = ?3, description = ?4
            WHERE id = ?5",
        (
            sender_id.as_i64(),
            receiver_id.as_i64(),
            amount,
            description,
            id,
        ),
    )?;

    if rows_updated == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(Transaction {
        id,
        sender_id,
        receiver_id,
        amount,
        description: description.to_owned(),
    })
}

/// Delete the ledger entry with ID `id`.
///
/// Deleting an absent entry signals [Error::DeleteMissingTransaction] so the
/// caller can choose whether to treat the delete as idempotent. The HTTP
/// layer does.
///
/// # Errors
///
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if `id` does not refer to a recorded transaction,
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn delete_transaction(id: TransactionID, connection: &Connection) -> Result<(), Error> {
    let rows_deleted = connection.execute("DELETE FROM ledger_entry WHERE id = ?1", (id,))?;

    if rows_deleted == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}
