//! The connection graph: the symmetric "these two users may send each other
//! money" relation.
//!
//! Edges are stored once in a dedicated join table, keyed by the sorted pair
//! of user IDs, so the relation is symmetric by construction and there is at
//! most one edge between any two users. Adding an edge that already exists is
//! a no-op; the caller-facing endpoint decides whether a duplicate request is
//! a user error.

use rusqlite::Connection;

use crate::{
    Error,
    user::{User, UserID, get_user_by_id, map_row_to_user},
};

/// Create the connection table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_connection_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS connection (
                user_a INTEGER NOT NULL,
                user_b INTEGER NOT NULL,
                PRIMARY KEY (user_a, user_b),
                CHECK (user_a < user_b),
                FOREIGN KEY (user_a) REFERENCES user(id),
                FOREIGN KEY (user_b) REFERENCES user(id)
                )",
        (),
    )?;

    Ok(())
}

/// Canonicalise an unordered pair of user IDs into the sorted pair used as
/// the table key.
fn ordered_pair(first: UserID, second: UserID) -> (i64, i64) {
    let (first, second) = (first.as_i64(), second.as_i64());

    if first < second {
        (first, second)
    } else {
        (second, first)
    }
}

/// Add the bilateral connection edge between two users.
///
/// Both sides see the edge immediately, there is no pending or directional
/// state. Adding an edge that already exists is a no-op.
///
/// # Errors
///
/// This function will return a:
/// - [Error::SelfReferentialConnection] if both IDs refer to the same user,
/// - [Error::NotFound] if either ID does not belong to a registered user,
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn connect(first: UserID, second: UserID, connection: &Connection) -> Result<(), Error> {
    if first == second {
        return Err(Error::SelfReferentialConnection);
    }

    get_user_by_id(first, connection)?;
    get_user_by_id(second, connection)?;

    let (user_a, user_b) = ordered_pair(first, second);
    connection.execute(
        "INSERT OR IGNORE INTO connection (user_a, user_b) VALUES (?1, ?2)",
        (user_a, user_b),
    )?;

    Ok(())
}

/// Remove the connection edge between two users, if present.
///
/// Removing an absent edge is a no-op.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn disconnect(first: UserID, second: UserID, connection: &Connection) -> Result<(), Error> {
    let (user_a, user_b) = ordered_pair(first, second);

    connection.execute(
        "DELETE FROM connection WHERE user_a = ?1 AND user_b = ?2",
        (user_a, user_b),
    )?;

    Ok(())
}

/// Check whether two users are connected.
///
/// The query is symmetric and returns false when both IDs refer to the same
/// user, since a user can never be connected to themselves.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn are_connected(first: UserID, second: UserID, connection: &Connection) -> Result<bool, Error> {
    if first == second {
        return Ok(false);
    }

    let (user_a, user_b) = ordered_pair(first, second);

    connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM connection WHERE user_a = ?1 AND user_b = ?2)",
            (user_a, user_b),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Remove every connection edge that references `user_id`.
///
/// Account deletion must call this before removing the user row, otherwise
/// peers would be left holding edges to a dead account.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn remove_all_connections_for(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM connection WHERE user_a = ?1 OR user_b = ?1",
        (user_id.as_i64(),),
    )?;

    Ok(())
}

/// Get the users connected to `user_id`, ordered by ID.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn list_connections_for(user_id: UserID, connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare(
            "SELECT u.id, u.username, u.email, u.password FROM user u
                INNER JOIN connection c
                ON (c.user_a = :id AND u.id = c.user_b)
                OR (c.user_b = :id AND u.id = c.user_a)
                ORDER BY u.id",
        )?
        .query_map(&[(":id", &user_id.as_i64())], map_row_to_user)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}
