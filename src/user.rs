//! The account store: creating the user table and reading and writing user
//! accounts.
//!
//! The email address is the unique natural key used for lookups from the
//! session layer. Deleting a user detaches all of their connection edges
//! before removing the row so that no peer is left referencing a dead
//! account.

use std::fmt::Display;

use email_address::EmailAddress;
use rusqlite::{Connection, Row, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::{Error, PasswordHash, connection::remove_all_connections_for};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The maximum number of characters allowed in a username.
pub const USERNAME_MAX_LENGTH: usize = 50;

/// A display name chosen by the user.
///
/// Usernames must be non-empty and at most [USERNAME_MAX_LENGTH] characters.
/// They do not have to be unique, the email address is the unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// Create and validate a username from a string.
    ///
    /// Leading and trailing whitespace is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidUsername] if the trimmed string is empty or
    /// longer than [USERNAME_MAX_LENGTH] characters.
    pub fn new(raw_username: &str) -> Result<Self, Error> {
        let username = raw_username.trim();

        if username.is_empty() {
            return Err(Error::InvalidUsername("Username is required".to_owned()));
        }

        if username.chars().count() > USERNAME_MAX_LENGTH {
            return Err(Error::InvalidUsername(format!(
                "Username must be {USERNAME_MAX_LENGTH} characters or fewer"
            )));
        }

        Ok(Self(username.to_owned()))
    }

    /// Create a username without any validation.
    ///
    /// The caller should ensure the string is a valid username, e.g. when
    /// reading a row that was validated at insertion time.
    pub fn new_unchecked(raw_username: &str) -> Self {
        Self(raw_username.to_owned())
    }

    /// The username as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
///
/// The caller should ensure that `id` is unique.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The display name chosen by the user.
    pub username: Username,
    /// The user's email address, unique across all users.
    pub email: EmailAddress,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// The representation of a user sent to API clients.
///
/// This deliberately omits the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The display name chosen by the user.
    pub username: String,
    /// The user's email address.
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.to_string(),
            email: user.email.to_string(),
        }
    }
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

pub(crate) fn map_row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_username: String = row.get(1)?;
    let raw_email: String = row.get(2)?;
    let raw_password_hash: String = row.get(3)?;

    Ok(User {
        id: UserID::new(id),
        username: Username::new_unchecked(&raw_username),
        email: EmailAddress::new_unchecked(raw_email),
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
    })
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// This function will return a:
/// - [Error::DuplicateEmail] if the email address is already in use,
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(
    username: Username,
    email: EmailAddress,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (username, email, password) VALUES (?1, ?2, ?3)",
        (username.as_str(), email.as_str(), password_hash.as_ref()),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username,
        email,
        password_hash,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, username, email, password FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_row_to_user)
        .map_err(|error| error.into())
}

/// Get the user from the database with an email equal to `email`.
///
/// The comparison is a case-sensitive exact match on the stored address.
///
/// # Errors
///
/// This function will return an error if:
/// - `email` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, username, email, password FROM user WHERE email = :email")?
        .query_row(&[(":email", &email)], map_row_to_user)
        .map_err(|error| error.into())
}

/// Get all users in the database, ordered by ID.
///
/// # Errors
///
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn list_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare("SELECT id, username, email, password FROM user ORDER BY id")?
        .query_map([], map_row_to_user)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

/// Overwrite the stored username, email and password hash of the user with
/// the same ID as `user`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::UpdateMissingUser] if `user.id` does not belong to a registered user,
/// - [Error::DuplicateEmail] if the new email belongs to a different user,
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn update_user(user: &User, connection: &Connection) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE user SET username = ?1, email = ?2, password = ?3 WHERE id = ?4",
        (
            user.username.as_str(),
            user.email.as_str(),
            user.password_hash.as_ref(),
            user.id.as_i64(),
        ),
    )?;

    if rows_updated == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Delete the user with `user_id` from the database.
///
/// The user's connection edges are removed before the user row itself, inside
/// the same SQL transaction. Skipping the detach step would leave peers with
/// dangling references, so callers must always delete through this function.
///
/// # Errors
///
/// This function will return a:
/// - [Error::DeleteMissingUser] if `user_id` does not belong to a registered user,
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn delete_user(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    remove_all_connections_for(user_id, &transaction)?;

    let rows_deleted = transaction.execute("DELETE FROM user WHERE id = ?1", (user_id.as_i64(),))?;

    if rows_deleted == 0 {
        return Err(Error::DeleteMissingUser);
    }

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::str::FromStr;

    use email_address::EmailAddress;
    use rusqlite::Connection;

    use crate::{PasswordHash, db::initialize};

    use super::{User, Username, create_user};

    pub fn init_db() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        connection
    }

    pub fn insert_test_user(name: &str, email: &str, connection: &Connection) -> User {
        create_user(
            Username::new_unchecked(name),
            EmailAddress::from_str(email).expect("Could not parse test email"),
            PasswordHash::new_unchecked("hunter2"),
            connection,
        )
        .expect("Could not insert test user")
    }
}
