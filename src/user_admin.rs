//! Administrative endpoints for user accounts: list, fetch, update and
//! delete.
//!
//! Deleting a user goes through the account store's cascading delete, so the
//! user's connection edges are detached before the row disappears.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use email_address::EmailAddress;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    user::{User, UserID, UserResponse, Username, delete_user, get_user_by_id, list_users,
        update_user},
};

/// The state needed for the user admin endpoints.
#[derive(Debug, Clone)]
pub struct UserAdminState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UserAdminState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The fields accepted when updating a user.
///
/// A `password` of `None` keeps the stored password hash. When it is set it
/// is always treated as a new plaintext password and hashed, the store never
/// guesses whether a credential string is already hashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    /// The new display name.
    pub username: String,
    /// The new email address.
    pub email: String,
    /// A new plaintext password, or `None` to keep the current one.
    #[serde(default)]
    pub password: Option<String>,
}

/// Handler for listing all users.
pub async fn get_users(
    State(state): State<UserAdminState>,
) -> Result<Json<Vec<UserResponse>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let users = list_users(&connection)?;

    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// Handler for fetching a single user by ID.
pub async fn get_user(
    State(state): State<UserAdminState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserID::new(user_id), &connection)?;

    Ok(Json(UserResponse::from(&user)))
}

/// Handler for updating a user's username, email and optionally password.
pub async fn put_user(
    State(state): State<UserAdminState>,
    Path(user_id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, Error> {
    let username = Username::new(&request.username)?;
    let email = EmailAddress::from_str(&request.email)
        .map_err(|_| Error::InvalidEmail(request.email.clone()))?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let existing_user = get_user_by_id(UserID::new(user_id), &connection)?;

    let password_hash = match request.password {
        Some(raw_password) => {
            let validated_password = ValidatedPassword::new(&raw_password)?;
            PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST)?
        }
        None => existing_user.password_hash,
    };

    let user = User {
        id: existing_user.id,
        username,
        email,
        password_hash,
    };
    update_user(&user, &connection)?;

    Ok(Json(UserResponse::from(&user)))
}

/// Handler for deleting a user by ID.
///
/// The user's connection edges are removed before the user row itself.
pub async fn delete_user_endpoint(
    State(state): State<UserAdminState>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    delete_user(UserID::new(user_id), &connection)?;

    tracing::info!("deleted user {user_id}");

    Ok(StatusCode::NO_CONTENT)
}
