//! The registration endpoint for creating a new user account.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use email_address::EmailAddress;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    endpoints::{self, format_endpoint},
    user::{UserResponse, Username, create_user},
};

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The data entered by the user when registering an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// The display name for the new account.
    pub username: String,
    /// The email address for the new account, used to log in.
    pub email: String,
    /// The password for the new account.
    pub password: String,
    /// The password entered a second time, to catch typos.
    pub confirm_password: String,
}

/// Handler for creating a new user account.
///
/// The username, email syntax, password confirmation and password strength
/// are validated before the account is created. A duplicate email answers
/// 409, the account is not touched.
///
/// On success the new user is returned with status 201 and a `Location`
/// header pointing at the created resource.
pub async fn register_user(
    State(state): State<RegistrationState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, Error> {
    let username = Username::new(&request.username)?;
    let email = EmailAddress::from_str(&request.email)
        .map_err(|_| Error::InvalidEmail(request.email.clone()))?;

    if request.password != request.confirm_password {
        return Err(Error::PasswordMismatch);
    }

    let validated_password = ValidatedPassword::new(&request.password)?;
    let password_hash = PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = create_user(username, email, password_hash, &connection)?;

    tracing::info!("registered new user {}", user.id);

    let location = format_endpoint(endpoints::USER, user.id.as_i64());

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(UserResponse::from(&user)),
    )
        .into_response())
}
