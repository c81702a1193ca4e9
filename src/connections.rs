//! Endpoints for listing, adding and removing the authenticated user's
//! connections.
//!
//! The connection store's `connect` primitive is idempotent, but this layer
//! treats adding an edge that already exists as a user error so the client
//! can tell the user why nothing changed.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    connection::{are_connected, connect, disconnect, list_connections_for},
    user::{UserID, UserResponse, get_user_by_email, get_user_by_id},
};

/// The state needed for the connection endpoints.
#[derive(Debug, Clone)]
pub struct ConnectionsState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ConnectionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The data entered by the user when adding a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddConnectionRequest {
    /// The email address of the user to connect with.
    pub email: String,
}

/// Handler for listing the authenticated user's connections.
pub async fn get_connections(
    State(state): State<ConnectionsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<UserResponse>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let peers = list_connections_for(user_id, &connection)?;

    Ok(Json(peers.iter().map(UserResponse::from).collect()))
}

/// Handler for adding a connection by email.
///
/// The checks run in order so the user sees the most specific error: unknown
/// email answers 404, the user's own email answers 400 and an existing
/// connection answers 409. On success both users see the new edge and the
/// peer is returned with status 201.
pub async fn create_connection(
    State(state): State<ConnectionsState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<AddConnectionRequest>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let current_user = get_user_by_id(user_id, &connection)?;
    let target_user = get_user_by_email(&request.email, &connection)?;

    if current_user.id == target_user.id {
        return Err(Error::SelfReferentialConnection);
    }

    if are_connected(current_user.id, target_user.id, &connection)? {
        return Err(Error::DuplicateConnection);
    }

    connect(current_user.id, target_user.id, &connection)?;

    tracing::info!("connected users {} and {}", current_user.id, target_user.id);

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::from(&target_user)),
    )
        .into_response())
}

/// Handler for removing a connection by the peer's user ID.
///
/// Removing an absent edge is a no-op, so the handler is idempotent and
/// always answers 204.
pub async fn delete_connection(
    State(state): State<ConnectionsState>,
    Extension(user_id): Extension<UserID>,
    Path(peer_id): Path<i64>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    disconnect(user_id, UserID::new(peer_id), &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
