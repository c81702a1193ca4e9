//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};

use crate::{
    AppState,
    auth_middleware::auth_guard,
    connections::{create_connection, delete_connection, get_connections},
    endpoints,
    log_in::post_log_in,
    log_out::get_log_out,
    register_user::register_user,
    send_money::post_transfer,
    transaction_admin::{
        delete_transaction_endpoint, get_transaction, get_transactions,
        get_transactions_by_receiver, get_transactions_by_sender, put_transaction,
    },
    user_admin::{delete_user_endpoint, get_user, get_users, put_user},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::REGISTER, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out));

    let protected_routes = Router::new()
        .route(
            endpoints::CONNECTIONS,
            get(get_connections).post(create_connection),
        )
        .route(endpoints::CONNECTION, delete(delete_connection))
        .route(endpoints::TRANSFER, post(post_transfer))
        .route(endpoints::USERS, get(get_users))
        .route(
            endpoints::USER,
            get(get_user).put(put_user).delete(delete_user_endpoint),
        )
        .route(endpoints::TRANSACTIONS, get(get_transactions))
        .route(
            endpoints::TRANSACTION,
            get(get_transaction)
                .put(put_transaction)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS_BY_SENDER,
            get(get_transactions_by_sender),
        )
        .route(
            endpoints::TRANSACTIONS_BY_RECEIVER,
            get(get_transactions_by_receiver),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, "I'm a teapot").into_response()
}

/// The JSON response for requests that match no route.
async fn get_404_not_found() -> Response {
    crate::error_response(StatusCode::NOT_FOUND, "Not found")
}
