//! Log-out route handler that invalidates the authentication cookies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::auth_cookie::invalidate_auth_cookie;

/// Invalidate the auth cookie, ending the session.
///
/// Logging out without a session is a no-op and also answers 204.
pub async fn get_log_out(jar: PrivateCookieJar) -> Response {
    let jar = invalidate_auth_cookie(jar);

    (jar, StatusCode::NO_CONTENT).into_response()
}
