//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/users/{user_id}', use
//! [format_endpoint].

/// The route for registering a new user.
pub const REGISTER: &str = "/api/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to list all users.
pub const USERS: &str = "/api/users";
/// The route to access a single user.
pub const USER: &str = "/api/users/{user_id}";
/// The route to list or add the authenticated user's connections.
pub const CONNECTIONS: &str = "/api/connections";
/// The route to remove a single connection of the authenticated user.
pub const CONNECTION: &str = "/api/connections/{user_id}";
/// The route to send money to a connection.
pub const TRANSFER: &str = "/api/transfer";
/// The route to access ledger entries.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single ledger entry.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to list the ledger entries sent by a user.
pub const TRANSACTIONS_BY_SENDER: &str = "/api/transactions/sender/{user_id}";
/// The route to list the ledger entries received by a user.
pub const TRANSACTIONS_BY_RECEIVER: &str = "/api/transactions/receiver/{user_id}";
/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/users/{user_id}', '{user_id}' is
/// the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
