//! The transfer validator: decides whether a transfer may happen without
//! committing anything.
//!
//! Rejection is an expected, common outcome, so the validator returns a
//! decision value instead of an error. Errors are reserved for store faults.
//! Recording an accepted transfer is the ledger's job, see [crate::ledger].

use std::fmt::Display;

use rusqlite::Connection;

use crate::{Error, connection::are_connected, user::User};

/// The smallest amount of money that can be transferred.
pub const MIN_TRANSFER_AMOUNT: f64 = 0.01;

/// Why a transfer request was turned down.
///
/// Each reason renders as the message shown to the user who requested the
/// transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No account matches the requested recipient.
    RecipientNotFound,
    /// The sender and the recipient are the same account.
    SelfTransfer,
    /// There is no connection edge between sender and recipient.
    NotConnected,
    /// The amount is below [MIN_TRANSFER_AMOUNT].
    InvalidAmount,
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            RejectReason::RecipientNotFound => "Recipient not found",
            RejectReason::SelfTransfer => "You cannot send money to yourself",
            RejectReason::NotConnected => "You can only send money to your connections.",
            RejectReason::InvalidAmount => "Amount must be at least 0.01",
        };

        write!(f, "{message}")
    }
}

/// The outcome of validating a transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDecision {
    /// The transfer may be recorded.
    Accepted,
    /// The transfer must not be recorded, with the reason to show the user.
    Rejected(RejectReason),
}

/// Decide whether `sender` may transfer `amount` to `receiver`.
///
/// `receiver` is the result of resolving the requested recipient against the
/// account store, `None` when no account matched. The checks run in a fixed
/// order and the first failure wins, so the user always sees the most
/// specific message:
///
/// 1. the recipient resolves to an existing account,
/// 2. the recipient is not the sender themselves,
/// 3. sender and recipient are connected,
/// 4. the amount is at least [MIN_TRANSFER_AMOUNT].
///
/// The self-transfer check is deliberately explicit even though a connection
/// edge can never point back at the sender: the decision must not lean on the
/// shape of the graph alone.
///
/// There is no balance or funds-sufficiency check. The only financial
/// guarantee is that money moves along an existing connection edge with a
/// positive amount.
///
/// # Errors
///
/// Returns an [Error::SqlError] if the connection lookup failed. A rejected
/// transfer is not an error.
pub fn validate_transfer(
    sender: &User,
    receiver: Option<&User>,
    amount: f64,
    connection: &Connection,
) -> Result<TransferDecision, Error> {
    let receiver = match receiver {
        Some(receiver) => receiver,
        None => return Ok(TransferDecision::Rejected(RejectReason::RecipientNotFound)),
    };

    if sender.id == receiver.id {
        return Ok(TransferDecision::Rejected(RejectReason::SelfTransfer));
    }

    if !are_connected(sender.id, receiver.id, connection)? {
        return Ok(TransferDecision::Rejected(RejectReason::NotConnected));
    }

    if amount < MIN_TRANSFER_AMOUNT {
        return Ok(TransferDecision::Rejected(RejectReason::InvalidAmount));
    }

    Ok(TransferDecision::Accepted)
}

#[cfg(test)]
mod validate_transfer_tests {
    use rusqlite::Connection;

    use crate::{
        connection::connect,
        user::{
            User,
            test_utils::{init_db, insert_test_user},
        },
    };

    use super::{RejectReason, TransferDecision, validate_transfer};

    fn init_db_with_two_users() -> (Connection, User, User) {
        let connection = init_db();
        let alice = insert_test_user("alice", "alice@example.com", &connection);
        let bob = insert_test_user("bob", "bob@example.com", &connection);

        (connection, alice, bob)
    }

    #[test]
    fn rejects_missing_recipient() {
        let (connection, alice, _) = init_db_with_two_users();

        let decision = validate_transfer(&alice, None, 10.0, &connection).unwrap();

        assert_eq!(
            decision,
            TransferDecision::Rejected(RejectReason::RecipientNotFound)
        );
    }

    #[test]
    fn rejects_self_transfer() {
        let (connection, alice, _) = init_db_with_two_users();

        let decision = validate_transfer(&alice, Some(&alice), 10.0, &connection).unwrap();

        assert_eq!(
            decision,
            TransferDecision::Rejected(RejectReason::SelfTransfer)
        );
    }

    #[test]
    fn rejects_unconnected_users_regardless_of_amount() {
        let (connection, alice, bob) = init_db_with_two_users();

        for amount in [10.0, 0.0, -5.0] {
            let decision = validate_transfer(&alice, Some(&bob), amount, &connection).unwrap();

            assert_eq!(
                decision,
                TransferDecision::Rejected(RejectReason::NotConnected),
                "amount {amount} should be rejected with NotConnected"
            );
        }
    }

    #[test]
    fn rejects_zero_amount() {
        let (connection, alice, bob) = init_db_with_two_users();
        connect(alice.id, bob.id, &connection).unwrap();

        let decision = validate_transfer(&alice, Some(&bob), 0.0, &connection).unwrap();

        assert_eq!(
            decision,
            TransferDecision::Rejected(RejectReason::InvalidAmount)
        );
    }

    #[test]
    fn rejects_negative_amount() {
        let (connection, alice, bob) = init_db_with_two_users();
        connect(alice.id, bob.id, &connection).unwrap();

        let decision = validate_transfer(&alice, Some(&bob), -5.0, &connection).unwrap();

        assert_eq!(
            decision,
            TransferDecision::Rejected(RejectReason::InvalidAmount)
        );
    }

    #[test]
    fn accepts_minimum_amount_between_connected_users() {
        let (connection, alice, bob) = init_db_with_two_users();
        connect(alice.id, bob.id, &connection).unwrap();

        let decision = validate_transfer(&alice, Some(&bob), 0.01, &connection).unwrap();

        assert_eq!(decision, TransferDecision::Accepted);
    }

    #[test]
    fn accepts_transfer_in_both_directions() {
        let (connection, alice, bob) = init_db_with_two_users();
        connect(alice.id, bob.id, &connection).unwrap();

        assert_eq!(
            validate_transfer(&alice, Some(&bob), 10.0, &connection).unwrap(),
            TransferDecision::Accepted
        );
        assert_eq!(
            validate_transfer(&bob, Some(&alice), 10.0, &connection).unwrap(),
            TransferDecision::Accepted
        );
    }

    #[test]
    fn self_transfer_wins_over_invalid_amount() {
        let (connection, alice, _) = init_db_with_two_users();

        let decision = validate_transfer(&alice, Some(&alice), -1.0, &connection).unwrap();

        assert_eq!(
            decision,
            TransferDecision::Rejected(RejectReason::SelfTransfer)
        );
    }

    #[test]
    fn rejects_recipient_deleted_after_connecting() {
        let (connection, alice, bob) = init_db_with_two_users();
        connect(alice.id, bob.id, &connection).unwrap();

        crate::user::delete_user(bob.id, &connection).unwrap();

        // The caller resolves the recipient by email and finds nothing.
        let receiver = match crate::user::get_user_by_email("bob@example.com", &connection) {
            Ok(user) => Some(user),
            Err(_) => None,
        };

        let decision = validate_transfer(&alice, receiver.as_ref(), 5.0, &connection).unwrap();

        assert_eq!(
            decision,
            TransferDecision::Rejected(RejectReason::RecipientNotFound)
        );
    }

    #[test]
    fn validation_does_not_write_to_the_ledger() {
        let (connection, alice, bob) = init_db_with_two_users();
        connect(alice.id, bob.id, &connection).unwrap();

        validate_transfer(&alice, Some(&bob), 10.0, &connection).unwrap();

        let entry_count: i64 = connection
            .query_row("SELECT COUNT(*) FROM ledger_entry", [], |row| row.get(0))
            .unwrap();
        assert_eq!(entry_count, 0);
    }
}
