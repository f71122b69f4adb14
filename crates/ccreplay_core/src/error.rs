//! Error types for ccreplay core.

use crate::schedule::Request;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while parsing or replaying a schedule.
///
/// A failed OCC validation is not an error: it is recovered by rolling
/// the transaction back and rescheduling it.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A schedule token starts with something other than `R`, `W` or `C`.
    #[error("invalid operation: {token:?}")]
    InvalidOperation {
        /// The offending token.
        token: String,
    },

    /// A schedule token has a valid operation but a malformed body.
    #[error("malformed token {token:?}: {message}")]
    MalformedToken {
        /// The offending token.
        token: String,
        /// What is wrong with it.
        message: String,
    },

    /// The schedule ran out while requests were still waiting for locks.
    #[error("deadlock detected: {} requests still waiting", .waiting.len())]
    Deadlock {
        /// Requests left in the waiting queue, in FIFO order.
        waiting: Vec<Request>,
    },

    /// A schedule tick names a transaction that was never registered.
    #[error("unknown transaction {id}")]
    UnknownTransaction {
        /// The unknown id.
        id: u64,
    },

    /// Two transactions were registered under the same id.
    #[error("duplicate transaction {id}")]
    DuplicateTransaction {
        /// The duplicated id.
        id: u64,
    },

    /// A schedule tick names a transaction with no operation left to run.
    #[error("transaction {id} has no pending operation")]
    TransactionExhausted {
        /// Logical timestamp of the transaction when the tick arrived.
        id: u64,
    },

    /// A transaction was rolled back more often than the configured bound.
    #[error("transaction {id} exceeded {limit} rollbacks")]
    RetryLimitExceeded {
        /// Original id of the transaction.
        id: u64,
        /// The configured bound.
        limit: usize,
    },

    /// Applying committed work to a value store failed.
    #[error("storage error: {0}")]
    Storage(#[from] ccreplay_storage::StorageError),
}

impl CoreError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(token: impl Into<String>) -> Self {
        Self::InvalidOperation {
            token: token.into(),
        }
    }

    /// Creates a malformed token error.
    pub fn malformed_token(token: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedToken {
            token: token.into(),
            message: message.into(),
        }
    }

    /// Returns true if this is a deadlock.
    #[must_use]
    pub fn is_deadlock(&self) -> bool {
        matches!(self, Self::Deadlock { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Operation;
    use crate::types::TxnId;

    #[test]
    fn deadlock_message_counts_waiters() {
        let err = CoreError::Deadlock {
            waiting: vec![
                Request::new(TxnId::new(1), Operation::write("Y")),
                Request::new(TxnId::new(2), Operation::write("X")),
            ],
        };
        assert!(err.is_deadlock());
        assert_eq!(err.to_string(), "deadlock detected: 2 requests still waiting");
    }

    #[test]
    fn invalid_operation_message() {
        let err = CoreError::invalid_operation("X1(A)");
        assert_eq!(err.to_string(), "invalid operation: \"X1(A)\"");
        assert!(!err.is_deadlock());
    }
}
