//! Error types for matching operations.

use chrono::{DateTime, Utc};
use database::{DatabaseError, OrderStatus, ValidationError};
use thiserror::Error;

use crate::permissions::Permission;

/// Errors that can occur while matching, offering or updating orders.
#[derive(Debug, Error)]
pub enum MatchingError {
    /// Storage failed or a referenced row was missing.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Rejected input.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The order cannot move between these states.
    #[error("order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The executor does not hold this order (offer or assignment).
    #[error("order {order_id} is not offered to or assigned to executor {executor_id}")]
    NotOffered { order_id: i64, executor_id: i64 },

    /// The executor is temporarily blocked.
    #[error("executor {executor_id} is blocked")]
    ExecutorBlocked {
        executor_id: i64,
        until: Option<DateTime<Utc>>,
    },

    /// The acting user lacks a capability.
    #[error("user {actor_id} lacks permission {permission:?}")]
    Forbidden { actor_id: i64, permission: Permission },

    /// The acting client does not own the order.
    #[error("order {order_id} does not belong to user {user_id}")]
    NotOwner { order_id: i64, user_id: i64 },
}

impl MatchingError {
    /// Whether this error means the action was already handled or lost a race.
    ///
    /// UIs show these as a transient "already handled" message rather than a failure.
    ///
    /// A write that lost the SQLite lock to a concurrent resolution (for
    /// example the expiry sweep) counts too; nothing was changed.
    pub fn is_already_handled(&self) -> bool {
        match self {
            MatchingError::Database(err) if err.is_busy() => true,
            _ => matches!(
                self,
                MatchingError::InvalidTransition { .. }
                    | MatchingError::NotOffered { .. }
                    | MatchingError::Database(DatabaseError::NotFound { .. })
                    | MatchingError::Database(DatabaseError::AlreadyExists { .. })
            ),
        }
    }
}

/// Errors from the notification transport.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The transport could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The transport refused the message.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Result type for matching operations.
pub type Result<T> = std::result::Result<T, MatchingError>;
