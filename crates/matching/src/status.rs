//! Order status transitions.

use database::OrderStatus;

use crate::error::{MatchingError, Result};

/// Whether an order may move from `from` to `to`.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    match (from, to) {
        // Forward progression
        (New, Accepted) | (Accepted, OnTheWay) | (OnTheWay, InProgress) | (InProgress, Completed) => {
            true
        }

        // Cancellation from any live state except re-confirmation
        (New | Accepted | OnTheWay | InProgress, Cancelled) => true,

        // Post-edit re-confirmation
        (Accepted | OnTheWay | InProgress, PendingConfirmation) => true,
        (PendingConfirmation, Accepted) => true,

        // Unassignment or refused re-confirmation returns the order to the pool
        (from, New) => from.is_assigned(),

        _ => false,
    }
}

/// Fail with [`MatchingError::InvalidTransition`] unless the move is allowed.
pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(MatchingError::InvalidTransition { from, to })
    }
}

/// Next step an assigned executor can report, if any.
pub fn next_progress(status: OrderStatus) -> Option<OrderStatus> {
    match status {
        OrderStatus::Accepted => Some(OrderStatus::OnTheWay),
        OrderStatus::OnTheWay => Some(OrderStatus::InProgress),
        OrderStatus::InProgress => Some(OrderStatus::Completed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    const ALL: [OrderStatus; 7] = [
        New,
        Accepted,
        OnTheWay,
        InProgress,
        Completed,
        Cancelled,
        PendingConfirmation,
    ];

    #[test]
    fn test_happy_path() {
        assert!(can_transition(New, Accepted));
        assert!(can_transition(Accepted, OnTheWay));
        assert!(can_transition(OnTheWay, InProgress));
        assert!(can_transition(InProgress, Completed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for to in ALL {
            assert!(!can_transition(Completed, to));
            assert!(!can_transition(Cancelled, to));
        }
    }

    #[test]
    fn test_no_skipping_steps() {
        assert!(!can_transition(New, InProgress));
        assert!(!can_transition(Accepted, Completed));
        assert!(!can_transition(New, PendingConfirmation));
    }

    #[test]
    fn test_reconfirmation_and_release() {
        assert!(can_transition(InProgress, PendingConfirmation));
        assert!(can_transition(PendingConfirmation, Accepted));
        assert!(can_transition(PendingConfirmation, New));
        assert!(!can_transition(PendingConfirmation, Cancelled));
        assert!(can_transition(OnTheWay, New));
        assert!(!can_transition(New, New));
    }

    #[test]
    fn test_ensure_transition_reports_states() {
        match ensure_transition(Completed, Cancelled) {
            Err(MatchingError::InvalidTransition { from, to }) => {
                assert_eq!(from, Completed);
                assert_eq!(to, Cancelled);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(ensure_transition(New, Cancelled).is_ok());
    }

    #[test]
    fn test_progress_follows_transitions() {
        for from in ALL {
            if let Some(to) = next_progress(from) {
                assert!(can_transition(from, to));
            }
        }
        assert_eq!(next_progress(Completed), None);
        assert_eq!(next_progress(New), None);
    }
}
