//! Item status transition rules.

use super::types::ItemStatus;
use crate::error::StateError;

pub struct StatusTransition;

impl StatusTransition {
    pub fn is_allowed(from: ItemStatus, to: ItemStatus) -> bool {
        use ItemStatus::*;

        matches!(
            (from, to),
            (Pending, Running)
                | (Pending, Skipped)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Timeout)
                | (Running, Interrupted)
        )
    }

    /// Statuses only move forward within an attempt; terminal states are final.
    pub fn validate(item_id: &str, from: ItemStatus, to: ItemStatus) -> Result<(), StateError> {
        if Self::is_allowed(from, to) {
            Ok(())
        } else {
            Err(StateError::InvalidTransition {
                item_id: item_id.to_string(),
                from,
                to,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ItemStatus::*;

    #[test]
    fn test_valid_transitions() {
        assert!(StatusTransition::validate("A", Pending, Running).is_ok());
        assert!(StatusTransition::validate("A", Pending, Skipped).is_ok());
        assert!(StatusTransition::validate("A", Running, Timeout).is_ok());
        assert!(StatusTransition::validate("A", Running, Interrupted).is_ok());
    }

    #[test]
    fn test_no_transition_returns_to_an_earlier_state() {
        assert!(StatusTransition::validate("A", Running, Pending).is_err());
        assert!(StatusTransition::validate("A", Completed, Running).is_err());
        assert!(StatusTransition::validate("A", Failed, Completed).is_err());
        assert!(StatusTransition::validate("A", Pending, Completed).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [Completed, Failed, Skipped, Timeout, Interrupted] {
            assert!(terminal.is_terminal());
            for to in [Pending, Running, Completed, Failed, Skipped, Timeout, Interrupted] {
                assert!(!StatusTransition::is_allowed(terminal, to));
            }
        }
    }
}
