// libs/scheduling-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::error::BookingError;
use crate::models::BookingStatus;

/// Booking status state machine.
///
/// `pending` is accepted as an entry state even though new bookings are
/// created `confirmed`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BookingLifecycle;

impl BookingLifecycle {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_transition(
        &self,
        current_status: BookingStatus,
        new_status: BookingStatus,
    ) -> Result<(), BookingError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(BookingError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    pub fn valid_transitions(&self, current_status: BookingStatus) -> &'static [BookingStatus] {
        match current_status {
            BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
            BookingStatus::Confirmed => &[
                BookingStatus::Cancelled,
                BookingStatus::Completed,
                BookingStatus::NoShow,
            ],
            // Terminal
            BookingStatus::Cancelled | BookingStatus::Completed | BookingStatus::NoShow => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn pending_can_be_confirmed_or_cancelled() {
        let lifecycle = BookingLifecycle::new();
        assert!(lifecycle.validate_transition(BookingStatus::Pending, BookingStatus::Confirmed).is_ok());
        assert!(lifecycle.validate_transition(BookingStatus::Pending, BookingStatus::Cancelled).is_ok());
        assert!(lifecycle.validate_transition(BookingStatus::Pending, BookingStatus::Completed).is_err());
    }

    #[test]
    fn confirmed_moves_to_any_outcome() {
        let lifecycle = BookingLifecycle::new();
        for next in [BookingStatus::Cancelled, BookingStatus::Completed, BookingStatus::NoShow] {
            assert!(lifecycle.validate_transition(BookingStatus::Confirmed, next).is_ok());
        }
        assert!(lifecycle.validate_transition(BookingStatus::Confirmed, BookingStatus::Pending).is_err());
    }

    #[test]
    fn terminal_states_have_no_exits() {
        let lifecycle = BookingLifecycle::new();
        for terminal in [BookingStatus::Cancelled, BookingStatus::Completed, BookingStatus::NoShow] {
            assert!(lifecycle.valid_transitions(terminal).is_empty());
            assert_matches!(
                lifecycle.validate_transition(terminal, BookingStatus::Confirmed),
                Err(BookingError::InvalidStatusTransition { from, .. }) if from == terminal
            );
        }
    }
}
