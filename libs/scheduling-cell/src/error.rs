use chrono::{NaiveTime, Weekday};
use thiserror::Error;

use shared_models::error::AppError;

use crate::models::BookingStatus;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Requested slot is no longer available")]
    SlotNoLongerAvailable,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Booking cannot move from {from} to {to}")]
    InvalidStatusTransition { from: BookingStatus, to: BookingStatus },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Failures reported by a storage collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Overlapping active booking: {0}")]
    ConstraintViolation(String),

    #[error("Booking reference already exists: {0}")]
    DuplicateReference(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConstraintViolation(_) => BookingError::SlotNoLongerAvailable,
            StoreError::NotFound(what) => BookingError::NotFound(what),
            StoreError::DuplicateReference(reference) => {
                BookingError::Persistence(format!("duplicate booking reference {}", reference))
            }
            StoreError::Backend(msg) => BookingError::Persistence(msg),
        }
    }
}

/// Failures of best-effort side effects. Never surfaced as a request failure.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Dispatch target not configured")]
    NotConfigured,

    #[error("Provider rejected the request: {0}")]
    Rejected(String),

    #[error("Transport failure: {0}")]
    Transport(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigValidationError {
    #[error("Unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("Working hours on {day} must start before they end ({start} - {end})")]
    EmptyWindow { day: Weekday, start: NaiveTime, end: NaiveTime },

    #[error("Working hours on {day} overlap each other")]
    OverlappingWindows { day: Weekday },

    #[error("Session duration must be at least one minute")]
    InvalidSessionDuration,
}

impl From<ConfigValidationError> for BookingError {
    fn from(err: ConfigValidationError) -> Self {
        BookingError::InvalidRequest(err.to_string())
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::InvalidRequest(msg) => AppError::InvalidRequest(msg),
            BookingError::SlotNoLongerAvailable => AppError::SlotNoLongerAvailable(
                "The requested slot was taken. Fetch availability again and pick another slot."
                    .to_string(),
            ),
            BookingError::NotFound(what) => AppError::NotFound(what),
            err @ BookingError::InvalidStatusTransition { .. } => {
                AppError::InvalidStatusTransition(err.to_string())
            }
            BookingError::Persistence(msg) => AppError::Persistence(msg),
        }
    }
}

impl From<ConfigValidationError> for AppError {
    fn from(err: ConfigValidationError) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        BookingError::from(err).into()
    }
}
