//! Appointment scheduling for a therapy practice.
//!
//! [`services::availability`] turns a therapist's weekly working hours, session
//! length, buffer and existing bookings into bookable slots.
//! [`services::booking`] books one of those slots, re-checking it against
//! storage at write time, and hands confirmations to a background task.
//! Storage sits behind [`store::SchedulingStore`].

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use error::{BookingError, ConfigValidationError, DispatchError, StoreError};
pub use handlers::SchedulingState;
pub use models::*;
pub use router::scheduling_routes;
