pub mod availability;
pub mod booking;
pub mod calendar;
pub mod dispatch;
pub mod lifecycle;
pub mod reference;
pub mod schedule;

pub use availability::{compute_available_slots, AvailabilityService, AvailableSlots};
pub use booking::{BookingCreated, BookingService};
pub use schedule::{validate_schedule_config, ScheduleService};
