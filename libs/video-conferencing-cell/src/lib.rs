//! Video meeting links for bookings, backed by an HTTP meeting provider.

pub mod models;
pub mod services;

pub use models::{CreateMeetingRequest, MeetingResponse, VideoConferencingError};
pub use services::VideoMeetingClient;
