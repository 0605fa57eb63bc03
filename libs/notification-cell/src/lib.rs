//! Booking confirmation emails sent through an HTTP email API.

pub mod models;
pub mod services;

pub use models::EmailMessage;
pub use services::{render_confirmation, EmailNotificationService};
