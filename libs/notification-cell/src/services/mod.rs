pub mod email;
pub mod templates;

pub use email::EmailNotificationService;
pub use templates::render_confirmation;
