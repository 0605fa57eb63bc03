pub mod meetings;

pub use meetings::VideoMeetingClient;
