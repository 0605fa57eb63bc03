use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub video_meeting_api_url: String,
    pub video_meeting_api_token: String,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from_address: String,
    pub practice_name: String,
    pub booking_reference_prefix: String,
    pub booking_reference_max_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            video_meeting_api_url: String::new(),
            video_meeting_api_token: String::new(),
            email_api_url: String::new(),
            email_api_key: String::new(),
            email_from_address: "bookings@localhost".to_string(),
            practice_name: "Therapy Practice".to_string(),
            booking_reference_prefix: "BK".to_string(),
            booking_reference_max_attempts: 5,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.server_port),
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, bookings will be kept in memory");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, bearer tokens will be rejected");
                    String::new()
                }),
            video_meeting_api_url: env::var("VIDEO_MEETING_API_URL")
                .unwrap_or_else(|_| {
                    warn!("VIDEO_MEETING_API_URL not set, video bookings will have no meeting link");
                    String::new()
                }),
            video_meeting_api_token: env::var("VIDEO_MEETING_API_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("VIDEO_MEETING_API_TOKEN not set, using empty value");
                    String::new()
                }),
            email_api_url: env::var("EMAIL_API_URL")
                .unwrap_or_else(|_| {
                    warn!("EMAIL_API_URL not set, confirmations will only be logged");
                    String::new()
                }),
            email_api_key: env::var("EMAIL_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("EMAIL_API_KEY not set, using empty value");
                    String::new()
                }),
            email_from_address: env::var("EMAIL_FROM_ADDRESS")
                .unwrap_or(defaults.email_from_address),
            practice_name: env::var("PRACTICE_NAME").unwrap_or(defaults.practice_name),
            booking_reference_prefix: env::var("BOOKING_REFERENCE_PREFIX")
                .unwrap_or(defaults.booking_reference_prefix),
            booking_reference_max_attempts: env::var("BOOKING_REFERENCE_MAX_ATTEMPTS")
                .ok()
                .and_then(|attempts| attempts.parse().ok())
                .filter(|attempts: &u32| *attempts > 0)
                .unwrap_or(defaults.booking_reference_max_attempts),
        };

        if !config.is_database_configured() {
            warn!("Database not configured - running with the in-memory booking store");
        }

        config
    }

    pub fn is_database_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn is_auth_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_video_meeting_configured(&self) -> bool {
        !self.video_meeting_api_url.is_empty() && !self.video_meeting_api_token.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.email_api_url.is_empty() && !self.email_api_key.is_empty()
    }
}
