// libs/video-conferencing-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of `POST {base}/meetings`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateMeetingRequest {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeetingResponse {
    pub id: String,
    pub join_url: String,
    #[serde(default)]
    pub host_url: Option<String>,
}

#[derive(Error, Debug)]
pub enum VideoConferencingError {
    #[error("Video meetings not configured")]
    NotConfigured,

    #[error("Meeting provider error: {message}")]
    ProviderError { message: String },

    #[error("Meeting provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}
