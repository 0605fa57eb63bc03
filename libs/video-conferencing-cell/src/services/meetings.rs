// libs/video-conferencing-cell/src/services/meetings.rs
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info, warn};

use scheduling_cell::services::dispatch::{MeetingLinkProvider, MeetingLinkRequest};
use shared_config::AppConfig;

use crate::models::{CreateMeetingRequest, MeetingResponse, VideoConferencingError};

/// Client for the meeting provider's REST API.
#[derive(Debug)]
pub struct VideoMeetingClient {
    client: Client,
    api_token: String,
    base_url: String,
}

impl VideoMeetingClient {
    pub fn new(config: &AppConfig) -> Result<Self, VideoConferencingError> {
        if !config.is_video_meeting_configured() {
            return Err(VideoConferencingError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            api_token: config.video_meeting_api_token.clone(),
            base_url: config.video_meeting_api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a meeting. A repeated `idempotency_key` returns the meeting
    /// created the first time.
    /// POST /meetings
    pub async fn create_meeting(
        &self,
        request: &MeetingLinkRequest,
    ) -> Result<MeetingResponse, VideoConferencingError> {
        let url = format!("{}/meetings", self.base_url);

        let body = CreateMeetingRequest {
            title: request.summary.clone(),
            description: request.description.clone(),
            start_time: request.start,
            end_time: request.end,
            attendees: request.attendees.clone(),
        };

        debug!("Sending meeting creation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Idempotency-Key", &request.idempotency_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            error!("Meeting creation failed: {} - {}", status, response_text);
            return Err(VideoConferencingError::ProviderError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        let meeting: MeetingResponse = serde_json::from_str(&response_text).map_err(|e| {
            VideoConferencingError::ProviderError {
                message: format!("Failed to parse meeting response: {}", e),
            }
        })?;

        if meeting.join_url.trim().is_empty() {
            return Err(VideoConferencingError::ProviderError {
                message: format!("Meeting {} has no join URL", meeting.id),
            });
        }

        info!("Created meeting {} for booking {}", meeting.id, request.idempotency_key);
        Ok(meeting)
    }
}

#[async_trait]
impl MeetingLinkProvider for VideoMeetingClient {
    async fn create_meeting_link(&self, request: &MeetingLinkRequest) -> Option<String> {
        match self.create_meeting(request).await {
            Ok(meeting) => Some(meeting.join_url),
            Err(e) => {
                warn!(
                    "No meeting link for booking {}: {}",
                    request.idempotency_key, e
                );
                None
            }
        }
    }
}
