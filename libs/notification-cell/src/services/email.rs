use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use scheduling_cell::error::DispatchError;
use scheduling_cell::models::{Booking, SessionType, Therapist};
use scheduling_cell::services::dispatch::{NotificationDispatcher, RecipientRole};
use shared_config::AppConfig;

use crate::models::EmailMessage;
use crate::services::templates::render_confirmation;

/// Sends booking confirmations through the configured email API.
#[derive(Debug)]
pub struct EmailNotificationService {
    client: Client,
    api_url: String,
    api_key: String,
    from_address: String,
    practice_name: String,
}

impl EmailNotificationService {
    pub fn new(config: &AppConfig) -> Result<Self, DispatchError> {
        if !config.is_email_configured() {
            return Err(DispatchError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            api_url: config.email_api_url.clone(),
            api_key: config.email_api_key.clone(),
            from_address: config.email_from_address.clone(),
            practice_name: config.practice_name.clone(),
        })
    }

    pub fn compose(
        &self,
        recipient: RecipientRole,
        booking: &Booking,
        therapist: &Therapist,
        session_type: &SessionType,
    ) -> EmailMessage {
        let rendered = render_confirmation(recipient, booking, therapist, session_type, &self.practice_name);

        let (to, reply_to) = match recipient {
            RecipientRole::Client => (booking.client_email.clone(), Some(therapist.email.clone())),
            RecipientRole::Therapist => (therapist.email.clone(), Some(booking.client_email.clone())),
        };

        EmailMessage {
            from: format!("{} <{}>", self.practice_name, self.from_address),
            to: vec![to],
            subject: rendered.subject,
            text: rendered.text,
            reply_to,
        }
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), DispatchError> {
        debug!("Sending email '{}' to {:?}", message.subject, message.to);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(message)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Email API rejected message: {} - {}", status, body);
            return Err(DispatchError::Rejected(format!("HTTP {}: {}", status, body)));
        }

        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for EmailNotificationService {
    async fn send_booking_confirmation(
        &self,
        recipient: RecipientRole,
        booking: &Booking,
        therapist: &Therapist,
        session_type: &SessionType,
    ) -> Result<(), DispatchError> {
        let message = self.compose(recipient, booking, therapist, session_type);
        self.send(&message).await
    }
}
