//! Best-effort side effects of a booking: the video meeting link requested
//! before persistence and the confirmation notifications sent after it.
//!
//! Neither ever fails a booking. Link creation degrades to `None`; notification
//! failures are logged and reported through [`DispatchReport`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::DispatchError;
use crate::models::{Booking, SessionType, Therapist};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MeetingLinkRequest {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<String>,
    /// Stable per booking so a retried request cannot create a second meeting.
    pub idempotency_key: String,
}

#[async_trait]
pub trait MeetingLinkProvider: Send + Sync {
    /// A join URL, or `None` when the provider is unavailable or refuses.
    async fn create_meeting_link(&self, request: &MeetingLinkRequest) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientRole {
    Client,
    Therapist,
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_booking_confirmation(
        &self,
        recipient: RecipientRole,
        booking: &Booking,
        therapist: &Therapist,
        session_type: &SessionType,
    ) -> Result<(), DispatchError>;
}

/// Used when no video provider is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMeetingLinks;

#[async_trait]
impl MeetingLinkProvider for DisabledMeetingLinks {
    async fn create_meeting_link(&self, request: &MeetingLinkRequest) -> Option<String> {
        warn!(
            "Video meetings not configured; booking {} proceeds without a link",
            request.idempotency_key
        );
        None
    }
}

/// Used when no email provider is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyNotifier;

#[async_trait]
impl NotificationDispatcher for LogOnlyNotifier {
    async fn send_booking_confirmation(
        &self,
        recipient: RecipientRole,
        booking: &Booking,
        _therapist: &Therapist,
        _session_type: &SessionType,
    ) -> Result<(), DispatchError> {
        info!(
            "Email not configured; would send {:?} confirmation for booking {}",
            recipient, booking.booking_reference
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub booking_reference: String,
    pub client: DeliveryOutcome,
    pub therapist: DeliveryOutcome,
}

/// Handle on the notification task. Dropping it detaches the task.
#[derive(Debug)]
pub struct DispatchHandle(JoinHandle<DispatchReport>);

impl DispatchHandle {
    /// Wait for both notifications. `None` if the task panicked or was aborted.
    pub async fn wait(self) -> Option<DispatchReport> {
        match self.0.await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Notification task did not finish: {}", e);
                None
            }
        }
    }
}

/// Send client and therapist confirmations on a background task.
pub fn spawn_confirmations(
    notifier: Arc<dyn NotificationDispatcher>,
    booking: Booking,
    therapist: Therapist,
    session_type: SessionType,
) -> DispatchHandle {
    DispatchHandle(tokio::spawn(async move {
        let client = deliver(notifier.as_ref(), RecipientRole::Client, &booking, &therapist, &session_type).await;
        let therapist_outcome =
            deliver(notifier.as_ref(), RecipientRole::Therapist, &booking, &therapist, &session_type).await;

        DispatchReport {
            booking_reference: booking.booking_reference,
            client,
            therapist: therapist_outcome,
        }
    }))
}

async fn deliver(
    notifier: &dyn NotificationDispatcher,
    recipient: RecipientRole,
    booking: &Booking,
    therapist: &Therapist,
    session_type: &SessionType,
) -> DeliveryOutcome {
    match notifier
        .send_booking_confirmation(recipient, booking, therapist, session_type)
        .await
    {
        Ok(()) => {
            info!("Sent {:?} confirmation for booking {}", recipient, booking.booking_reference);
            DeliveryOutcome::Delivered
        }
        Err(e) => {
            warn!(
                "Failed to send {:?} confirmation for booking {}: {}",
                recipient, booking.booking_reference, e
            );
            DeliveryOutcome::Failed(e.to_string())
        }
    }
}
