// libs/scheduling-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{BookingError, StoreError};
use crate::models::{
    Booking, BookingConfirmation, BookingContext, BookingStatus, CancelBookingRequest,
    CreateBookingRequest, MeetingType, SessionType, TherapistScheduleConfig,
};
use crate::services::availability::{check_requested_slot, conflicting_bookings, SlotRejection};
use crate::services::dispatch::{
    spawn_confirmations, DispatchHandle, MeetingLinkProvider, MeetingLinkRequest, NotificationDispatcher,
};
use crate::services::lifecycle::BookingLifecycle;
use crate::services::reference::{normalize_reference, ReferenceSource};
use crate::store::SchedulingStore;

pub const DEFAULT_REFERENCE_ATTEMPTS: u32 = 5;

/// A persisted booking plus the handle of its confirmation task.
#[derive(Debug)]
pub struct BookingCreated {
    pub booking: Booking,
    pub dispatch: DispatchHandle,
}

impl BookingCreated {
    pub fn confirmation(&self) -> BookingConfirmation {
        BookingConfirmation {
            booking_reference: self.booking.booking_reference.clone(),
            status: self.booking.status,
            meeting_link: self.booking.meeting_link.clone(),
            start_datetime: self.booking.start_datetime,
            end_datetime: self.booking.end_datetime,
            confirmation: "queued".to_string(),
        }
    }
}

pub struct BookingService {
    store: Arc<dyn SchedulingStore>,
    meeting_links: Arc<dyn MeetingLinkProvider>,
    notifier: Arc<dyn NotificationDispatcher>,
    references: Arc<dyn ReferenceSource>,
    lifecycle: BookingLifecycle,
    max_reference_attempts: u32,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        meeting_links: Arc<dyn MeetingLinkProvider>,
        notifier: Arc<dyn NotificationDispatcher>,
        references: Arc<dyn ReferenceSource>,
    ) -> Self {
        Self {
            store,
            meeting_links,
            notifier,
            references,
            lifecycle: BookingLifecycle::new(),
            max_reference_attempts: DEFAULT_REFERENCE_ATTEMPTS,
        }
    }

    pub fn with_max_reference_attempts(mut self, attempts: u32) -> Self {
        self.max_reference_attempts = attempts.max(1);
        self
    }

    /// Book a requested slot.
    ///
    /// Everything before `save_booking` is side-effect free apart from the
    /// meeting link, which is keyed by the booking id. The store write is the
    /// only hard failure point after validation; notifications run afterwards
    /// and never undo it.
    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
        context: BookingContext,
        now: DateTime<Utc>,
    ) -> Result<BookingCreated, BookingError> {
        info!(
            "Booking request for therapist {} at {}",
            request.therapist_id, request.start_datetime
        );

        request.validate()?;

        let therapist = self
            .store
            .find_therapist(request.therapist_id)
            .await?
            .ok_or_else(|| BookingError::InvalidRequest(format!("Unknown therapist {}", request.therapist_id)))?;

        let config = self
            .store
            .find_therapist_config(request.therapist_id)
            .await?
            .ok_or_else(|| {
                BookingError::InvalidRequest(format!("Therapist {} has no schedule", request.therapist_id))
            })?;

        let session_type = self.bookable_session_type(&request).await?;
        debug!("Booking request resolved to session type '{}'", session_type.name);

        let requested_length = request.end_datetime - request.start_datetime;
        if requested_length != session_type.length() {
            return Err(BookingError::InvalidRequest(format!(
                "'{}' lasts {} minutes, requested slot lasts {} seconds",
                session_type.name,
                session_type.duration,
                requested_length.num_seconds()
            )));
        }

        check_requested_slot(&config, request.start_datetime, request.end_datetime, now).map_err(
            |rejection| match rejection {
                SlotRejection::InsideNoticePeriod => BookingError::SlotNoLongerAvailable,
                SlotRejection::OutsideWorkingHours => {
                    BookingError::InvalidRequest("Requested slot is outside working hours".to_string())
                }
                SlotRejection::BeyondBookingHorizon => BookingError::InvalidRequest(format!(
                    "Bookings open at most {} days ahead",
                    config.advance_booking_days
                )),
            },
        )?;

        self.ensure_slot_still_free(&config, &request).await?;
        debug!("Slot at {} is free at write time", request.start_datetime);

        let booking_id = Uuid::new_v4();
        let booking_reference = self.allocate_reference().await?;
        debug!("Allocated reference {} for booking {}", booking_reference, booking_id);

        let meeting_link = match session_type.meeting_type {
            MeetingType::Video => {
                self.meeting_links
                    .create_meeting_link(&MeetingLinkRequest {
                        summary: format!("{} with {}", session_type.name, therapist.display_name),
                        // The reference may still change on write; the id will not.
                        description: format!("Booking {}", booking_id),
                        start: request.start_datetime,
                        end: request.end_datetime,
                        attendees: vec![request.client_email.trim().to_string(), therapist.email.clone()],
                        idempotency_key: booking_id.to_string(),
                    })
                    .await
            }
            MeetingType::InPerson | MeetingType::Phone => None,
        };

        if session_type.meeting_type == MeetingType::Video && meeting_link.is_none() {
            warn!("Booking {} will be saved without a meeting link", booking_reference);
        }

        let booking = Booking {
            id: booking_id,
            booking_reference,
            therapist_id: request.therapist_id,
            session_type_id: Some(session_type.id),
            client_id: context.client_id,
            client_name: request.client_name.trim().to_string(),
            client_email: request.client_email.trim().to_string(),
            client_phone: request.client_phone,
            client_notes: request.client_notes,
            start_datetime: request.start_datetime,
            end_datetime: request.end_datetime,
            timezone: request.timezone.unwrap_or_else(|| config.timezone.clone()),
            status: BookingStatus::Confirmed,
            meeting_type: session_type.meeting_type,
            meeting_link,
            meeting_location: session_type.meeting_location.clone(),
            cancellation_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            internal_notes: None,
            reminder_sent_at: None,
            created_by: context.created_by,
            created_at: now,
            updated_at: now,
        };

        let booking = self.persist(booking).await?;
        info!(
            "Booking {} confirmed for therapist {} at {}",
            booking.booking_reference, booking.therapist_id, booking.start_datetime
        );

        let dispatch = spawn_confirmations(
            Arc::clone(&self.notifier),
            booking.clone(),
            therapist,
            session_type,
        );

        Ok(BookingCreated { booking, dispatch })
    }

    pub async fn get_booking(&self, reference: &str) -> Result<Booking, BookingError> {
        let reference = normalize_reference(reference);
        self.store
            .find_booking_by_reference(&reference)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Booking {}", reference)))
    }

    pub async fn confirm_booking(&self, reference: &str, now: DateTime<Utc>) -> Result<Booking, BookingError> {
        self.transition(reference, BookingStatus::Confirmed, now, |_| {}).await
    }

    pub async fn cancel_booking(
        &self,
        reference: &str,
        request: CancelBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        self.transition(reference, BookingStatus::Cancelled, now, |booking| {
            booking.cancellation_reason = request.reason;
            booking.cancelled_by = Some(request.cancelled_by);
            booking.cancelled_at = Some(now);
        })
        .await
    }

    pub async fn complete_booking(&self, reference: &str, now: DateTime<Utc>) -> Result<Booking, BookingError> {
        self.transition(reference, BookingStatus::Completed, now, |_| {}).await
    }

    pub async fn mark_no_show(&self, reference: &str, now: DateTime<Utc>) -> Result<Booking, BookingError> {
        self.transition(reference, BookingStatus::NoShow, now, |_| {}).await
    }

    /// Confirmed bookings starting in `[now, now + lead)` with no reminder sent yet.
    pub async fn bookings_due_for_reminder(
        &self,
        now: DateTime<Utc>,
        lead: Duration,
    ) -> Result<Vec<Booking>, BookingError> {
        let until = now.checked_add_signed(lead).ok_or_else(|| {
            BookingError::InvalidRequest(format!("Reminder window of {} hours is too long", lead.num_hours()))
        })?;

        let bookings = self
            .store
            .find_bookings_starting_between(now, until, &[BookingStatus::Confirmed])
            .await?;

        Ok(bookings
            .into_iter()
            .filter(|booking| booking.reminder_sent_at.is_none())
            .collect())
    }

    pub async fn mark_reminder_sent(&self, reference: &str, at: DateTime<Utc>) -> Result<Booking, BookingError> {
        let mut booking = self.get_booking(reference).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidRequest(format!(
                "Booking {} is {}, reminders apply to confirmed bookings only",
                booking.booking_reference, booking.status
            )));
        }

        booking.reminder_sent_at = Some(at);
        booking.updated_at = at;
        Ok(self.store.update_booking(&booking).await?)
    }

    async fn bookable_session_type(&self, request: &CreateBookingRequest) -> Result<SessionType, BookingError> {
        let session_type = self
            .store
            .find_session_type(request.session_type_id)
            .await?
            .ok_or_else(|| {
                BookingError::InvalidRequest(format!("Unknown session type {}", request.session_type_id))
            })?;

        if session_type.therapist_id != request.therapist_id {
            return Err(BookingError::InvalidRequest(format!(
                "Session type {} is not offered by therapist {}",
                session_type.id, request.therapist_id
            )));
        }

        if !session_type.is_active {
            return Err(BookingError::InvalidRequest(format!(
                "Session type '{}' is no longer offered",
                session_type.name
            )));
        }

        Ok(session_type)
    }

    /// Re-check the requested interval against bookings as they are now.
    async fn ensure_slot_still_free(
        &self,
        config: &TherapistScheduleConfig,
        request: &CreateBookingRequest,
    ) -> Result<(), BookingError> {
        let existing = self
            .store
            .find_bookings_for_therapist(
                request.therapist_id,
                request.start_datetime - config.buffer(),
                request.end_datetime + config.buffer(),
                &BookingStatus::ACTIVE,
            )
            .await?;

        let conflicts = conflicting_bookings(config, request.start_datetime, request.end_datetime, &existing);
        if let Some(conflict) = conflicts.first() {
            warn!(
                "Slot at {} for therapist {} taken by {}",
                request.start_datetime, request.therapist_id, conflict.booking_reference
            );
            return Err(BookingError::SlotNoLongerAvailable);
        }

        Ok(())
    }

    async fn allocate_reference(&self) -> Result<String, BookingError> {
        for attempt in 1..=self.max_reference_attempts {
            let candidate = normalize_reference(&self.references.next_reference());
            if !self.store.booking_reference_exists(&candidate).await? {
                return Ok(candidate);
            }
            debug!("Reference {} already taken (attempt {})", candidate, attempt);
        }

        Err(BookingError::Persistence(format!(
            "Could not allocate a unique booking reference after {} attempts",
            self.max_reference_attempts
        )))
    }

    /// Save, drawing a fresh reference if one was taken between allocation and write.
    async fn persist(&self, mut booking: Booking) -> Result<Booking, BookingError> {
        for _ in 1..self.max_reference_attempts {
            match self.store.save_booking(booking.clone()).await {
                Err(StoreError::DuplicateReference(reference)) => {
                    warn!("Reference {} collided on write, drawing another", reference);
                    booking.booking_reference = self.allocate_reference().await?;
                }
                Err(StoreError::ConstraintViolation(detail)) => {
                    warn!("Store rejected booking {} as overlapping: {}", booking.booking_reference, detail);
                    return Err(BookingError::SlotNoLongerAvailable);
                }
                result => return Ok(result?),
            }
        }

        Ok(self.store.save_booking(booking).await?)
    }

    async fn transition<F>(
        &self,
        reference: &str,
        new_status: BookingStatus,
        now: DateTime<Utc>,
        apply: F,
    ) -> Result<Booking, BookingError>
    where
        F: FnOnce(&mut Booking),
    {
        let mut booking = self.get_booking(reference).await?;
        self.lifecycle.validate_transition(booking.status, new_status)?;

        if matches!(new_status, BookingStatus::Completed | BookingStatus::NoShow) && now < booking.start_datetime {
            return Err(BookingError::InvalidRequest(format!(
                "Booking {} has not started yet",
                booking.booking_reference
            )));
        }

        booking.status = new_status;
        booking.updated_at = now;
        apply(&mut booking);

        let booking = self.store.update_booking(&booking).await?;
        info!("Booking {} is now {}", booking.booking_reference, booking.status);
        Ok(booking)
    }
}
