use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Booking, BookingStatus, MeetingType, SessionType, Therapist, TherapistScheduleConfig, WorkingHours,
};
use crate::services::calendar::{expand_with_buffer, overlaps};
use crate::store::SchedulingStore;

#[derive(Default)]
struct StoreState {
    therapists: HashMap<Uuid, Therapist>,
    configs: HashMap<Uuid, TherapistScheduleConfig>,
    session_types: HashMap<Uuid, SessionType>,
    bookings: Vec<Booking>,
}

/// Process-local store used for development and tests.
///
/// A single write lock covers the overlap check and the insert, which is the
/// same guarantee the database exclusion constraint gives in production.
#[derive(Default)]
pub struct InMemorySchedulingStore {
    state: RwLock<StoreState>,
}

impl InMemorySchedulingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_therapist(&self, therapist: Therapist) {
        self.state.write().await.therapists.insert(therapist.id, therapist);
    }

    pub async fn insert_session_type(&self, session_type: SessionType) {
        self.state.write().await.session_types.insert(session_type.id, session_type);
    }

    pub async fn remove_session_type(&self, session_type_id: Uuid) {
        self.state.write().await.session_types.remove(&session_type_id);
    }

    pub async fn all_bookings(&self) -> Vec<Booking> {
        self.state.read().await.bookings.clone()
    }

    /// One therapist working weekdays 09:00-12:00 and 13:00-17:00 London time,
    /// offering a 50 minute video session and a 50 minute in-person session.
    pub async fn seed_demo(&self) -> DemoFixture {
        let fixture = DemoFixture::default();

        self.insert_therapist(Therapist {
            id: fixture.therapist_id,
            display_name: "Alex Morgan".to_string(),
            email: "alex.morgan@example.com".to_string(),
        })
        .await;

        let mut working_hours = Vec::new();
        for day in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
            for (start, end) in [(9, 12), (13, 17)] {
                working_hours.push(WorkingHours {
                    day_of_week: day,
                    start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap_or_default(),
                    end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap_or_default(),
                });
            }
        }

        let mut state = self.state.write().await;
        state.configs.insert(
            fixture.therapist_id,
            TherapistScheduleConfig {
                therapist_id: fixture.therapist_id,
                timezone: "Europe/London".to_string(),
                working_hours,
                default_session_duration: 50,
                buffer_time: 10,
                advance_booking_days: 60,
                min_booking_notice_hours: 24,
            },
        );
        for (id, name, meeting_type, location) in [
            (fixture.video_session_type_id, "Online session", MeetingType::Video, None),
            (
                fixture.in_person_session_type_id,
                "In-person session",
                MeetingType::InPerson,
                Some("Room 2, 14 Harbour Street".to_string()),
            ),
        ] {
            state.session_types.insert(
                id,
                SessionType {
                    id,
                    therapist_id: fixture.therapist_id,
                    name: name.to_string(),
                    duration: 50,
                    meeting_type,
                    meeting_location: location,
                    is_active: true,
                },
            );
        }

        fixture
    }

    fn buffer_for(state: &StoreState, therapist_id: Uuid) -> u32 {
        state.configs.get(&therapist_id).map(|config| config.buffer_time).unwrap_or(0)
    }
}

/// Fixed identifiers of the demo data.
#[derive(Debug, Clone, Copy)]
pub struct DemoFixture {
    pub therapist_id: Uuid,
    pub video_session_type_id: Uuid,
    pub in_person_session_type_id: Uuid,
}

impl Default for DemoFixture {
    fn default() -> Self {
        Self {
            therapist_id: Uuid::from_u128(0x7a1e_0000_0000_4000_8000_0000_0000_0001),
            video_session_type_id: Uuid::from_u128(0x7a1e_0000_0000_4000_8000_0000_0000_0101),
            in_person_session_type_id: Uuid::from_u128(0x7a1e_0000_0000_4000_8000_0000_0000_0102),
        }
    }
}

#[async_trait]
impl SchedulingStore for InMemorySchedulingStore {
    async fn find_bookings_for_therapist(
        &self,
        therapist_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .iter()
            .filter(|booking| booking.therapist_id == therapist_id && statuses.contains(&booking.status))
            .filter(|booking| overlaps(booking.start_datetime, booking.end_datetime, range_start, range_end))
            .cloned()
            .collect();
        bookings.sort_by_key(|booking| booking.start_datetime);
        Ok(bookings)
    }

    async fn find_bookings_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .iter()
            .filter(|booking| statuses.contains(&booking.status))
            .filter(|booking| booking.start_datetime >= from && booking.start_datetime < to)
            .cloned()
            .collect();
        bookings.sort_by_key(|booking| booking.start_datetime);
        Ok(bookings)
    }

    async fn save_booking(&self, booking: Booking) -> Result<Booking, StoreError> {
        let mut state = self.state.write().await;

        if state
            .bookings
            .iter()
            .any(|existing| existing.booking_reference == booking.booking_reference)
        {
            return Err(StoreError::DuplicateReference(booking.booking_reference));
        }

        if booking.is_active() {
            let buffer = Self::buffer_for(&state, booking.therapist_id);
            let (start, end) = expand_with_buffer(booking.start_datetime, booking.end_datetime, buffer);

            let clash = state.bookings.iter().find(|existing| {
                existing.therapist_id == booking.therapist_id
                    && existing.is_active()
                    && {
                        let (existing_start, existing_end) =
                            expand_with_buffer(existing.start_datetime, existing.end_datetime, buffer);
                        overlaps(start, end, existing_start, existing_end)
                    }
            });

            if let Some(clash) = clash {
                warn!(
                    "Rejecting booking {} for therapist {}: overlaps {}",
                    booking.booking_reference, booking.therapist_id, clash.booking_reference
                );
                return Err(StoreError::ConstraintViolation(format!(
                    "overlaps booking {}",
                    clash.booking_reference
                )));
            }
        }

        debug!("Stored booking {}", booking.booking_reference);
        state.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn update_booking(&self, booking: &Booking) -> Result<Booking, StoreError> {
        let mut state = self.state.write().await;
        let stored = state
            .bookings
            .iter_mut()
            .find(|existing| existing.id == booking.id)
            .ok_or_else(|| StoreError::NotFound(format!("booking {}", booking.booking_reference)))?;

        *stored = booking.clone();
        Ok(booking.clone())
    }

    async fn find_booking_by_reference(&self, reference: &str) -> Result<Option<Booking>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .iter()
            .find(|booking| booking.booking_reference == reference)
            .cloned())
    }

    async fn booking_reference_exists(&self, reference: &str) -> Result<bool, StoreError> {
        Ok(self.find_booking_by_reference(reference).await?.is_some())
    }

    async fn find_therapist(&self, therapist_id: Uuid) -> Result<Option<Therapist>, StoreError> {
        Ok(self.state.read().await.therapists.get(&therapist_id).cloned())
    }

    async fn find_therapist_config(
        &self,
        therapist_id: Uuid,
    ) -> Result<Option<TherapistScheduleConfig>, StoreError> {
        Ok(self.state.read().await.configs.get(&therapist_id).cloned())
    }

    async fn save_therapist_config(
        &self,
        config: TherapistScheduleConfig,
    ) -> Result<TherapistScheduleConfig, StoreError> {
        let mut state = self.state.write().await;
        if !state.therapists.contains_key(&config.therapist_id) {
            return Err(StoreError::NotFound(format!("therapist {}", config.therapist_id)));
        }
        state.configs.insert(config.therapist_id, config.clone());
        Ok(config)
    }

    async fn find_session_type(&self, session_type_id: Uuid) -> Result<Option<SessionType>, StoreError> {
        Ok(self.state.read().await.session_types.get(&session_type_id).cloned())
    }
}
