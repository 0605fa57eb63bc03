#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc, Weekday};
use uuid::Uuid;

use scheduling_cell::error::DispatchError;
use scheduling_cell::models::{
    Booking, BookingStatus, CreateBookingRequest, MeetingType, SessionType, Therapist,
    TherapistScheduleConfig, WorkingHours,
};
use scheduling_cell::services::dispatch::{
    MeetingLinkProvider, MeetingLinkRequest, NotificationDispatcher, RecipientRole,
};
use scheduling_cell::store::{InMemorySchedulingStore, SchedulingStore};

/// 2026-03-16 is a Monday.
pub fn monday(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, hour, minute, 0).unwrap()
}

pub fn tuesday(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 17, hour, minute, 0).unwrap()
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub fn window(day: Weekday, start: NaiveTime, end: NaiveTime) -> WorkingHours {
    WorkingHours {
        day_of_week: day,
        start_time: start,
        end_time: end,
    }
}

/// UTC therapist working Mondays 09:00-12:00, 50 minute sessions, 10 minute buffer.
pub fn monday_morning_config(therapist_id: Uuid) -> TherapistScheduleConfig {
    TherapistScheduleConfig {
        therapist_id,
        timezone: "UTC".to_string(),
        working_hours: vec![window(Weekday::Mon, time(9, 0), time(12, 0))],
        default_session_duration: 50,
        buffer_time: 10,
        advance_booking_days: 60,
        min_booking_notice_hours: 0,
    }
}

pub fn therapist(therapist_id: Uuid) -> Therapist {
    Therapist {
        id: therapist_id,
        display_name: "Sam Rivera".to_string(),
        email: "sam.rivera@example.com".to_string(),
    }
}

pub fn session_type(therapist_id: Uuid, meeting_type: MeetingType) -> SessionType {
    SessionType {
        id: Uuid::new_v4(),
        therapist_id,
        name: "Individual therapy".to_string(),
        duration: 50,
        meeting_type,
        meeting_location: None,
        is_active: true,
    }
}

pub fn booking(
    therapist_id: Uuid,
    start: DateTime<Utc>,
    minutes: i64,
    status: BookingStatus,
) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        booking_reference: format!("BK-{}", &Uuid::new_v4().simple().to_string()[..8].to_uppercase()),
        therapist_id,
        session_type_id: None,
        client_id: None,
        client_name: "Existing Client".to_string(),
        client_email: "existing@example.com".to_string(),
        client_phone: None,
        client_notes: None,
        start_datetime: start,
        end_datetime: start + Duration::minutes(minutes),
        timezone: "UTC".to_string(),
        status,
        meeting_type: MeetingType::InPerson,
        meeting_link: None,
        meeting_location: None,
        cancellation_reason: None,
        cancelled_by: None,
        cancelled_at: None,
        internal_notes: None,
        reminder_sent_at: None,
        created_by: "public".to_string(),
        created_at: start - Duration::days(7),
        updated_at: start - Duration::days(7),
    }
}

pub fn booking_request(
    therapist_id: Uuid,
    session_type_id: Uuid,
    start: DateTime<Utc>,
) -> CreateBookingRequest {
    CreateBookingRequest {
        therapist_id,
        session_type_id,
        client_name: "Jordan Lee".to_string(),
        client_email: "jordan.lee@example.com".to_string(),
        client_phone: Some("+44 7700 900123".to_string()),
        start_datetime: start,
        end_datetime: start + Duration::minutes(50),
        client_notes: None,
        timezone: None,
    }
}

/// A store holding one therapist on [`monday_morning_config`] with one session type.
pub struct Practice {
    pub store: Arc<InMemorySchedulingStore>,
    pub therapist_id: Uuid,
    pub session_type: SessionType,
}

pub async fn practice(meeting_type: MeetingType) -> Practice {
    let store = Arc::new(InMemorySchedulingStore::new());
    let therapist_id = Uuid::new_v4();
    let session_type = session_type(therapist_id, meeting_type);

    store.insert_therapist(therapist(therapist_id)).await;
    store
        .save_therapist_config(monday_morning_config(therapist_id))
        .await
        .unwrap();
    store.insert_session_type(session_type.clone()).await;

    Practice {
        store,
        therapist_id,
        session_type,
    }
}

/// Records every request and answers with a fixed link, or `None`.
#[derive(Default)]
pub struct RecordingMeetingLinks {
    pub link: Option<String>,
    pub requests: Mutex<Vec<MeetingLinkRequest>>,
}

impl RecordingMeetingLinks {
    pub fn answering(link: &str) -> Self {
        Self {
            link: Some(link.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MeetingLinkProvider for RecordingMeetingLinks {
    async fn create_meeting_link(&self, request: &MeetingLinkRequest) -> Option<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.link.clone()
    }
}

/// Records recipients; fails every send when `fail` is set.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub sent: Mutex<Vec<(RecipientRole, String)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn send_booking_confirmation(
        &self,
        recipient: RecipientRole,
        booking: &Booking,
        _therapist: &Therapist,
        _session_type: &SessionType,
    ) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::Transport("mail relay unreachable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient, booking.booking_reference.clone()));
        Ok(())
    }
}
