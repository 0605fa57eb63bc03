// libs/scheduling-cell/src/models.rs
use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BookingError;

// ==============================================================================
// THERAPIST CONFIGURATION
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Therapist {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
}

/// A recurring weekly interval during which sessions may be scheduled,
/// expressed in the owning config's timezone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkingHours {
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TherapistScheduleConfig {
    pub therapist_id: Uuid,
    /// IANA timezone name, e.g. "Europe/London".
    pub timezone: String,
    pub working_hours: Vec<WorkingHours>,
    pub default_session_duration: u32,
    /// Minutes blocked after each session.
    pub buffer_time: u32,
    pub advance_booking_days: u32,
    pub min_booking_notice_hours: u32,
}

impl TherapistScheduleConfig {
    pub fn tz(&self) -> Option<Tz> {
        self.timezone.parse().ok()
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(i64::from(self.buffer_time))
    }

    pub fn earliest_bookable(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(Duration::hours(i64::from(self.min_booking_notice_hours)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn booking_horizon(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(Duration::days(i64::from(self.advance_booking_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn windows_for(&self, day: Weekday) -> impl Iterator<Item = &WorkingHours> {
        self.working_hours.iter().filter(move |window| window.day_of_week == day)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MeetingType {
    InPerson,
    Video,
    Phone,
}

impl fmt::Display for MeetingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeetingType::InPerson => write!(f, "in_person"),
            MeetingType::Video => write!(f, "video"),
            MeetingType::Phone => write!(f, "phone"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionType {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub name: String,
    /// Minutes.
    pub duration: u32,
    pub meeting_type: MeetingType,
    pub meeting_location: Option<String>,
    pub is_active: bool,
}

impl SessionType {
    pub fn length(&self) -> Duration {
        Duration::minutes(i64::from(self.duration))
    }
}

// ==============================================================================
// BOOKINGS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl BookingStatus {
    /// Statuses that occupy the therapist's calendar.
    pub const ACTIVE: [BookingStatus; 2] = [BookingStatus::Pending, BookingStatus::Confirmed];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed | BookingStatus::NoShow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::NoShow => "no_show",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    #[default]
    Client,
    Therapist,
    Staff,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub booking_reference: String,
    pub therapist_id: Uuid,
    pub session_type_id: Option<Uuid>,
    pub client_id: Option<String>,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_notes: Option<String>,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    /// Display timezone the client booked in.
    pub timezone: String,
    pub status: BookingStatus,
    pub meeting_type: MeetingType,
    pub meeting_link: Option<String>,
    pub meeting_location: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<CancelledBy>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub internal_notes: Option<String>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// End of the interval this booking keeps off-limits, buffer included.
    pub fn blocked_until(&self, buffer: Duration) -> DateTime<Utc> {
        self.end_datetime + buffer
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_datetime - self.start_datetime).num_minutes()
    }
}

/// A candidate `[start, end)` interval offered for booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub therapist_id: Uuid,
    pub session_type_id: Uuid,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub therapist_id: Uuid,
    pub session_type_id: Uuid,
    pub timezone: String,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub therapist_id: Uuid,
    pub session_type_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub client_notes: Option<String>,
    /// Display timezone; defaults to the therapist's.
    pub timezone: Option<String>,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

impl CreateBookingRequest {
    /// Shape checks that need no storage access.
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.client_name.trim().is_empty() {
            return Err(BookingError::InvalidRequest("client_name is required".to_string()));
        }

        if !email_pattern().is_match(self.client_email.trim()) {
            return Err(BookingError::InvalidRequest(format!(
                "client_email '{}' is not a valid email address",
                self.client_email
            )));
        }

        if self.end_datetime <= self.start_datetime {
            return Err(BookingError::InvalidRequest(
                "end_datetime must be after start_datetime".to_string(),
            ));
        }

        if let Some(timezone) = &self.timezone {
            if timezone.parse::<Tz>().is_err() {
                return Err(BookingError::InvalidRequest(format!("Unknown timezone '{}'", timezone)));
            }
        }

        Ok(())
    }
}

/// Who is asking for the booking, resolved from the request's credentials.
#[derive(Debug, Clone, Default)]
pub struct BookingContext {
    pub client_id: Option<String>,
    pub created_by: String,
}

impl BookingContext {
    pub fn anonymous() -> Self {
        Self {
            client_id: None,
            created_by: "public".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub booking_reference: String,
    pub status: BookingStatus,
    pub meeting_link: Option<String>,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub confirmation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
    #[serde(default)]
    pub cancelled_by: CancelledBy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderQuery {
    pub hours_ahead: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> CreateBookingRequest {
        CreateBookingRequest {
            therapist_id: Uuid::new_v4(),
            session_type_id: Uuid::new_v4(),
            client_name: "Robin Client".to_string(),
            client_email: "robin@example.com".to_string(),
            client_phone: None,
            start_datetime: Utc.with_ymd_and_hms(2026, 3, 16, 9, 0, 0).unwrap(),
            end_datetime: Utc.with_ymd_and_hms(2026, 3, 16, 9, 50, 0).unwrap(),
            client_notes: None,
            timezone: None,
        }
    }

    #[test]
    fn well_formed_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut bad = request();
        bad.end_datetime = bad.start_datetime;
        assert!(matches!(bad.validate(), Err(BookingError::InvalidRequest(_))));
    }

    #[test]
    fn malformed_email_and_blank_name_are_rejected() {
        let mut bad = request();
        bad.client_email = "robin.example.com".to_string();
        assert!(bad.validate().is_err());

        let mut bad = request();
        bad.client_name = "   ".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn only_pending_and_confirmed_are_active() {
        assert!(BookingStatus::Pending.is_active());
        assert!(BookingStatus::Confirmed.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
        assert!(BookingStatus::NoShow.is_terminal());
        assert_eq!(BookingStatus::NoShow.to_string(), "no_show");
    }
}
