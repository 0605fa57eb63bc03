// libs/scheduling-cell/src/services/availability.rs
use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::BookingError;
use crate::models::{
    AvailabilityQuery, AvailabilityResponse, Booking, BookingStatus, SessionType, Slot,
    TherapistScheduleConfig,
};
use crate::services::calendar::{clip_to_window, expand_with_buffer, local_date_span, overlaps, resolve_local};
use crate::store::SchedulingStore;

/// Free slots for one therapist and session type over a range.
///
/// Computing the value does no slot generation; iterating it walks the range one
/// local day at a time. Every call to [`AvailableSlots::iter`] restarts from the
/// first day and yields the same slots in the same order.
#[derive(Debug, Clone)]
pub struct AvailableSlots<'a> {
    config: &'a TherapistScheduleConfig,
    tz: Option<Tz>,
    session_length: Duration,
    step: Duration,
    buffer_minutes: u32,
    /// Buffered intervals of active bookings, sorted by start.
    blocked: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    earliest_start: DateTime<Utc>,
    latest_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    first_day: NaiveDate,
    last_day: NaiveDate,
    exhausted: bool,
}

/// Compute the bookable slots for `session_type` between `range_start` and
/// `range_end` given the therapist's configuration and existing bookings.
///
/// Bookings of other therapists and bookings that are not pending/confirmed are
/// ignored. A malformed config (unknown timezone, zero duration) produces no
/// slots rather than an error.
pub fn compute_available_slots<'a>(
    config: &'a TherapistScheduleConfig,
    session_type: &SessionType,
    existing_bookings: &[Booking],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AvailableSlots<'a> {
    let tz = config.tz();
    let session_length = session_type.length();
    let earliest_bookable = config.earliest_bookable(now);
    let horizon = config.booking_horizon(now);

    let exhausted = tz.is_none()
        || session_type.duration == 0
        || range_end <= range_start
        || range_start > horizon
        || range_end <= earliest_bookable;

    let mut blocked: Vec<_> = existing_bookings
        .iter()
        .filter(|booking| booking.therapist_id == config.therapist_id && booking.is_active())
        .map(|booking| expand_with_buffer(booking.start_datetime, booking.end_datetime, config.buffer_time))
        .collect();
    blocked.sort();

    // No slot starts after the horizon, so days past it are never walked.
    let scan_end = horizon
        .checked_add_signed(session_length)
        .map_or(range_end, |latest_end| range_end.min(latest_end));
    let (first_day, last_day) = match &tz {
        Some(tz) => local_date_span(tz, range_start, scan_end),
        None => (range_start.date_naive(), scan_end.date_naive()),
    };

    AvailableSlots {
        config,
        tz,
        session_length,
        step: session_length + config.buffer(),
        buffer_minutes: config.buffer_time,
        blocked,
        earliest_start: range_start.max(earliest_bookable),
        latest_start: horizon,
        range_end,
        first_day,
        last_day,
        exhausted,
    }
}

impl<'a> AvailableSlots<'a> {
    pub fn iter(&self) -> SlotIter<'_, 'a> {
        SlotIter {
            slots: self,
            next_day: (!self.exhausted).then_some(self.first_day),
            pending: VecDeque::new(),
        }
    }

    pub fn to_vec(&self) -> Vec<Slot> {
        self.iter().collect()
    }

    fn is_blocked(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let (start, end) = expand_with_buffer(start, end, self.buffer_minutes);
        self.blocked
            .iter()
            .take_while(|(blocked_start, _)| *blocked_start < end)
            .any(|(blocked_start, blocked_end)| overlaps(start, end, *blocked_start, *blocked_end))
    }

    fn accepts(&self, slot: &Slot) -> bool {
        slot.start >= self.earliest_start
            && slot.start <= self.latest_start
            && slot.end <= self.range_end
            && !self.is_blocked(slot.start, slot.end)
    }

    /// Candidates for every working-hour window on `day`, in start order.
    fn slots_on(&self, day: NaiveDate) -> Vec<Slot> {
        let Some(tz) = &self.tz else {
            return Vec::new();
        };

        let mut slots = Vec::new();
        for window in self.config.windows_for(day.weekday()) {
            let (Some(window_start), Some(window_end)) = (
                resolve_local(tz, day, window.start_time),
                resolve_local(tz, day, window.end_time),
            ) else {
                continue;
            };

            let mut cursor = window_start;
            while clip_to_window(cursor, cursor + self.session_length, window_start, window_end) {
                let slot = Slot { start: cursor, end: cursor + self.session_length };
                if self.accepts(&slot) {
                    slots.push(slot);
                }
                cursor += self.step;
            }
        }

        slots.sort();
        slots
    }
}

impl<'s, 'a> IntoIterator for &'s AvailableSlots<'a> {
    type Item = Slot;
    type IntoIter = SlotIter<'s, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct SlotIter<'s, 'a> {
    slots: &'s AvailableSlots<'a>,
    next_day: Option<NaiveDate>,
    pending: VecDeque<Slot>,
}

impl Iterator for SlotIter<'_, '_> {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        loop {
            if let Some(slot) = self.pending.pop_front() {
                return Some(slot);
            }

            let day = self.next_day.filter(|day| *day <= self.slots.last_day)?;
            self.next_day = day.succ_opt();
            self.pending.extend(self.slots.slots_on(day));
        }
    }
}

/// Why a specific requested interval cannot be booked regardless of other bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRejection {
    OutsideWorkingHours,
    InsideNoticePeriod,
    BeyondBookingHorizon,
}

/// Check a requested interval against working hours, notice and horizon.
pub fn check_requested_slot(
    config: &TherapistScheduleConfig,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), SlotRejection> {
    if start > config.booking_horizon(now) {
        return Err(SlotRejection::BeyondBookingHorizon);
    }

    let tz = config.tz().ok_or(SlotRejection::OutsideWorkingHours)?;
    let day = start.with_timezone(&tz).date_naive();

    let inside_window = config.windows_for(day.weekday()).any(|window| {
        match (resolve_local(&tz, day, window.start_time), resolve_local(&tz, day, window.end_time)) {
            (Some(window_start), Some(window_end)) => clip_to_window(start, end, window_start, window_end),
            _ => false,
        }
    });
    if !inside_window {
        return Err(SlotRejection::OutsideWorkingHours);
    }

    if start < config.earliest_bookable(now) {
        return Err(SlotRejection::InsideNoticePeriod);
    }

    Ok(())
}

/// Active bookings whose buffered interval overlaps the buffered request.
pub fn conflicting_bookings<'b>(
    config: &TherapistScheduleConfig,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    existing_bookings: &'b [Booking],
) -> Vec<&'b Booking> {
    let (start, end) = expand_with_buffer(start, end, config.buffer_time);

    existing_bookings
        .iter()
        .filter(|booking| booking.therapist_id == config.therapist_id && booking.is_active())
        .filter(|booking| {
            let (booked_start, booked_end) =
                expand_with_buffer(booking.start_datetime, booking.end_datetime, config.buffer_time);
            overlaps(start, end, booked_start, booked_end)
        })
        .collect()
}

/// Read side of scheduling: loads inputs from storage and runs the engine.
pub struct AvailabilityService {
    store: Arc<dyn SchedulingStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    pub async fn get_available_slots(
        &self,
        query: &AvailabilityQuery,
        now: DateTime<Utc>,
    ) -> Result<AvailabilityResponse, BookingError> {
        debug!(
            "Calculating availability for therapist {} session type {} from {} to {}",
            query.therapist_id, query.session_type_id, query.from, query.to
        );

        if query.to <= query.from {
            return Err(BookingError::InvalidRequest("'to' must be after 'from'".to_string()));
        }

        let config = self
            .store
            .find_therapist_config(query.therapist_id)
            .await?
            .ok_or_else(|| BookingError::InvalidRequest(format!("Unknown therapist {}", query.therapist_id)))?;

        let session_type = self
            .store
            .find_session_type(query.session_type_id)
            .await?
            .filter(|session_type| session_type.therapist_id == query.therapist_id && session_type.is_active)
            .ok_or_else(|| {
                BookingError::InvalidRequest(format!("Unknown session type {}", query.session_type_id))
            })?;

        // Bookings ending up to one buffer before the range still block its start.
        let fetch_start = query.from.checked_sub_signed(config.buffer()).unwrap_or(query.from);
        let fetch_end = config
            .booking_horizon(now)
            .checked_add_signed(session_type.length() + config.buffer())
            .map_or(query.to, |latest| query.to.min(latest));

        let existing = self
            .store
            .find_bookings_for_therapist(query.therapist_id, fetch_start, fetch_end, &BookingStatus::ACTIVE)
            .await?;

        let slots = compute_available_slots(&config, &session_type, &existing, query.from, query.to, now).to_vec();

        debug!("Found {} available slots", slots.len());
        Ok(AvailabilityResponse {
            therapist_id: query.therapist_id,
            session_type_id: query.session_type_id,
            timezone: config.timezone.clone(),
            slots,
        })
    }
}
