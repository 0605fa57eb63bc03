//! Pure interval arithmetic shared by the availability engine and the booking
//! transaction. All intervals are half-open `[start, end)`.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Longest DST gap we step across when resolving a local time.
const MAX_DST_GAP_MINUTES: i64 = 180;
const DST_GAP_STEP_MINUTES: i64 = 15;

/// True iff the half-open intervals intersect. Touching intervals do not.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// The window a session keeps off-limits: buffer applies after the end only.
pub fn expand_with_buffer(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    buffer_minutes: u32,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (start, end + Duration::minutes(i64::from(buffer_minutes)))
}

/// True iff the candidate lies fully inside the window.
pub fn clip_to_window(
    candidate_start: DateTime<Utc>,
    candidate_end: DateTime<Utc>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> bool {
    candidate_start >= window_start && candidate_end <= window_end
}

/// Resolve a wall-clock time on a date in `tz` to an instant.
///
/// Ambiguous times (clocks falling back) take the earlier instant. Times inside
/// a gap (clocks springing forward) move to the first valid local time after it.
pub fn resolve_local(tz: &Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    let local = date.and_time(time);

    let mut shifted = 0;
    while shifted <= MAX_DST_GAP_MINUTES {
        match tz.from_local_datetime(&(local + Duration::minutes(shifted))) {
            LocalResult::Single(instant) => return Some(instant.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest.with_timezone(&Utc)),
            LocalResult::None => shifted += DST_GAP_STEP_MINUTES,
        }
    }

    None
}

/// Local calendar dates in `tz` touched by `[start, end]`, inclusive.
pub fn local_date_span(tz: &Tz, start: DateTime<Utc>, end: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
    (
        start.with_timezone(tz).date_naive(),
        end.with_timezone(tz).date_naive(),
    )
}
