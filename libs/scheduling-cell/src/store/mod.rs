//! Storage port for the scheduling core and its implementations.
//!
//! The port is the only shared mutable resource the booking transaction
//! touches. Implementations must reject, atomically with the write, a new
//! active booking whose buffered interval overlaps another active booking of
//! the same therapist ([`StoreError::ConstraintViolation`]) and a duplicate
//! booking reference ([`StoreError::DuplicateReference`]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Booking, BookingStatus, SessionType, Therapist, TherapistScheduleConfig};

pub mod memory;
pub mod supabase;

pub use memory::InMemorySchedulingStore;
pub use supabase::SupabaseSchedulingStore;

#[async_trait]
pub trait SchedulingStore: Send + Sync {
    /// Bookings of `therapist_id` with a status in `statuses` whose
    /// `[start, end)` intersects `[range_start, range_end)`, ordered by start.
    async fn find_bookings_for_therapist(
        &self,
        therapist_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError>;

    /// Bookings in `statuses` starting within `[from, to)`, any therapist.
    async fn find_bookings_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError>;

    /// Insert a new booking.
    async fn save_booking(&self, booking: Booking) -> Result<Booking, StoreError>;

    /// Overwrite the mutable fields of an existing booking.
    async fn update_booking(&self, booking: &Booking) -> Result<Booking, StoreError>;

    /// Exact match on an already normalised reference.
    async fn find_booking_by_reference(&self, reference: &str) -> Result<Option<Booking>, StoreError>;

    async fn booking_reference_exists(&self, reference: &str) -> Result<bool, StoreError>;

    async fn find_therapist(&self, therapist_id: Uuid) -> Result<Option<Therapist>, StoreError>;

    async fn find_therapist_config(
        &self,
        therapist_id: Uuid,
    ) -> Result<Option<TherapistScheduleConfig>, StoreError>;

    async fn save_therapist_config(
        &self,
        config: TherapistScheduleConfig,
    ) -> Result<TherapistScheduleConfig, StoreError>;

    async fn find_session_type(&self, session_type_id: Uuid) -> Result<Option<SessionType>, StoreError>;
}
