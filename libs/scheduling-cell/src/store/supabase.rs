use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{DatabaseError, SupabaseClient};

use crate::error::StoreError;
use crate::models::{Booking, BookingStatus, SessionType, Therapist, TherapistScheduleConfig};
use crate::store::SchedulingStore;

/// PostgREST-backed store. The `bookings` table carries an exclusion
/// constraint over `[start_datetime, blocked_until)` for active rows, see
/// `migrations/`.
pub struct SupabaseSchedulingStore {
    supabase: SupabaseClient,
}

fn timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn status_filter(statuses: &[BookingStatus]) -> String {
    let joined: Vec<&str> = statuses.iter().map(BookingStatus::as_str).collect();
    format!("in.({})", joined.join(","))
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        if err.is_exclusion_violation() {
            return StoreError::ConstraintViolation(err.to_string());
        }

        if err.is_unique_violation() {
            let message = err.to_string();
            if message.contains("booking_reference") {
                return StoreError::DuplicateReference(message);
            }
            return StoreError::ConstraintViolation(message);
        }

        match err {
            DatabaseError::NotFound(what) => StoreError::NotFound(what),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl SupabaseSchedulingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn select<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StoreError> {
        let rows: Vec<Value> = self.supabase.request(Method::GET, path, None, None).await?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    error!("Unreadable row from {}: {}", path, e);
                    StoreError::Backend(format!("unreadable row: {}", e))
                })
            })
            .collect()
    }

    async fn select_one<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        Ok(self.select(path).await?.into_iter().next())
    }

    async fn write_one<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Value,
        prefer: &'static str,
    ) -> Result<T, StoreError> {
        let mut headers = SupabaseClient::return_representation();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static(prefer));

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(method, path, None, Some(body), Some(headers))
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend(format!("{} returned no rows", path)))?;

        serde_json::from_value(row).map_err(|e| StoreError::Backend(format!("unreadable row: {}", e)))
    }

    fn booking_payload(booking: &Booking, buffer_minutes: u32) -> Result<Value, StoreError> {
        let mut payload = serde_json::to_value(booking)
            .map_err(|e| StoreError::Backend(format!("unserialisable booking: {}", e)))?;

        let blocked_until = booking.end_datetime + chrono::Duration::minutes(i64::from(buffer_minutes));
        payload["blocked_until"] = json!(timestamp(blocked_until));
        Ok(payload)
    }

    async fn buffer_for(&self, therapist_id: Uuid) -> Result<u32, StoreError> {
        Ok(self
            .find_therapist_config(therapist_id)
            .await?
            .map(|config| config.buffer_time)
            .unwrap_or(0))
    }
}

#[async_trait]
impl SchedulingStore for SupabaseSchedulingStore {
    async fn find_bookings_for_therapist(
        &self,
        therapist_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError> {
        let path = format!(
            "/rest/v1/bookings?therapist_id=eq.{}&start_datetime=lt.{}&end_datetime=gt.{}&status={}&order=start_datetime.asc",
            therapist_id,
            timestamp(range_end),
            timestamp(range_start),
            status_filter(statuses),
        );
        debug!("Fetching bookings for therapist {}", therapist_id);
        self.select(&path).await
    }

    async fn find_bookings_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError> {
        let path = format!(
            "/rest/v1/bookings?start_datetime=gte.{}&start_datetime=lt.{}&status={}&order=start_datetime.asc",
            timestamp(from),
            timestamp(to),
            status_filter(statuses),
        );
        self.select(&path).await
    }

    async fn save_booking(&self, booking: Booking) -> Result<Booking, StoreError> {
        let buffer = self.buffer_for(booking.therapist_id).await?;
        let payload = Self::booking_payload(&booking, buffer)?;

        self.write_one(Method::POST, "/rest/v1/bookings", payload, "return=representation")
            .await
    }

    async fn update_booking(&self, booking: &Booking) -> Result<Booking, StoreError> {
        let buffer = self.buffer_for(booking.therapist_id).await?;
        let payload = Self::booking_payload(booking, buffer)?;
        let path = format!("/rest/v1/bookings?id=eq.{}", booking.id);

        self.write_one(Method::PATCH, &path, payload, "return=representation")
            .await
    }

    async fn find_booking_by_reference(&self, reference: &str) -> Result<Option<Booking>, StoreError> {
        let path = format!(
            "/rest/v1/bookings?booking_reference=eq.{}",
            urlencoding::encode(reference)
        );
        self.select_one(&path).await
    }

    async fn booking_reference_exists(&self, reference: &str) -> Result<bool, StoreError> {
        let path = format!(
            "/rest/v1/bookings?booking_reference=eq.{}&select=id",
            urlencoding::encode(reference)
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(!rows.is_empty())
    }

    async fn find_therapist(&self, therapist_id: Uuid) -> Result<Option<Therapist>, StoreError> {
        self.select_one(&format!("/rest/v1/therapists?id=eq.{}", therapist_id)).await
    }

    async fn find_therapist_config(
        &self,
        therapist_id: Uuid,
    ) -> Result<Option<TherapistScheduleConfig>, StoreError> {
        self.select_one(&format!(
            "/rest/v1/therapist_schedule_configs?therapist_id=eq.{}",
            therapist_id
        ))
        .await
    }

    async fn save_therapist_config(
        &self,
        config: TherapistScheduleConfig,
    ) -> Result<TherapistScheduleConfig, StoreError> {
        let payload = serde_json::to_value(&config)
            .map_err(|e| StoreError::Backend(format!("unserialisable config: {}", e)))?;

        self.write_one(
            Method::POST,
            "/rest/v1/therapist_schedule_configs?on_conflict=therapist_id",
            payload,
            "resolution=merge-duplicates,return=representation",
        )
        .await
    }

    async fn find_session_type(&self, session_type_id: Uuid) -> Result<Option<SessionType>, StoreError> {
        self.select_one(&format!("/rest/v1/session_types?id=eq.{}", session_type_id)).await
    }
}
