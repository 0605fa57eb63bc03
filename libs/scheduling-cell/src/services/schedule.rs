use std::sync::Arc;

use chrono_tz::Tz;
use tracing::info;
use uuid::Uuid;

use crate::error::{BookingError, ConfigValidationError};
use crate::models::{Therapist, TherapistScheduleConfig};
use crate::store::SchedulingStore;

/// Reject configurations the availability engine cannot interpret.
///
/// Runs when a config is written; the engine itself assumes a config that
/// passed here.
pub fn validate_schedule_config(config: &TherapistScheduleConfig) -> Result<(), ConfigValidationError> {
    if config.timezone.parse::<Tz>().is_err() {
        return Err(ConfigValidationError::UnknownTimezone(config.timezone.clone()));
    }

    if config.default_session_duration == 0 {
        return Err(ConfigValidationError::InvalidSessionDuration);
    }

    for window in &config.working_hours {
        if window.start_time >= window.end_time {
            return Err(ConfigValidationError::EmptyWindow {
                day: window.day_of_week,
                start: window.start_time,
                end: window.end_time,
            });
        }
    }

    let mut windows: Vec<_> = config.working_hours.iter().collect();
    windows.sort_by_key(|window| (window.day_of_week.num_days_from_monday(), window.start_time));

    for pair in windows.windows(2) {
        let (earlier, later) = (pair[0], pair[1]);
        if earlier.day_of_week == later.day_of_week && later.start_time < earlier.end_time {
            return Err(ConfigValidationError::OverlappingWindows { day: earlier.day_of_week });
        }
    }

    Ok(())
}

/// Therapist profile and working-hours configuration.
pub struct ScheduleService {
    store: Arc<dyn SchedulingStore>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    pub async fn get_therapist(&self, therapist_id: Uuid) -> Result<Therapist, BookingError> {
        self.store
            .find_therapist(therapist_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Therapist {}", therapist_id)))
    }

    pub async fn get_schedule(&self, therapist_id: Uuid) -> Result<TherapistScheduleConfig, BookingError> {
        self.store
            .find_therapist_config(therapist_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Schedule for therapist {}", therapist_id)))
    }

    /// Validate and store a therapist's schedule. The path id wins over the body.
    pub async fn update_schedule(
        &self,
        therapist_id: Uuid,
        mut config: TherapistScheduleConfig,
    ) -> Result<TherapistScheduleConfig, BookingError> {
        config.therapist_id = therapist_id;
        validate_schedule_config(&config)?;

        self.get_therapist(therapist_id).await?;
        let saved = self.store.save_therapist_config(config).await?;

        info!(
            "Schedule for therapist {} updated: {} windows in {}",
            therapist_id,
            saved.working_hours.len(),
            saved.timezone
        );
        Ok(saved)
    }
}
