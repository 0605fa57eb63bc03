use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::extractor::{require_staff, resolve_optional_user};

use crate::models::{
    AvailabilityQuery, BookingContext, CancelBookingRequest, CancelledBy, CreateBookingRequest,
    ReminderQuery, TherapistScheduleConfig,
};
use crate::services::{AvailabilityService, BookingService, ScheduleService};

const DEFAULT_REMINDER_HOURS: u32 = 24;

/// Everything the scheduling routes need, built once by the entry point.
pub struct SchedulingState {
    pub config: Arc<AppConfig>,
    pub availability: AvailabilityService,
    pub bookings: BookingService,
    pub schedules: ScheduleService,
}

type Auth = Option<TypedHeader<Authorization<Bearer>>>;

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let response = state.availability.get_available_slots(&query, Utc::now()).await?;
    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<SchedulingState>>,
    auth: Auth,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let context = match resolve_optional_user(auth.as_ref(), &state.config.supabase_jwt_secret)? {
        Some(user) => BookingContext {
            client_id: user.has_role("client").then(|| user.id.clone()),
            created_by: user.id,
        },
        None => BookingContext::anonymous(),
    };

    let created = state.bookings.create_booking(request, context, Utc::now()).await?;
    let confirmation = created.confirmation();

    // Notifications keep running after the response is sent.
    drop(created.dispatch);

    Ok((StatusCode::CREATED, Json(json!(confirmation))))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<SchedulingState>>,
    Path(reference): Path<String>,
) -> Result<Json<Value>, AppError> {
    let booking = state.bookings.get_booking(&reference).await?;
    Ok(Json(json!(booking)))
}

/// Anonymous callers cancel as the client; staff may say who asked.
#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<SchedulingState>>,
    Path(reference): Path<String>,
    auth: Auth,
    Json(mut request): Json<CancelBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = resolve_optional_user(auth.as_ref(), &state.config.supabase_jwt_secret)?;
    if !caller.as_ref().is_some_and(|user| user.is_staff()) {
        request.cancelled_by = CancelledBy::Client;
    }

    let booking = state.bookings.cancel_booking(&reference, request, Utc::now()).await?;
    Ok(Json(json!(booking)))
}

#[axum::debug_handler]
pub async fn get_therapist(
    State(state): State<Arc<SchedulingState>>,
    Path(therapist_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let therapist = state.schedules.get_therapist(therapist_id).await?;
    Ok(Json(json!(therapist)))
}

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<Arc<SchedulingState>>,
    Path(therapist_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let config = state.schedules.get_schedule(therapist_id).await?;
    Ok(Json(json!(config)))
}

// ==============================================================================
// STAFF HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<Arc<SchedulingState>>,
    Path(therapist_id): Path<Uuid>,
    auth: Auth,
    Json(config): Json<TherapistScheduleConfig>,
) -> Result<Json<Value>, AppError> {
    let user = require_staff(auth.as_ref(), &state.config.supabase_jwt_secret)?;
    info!("User {} updating schedule of therapist {}", user.id, therapist_id);

    let saved = state.schedules.update_schedule(therapist_id, config).await?;
    Ok(Json(json!(saved)))
}

#[axum::debug_handler]
pub async fn confirm_booking(
    State(state): State<Arc<SchedulingState>>,
    Path(reference): Path<String>,
    auth: Auth,
) -> Result<Json<Value>, AppError> {
    require_staff(auth.as_ref(), &state.config.supabase_jwt_secret)?;
    let booking = state.bookings.confirm_booking(&reference, Utc::now()).await?;
    Ok(Json(json!(booking)))
}

#[axum::debug_handler]
pub async fn complete_booking(
    State(state): State<Arc<SchedulingState>>,
    Path(reference): Path<String>,
    auth: Auth,
) -> Result<Json<Value>, AppError> {
    require_staff(auth.as_ref(), &state.config.supabase_jwt_secret)?;
    let booking = state.bookings.complete_booking(&reference, Utc::now()).await?;
    Ok(Json(json!(booking)))
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(state): State<Arc<SchedulingState>>,
    Path(reference): Path<String>,
    auth: Auth,
) -> Result<Json<Value>, AppError> {
    require_staff(auth.as_ref(), &state.config.supabase_jwt_secret)?;
    let booking = state.bookings.mark_no_show(&reference, Utc::now()).await?;
    Ok(Json(json!(booking)))
}

#[axum::debug_handler]
pub async fn get_due_reminders(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<ReminderQuery>,
    auth: Auth,
) -> Result<Json<Value>, AppError> {
    require_staff(auth.as_ref(), &state.config.supabase_jwt_secret)?;

    let hours = query.hours_ahead.unwrap_or(DEFAULT_REMINDER_HOURS);
    let bookings = state
        .bookings
        .bookings_due_for_reminder(Utc::now(), Duration::hours(i64::from(hours)))
        .await?;

    Ok(Json(json!({
        "hours_ahead": hours,
        "count": bookings.len(),
        "bookings": bookings,
    })))
}

#[axum::debug_handler]
pub async fn mark_reminder_sent(
    State(state): State<Arc<SchedulingState>>,
    Path(reference): Path<String>,
    auth: Auth,
) -> Result<Json<Value>, AppError> {
    require_staff(auth.as_ref(), &state.config.supabase_jwt_secret)?;
    let booking = state.bookings.mark_reminder_sent(&reference, Utc::now()).await?;
    Ok(Json(json!(booking)))
}
