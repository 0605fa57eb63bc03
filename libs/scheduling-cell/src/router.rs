use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::{self, SchedulingState};

pub fn scheduling_routes(state: Arc<SchedulingState>) -> Router {
    // Open to anonymous callers
    let public_routes = Router::new()
        .route("/availability", get(handlers::get_availability))
        .route("/bookings", post(handlers::create_booking))
        .route("/bookings/{reference}", get(handlers::get_booking))
        .route("/bookings/{reference}/cancel", post(handlers::cancel_booking))
        .route("/therapists/{therapist_id}", get(handlers::get_therapist));

    // Staff token checked per handler, except the schedule read
    let staff_routes = Router::new()
        .route(
            "/therapists/{therapist_id}/schedule",
            get(handlers::get_schedule).put(handlers::update_schedule),
        )
        .route("/bookings/{reference}/confirm", post(handlers::confirm_booking))
        .route("/bookings/{reference}/complete", post(handlers::complete_booking))
        .route("/bookings/{reference}/no-show", post(handlers::mark_no_show))
        .route("/bookings/{reference}/reminder-sent", post(handlers::mark_reminder_sent))
        .route("/bookings/reminders/due", get(handlers::get_due_reminders));

    Router::new()
        .merge(public_routes)
        .merge(staff_routes)
        .with_state(state)
}
