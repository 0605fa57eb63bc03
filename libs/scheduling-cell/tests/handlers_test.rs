use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use scheduling_cell::handlers::SchedulingState;
use scheduling_cell::scheduling_routes;
use scheduling_cell::services::dispatch::{DisabledMeetingLinks, LogOnlyNotifier};
use scheduling_cell::services::reference::RandomReferenceGenerator;
use scheduling_cell::services::{AvailabilityService, BookingService, ScheduleService};
use scheduling_cell::store::memory::DemoFixture;
use scheduling_cell::store::InMemorySchedulingStore;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    router: Router,
    fixture: DemoFixture,
    jwt_secret: String,
}

async fn create_test_app() -> TestApp {
    let config = TestConfig::default().to_arc();
    let store = Arc::new(InMemorySchedulingStore::new());
    let fixture = store.seed_demo().await;

    let state = Arc::new(SchedulingState {
        config: config.clone(),
        availability: AvailabilityService::new(store.clone()),
        bookings: BookingService::new(
            store.clone(),
            Arc::new(DisabledMeetingLinks),
            Arc::new(LogOnlyNotifier),
            Arc::new(RandomReferenceGenerator::new("BK")),
        ),
        schedules: ScheduleService::new(store),
    });

    TestApp {
        router: scheduling_routes(state),
        fixture,
        jwt_secret: config.supabase_jwt_secret.clone(),
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn first_open_slot(app: &TestApp) -> (String, String) {
    let from = Utc::now();
    let to = from + Duration::days(14);
    let uri = format!(
        "/availability?therapist_id={}&session_type_id={}&from={}&to={}",
        app.fixture.therapist_id,
        app.fixture.in_person_session_type_id,
        from.to_rfc3339_opts(SecondsFormat::Secs, true),
        to.to_rfc3339_opts(SecondsFormat::Secs, true),
    );

    let (status, body) = send(app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timezone"], "Europe/London");

    let slot = &body["slots"][0];
    (
        slot["start"].as_str().unwrap().to_string(),
        slot["end"].as_str().unwrap().to_string(),
    )
}

fn booking_body(app: &TestApp, start: &str, end: &str) -> Value {
    json!({
        "therapist_id": app.fixture.therapist_id,
        "session_type_id": app.fixture.in_person_session_type_id,
        "client_name": "Jordan Lee",
        "client_email": "jordan.lee@example.com",
        "start_datetime": start,
        "end_datetime": end,
    })
}

#[tokio::test]
async fn test_availability_then_booking() {
    let app = create_test_app().await;
    let (start, end) = first_open_slot(&app).await;

    let (status, body) = send(&app, json_request("POST", "/bookings", booking_body(&app, &start, &end), None)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["confirmation"], "queued");
    assert!(body["meeting_link"].is_null());
    let reference = body["booking_reference"].as_str().unwrap().to_string();

    let (status, booking) = send(&app, get(&format!("/bookings/{}", reference.to_lowercase()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["booking_reference"], reference.as_str());
    assert_eq!(booking["created_by"], "public");
    assert_eq!(booking["meeting_location"], "Room 2, 14 Harbour Street");
}

#[tokio::test]
async fn test_second_booking_gets_refetch_hint() {
    let app = create_test_app().await;
    let (start, end) = first_open_slot(&app).await;

    let (status, _) = send(&app, json_request("POST", "/bookings", booking_body(&app, &start, &end), None)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, json_request("POST", "/bookings", booking_body(&app, &start, &end), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "slot_no_longer_available");
    assert_eq!(body["retryable"], true);
    assert_eq!(body["action"], "refetch_availability");

    let (_, next) = first_open_slot(&app).await;
    assert_ne!(next, end);
}

#[tokio::test]
async fn test_malformed_booking_is_bad_request() {
    let app = create_test_app().await;
    let (start, _) = first_open_slot(&app).await;

    let mut body = booking_body(&app, &start, &start);
    body["client_email"] = json!("nobody");
    let (status, body) = send(&app, json_request("POST", "/bookings", body, None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_signed_in_client_owns_the_booking() {
    let app = create_test_app().await;
    let (start, end) = first_open_slot(&app).await;
    let client = TestUser::client("jordan.lee@example.com");
    let token = JwtTestUtils::create_test_token(&client, &app.jwt_secret, Some(1));

    let (status, body) = send(
        &app,
        json_request("POST", "/bookings", booking_body(&app, &start, &end), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let reference = body["booking_reference"].as_str().unwrap();
    let (_, booking) = send(&app, get(&format!("/bookings/{}", reference))).await;
    assert_eq!(booking["client_id"], client.id.as_str());
    assert_eq!(booking["created_by"], client.id.as_str());
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let app = create_test_app().await;
    let (start, end) = first_open_slot(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/bookings",
            booking_body(&app, &start, &end),
            Some(&JwtTestUtils::create_malformed_token()),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_unknown_reference_is_not_found() {
    let app = create_test_app().await;
    let (status, body) = send(&app, get("/bookings/BK-NOPE2345")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_staff_routes_require_staff() {
    let app = create_test_app().await;
    let (start, end) = first_open_slot(&app).await;
    let (_, created) = send(&app, json_request("POST", "/bookings", booking_body(&app, &start, &end), None)).await;
    let reference = created["booking_reference"].as_str().unwrap();
    let confirm_uri = format!("/bookings/{}/confirm", reference);

    let (status, _) = send(&app, json_request("POST", &confirm_uri, json!({}), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let client = TestUser::client("jordan.lee@example.com");
    let client_token = JwtTestUtils::create_test_token(&client, &app.jwt_secret, Some(1));
    let (status, _) = send(&app, json_request("POST", &confirm_uri, json!({}), Some(&client_token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Staff reach the lifecycle, which refuses confirming a confirmed booking.
    let reception = TestUser::reception("front.desk@example.com");
    let staff_token = JwtTestUtils::create_test_token(&reception, &app.jwt_secret, Some(1));
    let (status, body) = send(&app, json_request("POST", &confirm_uri, json!({}), Some(&staff_token))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_status_transition");
}

#[tokio::test]
async fn test_anonymous_cancellation_is_recorded_as_client() {
    let app = create_test_app().await;
    let (start, end) = first_open_slot(&app).await;
    let (_, created) = send(&app, json_request("POST", "/bookings", booking_body(&app, &start, &end), None)).await;
    let reference = created["booking_reference"].as_str().unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/bookings/{}/cancel", reference),
            json!({ "reason": "Double booked myself", "cancelled_by": "therapist" }),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["cancelled_by"], "client");

    // The slot is offered again.
    let (again, _) = first_open_slot(&app).await;
    assert_eq!(again, start);
}

#[tokio::test]
async fn test_schedule_update_is_validated() {
    let app = create_test_app().await;
    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &app.jwt_secret, Some(1));
    let uri = format!("/therapists/{}/schedule", app.fixture.therapist_id);

    let (status, current) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["buffer_time"], 10);

    let overlapping = json!({
        "therapist_id": app.fixture.therapist_id,
        "timezone": "Europe/London",
        "working_hours": [
            { "day_of_week": "Mon", "start_time": "09:00:00", "end_time": "12:00:00" },
            { "day_of_week": "Mon", "start_time": "11:00:00", "end_time": "14:00:00" }
        ],
        "default_session_duration": 50,
        "buffer_time": 10,
        "advance_booking_days": 60,
        "min_booking_notice_hours": 24
    });
    let (status, body) = send(&app, json_request("PUT", &uri, overlapping, Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let mut valid = current.clone();
    valid["buffer_time"] = json!(15);
    let (status, body) = send(&app, json_request("PUT", &uri, valid, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["buffer_time"], 15);
}

#[tokio::test]
async fn test_therapist_profile_is_public() {
    let app = create_test_app().await;
    let (status, body) = send(&app, get(&format!("/therapists/{}", app.fixture.therapist_id))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display_name"], "Alex Morgan");
}

#[tokio::test]
async fn test_due_reminders_for_staff() {
    let app = create_test_app().await;
    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &app.jwt_secret, Some(1));

    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/bookings/reminders/due?hours_ahead=1")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    // Demo therapist needs 24h notice, so nothing can start within the hour.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hours_ahead"], 1);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_oversized_reminder_window_is_a_bad_request() {
    let app = create_test_app().await;
    let reception = TestUser::reception("desk@example.com");
    let token = JwtTestUtils::create_test_token(&reception, &app.jwt_secret, Some(1));

    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/bookings/reminders/due?hours_ahead=4294967295")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_availability_with_distant_end_is_served() {
    let app = create_test_app().await;
    let from = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let (status, body) = send(
        &app,
        get(&format!(
            "/availability?therapist_id={}&session_type_id={}&from={}&to=9999-12-31T00:00:00Z",
            app.fixture.therapist_id, app.fixture.video_session_type_id, from
        )),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["slots"].as_array().unwrap().is_empty());
}
