use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use notification_cell::EmailNotificationService;
use scheduling_cell::services::dispatch::{
    DisabledMeetingLinks, LogOnlyNotifier, MeetingLinkProvider, NotificationDispatcher,
};
use scheduling_cell::services::reference::RandomReferenceGenerator;
use scheduling_cell::services::{AvailabilityService, BookingService, ScheduleService};
use scheduling_cell::store::{InMemorySchedulingStore, SchedulingStore, SupabaseSchedulingStore};
use scheduling_cell::SchedulingState;
use shared_config::AppConfig;
use video_conferencing_cell::VideoMeetingClient;

async fn build_store(config: &AppConfig) -> Arc<dyn SchedulingStore> {
    if config.is_database_configured() {
        info!("Using Supabase booking store at {}", config.supabase_url);
        return Arc::new(SupabaseSchedulingStore::new(config));
    }

    let store = InMemorySchedulingStore::new();
    let fixture = store.seed_demo().await;
    info!(
        "Using in-memory booking store with demo therapist {} (video session {}, in-person session {})",
        fixture.therapist_id, fixture.video_session_type_id, fixture.in_person_session_type_id
    );
    Arc::new(store)
}

fn build_meeting_links(config: &AppConfig) -> Arc<dyn MeetingLinkProvider> {
    match VideoMeetingClient::new(config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!("Video meeting links disabled: {}", e);
            Arc::new(DisabledMeetingLinks)
        }
    }
}

fn build_notifier(config: &AppConfig) -> Arc<dyn NotificationDispatcher> {
    match EmailNotificationService::new(config) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            warn!("Confirmation emails disabled: {}", e);
            Arc::new(LogOnlyNotifier)
        }
    }
}

pub async fn build_state(config: AppConfig) -> Arc<SchedulingState> {
    let store = build_store(&config).await;
    let references = Arc::new(RandomReferenceGenerator::new(&config.booking_reference_prefix));

    let bookings = BookingService::new(
        store.clone(),
        build_meeting_links(&config),
        build_notifier(&config),
        references,
    )
    .with_max_reference_attempts(config.booking_reference_max_attempts);

    Arc::new(SchedulingState {
        availability: AvailabilityService::new(store.clone()),
        schedules: ScheduleService::new(store),
        bookings,
        config: Arc::new(config),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting practice booking API server");

    let config = AppConfig::from_env();
    let port = config.server_port;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = build_state(config).await;

    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app)
        .await
        .context("server terminated")?;

    Ok(())
}
