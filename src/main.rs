use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parley::config::HubConfig;
use parley::hub::RoomRegistry;
use parley::room::repository::{InMemoryRoomRepository, PostgresRoomRepository, RoomRepository};
use parley::session::repository::{
    InMemorySessionRepository, PostgresSessionRepository, SessionRepository,
};
use parley::session::TokenConfig;
use parley::shared::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting parley chat server");

    let token_config = TokenConfig::new();
    let hub_config = HubConfig::from_env();
    let registry = RoomRegistry::new();

    // Select repositories by environment; a configured but unreachable
    // database is fatal at boot, never later
    let (session_repository, room_repository): (
        Arc<dyn SessionRepository + Send + Sync>,
        Arc<dyn RoomRepository + Send + Sync>,
    ) = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = sqlx::PgPool::connect(&database_url)
                .await
                .expect("Failed to connect to database");
            info!("Connected to PostgreSQL");
            (
                Arc::new(PostgresSessionRepository::new(pool.clone())),
                Arc::new(PostgresRoomRepository::new(pool)),
            )
        }
        Err(_) => {
            info!("DATABASE_URL not set, using in-memory repositories");
            (
                Arc::new(InMemorySessionRepository::new()),
                Arc::new(InMemoryRoomRepository::new()),
            )
        }
    };

    let app_state = AppState::new(
        session_repository,
        room_repository,
        registry.clone(),
        token_config,
        hub_config,
    );

    // build our application
    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/session", post(parley::session::create_session))
        .route("/room", post(parley::room::create_room))
        .route("/ws/:room_id", get(parley::websockets::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("Failed to bind listener");
    info!("Server running on http://localhost:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await
        .expect("Server error");
}

/// Waits for ctrl-c, then tears down every live room so clients reach
/// their terminal state before the process exits.
async fn shutdown_signal(registry: RoomRegistry) {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received, closing rooms");
    registry.close_all().await;
}
