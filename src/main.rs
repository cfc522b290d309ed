use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use queuedesk::config::AppConfig;
use queuedesk::db;
use queuedesk::services::clock::SystemClock;
use queuedesk::services::store::memory::MemoryDocumentStore;
use queuedesk::services::store::sqlite::SqliteDocumentStore;
use queuedesk::services::store::DocumentStore;
use queuedesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    config.booking.validate()?;

    let store: Arc<dyn DocumentStore> = match config.store_backend.as_str() {
        "memory" => {
            tracing::warn!("using in-memory store; bookings are lost on restart");
            Arc::new(MemoryDocumentStore::new())
        }
        "sqlite" => {
            tracing::info!("using SQLite store (path: {})", config.database_url);
            Arc::new(SqliteDocumentStore::new(db::init_db(&config.database_url)?))
        }
        other => anyhow::bail!("unknown STORE_BACKEND: {other} (expected sqlite or memory)"),
    };

    tracing::info!(
        collection = %config.booking.collection,
        slots = config.booking.time_slots.len(),
        capacity = config.booking.capacity,
        window_days = config.booking.window_days,
        "queue configuration loaded"
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState::new(config, store, Arc::new(SystemClock)));

    let app = queuedesk::app(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
