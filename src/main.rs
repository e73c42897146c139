//! Car Service Backend server binary.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use carservice_backend::config::Config;
use carservice_backend::db::{self, Repository};
use carservice_backend::search::SearchIndex;
use carservice_backend::{create_router, AppState};

/// How often expired sessions are deleted.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Car Service Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (CARSVC_API_PSK). The admin API is open!");
    }
    if config.square.is_none() {
        tracing::warn!("Square is not configured; payment endpoints will return 503");
    }
    if config.twilio.is_none() {
        tracing::info!("Twilio is not configured; SMS notifications will only be logged");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Initialize search index
    let search = Arc::new(SearchIndex::open(&config.index_path)?);

    // Build initial search index from database
    tracing::info!("Building search index...");
    let bookings = repo.list_bookings(None).await?;
    search.rebuild(&bookings).await?;

    spawn_session_purge(repo.clone());

    let bind_addr = config.bind_addr;
    let state = AppState::new(repo, search, config);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Delete expired sessions in the background.
fn spawn_session_purge(repo: Arc<Repository>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match repo.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!("Purged {} expired sessions", purged),
                Err(e) => tracing::warn!("Session purge failed: {}", e),
            }
        }
    });
}
