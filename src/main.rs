use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use pagetally::api::{self, AppState};
use pagetally::auth::SessionService;
use pagetally::config::Config;
use pagetally::storage::{SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    info!("Using SQLite storage: {}", config.database.url);
    let storage: Arc<dyn Storage> = Arc::new(
        SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
    );

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    if config.collector.visitor_hashing {
        info!("Visitor fingerprinting enabled (daily-rotating hash)");
    } else {
        info!("Visitor fingerprinting disabled");
    }

    // Expired sessions are swept once a day; the sweep shares storage with
    // the analytics core but touches a disjoint table
    let sweeper = SessionService::new(Arc::clone(&storage));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;
            match sweeper.sweep_expired().await {
                Ok(0) => {}
                Ok(removed) => info!("Swept {} expired sessions", removed),
                Err(err) => warn!(error = %err, "failed to sweep expired sessions"),
            }
        }
    });

    // Create router
    let state = Arc::new(AppState::new(
        Arc::clone(&storage),
        config.collector.visitor_hashing,
    ));
    let app = api::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server listening on http://{}", addr);
    info!("   - Beacon endpoint at http://{}/collect", addr);
    info!("   - API endpoints at http://{}/api/...", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
