use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{Notify, watch};
use tracing::info;
use tracing_subscriber::EnvFilter;

use feed_server::config::Config;
use feed_server::feed::{ArrivalCache, FeedFetcher};
use feed_server::hub::BroadcastHub;
use feed_server::stations::StationDirectory;
use feed_server::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Config and directory load failures are the only process-fatal
    // conditions; everything after startup degrades instead of dying.
    let config_path =
        std::env::var("FEED_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let config = Config::load(&config_path)
        .unwrap_or_else(|e| panic!("failed to load {config_path}: {e}"));

    let directory = Arc::new(
        StationDirectory::load(&config.stations_path)
            .unwrap_or_else(|e| panic!("failed to load {}: {e}", config.stations_path)),
    );
    info!(stations = directory.len(), "loaded station directory");

    let cache = Arc::new(ArrivalCache::new(config.polling.stale_after()));
    let signal = Arc::new(Notify::new());
    let hub = Arc::new(BroadcastHub::new(Arc::clone(&cache), Arc::clone(&signal)));

    let fetcher = FeedFetcher::new(
        config.feeds.clone(),
        config.polling.interval(),
        Arc::clone(&cache),
        Arc::clone(&directory),
        Arc::clone(&signal),
    )
    .expect("failed to build HTTP client");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn({
        let hub = Arc::clone(&hub);
        let shutdown = shutdown_rx.clone();
        async move { hub.run(shutdown).await }
    });
    tokio::spawn({
        let shutdown = shutdown_rx;
        async move { fetcher.run(shutdown).await }
    });

    let state = AppState::new(cache, hub, directory);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!(%addr, feeds = config.feeds.len(), "arrivals server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            // Stops the fetcher and makes the hub close every
            // subscriber stream, ending the open SSE connections.
            let _ = shutdown_tx.send(true);
        })
        .await
        .expect("server error");
}
