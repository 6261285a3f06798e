//! Studygraph session server.
//!
//! Loads the graph from the notes backend, runs the force layout in the
//! background and exposes the view over HTTP:
//!
//! - `/view`: snapshot plus local interaction (select, hover, drag, zoom)
//! - `/actions`: create, delete and relink, each followed by a reload
//! - `/api`: pass-through to the backend

use std::sync::Arc;
use std::time::Duration;

use studygraph::{config::ClientConfig, router, AppState};
use tracing_subscriber::EnvFilter;

/// Frame interval for the layout driver, about 60 fps.
const TICK_INTERVAL: Duration = Duration::from_millis(16);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("studygraph=info")),
        )
        .init();

    let config = ClientConfig::from_env().expect("Invalid configuration");
    let state = Arc::new(AppState::new(&config).expect("Failed to build HTTP client"));

    let loader = state.clone();
    tokio::spawn(async move {
        // Failures are already surfaced as notices.
        let _ = loader.orchestrator.load().await;
    });

    let driver = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            driver.tick();
        }
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", config.bind, e));

    tracing::info!(bind = %config.bind, api_base = %config.api_base, "studygraph server running");
    tracing::info!(
        highlight_selection = config.highlight_selection,
        "selection highlighting {}",
        if config.highlight_selection { "enabled" } else { "disabled" }
    );

    axum::serve(listener, app).await.expect("Server error");
}
