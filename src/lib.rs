//! Studygraph library - the client core of the study-notes graph viewer.
//!
//! Nodes are fetched from the notes backend, turned into an undirected link
//! set, laid out with a force simulation and served to a renderer as
//! snapshots. Mutations go back to the backend and trigger a reload.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    routing::{any, get, post},
    Router,
};
use url::Url;

pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod layout;
pub mod links;
pub mod models;
pub mod notify;
pub mod selection;
pub mod simulation;
pub mod store;
pub mod sync;
pub mod view;

use api::{HttpNodeService, NodeService};
use config::ClientConfig;
use notify::NotificationCenter;
use sync::SyncOrchestrator;
use view::GraphView;

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub notices: NotificationCenter,
    /// Client used by the `/api` pass-through.
    pub proxy: reqwest::Client,
    pub api_base: Url,
    /// Simulation frames rendered so far.
    pub frames: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: &ClientConfig) -> error::Result<Self> {
        let service = HttpNodeService::new(config.api_base.clone(), config.timeout)?;
        Self::with_service(config, Arc::new(service))
    }

    /// Build state around an arbitrary backend, e.g. a test double.
    pub fn with_service(config: &ClientConfig, service: Arc<dyn NodeService>) -> error::Result<Self> {
        let notices = NotificationCenter::new();
        let frames = Arc::new(AtomicU64::new(0));

        let mut view = GraphView::from_config(config);
        let counter = frames.clone();
        view.layout_mut().on_tick(Box::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));

        let orchestrator = SyncOrchestrator::new(
            service,
            Arc::new(Mutex::new(view)),
            Arc::new(notices.clone()),
        );

        let proxy = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| error::Error::Transport(e.to_string()))?;

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            notices,
            proxy,
            api_base: config.api_base.clone(),
            frames,
        })
    }

    /// Advance the layout one frame. Returns whether it is still moving.
    pub fn tick(&self) -> bool {
        self.orchestrator.with_view(|v| v.layout_mut().tick())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // View routes
        .route("/view", get(handlers::view_snapshot))
        .route("/view/select/{id}", post(handlers::select_node))
        .route("/view/select-linked/{id}", post(handlers::select_linked))
        .route("/view/deselect", post(handlers::deselect))
        .route(
            "/view/hover/{id}",
            post(handlers::hover_enter).delete(handlers::hover_leave),
        )
        .route("/view/drag/{id}", post(handlers::drag_node))
        .route("/view/resize", post(handlers::resize))
        .route("/view/zoom", post(handlers::zoom))
        // Action routes
        .route("/actions/reload", post(handlers::reload))
        .route("/actions/nodes", post(handlers::create_node))
        .route("/actions/selected", axum::routing::delete(handlers::delete_selected))
        .route("/actions/recompute/{method}", post(handlers::recompute))
        // Backend pass-through
        .route("/api/{*path}", any(handlers::proxy_api))
        .with_state(state)
}

// Re-export commonly used types
pub use error::{Error, Result};
pub use layout::{LayoutController, LayoutParams, ViewTransform, Viewport};
pub use links::derive_links;
pub use models::{Link, LinkMethod, NewNode, Node, NodeId, Point};
pub use selection::{Highlight, NodeDetail, Selection, SelectionHighlight};
pub use simulation::{ForceEngine, ForceSimulation, PositionTable};
pub use store::{GraphDiff, GraphStats, GraphStore};
pub use sync::{Confirm, DeleteOutcome, LoadOutcome, SharedView};
