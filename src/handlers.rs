//! HTTP route handlers for the session server.
//!
//! `/view/*` routes drive local interaction state (selection, hover, drag,
//! viewport) synchronously. `/actions/*` routes go through the orchestrator
//! and round-trip to the backend. `/api/*` is forwarded to the backend as-is.

use crate::error::Error;
use crate::layout::ViewTransform;
use crate::models::{LinkMethod, NewNode, NodeId};
use crate::notify::Notice;
use crate::selection::Selection;
use crate::sync::{DeleteOutcome, LoadOutcome, StatusBoard};
use crate::view::ViewSnapshot;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

// ============================================================================
// Helpers
// ============================================================================

fn error_response(err: &Error) -> Response {
    let status = match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Server(_) | Error::Status { .. } | Error::Decode(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

// ============================================================================
// View Handlers
// ============================================================================

#[derive(Serialize)]
pub struct SessionSnapshot {
    pub frame: u64,
    pub view: ViewSnapshot,
    pub notices: Vec<Notice>,
    pub statuses: StatusBoard,
}

pub async fn view_snapshot(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    let view = state.orchestrator.with_view(|v| v.snapshot());
    Json(SessionSnapshot {
        frame: state.frames.load(Ordering::Relaxed),
        view,
        notices: state.notices.active(),
        statuses: state.orchestrator.statuses(),
    })
}

pub async fn select_node(
    Path(id): Path<NodeId>,
    State(state): State<Arc<AppState>>,
) -> Json<Selection> {
    Json(state.orchestrator.with_view(|v| v.select(id)))
}

pub async fn select_linked(
    Path(id): Path<NodeId>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.orchestrator.with_view(|v| v.select_linked(id)) {
        Some(transform) => Json(transform).into_response(),
        None => (StatusCode::NOT_FOUND, "Node not found").into_response(),
    }
}

pub async fn deselect(State(state): State<Arc<AppState>>) -> StatusCode {
    state.orchestrator.with_view(|v| v.deselect());
    StatusCode::NO_CONTENT
}

pub async fn hover_enter(Path(id): Path<NodeId>, State(state): State<Arc<AppState>>) -> Response {
    if state.orchestrator.with_view(|v| v.hover_enter(id)) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, "Node not found").into_response()
    }
}

pub async fn hover_leave(Path(id): Path<NodeId>, State(state): State<Arc<AppState>>) -> StatusCode {
    state.orchestrator.with_view(|v| v.hover_leave(id));
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DragPhase {
    Start,
    Move,
    End,
}

#[derive(Debug, Deserialize)]
pub struct DragBody {
    pub phase: DragPhase,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

pub async fn drag_node(
    Path(id): Path<NodeId>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<DragBody>,
) -> Response {
    let applied = state.orchestrator.with_view(|v| {
        let layout = v.layout_mut();
        match body.phase {
            DragPhase::Start => Some(layout.drag_start(id)),
            DragPhase::Move => match (body.x, body.y) {
                (Some(x), Some(y)) => Some(layout.drag_move(id, x, y)),
                _ => None,
            },
            DragPhase::End => Some(layout.drag_end(id)),
        }
    });

    match applied {
        Some(true) => StatusCode::NO_CONTENT.into_response(),
        Some(false) => (StatusCode::NOT_FOUND, "Node not found").into_response(),
        None => (StatusCode::BAD_REQUEST, "Drag move needs x and y").into_response(),
    }
}

#[derive(Deserialize)]
pub struct ResizeBody {
    pub width: f64,
    pub height: f64,
}

pub async fn resize(State(state): State<Arc<AppState>>, Json(body): Json<ResizeBody>) -> Response {
    if !(body.width > 0.0 && body.height > 0.0) {
        return (StatusCode::BAD_REQUEST, "Viewport must be positive").into_response();
    }
    state
        .orchestrator
        .with_view(|v| v.layout_mut().resize(body.width, body.height));
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
pub struct ZoomBody {
    pub k: f64,
}

pub async fn zoom(State(state): State<Arc<AppState>>, Json(body): Json<ZoomBody>) -> Json<ViewTransform> {
    Json(state.orchestrator.with_view(|v| v.layout_mut().zoom_to(body.k)))
}

// ============================================================================
// Action Handlers
// ============================================================================

pub async fn reload(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.load().await {
        Ok(LoadOutcome::Applied(diff)) => Json(json!({ "applied": true, "diff": diff })).into_response(),
        Ok(LoadOutcome::Stale) => Json(json!({ "applied": false })).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn create_node(State(state): State<Arc<AppState>>, Json(body): Json<NewNode>) -> Response {
    match state.orchestrator.create_node(body).await {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
pub struct DeleteSelectedBody {
    pub confirm: bool,
}

pub async fn delete_selected(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DeleteSelectedBody>,
) -> Response {
    match state.orchestrator.delete_node(&body.confirm).await {
        Ok(DeleteOutcome::Deleted(id)) => Json(json!({ "deleted": id })).into_response(),
        Ok(DeleteOutcome::NothingSelected) => {
            (StatusCode::CONFLICT, "No node selected").into_response()
        }
        Ok(DeleteOutcome::Declined) => {
            (StatusCode::BAD_REQUEST, "Deletion not confirmed").into_response()
        }
        Err(e) => error_response(&e),
    }
}

pub async fn recompute(Path(method): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let method: LinkMethod = match method.parse() {
        Ok(m) => m,
        Err(e) => return error_response(&e),
    };
    match state.orchestrator.recompute_links(method).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

// ============================================================================
// Backend Proxy
// ============================================================================

pub async fn proxy_api(
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    let forward = match method {
        Method::GET => reqwest::Method::GET,
        Method::POST => reqwest::Method::POST,
        Method::PUT => reqwest::Method::PUT,
        Method::DELETE => reqwest::Method::DELETE,
        Method::PATCH => reqwest::Method::PATCH,
        _ => return (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response(),
    };

    let mut url = format!("{}/api/{}", state.api_base.as_str().trim_end_matches('/'), path);
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(&q);
    }

    let mut request = state.proxy.request(forward, &url);
    if let Some(ct) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        request = request.header("content-type", ct);
    }
    if !body.is_empty() {
        request = request.body(body.to_vec());
    }

    let response = match request.send().await {
        Ok(r) => r,
        Err(e) if e.is_timeout() => {
            tracing::warn!(%url, "backend request timed out");
            return (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({ "error": "API request timeout" })),
            )
                .into_response();
        }
        Err(e) => {
            tracing::warn!(%url, error = %e, "backend unavailable");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "API server unavailable" })),
            )
                .into_response();
        }
    };

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();
    let bytes = match response.bytes().await {
        Ok(b) => b.to_vec(),
        Err(e) => {
            tracing::warn!(%url, error = %e, "failed to read backend response");
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "API response unreadable" })),
            )
                .into_response();
        }
    };

    (status, [(header::CONTENT_TYPE, content_type)], bytes).into_response()
}
