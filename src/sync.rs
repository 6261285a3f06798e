//! Mutation and reload coordination against the backend.
//!
//! Every mutation is followed by a full reload rather than a local patch.
//! Loads may overlap; each one takes an issue token before its request goes
//! out, and a response is only applied if no later-issued load has been
//! applied already. Older responses that arrive late are dropped.
//!
//! The view lock is never held across an `.await`.

use crate::api::NodeService;
use crate::error::{Error, Result};
use crate::models::{LinkMethod, NewNode, NodeId};
use crate::notify::{Notifier, Severity};
use crate::selection::Selection;
use crate::store::GraphDiff;
use crate::view::GraphView;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

pub type SharedView = Arc<Mutex<GraphView>>;

// ============================================================================
// Status Reporting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "method", rename_all = "snake_case")]
pub enum Operation {
    Load,
    CreateNode,
    DeleteNode,
    RecomputeLinks(LinkMethod),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum OpStatus {
    Pending,
    Success,
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub operation: Operation,
    pub status: OpStatus,
}

/// Latest status per operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusBoard {
    pub reports: Vec<StatusReport>,
}

impl StatusBoard {
    pub fn get(&self, operation: Operation) -> Option<&OpStatus> {
        self.reports
            .iter()
            .find(|r| r.operation == operation)
            .map(|r| &r.status)
    }

    fn set(&mut self, operation: Operation, status: OpStatus) {
        match self.reports.iter_mut().find(|r| r.operation == operation) {
            Some(report) => report.status = status,
            None => self.reports.push(StatusReport { operation, status }),
        }
    }
}

// ============================================================================
// Confirmation Gate
// ============================================================================

/// Synchronous yes/no gate consulted before destructive requests.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// An answer collected ahead of time, e.g. from a request body.
impl Confirm for bool {
    fn confirm(&self, _prompt: &str) -> bool {
        *self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Applied(GraphDiff),
    /// A later-issued load was applied first; this response was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(NodeId),
    NothingSelected,
    Declined,
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct SyncOrchestrator {
    service: Arc<dyn NodeService>,
    view: SharedView,
    notifier: Arc<dyn Notifier>,
    issued: AtomicU64,
    applied: AtomicU64,
    status: watch::Sender<StatusBoard>,
}

impl SyncOrchestrator {
    pub fn new(service: Arc<dyn NodeService>, view: SharedView, notifier: Arc<dyn Notifier>) -> Self {
        let (status, _rx) = watch::channel(StatusBoard::default());
        Self {
            service,
            view,
            notifier,
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
            status,
        }
    }

    pub fn view(&self) -> &SharedView {
        &self.view
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusBoard> {
        self.status.subscribe()
    }

    pub fn statuses(&self) -> StatusBoard {
        self.status.borrow().clone()
    }

    /// Run `f` with the view locked. A poisoned lock is recovered: the view
    /// is only mutated through whole-value operations.
    pub fn with_view<R>(&self, f: impl FnOnce(&mut GraphView) -> R) -> R {
        let mut guard = match self.view.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn report(&self, operation: Operation, status: OpStatus) {
        self.status.send_modify(|board| board.set(operation, status));
    }

    fn fail(&self, operation: Operation, err: &Error, message: String) {
        tracing::warn!(?operation, error = %err, "operation failed");
        self.notifier.notify(&message, Severity::Error);
        self.report(operation, OpStatus::Failure(message));
    }

    /// Reload after a successful mutation. The mutation's own outcome stands;
    /// a failed reload has already been reported by `load`.
    async fn reload_after(&self, operation: Operation) {
        match self.load().await {
            Ok(LoadOutcome::Applied(_)) => {}
            Ok(LoadOutcome::Stale) => {
                tracing::debug!(?operation, "reload after mutation superseded by a later load")
            }
            Err(e) => tracing::debug!(?operation, error = %e, "reload after mutation failed"),
        }
    }

    /// Fetch the full node list and replace the graph with it.
    pub async fn load(&self) -> Result<LoadOutcome> {
        let token = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.report(Operation::Load, OpStatus::Pending);
        tracing::info!(token, "loading nodes");

        let nodes = match self.service.list_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => {
                self.fail(Operation::Load, &e, "Failed to load data".to_string());
                return Err(e);
            }
        };

        let diff = self.with_view(|view| {
            if token <= self.applied.load(Ordering::SeqCst) {
                return None;
            }
            self.applied.store(token, Ordering::SeqCst);
            Some(view.apply_nodes(nodes))
        });

        match diff {
            Some(diff) => {
                tracing::info!(
                    token,
                    generation = diff.generation,
                    added = diff.added.len(),
                    removed = diff.removed.len(),
                    "graph loaded"
                );
                self.notifier.notify("Graph loaded", Severity::Success);
                self.report(Operation::Load, OpStatus::Success);
                Ok(LoadOutcome::Applied(diff))
            }
            None => {
                tracing::debug!(token, "discarding stale load response");
                Ok(LoadOutcome::Stale)
            }
        }
    }

    /// Create a node, then reload.
    pub async fn create_node(&self, node: NewNode) -> Result<NodeId> {
        let op = Operation::CreateNode;
        if let Err(e) = node.validate() {
            self.fail(op, &e, format!("Error: {}", e.user_message("Invalid node")));
            return Err(e);
        }

        self.report(op, OpStatus::Pending);
        tracing::info!(title = %node.title, "creating node");
        match self.service.create_node(&node).await {
            Ok(id) => {
                self.notifier
                    .notify(&format!("Node created (ID: {})", id), Severity::Success);
                self.report(op, OpStatus::Success);
                self.reload_after(op).await;
                Ok(id)
            }
            Err(e) => {
                let msg = format!("Error: {}", e.user_message("Failed to create node"));
                self.fail(op, &e, msg);
                Err(e)
            }
        }
    }

    /// Delete the selected node once `confirm` agrees, then reload.
    pub async fn delete_node(&self, confirm: &impl Confirm) -> Result<DeleteOutcome> {
        let op = Operation::DeleteNode;
        let target = self.with_view(|view| {
            let id = view.selection().selected()?;
            match view.store().find_by_id(id) {
                Some(node) => Some((id, node.title.clone())),
                None => {
                    view.deselect();
                    None
                }
            }
        });
        let Some((id, title)) = target else {
            return Ok(DeleteOutcome::NothingSelected);
        };

        if !confirm.confirm(&format!("Delete node \"{}\"?", title)) {
            tracing::debug!(id, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        self.report(op, OpStatus::Pending);
        tracing::info!(id, "deleting node");
        match self.service.delete_node(id).await {
            Ok(()) => {
                self.notifier.notify("Node deleted", Severity::Success);
                self.report(op, OpStatus::Success);
                self.with_view(|view| {
                    if view.selection().selection() == Selection::Selected(id) {
                        view.deselect();
                    }
                });
                self.reload_after(op).await;
                Ok(DeleteOutcome::Deleted(id))
            }
            Err(e) => {
                let msg = format!("Delete failed: {}", e.user_message("Failed to delete node"));
                self.fail(op, &e, msg);
                Err(e)
            }
        }
    }

    /// Ask the backend to recompute relationships, then reload.
    pub async fn recompute_links(&self, method: LinkMethod) -> Result<()> {
        let op = Operation::RecomputeLinks(method);
        self.report(op, OpStatus::Pending);
        self.notifier
            .notify(&format!("Recomputing links by {}...", method), Severity::Info);
        tracing::info!(%method, "recomputing links");

        match self.service.recompute_links(method).await {
            Ok(()) => {
                self.notifier.notify("Links recomputed", Severity::Success);
                self.report(op, OpStatus::Success);
                self.reload_after(op).await;
                Ok(())
            }
            Err(e) => {
                let msg = format!("Error: {}", e.user_message("Failed to recompute links"));
                self.fail(op, &e, msg);
                Err(e)
            }
        }
    }
}
