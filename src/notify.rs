//! User-facing status notifications.
//!
//! The presentation layer owns how notices look; the core only fires them.
//! Notices dismiss themselves after [`NOTICE_TTL_SECS`].

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};

pub const NOTICE_TTL_SECS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Fire-and-forget notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Mirrors notifications into the log and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Error => tracing::warn!(%severity, "{}", message),
            _ => tracing::info!(%severity, "{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

/// Keeps recent notices so a renderer can poll them.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Vec<Notice> {
        self.active_at(Utc::now())
    }

    /// Notices younger than the TTL at `now`. Expired ones are discarded.
    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<Notice> {
        let ttl = Duration::seconds(NOTICE_TTL_SECS);
        let mut notices = match self.notices.lock() {
            Ok(n) => n,
            Err(poisoned) => poisoned.into_inner(),
        };
        notices.retain(|n| now - n.created_at < ttl);
        notices.clone()
    }

    /// Every notice still held, expired or not.
    pub fn all(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(n) => n.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, message: &str, severity: Severity) {
        TracingNotifier.notify(message, severity);
        let notice = Notice {
            message: message.to_string(),
            severity,
            created_at: Utc::now(),
        };
        match self.notices.lock() {
            Ok(mut n) => n.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}
