//! User-facing notifications for transaction milestones

use ethers::types::H256;
use tracing::{info, warn};

/// Milestone a notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Submitted,
    Confirmed,
    Failed,
}

/// A single user-facing notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub kind: NotifyKind,
    pub text: String,
    pub explorer_link: Option<String>,
}

impl Notification {
    pub fn submitted(text: String, explorer_link: String) -> Self {
        Self {
            kind: NotifyKind::Submitted,
            text,
            explorer_link: Some(explorer_link),
        }
    }

    pub fn confirmed(text: String, explorer_link: String) -> Self {
        Self {
            kind: NotifyKind::Confirmed,
            text,
            explorer_link: Some(explorer_link),
        }
    }

    pub fn failed(text: String) -> Self {
        Self {
            kind: NotifyKind::Failed,
            text,
            explorer_link: None,
        }
    }
}

/// Sink for transaction milestone events. Implementations render toasts,
/// push to a UI channel, or just log.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Default sink that emits notifications through tracing
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotifyKind::Failed => warn!("{}", notification.text),
            _ => match notification.explorer_link {
                Some(link) => info!("{} ({})", notification.text, link),
                None => info!("{}", notification.text),
            },
        }
    }
}

/// Build an explorer link of the form `<base>/tx/<hash>`
pub fn explorer_link(explorer_base: &str, tx_hash: H256) -> String {
    format!("{}/tx/{:?}", explorer_base.trim_end_matches('/'), tx_hash)
}
