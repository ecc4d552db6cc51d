//! Confirmation gate for destructive actions
//!
//! Holds at most one deferred destructive request per session. A newer request
//! in the same session overwrites the older one; records expire after the
//! configured time-to-live.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// A destructive action that may only run once confirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DestructiveAction {
    DeleteFile { path: String },
    Shutdown,
    Restart,
}

impl DestructiveAction {
    /// The phrase the user has to say to go ahead
    pub fn confirmation_phrase(&self) -> &'static str {
        match self {
            DestructiveAction::DeleteFile { .. } => "confirm delete",
            DestructiveAction::Shutdown => "confirm shutdown",
            DestructiveAction::Restart => "confirm restart",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DestructiveAction::DeleteFile { .. } => "file_delete",
            DestructiveAction::Shutdown => "system_shutdown",
            DestructiveAction::Restart => "system_restart",
        }
    }
}

/// Deferred destructive request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConfirmation {
    pub action: DestructiveAction,
    pub raw_text: String,
    pub requested_at: DateTime<Utc>,
}

impl PendingConfirmation {
    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.requested_at);
        age.to_std().map(|age| age > ttl).unwrap_or(false)
    }
}

/// Per-session store of pending destructive requests
#[derive(Debug, Clone)]
pub struct ConfirmationGate {
    pending: Arc<Mutex<HashMap<String, PendingConfirmation>>>,
    ttl: Duration,
}

impl ConfirmationGate {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Record a declined destructive request, replacing any earlier one.
    /// Stale records of other sessions are dropped on the way.
    pub async fn defer(&self, session: &str, action: DestructiveAction, raw_text: &str) {
        let now = Utc::now();
        let record = PendingConfirmation {
            action,
            raw_text: raw_text.to_string(),
            requested_at: now,
        };

        let mut pending = self.pending.lock().await;
        let ttl = self.ttl;
        pending.retain(|_, existing| !existing.is_expired(ttl, now));
        if let Some(previous) = pending.insert(session.to_string(), record) {
            tracing::debug!(
                session,
                previous = previous.action.label(),
                "Replaced pending confirmation"
            );
        }
    }

    /// Remove and return the pending request for a session, if still fresh
    pub async fn take(&self, session: &str) -> Option<PendingConfirmation> {
        let mut pending = self.pending.lock().await;
        let record = pending.remove(session)?;

        if record.is_expired(self.ttl, Utc::now()) {
            tracing::debug!(session, action = record.action.label(), "Pending confirmation expired");
            return None;
        }

        Some(record)
    }

    /// Look at the pending request for a session without consuming it
    pub async fn peek(&self, session: &str) -> Option<PendingConfirmation> {
        let pending = self.pending.lock().await;
        pending
            .get(session)
            .filter(|record| !record.is_expired(self.ttl, Utc::now()))
            .cloned()
    }

    /// Drop the pending request for a session when it matches the predicate
    pub async fn clear_if<F>(&self, session: &str, predicate: F) -> bool
    where
        F: FnOnce(&DestructiveAction) -> bool,
    {
        let mut pending = self.pending.lock().await;
        match pending.get(session) {
            Some(record) if predicate(&record.action) => {
                pending.remove(session);
                true
            }
            _ => false,
        }
    }
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_take_consumes_pending() {
        let gate = ConfirmationGate::default();
        gate.defer("phone", DestructiveAction::Shutdown, "shutdown")
            .await;

        let record = gate.take("phone").await.expect("pending shutdown");
        assert_eq!(record.action, DestructiveAction::Shutdown);
        assert!(gate.take("phone").await.is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let gate = ConfirmationGate::default();
        gate.defer(
            "phone",
            DestructiveAction::DeleteFile {
                path: "/tmp/a".to_string(),
            },
            "delete /tmp/a",
        )
        .await;

        assert!(gate.peek("voice").await.is_none());
        assert!(gate.peek("phone").await.is_some());
    }

    #[tokio::test]
    async fn test_newer_request_overwrites() {
        let gate = ConfirmationGate::default();
        gate.defer("voice", DestructiveAction::Shutdown, "shutdown").await;
        gate.defer("voice", DestructiveAction::Restart, "restart").await;

        let record = gate.take("voice").await.unwrap();
        assert_eq!(record.action, DestructiveAction::Restart);
    }

    #[tokio::test]
    async fn test_expired_record_is_not_returned() {
        let gate = ConfirmationGate::new(Duration::from_millis(10));
        gate.defer("api", DestructiveAction::Shutdown, "shutdown").await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(gate.peek("api").await.is_none());
        assert!(gate.take("api").await.is_none());
    }

    #[tokio::test]
    async fn test_defer_evicts_stale_sessions() {
        let gate = ConfirmationGate::new(Duration::from_millis(10));
        gate.defer("stale", DestructiveAction::Shutdown, "shutdown").await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        gate.defer("fresh", DestructiveAction::Restart, "restart").await;

        let pending = gate.pending.lock().await;
        assert!(!pending.contains_key("stale"));
        assert!(pending.contains_key("fresh"));
    }

    #[tokio::test]
    async fn test_clear_if_respects_predicate() {
        let gate = ConfirmationGate::default();
        gate.defer(
            "voice",
            DestructiveAction::DeleteFile {
                path: "notes.txt".to_string(),
            },
            "delete notes.txt",
        )
        .await;

        let cleared = gate
            .clear_if("voice", |action| {
                matches!(action, DestructiveAction::Shutdown | DestructiveAction::Restart)
            })
            .await;
        assert!(!cleared);
        assert!(gate.peek("voice").await.is_some());
    }

    #[test]
    fn test_confirmation_phrases() {
        assert_eq!(
            DestructiveAction::DeleteFile {
                path: "x".to_string()
            }
            .confirmation_phrase(),
            "confirm delete"
        );
        assert_eq!(DestructiveAction::Shutdown.confirmation_phrase(), "confirm shutdown");
        assert_eq!(DestructiveAction::Restart.confirmation_phrase(), "confirm restart");
    }
}
