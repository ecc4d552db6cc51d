//! A provider that pretends to do everything

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::capabilities::{
    AppLauncher, BrowserControl, CapabilityReply, CapabilityResult, FileManager, SystemControl,
    TypingController,
};

/// One capability call seen by [`DryRun`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub args: Vec<String>,
}

/// Implements every capability by recording the call and reporting success
/// without touching the machine
#[derive(Debug, Default)]
pub struct DryRun {
    calls: Mutex<Vec<RecordedCall>>,
}

impl DryRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, operation: &'static str, args: &[&str], message: String) -> CapabilityResult {
        tracing::info!(operation, ?args, "[dry-run] {}", message);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                operation,
                args: args.iter().map(|a| a.to_string()).collect(),
            });
        }
        Ok(CapabilityReply::ok(message))
    }

    /// Destructive calls without confirmation are refused like the real providers
    fn guarded(&self, operation: &'static str, args: &[&str], confirm: bool, message: String) -> CapabilityResult {
        if !confirm {
            return Ok(CapabilityReply::failed("Safety first! Please confirm first. 🛡️"));
        }
        self.record(operation, args, message)
    }
}

#[async_trait]
impl AppLauncher for DryRun {
    async fn open(&self, name: &str) -> CapabilityResult {
        self.record("open_app", &[name], format!("Would open {}", name))
    }
}

#[async_trait]
impl BrowserControl for DryRun {
    async fn open_url(&self, url: &str) -> CapabilityResult {
        self.record("open_url", &[url], format!("Would open {}", url))
    }

    async fn google_search(&self, query: &str) -> CapabilityResult {
        self.record(
            "google_search",
            &[query],
            format!("Would search Google for '{}'", query),
        )
    }

    async fn youtube_search(&self, query: &str) -> CapabilityResult {
        self.record(
            "youtube_search",
            &[query],
            format!("Would search YouTube for '{}'", query),
        )
    }
}

#[async_trait]
impl FileManager for DryRun {
    async fn copy(&self, source: &str, destination: &str) -> CapabilityResult {
        self.record(
            "copy",
            &[source, destination],
            format!("Would copy {} to {}", source, destination),
        )
    }

    async fn move_path(&self, source: &str, destination: &str) -> CapabilityResult {
        self.record(
            "move",
            &[source, destination],
            format!("Would move {} to {}", source, destination),
        )
    }

    async fn delete(&self, path: &str, confirm: bool) -> CapabilityResult {
        self.guarded("delete", &[path], confirm, format!("Would delete {}", path))
    }
}

#[async_trait]
impl SystemControl for DryRun {
    async fn volume_up(&self) -> CapabilityResult {
        self.record("volume_up", &[], "Would turn the volume up".to_string())
    }

    async fn volume_down(&self) -> CapabilityResult {
        self.record("volume_down", &[], "Would turn the volume down".to_string())
    }

    async fn mute(&self) -> CapabilityResult {
        self.record("mute", &[], "Would mute".to_string())
    }

    async fn unmute(&self) -> CapabilityResult {
        self.record("unmute", &[], "Would unmute".to_string())
    }

    async fn screenshot(&self) -> CapabilityResult {
        self.record("screenshot", &[], "Would take a screenshot".to_string())
    }

    async fn shutdown(&self, confirm: bool) -> CapabilityResult {
        self.guarded("shutdown", &[], confirm, "Would shut down".to_string())
    }

    async fn restart(&self, confirm: bool) -> CapabilityResult {
        self.guarded("restart", &[], confirm, "Would restart".to_string())
    }

    async fn cancel_shutdown(&self) -> CapabilityResult {
        self.record("cancel_shutdown", &[], "Would cancel the shutdown".to_string())
    }
}

#[async_trait]
impl TypingController for DryRun {
    async fn type_text(&self, text: &str) -> CapabilityResult {
        self.record(
            "type_text",
            &[text],
            format!("Would type {} characters", text.chars().count()),
        )
    }
}
