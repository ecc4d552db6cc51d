//! Capability interfaces consumed by the dispatcher
//!
//! Each provider reports expected failures through [`CapabilityReply`] and
//! reserves [`CapabilityError`] for conditions it did not anticipate.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// `(success, message)` result of a capability call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityReply {
    pub success: bool,
    pub message: String,
}

impl CapabilityReply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Unexpected capability failure
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("{0}")]
    Other(String),
}

pub type CapabilityResult = Result<CapabilityReply, CapabilityError>;

#[async_trait]
pub trait AppLauncher: Send + Sync {
    async fn open(&self, name: &str) -> CapabilityResult;
}

#[async_trait]
pub trait BrowserControl: Send + Sync {
    async fn open_url(&self, url: &str) -> CapabilityResult;
    async fn google_search(&self, query: &str) -> CapabilityResult;
    async fn youtube_search(&self, query: &str) -> CapabilityResult;
}

#[async_trait]
pub trait FileManager: Send + Sync {
    async fn copy(&self, source: &str, destination: &str) -> CapabilityResult;
    async fn move_path(&self, source: &str, destination: &str) -> CapabilityResult;
    async fn delete(&self, path: &str, confirm: bool) -> CapabilityResult;
}

#[async_trait]
pub trait SystemControl: Send + Sync {
    async fn volume_up(&self) -> CapabilityResult;
    async fn volume_down(&self) -> CapabilityResult;
    async fn mute(&self) -> CapabilityResult;
    async fn unmute(&self) -> CapabilityResult;
    async fn screenshot(&self) -> CapabilityResult;
    async fn shutdown(&self, confirm: bool) -> CapabilityResult;
    async fn restart(&self, confirm: bool) -> CapabilityResult;
    async fn cancel_shutdown(&self) -> CapabilityResult;
}

#[async_trait]
pub trait TypingController: Send + Sync {
    async fn type_text(&self, text: &str) -> CapabilityResult;
}

/// The full set of providers handed to the dispatcher
#[derive(Clone)]
pub struct Capabilities {
    pub apps: Arc<dyn AppLauncher>,
    pub browser: Arc<dyn BrowserControl>,
    pub files: Arc<dyn FileManager>,
    pub system: Arc<dyn SystemControl>,
    pub typing: Arc<dyn TypingController>,
}

impl Capabilities {
    /// Use one provider that implements every capability
    pub fn uniform<P>(provider: Arc<P>) -> Self
    where
        P: AppLauncher + BrowserControl + FileManager + SystemControl + TypingController + 'static,
    {
        Self {
            apps: provider.clone(),
            browser: provider.clone(),
            files: provider.clone(),
            system: provider.clone(),
            typing: provider,
        }
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
