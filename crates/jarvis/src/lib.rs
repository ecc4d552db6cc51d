//! # Jarvis - voice and remote command core
//!
//! Turns free-form text into a typed intent, gates destructive actions behind
//! an explicit confirmation, and routes everything else to pluggable
//! capability providers. Every request produces exactly one history record.

pub mod capabilities;
pub mod classifier;
pub mod composer;
pub mod config;
pub mod dispatcher;
pub mod gate;
pub mod history;
pub mod intent;
pub mod outcome;
pub mod providers;

#[cfg(test)]
mod dispatcher_tests;

pub use capabilities::{
    AppLauncher, BrowserControl, Capabilities, CapabilityError, CapabilityReply, CapabilityResult,
    FileManager, SystemControl, TypingController,
};
pub use classifier::IntentClassifier;
pub use composer::{ComposerError, LlmComposer, ResponseComposer, TemplateComposer};
pub use config::JarvisConfig;
pub use dispatcher::{CommandDispatcher, RequestContext};
pub use gate::{ConfirmationGate, DestructiveAction, PendingConfirmation};
pub use history::{
    FanoutLogSink, HistoryStats, JsonlLogSink, LogRecord, LogSink, MemoryLogSink, Source,
    TracingLogSink,
};
pub use intent::{BrowserAction, FileAction, Intent, IntentKind, ParsedIntent, SystemAction};
pub use outcome::ActionOutcome;

/// Main error type for Jarvis operations
#[derive(Debug, thiserror::Error)]
pub enum JarvisError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Composer error: {0}")]
    ComposerError(#[from] ComposerError),
}

pub type Result<T> = std::result::Result<T, JarvisError>;
