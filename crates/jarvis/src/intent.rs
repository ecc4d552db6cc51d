//! Structured intents produced by the classifier

use serde::{Deserialize, Serialize};

/// Top-level intent category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    AppLaunch,
    Browser,
    File,
    System,
    Typing,
    Chat,
    Unknown,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::AppLaunch => "app_launch",
            IntentKind::Browser => "browser",
            IntentKind::File => "file",
            IntentKind::System => "system",
            IntentKind::Typing => "typing",
            IntentKind::Chat => "chat",
            IntentKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Browser sub-actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserAction {
    GoogleSearch { query: String },
    YoutubeSearch { query: String },
    OpenUrl { url: String },
}

impl BrowserAction {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserAction::GoogleSearch { .. } => "google_search",
            BrowserAction::YoutubeSearch { .. } => "youtube_search",
            BrowserAction::OpenUrl { .. } => "open_url",
        }
    }
}

/// File sub-actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FileAction {
    Copy { source: String, destination: String },
    Move { source: String, destination: String },
    Delete { path: String },
}

impl FileAction {
    pub fn name(&self) -> &'static str {
        match self {
            FileAction::Copy { .. } => "copy",
            FileAction::Move { .. } => "move",
            FileAction::Delete { .. } => "delete",
        }
    }
}

/// System control sub-actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemAction {
    VolumeUp,
    VolumeDown,
    Mute,
    Unmute,
    Screenshot,
    Shutdown,
    Restart,
}

impl SystemAction {
    pub fn name(&self) -> &'static str {
        match self {
            SystemAction::VolumeUp => "volume_up",
            SystemAction::VolumeDown => "volume_down",
            SystemAction::Mute => "mute",
            SystemAction::Unmute => "unmute",
            SystemAction::Screenshot => "screenshot",
            SystemAction::Shutdown => "shutdown",
            SystemAction::Restart => "restart",
        }
    }

    /// Shutdown and restart cannot be undone and must be confirmed
    pub fn is_destructive(&self) -> bool {
        matches!(self, SystemAction::Shutdown | SystemAction::Restart)
    }
}

/// Intent together with its parameters.
///
/// Serialized adjacently as `{"kind": ..., "params": {...}}` so every kind
/// carries exactly its own parameter schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum Intent {
    AppLaunch {
        #[serde(rename = "appName")]
        app_name: String,
    },
    Browser(BrowserAction),
    File(FileAction),
    System { action: SystemAction },
    Typing { text: String },
    Chat { message: String },
    Unknown,
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::AppLaunch { .. } => IntentKind::AppLaunch,
            Intent::Browser(_) => IntentKind::Browser,
            Intent::File(_) => IntentKind::File,
            Intent::System { .. } => IntentKind::System,
            Intent::Typing { .. } => IntentKind::Typing,
            Intent::Chat { .. } => IntentKind::Chat,
            Intent::Unknown => IntentKind::Unknown,
        }
    }
}

/// Classifier output for one piece of input text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedIntent {
    #[serde(flatten)]
    pub intent: Intent,
    pub original_text: String,
}

impl ParsedIntent {
    pub fn new(intent: Intent, original_text: impl Into<String>) -> Self {
        Self {
            intent,
            original_text: original_text.into(),
        }
    }

    pub fn kind(&self) -> IntentKind {
        self.intent.kind()
    }
}
