//! Per-request outcome returned to callers

use serde::{Deserialize, Serialize};

/// Result of dispatching one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    /// Action label such as `app_launch`, `browser_google_search`, `file_delete`
    pub action_label: String,
    pub success: bool,
    pub spoken_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_confirmation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters_typed: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_chat: bool,
}

impl ActionOutcome {
    pub fn new(action_label: impl Into<String>, success: bool, spoken_response: impl Into<String>) -> Self {
        Self {
            action_label: action_label.into(),
            success,
            spoken_response: spoken_response.into(),
            error_message: None,
            details: None,
            requires_confirmation: false,
            characters_typed: None,
            is_chat: false,
        }
    }

    /// Destructive action withheld until confirmed
    pub fn needs_confirmation(action_label: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            requires_confirmation: true,
            ..Self::new(action_label, false, prompt)
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
