//! Types text into the active window by driving the platform's input tools

use std::sync::Arc;

use async_trait::async_trait;

use super::system::{CommandRunner, Platform, ProcessRunner};
use crate::{
    capabilities::{CapabilityReply, CapabilityResult, TypingController},
    config::JarvisConfig,
};

pub struct KeystrokeTyping {
    enabled: bool,
    platform: Platform,
    runner: Arc<dyn CommandRunner>,
}

impl KeystrokeTyping {
    pub fn new(enabled: bool, platform: Platform, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            enabled,
            platform,
            runner,
        }
    }

    pub fn from_config(config: &JarvisConfig) -> Self {
        Self::new(
            config.features.remote_typing,
            Platform::current(),
            Arc::new(ProcessRunner),
        )
    }
}

/// Candidate invocations that type `text`, tried in order
pub fn typing_commands(platform: Platform, text: &str) -> Vec<Vec<String>> {
    match platform {
        Platform::Linux => vec![
            vec![
                "xdotool".to_string(),
                "type".to_string(),
                "--delay".to_string(),
                "10".to_string(),
                "--".to_string(),
                text.to_string(),
            ],
            vec!["wtype".to_string(), "--".to_string(), text.to_string()],
        ],
        Platform::MacOs => vec![vec![
            "osascript".to_string(),
            "-e".to_string(),
            format!(
                "tell application \"System Events\" to keystroke \"{}\"",
                text.replace('\\', "\\\\").replace('"', "\\\"")
            ),
        ]],
        Platform::Windows => vec![vec![
            "powershell".to_string(),
            "-NoProfile".to_string(),
            "-Command".to_string(),
            format!(
                "(New-Object -ComObject WScript.Shell).SendKeys('{}')",
                escape_send_keys(text).replace('\'', "''")
            ),
        ]],
    }
}

/// SendKeys treats `+^%~(){}[]` as modifiers or grouping
fn escape_send_keys(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '+' | '^' | '%' | '~' | '(' | ')' | '{' | '}' | '[' | ']' => format!("{{{}}}", c),
            '\n' => "{ENTER}".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

#[async_trait]
impl TypingController for KeystrokeTyping {
    async fn type_text(&self, text: &str) -> CapabilityResult {
        if !self.enabled {
            return Ok(CapabilityReply::failed(
                "Remote typing is disabled in settings. ⚠️",
            ));
        }
        if text.is_empty() {
            return Ok(CapabilityReply::failed("No text provided to type."));
        }

        let mut last_error = None;
        for argv in typing_commands(self.platform, text) {
            match self.runner.run(&argv).await {
                Ok(true) => {
                    let count = text.chars().count();
                    tracing::info!("Typed text ({} chars)", count);
                    return Ok(CapabilityReply::ok(format!("Typed {} characters! ⌨️", count)));
                }
                Ok(false) => last_error = Some(format!("{} exited with failure", argv[0])),
                Err(e) => last_error = Some(format!("{}: {}", argv[0], e)),
            }
        }

        let reason = last_error.unwrap_or_else(|| "no input tool available".to_string());
        tracing::error!("Typing failed: {}", reason);
        Ok(CapabilityReply::failed(format!("Couldn't type text: {}", reason)))
    }
}
