//! Configuration for Jarvis
//!
//! Loaded from `~/.jarvis/config.toml` (or an explicit path). Every section
//! falls back to defaults, and a handful of environment variables override
//! the file.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{JarvisError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JarvisConfig {
    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub features: FeatureFlags,

    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default = "default_app_mappings")]
    pub apps: BTreeMap<String, String>,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_name() -> String {
    "JARVIS".to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub remote_typing: bool,

    #[serde(default = "default_true")]
    pub file_operations: bool,

    /// Shutdown and restart stay off unless explicitly enabled
    #[serde(default)]
    pub system_shutdown: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            remote_typing: true,
            file_operations: true,
            system_shutdown: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// Accept a bare "confirm" in a later request for a pending action
    #[serde(default = "default_true")]
    pub two_turn: bool,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    60
}

impl ConfirmationConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            two_turn: true,
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub enabled: bool,

    /// OpenAI-compatible chat completions endpoint
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_llm_timeout_secs() -> u64 {
    20
}

impl LlmConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Paths (and everything below them) that file operations refuse to touch
    #[serde(default = "default_protected_paths")]
    pub protected_paths: Vec<String>,
}

fn default_protected_paths() -> Vec<String> {
    [
        "C:\\Windows",
        "C:\\Program Files",
        "C:\\ProgramData",
        "/bin",
        "/boot",
        "/etc",
        "/sbin",
        "/usr",
        "/System",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            protected_paths: default_protected_paths(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryConfig {
    /// JSON Lines command history; defaults to `~/.jarvis/history.jsonl`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_app_mappings() -> BTreeMap<String, String> {
    [
        // Browsers
        ("chrome", "chrome"),
        ("google chrome", "chrome"),
        ("firefox", "firefox"),
        ("edge", "msedge"),
        ("microsoft edge", "msedge"),
        // Editors
        ("vs code", "code"),
        ("visual studio code", "code"),
        ("vscode", "code"),
        ("notepad", "notepad"),
        ("notepad++", "notepad++"),
        ("sublime", "sublime_text"),
        // System
        ("calculator", "calc"),
        ("paint", "mspaint"),
        ("explorer", "explorer"),
        ("file explorer", "explorer"),
        ("cmd", "cmd"),
        ("command prompt", "cmd"),
        ("terminal", "wt"),
        ("powershell", "powershell"),
        // Media
        ("spotify", "spotify"),
        ("vlc", "vlc"),
        // Office
        ("word", "winword"),
        ("excel", "excel"),
        ("powerpoint", "powerpnt"),
    ]
    .iter()
    .map(|(name, exe)| (name.to_string(), exe.to_string()))
    .collect()
}

impl Default for JarvisConfig {
    fn default() -> Self {
        Self {
            assistant: AssistantConfig::default(),
            features: FeatureFlags::default(),
            confirmation: ConfirmationConfig::default(),
            llm: LlmConfig::default(),
            apps: default_app_mappings(),
            files: FilesConfig::default(),
            history: HistoryConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl JarvisConfig {
    /// Directory holding config and history, `~/.jarvis`
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".jarvis")
    }

    pub fn default_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load from a file, falling back to defaults when it does not exist, then
    /// apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            JarvisConfig::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(name) = std::env::var("JARVIS_NAME") {
            self.assistant.name = name;
        }
        if let Ok(host) = std::env::var("JARVIS_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("JARVIS_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| JarvisError::ConfigError(format!("Invalid JARVIS_PORT: {}", port)))?;
        }

        let flags = [
            ("ENABLE_REMOTE_TYPING", &mut self.features.remote_typing),
            ("ENABLE_FILE_OPERATIONS", &mut self.features.file_operations),
            ("ENABLE_SYSTEM_SHUTDOWN", &mut self.features.system_shutdown),
        ];
        for (var, flag) in flags {
            if let Ok(value) = std::env::var(var) {
                *flag = value.trim().eq_ignore_ascii_case("true");
            }
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| JarvisError::ConfigError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn history_path(&self) -> PathBuf {
        self.history
            .path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("history.jsonl"))
    }

    /// Get a value by dotted key path (e.g. "server.port")
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["assistant", "name"] => Some(self.assistant.name.clone()),
            ["features", "remote_typing"] => Some(self.features.remote_typing.to_string()),
            ["features", "file_operations"] => Some(self.features.file_operations.to_string()),
            ["features", "system_shutdown"] => Some(self.features.system_shutdown.to_string()),
            ["confirmation", "two_turn"] => Some(self.confirmation.two_turn.to_string()),
            ["confirmation", "ttl_secs"] => Some(self.confirmation.ttl_secs.to_string()),
            ["llm", "enabled"] => Some(self.llm.enabled.to_string()),
            ["llm", "endpoint"] => Some(self.llm.endpoint.clone()),
            ["llm", "model"] => Some(self.llm.model.clone()),
            ["llm", "api_key_env"] => Some(self.llm.api_key_env.clone()),
            ["llm", "temperature"] => Some(self.llm.temperature.to_string()),
            ["llm", "timeout_secs"] => Some(self.llm.timeout_secs.to_string()),
            ["history", "path"] => Some(self.history_path().display().to_string()),
            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),
            ["apps", name] => self.apps.get(*name).cloned(),
            _ => None,
        }
    }

    /// Set a value by dotted key path
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["assistant", "name"] => self.assistant.name = value.to_string(),
            ["features", "remote_typing"] => self.features.remote_typing = parse_bool(key, value)?,
            ["features", "file_operations"] => {
                self.features.file_operations = parse_bool(key, value)?
            }
            ["features", "system_shutdown"] => {
                self.features.system_shutdown = parse_bool(key, value)?
            }
            ["confirmation", "two_turn"] => self.confirmation.two_turn = parse_bool(key, value)?,
            ["confirmation", "ttl_secs"] => {
                self.confirmation.ttl_secs = value.parse().map_err(|_| invalid(key, value))?
            }
            ["llm", "enabled"] => self.llm.enabled = parse_bool(key, value)?,
            ["llm", "endpoint"] => self.llm.endpoint = value.to_string(),
            ["llm", "model"] => self.llm.model = value.to_string(),
            ["llm", "api_key_env"] => self.llm.api_key_env = value.to_string(),
            ["llm", "temperature"] => {
                self.llm.temperature = value.parse().map_err(|_| invalid(key, value))?
            }
            ["llm", "timeout_secs"] => {
                self.llm.timeout_secs = value.parse().map_err(|_| invalid(key, value))?
            }
            ["history", "path"] => self.history.path = Some(PathBuf::from(value)),
            ["server", "host"] => self.server.host = value.to_string(),
            ["server", "port"] => self.server.port = value.parse().map_err(|_| invalid(key, value))?,
            ["apps", name] => {
                self.apps.insert(name.to_string(), value.to_string());
            }
            _ => {
                return Err(JarvisError::ConfigError(format!(
                    "Unknown configuration key: {}",
                    key
                )))
            }
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value.parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> JarvisError {
    JarvisError::ConfigError(format!("Invalid value for {}: {}", key, value))
}
