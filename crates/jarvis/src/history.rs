//! Command history: one log record per dispatched request, and the sinks that
//! receive them

use std::{
    collections::{BTreeMap, VecDeque},
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{io::AsyncWriteExt, sync::RwLock};

/// Where a request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Voice,
    Phone,
    Api,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Voice => "voice",
            Source::Phone => "phone",
            Source::Api => "api",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "voice" => Ok(Source::Voice),
            "phone" => Ok(Source::Phone),
            "api" => Ok(Source::Api),
            _ => Err(format!("Unknown source: {}", s)),
        }
    }
}

/// Summary of one dispatcher invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub source: Source,
    pub raw_text: String,
    pub action_label: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub response_text: Option<String>,
}

#[async_trait]
pub trait LogSink: Send + Sync {
    async fn record(&self, record: LogRecord);
}

/// Emits each record as a structured tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

#[async_trait]
impl LogSink for TracingLogSink {
    async fn record(&self, record: LogRecord) {
        let action = record.action_label.as_deref().unwrap_or("none");
        if record.success {
            tracing::info!(
                source = %record.source,
                action,
                "Command handled: {}",
                truncate(&record.raw_text, 50)
            );
        } else {
            tracing::warn!(
                source = %record.source,
                action,
                error = record.error_message.as_deref().unwrap_or(""),
                "Command not completed: {}",
                truncate(&record.raw_text, 50)
            );
        }
    }
}

/// Appends records to a JSON Lines file
#[derive(Debug)]
pub struct JsonlLogSink {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl JsonlLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, record: &LogRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    /// Read every record back, skipping lines that fail to parse
    pub async fn load(&self) -> std::io::Result<Vec<LogRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping malformed history line: {}", e);
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl LogSink for JsonlLogSink {
    async fn record(&self, record: LogRecord) {
        // Best effort: a write failure never fails the request
        if let Err(e) = self.append(&record).await {
            tracing::error!(path = %self.path.display(), "Failed to write command history: {}", e);
        }
    }
}

/// Aggregate counts over recorded commands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_commands: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub by_action: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
struct MemoryState {
    recent: VecDeque<LogRecord>,
    stats: HistoryStats,
}

/// Keeps the most recent records in memory together with running totals
#[derive(Debug, Clone)]
pub struct MemoryLogSink {
    state: Arc<RwLock<MemoryState>>,
    capacity: usize,
}

impl MemoryLogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            capacity: capacity.max(1),
        }
    }

    /// Most recent records, newest first
    pub async fn recent(&self, limit: usize) -> Vec<LogRecord> {
        let state = self.state.read().await;
        state.recent.iter().rev().take(limit).cloned().collect()
    }

    pub async fn stats(&self) -> HistoryStats {
        self.state.read().await.stats.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.recent.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryLogSink {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl LogSink for MemoryLogSink {
    async fn record(&self, record: LogRecord) {
        let mut state = self.state.write().await;

        let stats = &mut state.stats;
        stats.total_commands += 1;
        if record.success {
            stats.successful += 1;
        } else {
            stats.failed += 1;
        }
        stats.success_rate = stats.successful as f64 / stats.total_commands as f64;
        let action = record.action_label.clone().unwrap_or_else(|| "none".to_string());
        *stats.by_action.entry(action).or_insert(0) += 1;

        if state.recent.len() == self.capacity {
            state.recent.pop_front();
        }
        state.recent.push_back(record);
    }
}

/// Forwards each record to several sinks in order
#[derive(Clone, Default)]
pub struct FanoutLogSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl FanoutLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl LogSink for FanoutLogSink {
    async fn record(&self, record: LogRecord) {
        for sink in &self.sinks {
            sink.record(record.clone()).await;
        }
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
