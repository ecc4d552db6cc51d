//! CLI subcommand handlers
//!
//! Handles the non-interactive commands: run, classify, serve, history, config.

use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use jarvis::{IntentClassifier, JarvisConfig, JsonlLogSink, LogSink, MemoryLogSink, Source};

use crate::{engine, output::OutputHandler};

/// Handle one command and print the reply
pub async fn run(config: &JarvisConfig, dry_run: bool, text: &str) -> Result<bool> {
    let engine = engine::build(config, dry_run)?;
    let output = OutputHandler::new(dry_run);

    let outcome = engine.dispatcher.handle(text, Source::Voice).await;
    output.print_outcome(&config.assistant.name, &outcome);

    Ok(outcome.success || outcome.requires_confirmation)
}

/// Print the intent a piece of text classifies to, without acting on it
pub fn classify(text: &str) -> Result<()> {
    let parsed = IntentClassifier::new().classify(text);
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

pub async fn serve(
    mut config: JarvisConfig,
    dry_run: bool,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let engine = engine::build(&config, dry_run)?;
    let state = server::AppState::new(engine.dispatcher, config.clone(), engine.history);

    server::serve(&config, state)
        .await
        .with_context(|| format!("Failed to serve on {}:{}", config.server.host, config.server.port))
}

/// Show the most recent commands from the history file
pub async fn history(config: &JarvisConfig, limit: usize, stats: bool) -> Result<()> {
    let output = OutputHandler::new(false);
    let path = config.history_path();

    let records = JsonlLogSink::new(&path)
        .load()
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    output.print_header(&format!("Command history ({})", path.display()));
    let recent: Vec<_> = records.iter().rev().take(limit).cloned().collect();
    output.print_records(&recent);

    if stats {
        let totals = MemoryLogSink::new(1);
        for record in records {
            totals.record(record).await;
        }
        output.print_header("Totals");
        output.print_stats(&totals.stats().await);
    }

    Ok(())
}

/// Show current configuration
pub fn show_config(config: &JarvisConfig, path: &Path) -> Result<()> {
    let output = OutputHandler::new(false);

    output.print_header("Configuration");
    println!();
    println!("{}", toml::to_string_pretty(config)?);
    println!("  {} {}", "Config file:".dimmed(), path.display());
    println!("  {} {}", "History file:".dimmed(), config.history_path().display());

    Ok(())
}

/// Set a configuration value and write it back to `path`
pub fn set_config(path: &Path, kv: &str) -> Result<()> {
    let output = OutputHandler::new(false);

    let Some((key, value)) = kv.split_once('=') else {
        bail!("Invalid format. Use: key=value");
    };
    let key = key.trim();
    let value = value.trim().trim_matches('"');

    let mut config = read_config_file(path)?;
    config.set(key, value)?;
    config.save_to(path)?;

    output.print_success(&format!("Set {} = \"{}\"", key, value));
    Ok(())
}

/// The file as written, without environment overrides, so `config --set`
/// never persists a value that only came from the environment
fn read_config_file(path: &Path) -> Result<JarvisConfig> {
    if !path.exists() {
        return Ok(JarvisConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_config_persists_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        set_config(&path, "server.port=6000").unwrap();
        set_config(&path, "apps.editor=\"code\"").unwrap();

        let config = read_config_file(&path).unwrap();
        assert_eq!(config.server.port, 6000);
        assert_eq!(config.apps.get("editor").map(String::as_str), Some("code"));
    }

    #[test]
    fn test_set_config_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(set_config(&path, "server.port").is_err());
        assert!(set_config(&path, "server.port=loud").is_err());
        assert!(set_config(&path, "nope.key=1").is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_run_reports_success() {
        let ok = run(&JarvisConfig::default(), true, "search google for rust")
            .await
            .unwrap();
        assert!(ok);
    }
}
