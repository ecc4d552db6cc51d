//! Builds the dispatcher the REPL, one-shot commands and the server share

use std::sync::Arc;

use anyhow::Result;
use jarvis::{
    CommandDispatcher, FanoutLogSink, JarvisConfig, JsonlLogSink, LlmComposer, MemoryLogSink,
    ResponseComposer, TemplateComposer, TracingLogSink, providers,
};

/// Recent commands kept in memory for `/history` and `/status`
const MEMORY_HISTORY: usize = 200;

pub struct Engine {
    pub dispatcher: Arc<CommandDispatcher>,
    pub history: MemoryLogSink,
}

/// Real providers act on this machine; with `dry_run` every call is only
/// recorded and nothing is appended to the history file
pub fn build(config: &JarvisConfig, dry_run: bool) -> Result<Engine> {
    let capabilities = if dry_run {
        tracing::info!("Dry run: no action will touch this machine");
        providers::dry_run().0
    } else {
        providers::desktop(config)
    };

    let history = MemoryLogSink::new(MEMORY_HISTORY);
    let mut sink = FanoutLogSink::new()
        .with(Arc::new(TracingLogSink))
        .with(Arc::new(history.clone()));
    if !dry_run {
        sink = sink.with(Arc::new(JsonlLogSink::new(config.history_path())));
    }

    let dispatcher = CommandDispatcher::from_config(
        config,
        capabilities,
        composer(config)?,
        Arc::new(sink),
    );

    Ok(Engine {
        dispatcher: Arc::new(dispatcher),
        history,
    })
}

fn composer(config: &JarvisConfig) -> Result<Arc<dyn ResponseComposer>> {
    if !config.llm.enabled {
        return Ok(Arc::new(TemplateComposer::new()));
    }

    let composer = LlmComposer::new(config)?;
    if !composer.has_api_key() {
        tracing::warn!(
            "LLM replies enabled but {} is not set; chat will run in offline mode",
            config.llm.api_key_env
        );
    }
    Ok(Arc::new(composer))
}
