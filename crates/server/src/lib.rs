//! HTTP transport for the Jarvis command core
//!
//! The phone app talks to these routes; every request goes through the same
//! [`CommandDispatcher`] as the voice loop and the REPL.

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use jarvis::{CommandDispatcher, JarvisConfig, MemoryLogSink};

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<CommandDispatcher>,
    pub config: Arc<JarvisConfig>,
    /// Recent history and totals reported by `/status` and `/history`
    pub history: MemoryLogSink,
}

impl AppState {
    pub fn new(dispatcher: Arc<CommandDispatcher>, config: JarvisConfig, history: MemoryLogSink) -> Self {
        Self {
            dispatcher,
            config: Arc::new(config),
            history,
        }
    }
}

/// Binds `server.host:server.port` and serves until Ctrl-C
pub async fn serve(config: &JarvisConfig, state: AppState) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let actual = listener.local_addr()?;

    tracing::info!("{} API running on http://{}", config.assistant.name, actual);

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down API server");
}
