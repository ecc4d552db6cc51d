//! Jarvis CLI
//!
//! Interactive console, one-shot commands and the HTTP server the phone app
//! talks to, all on top of the same command dispatcher.

mod commands;
mod engine;
mod output;
mod repl;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use jarvis::JarvisConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Jarvis - voice and remote desktop assistant
#[derive(Parser)]
#[command(name = "jarvis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Control this computer with plain-language commands")]
#[command(long_about = r#"
Jarvis turns plain-language commands into actions on this computer: opening
apps and websites, copying or moving files, volume and screenshots, typing
text. Deleting files, shutdown and restart always ask for confirmation first.

Examples:
  jarvis                                  # Interactive console
  jarvis run open chrome                  # One command, then exit
  jarvis classify play lofi on youtube    # Show the parsed intent only
  jarvis serve --port 5000                # API for the phone app
  jarvis --dry-run run delete notes.txt   # Record instead of acting
"#)]
struct Cli {
    /// Config file (defaults to ~/.jarvis/config.toml)
    #[arg(short, long, env = "JARVIS_CONFIG")]
    config: Option<PathBuf>,

    /// Record actions instead of performing them
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one command and exit
    Run {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Print the intent for some text without acting on it
    Classify {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Serve the HTTP API used by the phone app
    Serve {
        /// Bind address (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show recent commands from the history file
    History {
        /// Number of commands to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Also show totals per action
        #[arg(long)]
        stats: bool,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set a configuration value (key=value)
        #[arg(long)]
        set: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The console prints replies itself; only the server logs at info by default
    let log_level = if cli.verbose {
        "debug"
    } else if matches!(cli.command, Some(Commands::Serve { .. })) {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "jarvis={level},jarvis_cli={level},server={level},warn",
                    level = log_level
                )
                .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = cli.config.clone().unwrap_or_else(JarvisConfig::default_path);
    let config = JarvisConfig::load_from(&config_path)?;

    match cli.command {
        Some(Commands::Run { text }) => {
            if !commands::run(&config, cli.dry_run, &text.join(" ")).await? {
                std::process::exit(1);
            }
        }
        Some(Commands::Classify { text }) => {
            commands::classify(&text.join(" "))?;
        }
        Some(Commands::Serve { host, port }) => {
            commands::serve(config, cli.dry_run, host, port).await?;
        }
        Some(Commands::History { limit, stats }) => {
            commands::history(&config, limit, stats).await?;
        }
        Some(Commands::Config { show, set }) => {
            if show {
                commands::show_config(&config, &config_path)?;
            } else if let Some(kv) = set {
                commands::set_config(&config_path, &kv)?;
            } else {
                commands::show_config(&config, &config_path)?;
            }
        }
        None => {
            let engine = engine::build(&config, cli.dry_run)?;
            let mut repl = repl::JarvisRepl::new(engine, &config, cli.dry_run)?;
            repl.run().await?;
        }
    }

    Ok(())
}
