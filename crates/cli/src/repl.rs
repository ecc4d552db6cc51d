//! Interactive REPL: typed commands go through the same dispatcher as voice
//! and phone requests

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use jarvis::{
    CommandDispatcher, JarvisConfig, MemoryLogSink, RequestContext, Source, TemplateComposer,
};
use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{engine::Engine, output::OutputHandler};

const DEFAULT_HISTORY_LIMIT: usize = 10;

/// What a console command asks the loop to do next
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct JarvisRepl {
    name: String,
    dispatcher: Arc<CommandDispatcher>,
    history: MemoryLogSink,
    ctx: RequestContext,
    output: OutputHandler,
    editor: DefaultEditor,
}

impl JarvisRepl {
    pub fn new(engine: Engine, config: &JarvisConfig, dry_run: bool) -> Result<Self> {
        Ok(Self {
            name: config.assistant.name.clone(),
            dispatcher: engine.dispatcher,
            history: engine.history,
            ctx: RequestContext::new(Source::Voice).with_session("console"),
            output: OutputHandler::new(dry_run),
            editor: DefaultEditor::new()?,
        })
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> Result<()> {
        self.output
            .print_banner(&self.name, &TemplateComposer::new().greeting_now());

        loop {
            let prompt = format!("\n{} ", "you ›".bright_green().bold());

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(input);

                    if input.starts_with('/') {
                        if self.handle_command(input).await == Flow::Exit {
                            break;
                        }
                    } else {
                        let outcome = self.dispatcher.handle_in(input, &self.ctx).await;
                        self.output.print_outcome(&self.name, &outcome);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!();
                    self.output.print_info("Use /exit to quit.");
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(e) => {
                    self.output.print_error(&format!("Input error: {}", e));
                    break;
                }
            }
        }

        println!("{} {}", format!("{}:", self.name).bright_green().bold(), "Goodbye! 👋");
        Ok(())
    }

    /// Handle slash commands
    async fn handle_command(&mut self, input: &str) -> Flow {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let command = parts.first().copied().unwrap_or("");

        match command {
            "/exit" | "/quit" | "/q" => return Flow::Exit,

            "/help" | "/h" | "/?" => self.print_help(),

            "/pending" => {
                let pending = self.dispatcher.pending(&self.ctx.session).await;
                self.output.print_pending(pending.as_ref());
            }

            "/history" => {
                let limit = match parts.get(1).map(|n| n.parse::<usize>()) {
                    None => DEFAULT_HISTORY_LIMIT,
                    Some(Ok(n)) => n,
                    Some(Err(_)) => {
                        self.output.print_error("Usage: /history [count]");
                        return Flow::Continue;
                    }
                };
                self.output.print_header("Recent commands");
                self.output.print_records(&self.history.recent(limit).await);
            }

            "/stats" => {
                self.output.print_header("This session");
                self.output.print_stats(&self.history.stats().await);
            }

            "/clear" => {
                print!("\x1B[2J\x1B[1;1H");
            }

            _ => {
                self.output.print_error(&format!(
                    "Unknown command: {}. Use /help for available commands.",
                    command
                ));
            }
        }

        Flow::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", format!("{} console", self.name).bright_white().bold());
        println!("{}", "─".repeat(50).dimmed());
        println!();

        println!("{}", "Try saying:".bright_cyan());
        for example in [
            "open chrome",
            "search google for rust tutorials",
            "play lofi beats on youtube",
            "type 'hello world'",
            "copy notes.txt to backup/notes.txt",
            "delete file at ~/old.txt",
            "volume up",
            "take a screenshot",
        ] {
            println!("  {}", example.bright_white());
        }
        println!();

        println!("{}", "Console commands:".bright_cyan());
        println!("  {}        Show what is waiting for confirmation", "/pending".bright_yellow());
        println!("  {}  Show recent commands", "/history [n]".bright_yellow());
        println!("  {}          Show totals for this session", "/stats".bright_yellow());
        println!("  {}          Clear screen", "/clear".bright_yellow());
        println!("  {}           Show this help", "/help".bright_yellow());
        println!("  {}           Exit", "/exit".bright_yellow());
        println!();
    }
}
