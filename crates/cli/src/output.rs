//! Output formatting and terminal rendering

use colored::Colorize;
use jarvis::{ActionOutcome, HistoryStats, LogRecord, PendingConfirmation};

/// Output handler for terminal display
pub struct OutputHandler {
    pub dry_run: bool,
}

impl OutputHandler {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Print the welcome banner
    pub fn print_banner(&self, name: &str, greeting: &str) {
        let rule = "═".repeat(56);
        println!();
        println!("{}", format!("╔{}╗", rule).bright_cyan());
        println!(
            "{}  {:<53} {}",
            "║".bright_cyan(),
            format!("{} command console", name).bright_white().bold(),
            "║".bright_cyan()
        );
        println!("{}", format!("╚{}╝", rule).bright_cyan());
        if self.dry_run {
            self.print_warning("Dry run: actions are recorded, not performed.");
        }
        println!();
        println!("{} {}", format!("{}:", name).bright_green().bold(), greeting);
        println!("{}", "Type a command, or /help for console commands.".dimmed());
    }

    /// Print a section header
    pub fn print_header(&self, text: &str) {
        println!();
        println!("{}", format!("▶ {}", text).bright_yellow().bold());
        println!("{}", "─".repeat(60).dimmed());
    }

    /// Print a success message
    pub fn print_success(&self, text: &str) {
        println!("{} {}", "✓".bright_green(), text.bright_white());
    }

    /// Print an error message
    pub fn print_error(&self, text: &str) {
        println!("{} {}", "✗".bright_red(), text.bright_red());
    }

    /// Print a warning message
    pub fn print_warning(&self, text: &str) {
        println!("{} {}", "⚠".bright_yellow(), text.yellow());
    }

    /// Print an info message
    pub fn print_info(&self, text: &str) {
        println!("{} {}", "ℹ".bright_blue(), text);
    }

    /// What the assistant says back, marked by how the request went
    pub fn print_outcome(&self, name: &str, outcome: &ActionOutcome) {
        let speaker = format!("{}:", name).bright_green().bold();
        let label = format!("[{}]", outcome.action_label).dimmed();

        if outcome.requires_confirmation {
            println!("{} {} {}", speaker, outcome.spoken_response.bright_yellow(), label);
        } else if outcome.success {
            println!("{} {} {}", speaker, outcome.spoken_response, label);
        } else {
            println!("{} {} {}", speaker, outcome.spoken_response.bright_red(), label);
            if let Some(error) = &outcome.error_message {
                println!("  {} {}", "error:".dimmed(), error.dimmed());
            }
        }
    }

    pub fn print_pending(&self, pending: Option<&PendingConfirmation>) {
        match pending {
            Some(pending) => {
                self.print_warning(&format!(
                    "Waiting for confirmation: {} (\"{}\")",
                    pending.action.label(),
                    pending.raw_text
                ));
                println!(
                    "  {} {}",
                    "Say:".dimmed(),
                    pending.action.confirmation_phrase().bright_yellow()
                );
            }
            None => self.print_info("Nothing is waiting for confirmation."),
        }
    }

    /// History table, in the order given
    pub fn print_records(&self, records: &[LogRecord]) {
        if records.is_empty() {
            self.print_info("No commands recorded yet.");
            return;
        }

        println!(
            "  {:<20} {:<7} {:<24} {}",
            "TIME".dimmed(),
            "SOURCE".dimmed(),
            "ACTION".dimmed(),
            "COMMAND".dimmed()
        );
        for record in records {
            let mark = if record.success {
                "✓".bright_green()
            } else {
                "✗".bright_red()
            };
            println!(
                "{} {:<20} {:<7} {:<24} {}",
                mark,
                record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                record.source.as_str(),
                record.action_label.as_deref().unwrap_or("-").bright_cyan(),
                shorten(&record.raw_text, 48)
            );
        }
    }

    pub fn print_stats(&self, stats: &HistoryStats) {
        println!(
            "  {} {}   {} {}   {} {}   {} {:.0}%",
            "total".dimmed(),
            stats.total_commands,
            "ok".dimmed(),
            stats.successful.to_string().bright_green(),
            "failed".dimmed(),
            stats.failed.to_string().bright_red(),
            "success rate".dimmed(),
            stats.success_rate * 100.0
        );
        for (action, count) in &stats.by_action {
            println!("    {:<28} {}", action.bright_cyan(), count);
        }
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}
