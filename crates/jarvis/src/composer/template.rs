//! Offline composer with canned buddy-style phrases

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Timelike;

use super::{ComposerError, ResponseComposer};

const SUCCESS_PHRASES: &[&str] = &[
    "Done! Got it handled for you, buddy. 🙂",
    "All set! Anything else you need? 😊",
    "Finished! That was easy. 🔥",
    "Done and done! Let me know what's next.",
    "Success! Your wish is my command. ✨",
];

pub const OFFLINE_REPLY: &str =
    "I'm running in offline mode right now, buddy. I can still help with basic commands!";

pub const UNREACHABLE_REPLY: &str =
    "I'm having trouble connecting to my brain right now. 😅 Can you try again in a moment?";

/// Deterministic composer: phrases rotate in order instead of at random so
/// output is reproducible.
#[derive(Debug, Default)]
pub struct TemplateComposer {
    cursor: AtomicUsize,
}

impl TemplateComposer {
    pub fn new() -> Self {
        Self::default()
    }

    fn next<'a>(&self, phrases: &[&'a str]) -> &'a str {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        phrases[index % phrases.len()]
    }

    pub fn success_phrase(&self) -> String {
        self.next(SUCCESS_PHRASES).to_string()
    }

    pub fn error_explanation(error: &str) -> String {
        format!("Hmm, I hit a snag: {}. Want to try again? 😅", error)
    }

    /// Time-of-day greeting shown when an interactive session starts
    pub fn greeting(&self, hour: u32) -> String {
        let part = time_of_day(hour);
        let greetings = [
            format!("Good {}! Ready to help out. 🙂", part),
            "Hey there! What's on the agenda today? 🔥".to_string(),
            "Hello! I'm all ears. Well, metaphorically speaking. 😄".to_string(),
            "Hi buddy! What can I do for you?".to_string(),
            format!("Good {}! Let's get things done. 💪", part),
        ];
        let index = self.cursor.fetch_add(1, Ordering::Relaxed);
        greetings[index % greetings.len()].clone()
    }

    pub fn greeting_now(&self) -> String {
        self.greeting(chrono::Local::now().hour())
    }
}

pub fn time_of_day(hour: u32) -> &'static str {
    match hour {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=21 => "evening",
        _ => "night",
    }
}

#[async_trait]
impl ResponseComposer for TemplateComposer {
    async fn phrase_success(&self, _action: &str, _details: &str) -> Result<String, ComposerError> {
        Ok(self.success_phrase())
    }

    async fn explain_error(&self, error: &str, _context: &str) -> String {
        Self::error_explanation(error)
    }

    async fn reply(&self, _message: &str) -> Result<String, ComposerError> {
        Ok(OFFLINE_REPLY.to_string())
    }
}
