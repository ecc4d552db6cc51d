//! Command dispatcher
//!
//! Routes classified intents to capabilities, holds destructive actions back
//! until they are confirmed, phrases the reply and writes exactly one history
//! record per request. Nothing in here propagates an error or a panic to the
//! caller.

use std::{any::Any, mem, panic::AssertUnwindSafe, sync::Arc};

use chrono::Utc;
use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::{
    capabilities::{Capabilities, CapabilityReply},
    classifier::IntentClassifier,
    composer::{ResponseComposer, TemplateComposer},
    config::JarvisConfig,
    gate::{ConfirmationGate, DestructiveAction, PendingConfirmation},
    history::{truncate, LogRecord, LogSink, Source},
    intent::{BrowserAction, FileAction, Intent, ParsedIntent, SystemAction},
    outcome::ActionOutcome,
};

pub const NO_COMMAND: &str = "No command provided";
pub const UNKNOWN_COMMAND: &str = "Unknown command type";
const TYPED_RESPONSE: &str = "Typed that for you! ⌨️";

/// "confirm", "yes, confirm delete", "confirm it please", ...
static BARE_CONFIRMATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^\s*
        (?:(?:yes|yeah|yep|ok|okay)[\s,!.]*)?
        (?:i\s+)?confirm(?:ed)?
        (?:\s+(delete|deletion|shut\s*down|restart|reboot|it|that|this))?
        (?:[\s,]+please)?
        [\s.!]*$",
    )
    .expect("valid confirmation regex")
});

/// Leading confirmation in front of a full command: "confirm delete notes.txt"
static CONFIRM_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:yes|ok|okay)[\s,]+)?confirm(?:ed)?[\s,:]+(.+)$")
        .expect("valid confirm prefix regex")
});

/// Trailing confirmation after a delete path: "notes.txt confirm", "notes.txt, confirm delete"
static TRAILING_CONFIRM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[\s,]+(?:and\s+)?confirm(?:ed)?(?:\s+delete)?[\s.!]*$")
        .expect("valid trailing confirm regex")
});

/// "confirm" as a word of its own, never part of a path like `confirm.txt`
static CONFIRM_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[\s,])confirm(?:ed)?(?:[\s,!]|[.!]*$)")
        .expect("valid confirm token regex")
});

/// Who is asking, and which pending-confirmation slot they share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub source: Source,
    pub session: String,
    /// Whether a later bare "confirm" may complete a withheld action
    pub two_turn: bool,
}

impl RequestContext {
    /// One session per source unless told otherwise
    pub fn new(source: Source) -> Self {
        Self {
            source,
            session: source.as_str().to_string(),
            two_turn: true,
        }
    }

    /// Anonymous caller: destructive actions need confirming in the same utterance
    pub fn same_utterance_only(mut self) -> Self {
        self.two_turn = false;
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = session.into();
        self
    }
}

/// What the dispatcher decided to do with a request
#[derive(Debug, Clone)]
enum Task {
    CancelShutdown,
    /// Destructive action that has been confirmed
    Execute(DestructiveAction),
    /// Destructive action withheld until confirmed
    Await(DestructiveAction),
    Run(Intent),
}

impl Task {
    fn label(&self) -> String {
        match self {
            Task::CancelShutdown => "system_cancel_shutdown".to_string(),
            Task::Execute(action) | Task::Await(action) => action.label().to_string(),
            Task::Run(intent) => action_label(intent),
        }
    }
}

/// Action label recorded for an intent, e.g. `browser_google_search`
pub fn action_label(intent: &Intent) -> String {
    match intent {
        Intent::AppLaunch { .. } => "app_launch".to_string(),
        Intent::Browser(action) => format!("browser_{}", action.name()),
        Intent::File(action) => format!("file_{}", action.name()),
        Intent::System { action } => format!("system_{}", action.name()),
        Intent::Typing { .. } => "type_text".to_string(),
        Intent::Chat { .. } => "chat".to_string(),
        Intent::Unknown => "unknown".to_string(),
    }
}

fn has_confirm_token(text: &str) -> bool {
    CONFIRM_TOKEN_REGEX.is_match(text)
}

fn is_cancel_shutdown(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("cancel") && lower.contains("shutdown")
}

/// Drop a trailing "confirm" so it never becomes part of a path
pub fn strip_confirm_suffix(path: &str) -> String {
    TRAILING_CONFIRM_REGEX.replace(path, "").trim().to_string()
}

/// Does a bare confirmation utterance cover this pending action?
fn confirmation_covers(target: Option<&str>, action: &DestructiveAction) -> bool {
    let target = target.map(|t| t.to_lowercase().replace(char::is_whitespace, ""));
    match target.as_deref() {
        None | Some("it") | Some("that") | Some("this") => true,
        Some("delete") | Some("deletion") => matches!(action, DestructiveAction::DeleteFile { .. }),
        Some("shutdown") => matches!(action, DestructiveAction::Shutdown),
        Some("restart") | Some("reboot") => matches!(action, DestructiveAction::Restart),
        Some(_) => false,
    }
}

fn confirmation_prompt(action: &DestructiveAction) -> &'static str {
    match action {
        DestructiveAction::DeleteFile { .. } => {
            "Delete operation requires confirmation. Say 'confirm delete' to proceed. 🛡️"
        }
        DestructiveAction::Shutdown => {
            "Shutdown requires confirmation. Say 'confirm shutdown' to proceed. ⚠️"
        }
        DestructiveAction::Restart => {
            "Restart requires confirmation. Say 'confirm restart' to proceed. ⚠️"
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected panic".to_string()
    }
}

fn with_message(details: serde_json::Value, message: &str) -> serde_json::Value {
    match details {
        serde_json::Value::Object(mut map) => {
            map.insert("message".to_string(), json!(message));
            serde_json::Value::Object(map)
        }
        _ => json!({ "message": message }),
    }
}

fn system_description(action: SystemAction) -> &'static str {
    match action {
        SystemAction::VolumeUp => "turn the volume up",
        SystemAction::VolumeDown => "turn the volume down",
        SystemAction::Mute => "mute the sound",
        SystemAction::Unmute => "unmute the sound",
        SystemAction::Screenshot => "take a screenshot",
        SystemAction::Shutdown => "shut down the computer",
        SystemAction::Restart => "restart the computer",
    }
}

pub struct CommandDispatcher {
    classifier: IntentClassifier,
    capabilities: Capabilities,
    composer: Arc<dyn ResponseComposer>,
    sink: Arc<dyn LogSink>,
    gate: ConfirmationGate,
    two_turn: bool,
}

impl CommandDispatcher {
    pub fn new(
        classifier: IntentClassifier,
        capabilities: Capabilities,
        composer: Arc<dyn ResponseComposer>,
        sink: Arc<dyn LogSink>,
        gate: ConfirmationGate,
    ) -> Self {
        Self {
            classifier,
            capabilities,
            composer,
            sink,
            gate,
            two_turn: true,
        }
    }

    pub fn from_config(
        config: &JarvisConfig,
        capabilities: Capabilities,
        composer: Arc<dyn ResponseComposer>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self::new(
            IntentClassifier::new(),
            capabilities,
            composer,
            sink,
            ConfirmationGate::new(config.confirmation.ttl()),
        )
        .with_two_turn(config.confirmation.two_turn)
    }

    /// With two-turn confirmation off, only same-utterance confirmation counts
    pub fn with_two_turn(mut self, enabled: bool) -> Self {
        self.two_turn = enabled;
        self
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// Destructive action waiting for confirmation in a session
    pub async fn pending(&self, session: &str) -> Option<PendingConfirmation> {
        self.gate.peek(session).await
    }

    pub async fn handle(&self, text: &str, source: Source) -> ActionOutcome {
        self.handle_in(text, &RequestContext::new(source)).await
    }

    pub async fn handle_in(&self, text: &str, ctx: &RequestContext) -> ActionOutcome {
        if text.trim().is_empty() {
            let outcome = self.error_outcome(NO_COMMAND, "").await;
            self.log(ctx, text, Some("error"), &outcome).await;
            return outcome;
        }

        let text = text.trim();
        tracing::info!(source = %ctx.source, "Processing command: {}", truncate(text, 50));

        let task = self.plan(text, ctx).await;
        let label = task.label();
        let outcome = self
            .guarded(&label, self.execute(task, text, ctx))
            .await;

        self.log(ctx, text, Some(&label), &outcome).await;
        outcome
    }

    /// Type text directly, bypassing classification
    pub async fn type_text(&self, text: &str, source: Source) -> ActionOutcome {
        let ctx = RequestContext::new(source);
        let label = "type_text";

        let outcome = if text.is_empty() {
            self.error_outcome("No text provided", "type text").await
        } else {
            tracing::info!(source = %source, "Typing {} characters", text.chars().count());
            self.guarded(label, self.run_typing(text)).await
        };

        self.log(&ctx, text, Some(label), &outcome).await;
        outcome
    }

    /// Chat directly, bypassing classification
    pub async fn ask(&self, message: &str, source: Source) -> ActionOutcome {
        let ctx = RequestContext::new(source);
        let label = "chat";

        let outcome = if message.trim().is_empty() {
            self.error_outcome("No message provided", "chat").await
        } else {
            tracing::info!(source = %source, "Chat: {}", truncate(message, 50));
            self.guarded(label, self.run_chat(message)).await
        };

        self.log(&ctx, message, Some(label), &outcome).await;
        outcome
    }

    async fn plan(&self, text: &str, ctx: &RequestContext) -> Task {
        if is_cancel_shutdown(text) {
            let cleared = self
                .gate
                .clear_if(&ctx.session, |action| {
                    matches!(action, DestructiveAction::Shutdown | DestructiveAction::Restart)
                })
                .await;
            if cleared {
                tracing::info!(session = %ctx.session, "Dropped pending shutdown");
            }
            return Task::CancelShutdown;
        }

        let two_turn = self.two_turn && ctx.two_turn;

        if two_turn {
            if let Some(caps) = BARE_CONFIRMATION_REGEX.captures(text) {
                let target = caps.get(1).map(|m| m.as_str());
                let covered = self
                    .gate
                    .peek(&ctx.session)
                    .await
                    .is_some_and(|pending| confirmation_covers(target, &pending.action));
                if covered {
                    if let Some(pending) = self.gate.take(&ctx.session).await {
                        tracing::info!(
                            session = %ctx.session,
                            action = pending.action.label(),
                            "Confirmed pending action"
                        );
                        return Task::Execute(pending.action);
                    }
                }
            }
        }

        let intent = self.classify(text).intent;
        let confirmed = has_confirm_token(text);

        let destructive = match &intent {
            Intent::System {
                action: SystemAction::Shutdown,
            } => Some(DestructiveAction::Shutdown),
            Intent::System {
                action: SystemAction::Restart,
            } => Some(DestructiveAction::Restart),
            Intent::File(FileAction::Delete { path }) => Some(DestructiveAction::DeleteFile {
                path: strip_confirm_suffix(path),
            }),
            _ => None,
        };

        match destructive {
            Some(action) if confirmed => {
                let kind = mem::discriminant(&action);
                self.gate
                    .clear_if(&ctx.session, |pending| mem::discriminant(pending) == kind)
                    .await;
                Task::Execute(action)
            }
            Some(action) => {
                if two_turn {
                    self.gate.defer(&ctx.session, action.clone(), text).await;
                }
                Task::Await(action)
            }
            None => Task::Run(intent),
        }
    }

    /// Classify, letting a leading "confirm" qualify a full command
    fn classify(&self, text: &str) -> ParsedIntent {
        let parsed = self.classifier.classify(text);
        if !matches!(parsed.intent, Intent::Chat { .. }) {
            return parsed;
        }

        let Some(rest) = CONFIRM_PREFIX_REGEX
            .captures(text)
            .and_then(|caps| caps.get(1))
        else {
            return parsed;
        };

        let qualified = self.classifier.classify(rest.as_str());
        match qualified.intent {
            Intent::Chat { .. } | Intent::Unknown => parsed,
            _ => qualified,
        }
    }

    async fn execute(
        &self,
        task: Task,
        text: &str,
        ctx: &RequestContext,
    ) -> Result<ActionOutcome, String> {
        let label = task.label();

        match task {
            Task::CancelShutdown => {
                let reply = self
                    .capabilities
                    .system
                    .cancel_shutdown()
                    .await
                    .map_err(|e| e.to_string())?;
                self.respond(&label, "cancel the shutdown", reply, json!({}))
                    .await
            }
            Task::Await(action) => {
                tracing::warn!(
                    session = %ctx.session,
                    action = action.label(),
                    "Destructive action awaiting confirmation"
                );
                let outcome = ActionOutcome::needs_confirmation(&label, confirmation_prompt(&action));
                Ok(match action {
                    DestructiveAction::DeleteFile { path } => {
                        outcome.with_details(json!({ "action": "delete", "path": path }))
                    }
                    _ => outcome,
                })
            }
            Task::Execute(DestructiveAction::DeleteFile { path }) => {
                let reply = self
                    .capabilities
                    .files
                    .delete(&path, true)
                    .await
                    .map_err(|e| e.to_string())?;
                self.respond(
                    &label,
                    "delete files",
                    reply,
                    json!({ "action": "delete", "path": path }),
                )
                .await
            }
            Task::Execute(DestructiveAction::Shutdown) => {
                let reply = self
                    .capabilities
                    .system
                    .shutdown(true)
                    .await
                    .map_err(|e| e.to_string())?;
                self.respond(&label, system_description(SystemAction::Shutdown), reply, json!({}))
                    .await
            }
            Task::Execute(DestructiveAction::Restart) => {
                let reply = self
                    .capabilities
                    .system
                    .restart(true)
                    .await
                    .map_err(|e| e.to_string())?;
                self.respond(&label, system_description(SystemAction::Restart), reply, json!({}))
                    .await
            }
            Task::Run(intent) => self.run(&label, intent, text).await,
        }
    }

    async fn run(&self, label: &str, intent: Intent, text: &str) -> Result<ActionOutcome, String> {
        match intent {
            Intent::AppLaunch { app_name } => {
                let reply = self
                    .capabilities
                    .apps
                    .open(&app_name)
                    .await
                    .map_err(|e| e.to_string())?;
                let description = format!("open {}", app_name);
                self.respond(label, &description, reply, json!({ "appName": app_name }))
                    .await
            }
            Intent::Browser(action) => {
                let browser = &self.capabilities.browser;
                let (reply, description) = match &action {
                    BrowserAction::GoogleSearch { query } => (
                        browser.google_search(query).await,
                        format!("search Google for {}", query),
                    ),
                    BrowserAction::YoutubeSearch { query } => (
                        browser.youtube_search(query).await,
                        format!("search YouTube for {}", query),
                    ),
                    BrowserAction::OpenUrl { url } => {
                        (browser.open_url(url).await, format!("open {}", url))
                    }
                };
                let reply = reply.map_err(|e| e.to_string())?;
                let details = serde_json::to_value(&action).unwrap_or_else(|_| json!({}));
                self.respond(label, &description, reply, details).await
            }
            Intent::File(action) => {
                let files = &self.capabilities.files;
                let reply = match &action {
                    FileAction::Copy {
                        source,
                        destination,
                    } => files.copy(source, destination).await,
                    FileAction::Move {
                        source,
                        destination,
                    } => files.move_path(source, destination).await,
                    // Delete is always routed through the confirmation gate
                    FileAction::Delete { path } => files.delete(path, false).await,
                }
                .map_err(|e| e.to_string())?;
                let description = format!("{} files", action.name());
                let details = serde_json::to_value(&action).unwrap_or_else(|_| json!({}));
                self.respond(label, &description, reply, details).await
            }
            Intent::System { action } => {
                let system = &self.capabilities.system;
                let reply = match action {
                    SystemAction::VolumeUp => system.volume_up().await,
                    SystemAction::VolumeDown => system.volume_down().await,
                    SystemAction::Mute => system.mute().await,
                    SystemAction::Unmute => system.unmute().await,
                    SystemAction::Screenshot => system.screenshot().await,
                    SystemAction::Shutdown => system.shutdown(false).await,
                    SystemAction::Restart => system.restart(false).await,
                }
                .map_err(|e| e.to_string())?;
                self.respond(
                    label,
                    system_description(action),
                    reply,
                    json!({ "action": action.name() }),
                )
                .await
            }
            Intent::Typing { text } => self.run_typing(&text).await,
            Intent::Chat { message } => self.run_chat(&message).await,
            Intent::Unknown => {
                let prompt = format!(
                    "I don't know how to handle this command: '{}'. \
                     Can you help me understand what you'd like me to do?",
                    text
                );
                let reply = self.composer.reply(&prompt).await.map_err(|e| e.to_string())?;
                Ok(ActionOutcome::new(label, false, reply).with_error(UNKNOWN_COMMAND))
            }
        }
    }

    async fn run_typing(&self, text: &str) -> Result<ActionOutcome, String> {
        let reply = self
            .capabilities
            .typing
            .type_text(text)
            .await
            .map_err(|e| e.to_string())?;

        let spoken = if reply.success {
            TYPED_RESPONSE.to_string()
        } else {
            reply.message.clone()
        };
        let mut outcome = ActionOutcome::new("type_text", reply.success, spoken);
        if !reply.success {
            outcome = outcome.with_error(reply.message);
        }
        outcome.characters_typed = Some(text.chars().count());
        Ok(outcome)
    }

    async fn run_chat(&self, message: &str) -> Result<ActionOutcome, String> {
        let reply = self
            .composer
            .reply(message)
            .await
            .map_err(|e| e.to_string())?;
        let mut outcome = ActionOutcome::new("chat", true, reply);
        outcome.is_chat = true;
        Ok(outcome)
    }

    /// Success is phrased by the composer; failure is reported verbatim
    async fn respond(
        &self,
        label: &str,
        description: &str,
        reply: CapabilityReply,
        details: serde_json::Value,
    ) -> Result<ActionOutcome, String> {
        let details = with_message(details, &reply.message);

        if reply.success {
            let spoken = self
                .composer
                .phrase_success(description, &reply.message)
                .await
                .map_err(|e| e.to_string())?;
            Ok(ActionOutcome::new(label, true, spoken).with_details(details))
        } else {
            tracing::warn!(action = label, "Action failed: {}", reply.message);
            Ok(ActionOutcome::new(label, false, reply.message.clone())
                .with_error(reply.message)
                .with_details(details))
        }
    }

    /// Turn errors and panics from the wrapped future into an apologetic outcome
    async fn guarded<F>(&self, label: &str, work: F) -> ActionOutcome
    where
        F: std::future::Future<Output = Result<ActionOutcome, String>>,
    {
        match AssertUnwindSafe(work).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(error)) => {
                tracing::error!(action = label, "Command handling failed: {}", error);
                self.error_outcome(&error, label).await
            }
            Err(panic) => {
                let error = panic_message(panic.as_ref());
                tracing::error!(action = label, "Command handling panicked: {}", error);
                self.error_outcome(&error, label).await
            }
        }
    }

    async fn error_outcome(&self, error: &str, context: &str) -> ActionOutcome {
        let spoken = AssertUnwindSafe(self.composer.explain_error(error, context))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| TemplateComposer::error_explanation(error));

        ActionOutcome::new("error", false, spoken).with_error(error)
    }

    async fn log(
        &self,
        ctx: &RequestContext,
        text: &str,
        label: Option<&str>,
        outcome: &ActionOutcome,
    ) {
        let record = LogRecord {
            timestamp: Utc::now(),
            source: ctx.source,
            raw_text: text.to_string(),
            action_label: label.map(str::to_string),
            success: outcome.success,
            error_message: outcome.error_message.clone(),
            response_text: Some(outcome.spoken_response.clone()),
        };
        self.sink.record(record).await;
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("gate", &self.gate)
            .field("two_turn", &self.two_turn)
            .finish_non_exhaustive()
    }
}
