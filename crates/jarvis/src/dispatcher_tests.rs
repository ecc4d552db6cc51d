//! Tests for the command dispatcher

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;

    use crate::{
        capabilities::{
            AppLauncher, BrowserControl, Capabilities, CapabilityError, CapabilityReply,
            CapabilityResult, FileManager, SystemControl, TypingController,
        },
        classifier::IntentClassifier,
        composer::{ComposerError, ResponseComposer, TemplateComposer},
        dispatcher::{CommandDispatcher, RequestContext, NO_COMMAND},
        gate::{ConfirmationGate, DestructiveAction},
        history::{MemoryLogSink, Source},
    };

    const FIRST_SUCCESS_PHRASE: &str = "Done! Got it handled for you, buddy. 🙂";

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Behaviour {
        Succeed,
        Fail,
        Error,
        Panic,
    }

    /// Records every capability call and answers according to its behaviour
    struct FakeProvider {
        calls: Mutex<Vec<String>>,
        behaviour: Behaviour,
    }

    impl FakeProvider {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                behaviour,
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn reply(&self, call: String) -> CapabilityResult {
            self.calls.lock().unwrap().push(call.clone());
            match self.behaviour {
                Behaviour::Succeed => Ok(CapabilityReply::ok(format!("did {}", call))),
                Behaviour::Fail => Ok(CapabilityReply::failed(format!("could not {}", call))),
                Behaviour::Error => Err(CapabilityError::Other("provider exploded".to_string())),
                Behaviour::Panic => panic!("provider panicked"),
            }
        }
    }

    #[async_trait]
    impl AppLauncher for FakeProvider {
        async fn open(&self, name: &str) -> CapabilityResult {
            self.reply(format!("open:{}", name))
        }
    }

    #[async_trait]
    impl BrowserControl for FakeProvider {
        async fn open_url(&self, url: &str) -> CapabilityResult {
            self.reply(format!("url:{}", url))
        }

        async fn google_search(&self, query: &str) -> CapabilityResult {
            self.reply(format!("google:{}", query))
        }

        async fn youtube_search(&self, query: &str) -> CapabilityResult {
            self.reply(format!("youtube:{}", query))
        }
    }

    #[async_trait]
    impl FileManager for FakeProvider {
        async fn copy(&self, source: &str, destination: &str) -> CapabilityResult {
            self.reply(format!("copy:{}:{}", source, destination))
        }

        async fn move_path(&self, source: &str, destination: &str) -> CapabilityResult {
            self.reply(format!("move:{}:{}", source, destination))
        }

        async fn delete(&self, path: &str, confirm: bool) -> CapabilityResult {
            self.reply(format!("delete:{}:{}", path, confirm))
        }
    }

    #[async_trait]
    impl SystemControl for FakeProvider {
        async fn volume_up(&self) -> CapabilityResult {
            self.reply("volume_up".to_string())
        }

        async fn volume_down(&self) -> CapabilityResult {
            self.reply("volume_down".to_string())
        }

        async fn mute(&self) -> CapabilityResult {
            self.reply("mute".to_string())
        }

        async fn unmute(&self) -> CapabilityResult {
            self.reply("unmute".to_string())
        }

        async fn screenshot(&self) -> CapabilityResult {
            self.reply("screenshot".to_string())
        }

        async fn shutdown(&self, confirm: bool) -> CapabilityResult {
            self.reply(format!("shutdown:{}", confirm))
        }

        async fn restart(&self, confirm: bool) -> CapabilityResult {
            self.reply(format!("restart:{}", confirm))
        }

        async fn cancel_shutdown(&self) -> CapabilityResult {
            self.reply("cancel_shutdown".to_string())
        }
    }

    #[async_trait]
    impl TypingController for FakeProvider {
        async fn type_text(&self, text: &str) -> CapabilityResult {
            self.reply(format!("type:{}", text))
        }
    }

    /// Composer whose phrasing always fails
    struct BrokenComposer;

    #[async_trait]
    impl ResponseComposer for BrokenComposer {
        async fn phrase_success(&self, _action: &str, _details: &str) -> Result<String, ComposerError> {
            Err(ComposerError::RequestFailed("composer offline".to_string()))
        }

        async fn explain_error(&self, error: &str, _context: &str) -> String {
            format!("explained: {}", error)
        }

        async fn reply(&self, _message: &str) -> Result<String, ComposerError> {
            Err(ComposerError::RequestFailed("composer offline".to_string()))
        }
    }

    struct Harness {
        dispatcher: CommandDispatcher,
        provider: Arc<FakeProvider>,
        history: Arc<MemoryLogSink>,
    }

    fn harness_with(
        behaviour: Behaviour,
        composer: Arc<dyn ResponseComposer>,
        gate: ConfirmationGate,
    ) -> Harness {
        let provider = FakeProvider::new(behaviour);
        let history = Arc::new(MemoryLogSink::new(50));
        let dispatcher = CommandDispatcher::new(
            IntentClassifier::new(),
            Capabilities::uniform(provider.clone()),
            composer,
            history.clone(),
            gate,
        );
        Harness {
            dispatcher,
            provider,
            history,
        }
    }

    fn harness(behaviour: Behaviour) -> Harness {
        harness_with(
            behaviour,
            Arc::new(TemplateComposer::new()),
            ConfirmationGate::default(),
        )
    }

    #[tokio::test]
    async fn test_app_launch_is_phrased_by_composer() {
        let h = harness(Behaviour::Succeed);

        let outcome = h.dispatcher.handle("open chrome", Source::Voice).await;

        assert!(outcome.success);
        assert_eq!(outcome.action_label, "app_launch");
        assert_eq!(outcome.spoken_response, FIRST_SUCCESS_PHRASE);
        assert_eq!(outcome.details.unwrap()["message"], "did open:chrome");
        assert_eq!(h.provider.calls(), vec!["open:chrome"]);
        assert_eq!(h.history.len().await, 1);
    }

    #[tokio::test]
    async fn test_google_search_routes_query() {
        let h = harness(Behaviour::Succeed);

        let outcome = h
            .dispatcher
            .handle("search google for python tutorials", Source::Api)
            .await;

        assert_eq!(outcome.action_label, "browser_google_search");
        assert_eq!(h.provider.calls(), vec!["google:python tutorials"]);
    }

    #[tokio::test]
    async fn test_unconfirmed_delete_is_withheld() {
        let h = harness(Behaviour::Succeed);

        let outcome = h
            .dispatcher
            .handle("delete file at C:/temp.txt", Source::Phone)
            .await;

        assert!(!outcome.success);
        assert!(outcome.requires_confirmation);
        assert_eq!(outcome.action_label, "file_delete");
        assert_eq!(
            outcome.spoken_response,
            "Delete operation requires confirmation. Say 'confirm delete' to proceed. 🛡️"
        );
        assert!(h.provider.calls().is_empty());

        let pending = h.dispatcher.pending("phone").await.expect("pending delete");
        assert_eq!(
            pending.action,
            DestructiveAction::DeleteFile {
                path: "C:/temp.txt".to_string()
            }
        );
        assert_eq!(h.history.len().await, 1);
    }

    #[tokio::test]
    async fn test_same_utterance_confirmation_deletes() {
        let h = harness(Behaviour::Succeed);

        let outcome = h
            .dispatcher
            .handle("delete file at C:/temp.txt confirm", Source::Phone)
            .await;

        assert!(outcome.success);
        assert!(!outcome.requires_confirmation);
        assert_eq!(h.provider.calls(), vec!["delete:C:/temp.txt:true"]);
    }

    #[tokio::test]
    async fn test_confirm_inside_a_path_does_not_confirm() {
        let h = harness(Behaviour::Succeed);

        let outcome = h
            .dispatcher
            .handle("delete /tmp/confirmation.txt", Source::Phone)
            .await;

        assert!(outcome.requires_confirmation);
        assert!(h.provider.calls().is_empty());
        let pending = h.dispatcher.pending("phone").await.expect("pending delete");
        assert_eq!(
            pending.action,
            DestructiveAction::DeleteFile {
                path: "/tmp/confirmation.txt".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_leading_confirm_qualifies_command() {
        let h = harness(Behaviour::Succeed);

        h.dispatcher
            .handle("confirm delete notes.txt", Source::Voice)
            .await;

        assert_eq!(h.provider.calls(), vec!["delete:notes.txt:true"]);
    }

    #[tokio::test]
    async fn test_two_turn_confirmation_executes_pending() {
        let h = harness(Behaviour::Succeed);

        h.dispatcher
            .handle("delete file at C:/temp.txt", Source::Phone)
            .await;
        let outcome = h.dispatcher.handle("confirm delete", Source::Phone).await;

        assert!(outcome.success);
        assert_eq!(outcome.action_label, "file_delete");
        assert_eq!(h.provider.calls(), vec!["delete:C:/temp.txt:true"]);
        assert!(h.dispatcher.pending("phone").await.is_none());
        assert_eq!(h.history.len().await, 2);
    }

    #[tokio::test]
    async fn test_confirmation_is_per_session() {
        let h = harness(Behaviour::Succeed);

        h.dispatcher
            .handle("delete file at C:/temp.txt", Source::Phone)
            .await;
        let outcome = h.dispatcher.handle("confirm", Source::Voice).await;

        assert_eq!(outcome.action_label, "chat");
        assert!(h.provider.calls().is_empty());
        assert!(h.dispatcher.pending("phone").await.is_some());
    }

    #[tokio::test]
    async fn test_explicit_sessions_share_nothing() {
        let h = harness(Behaviour::Succeed);
        let alice = RequestContext::new(Source::Api).with_session("alice");
        let bob = RequestContext::new(Source::Api).with_session("bob");

        h.dispatcher.handle_in("shutdown", &alice).await;
        h.dispatcher.handle_in("confirm", &bob).await;
        assert!(h.provider.calls().is_empty());

        h.dispatcher.handle_in("confirm", &alice).await;
        assert_eq!(h.provider.calls(), vec!["shutdown:true"]);
    }

    #[tokio::test]
    async fn test_same_utterance_only_context_never_defers() {
        let h = harness(Behaviour::Succeed);
        let anonymous = RequestContext::new(Source::Phone).same_utterance_only();

        let outcome = h.dispatcher.handle_in("shutdown", &anonymous).await;
        assert!(outcome.requires_confirmation);
        assert!(h.dispatcher.pending("phone").await.is_none());

        h.dispatcher.handle_in("confirm", &anonymous).await;
        assert!(h.provider.calls().is_empty());

        h.dispatcher.handle_in("shutdown confirm", &anonymous).await;
        assert_eq!(h.provider.calls(), vec!["shutdown:true"]);
    }

    #[tokio::test]
    async fn test_confirmation_must_match_pending_action() {
        let h = harness(Behaviour::Succeed);

        h.dispatcher
            .handle("delete file at notes.txt", Source::Voice)
            .await;
        h.dispatcher.handle("confirm restart", Source::Voice).await;

        // Restart was confirmed in the same utterance; the delete stays pending
        assert_eq!(h.provider.calls(), vec!["restart:true"]);
        assert!(h.dispatcher.pending("voice").await.is_some());
    }

    #[tokio::test]
    async fn test_two_turn_can_be_disabled() {
        let provider = FakeProvider::new(Behaviour::Succeed);
        let dispatcher = CommandDispatcher::new(
            IntentClassifier::new(),
            Capabilities::uniform(provider.clone()),
            Arc::new(TemplateComposer::new()),
            Arc::new(MemoryLogSink::default()),
            ConfirmationGate::default(),
        )
        .with_two_turn(false);

        dispatcher
            .handle("delete file at C:/temp.txt", Source::Phone)
            .await;
        let outcome = dispatcher.handle("confirm", Source::Phone).await;

        assert_eq!(outcome.action_label, "chat");
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_expired_pending_is_ignored() {
        let h = harness_with(
            Behaviour::Succeed,
            Arc::new(TemplateComposer::new()),
            ConfirmationGate::new(Duration::from_millis(10)),
        );

        h.dispatcher.handle("restart", Source::Voice).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        h.dispatcher.handle("confirm", Source::Voice).await;

        assert!(h.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_requires_confirmation() {
        let h = harness(Behaviour::Succeed);

        let outcome = h.dispatcher.handle("shut down the computer", Source::Voice).await;

        assert!(outcome.requires_confirmation);
        assert_eq!(outcome.action_label, "system_shutdown");
        assert_eq!(
            outcome.spoken_response,
            "Shutdown requires confirmation. Say 'confirm shutdown' to proceed. ⚠️"
        );
        assert!(h.provider.calls().is_empty());

        let outcome = h.dispatcher.handle("restart now", Source::Voice).await;
        assert_eq!(
            outcome.spoken_response,
            "Restart requires confirmation. Say 'confirm restart' to proceed. ⚠️"
        );
    }

    #[tokio::test]
    async fn test_confirmed_shutdown_calls_capability() {
        let h = harness(Behaviour::Succeed);

        let outcome = h.dispatcher.handle("confirm shutdown", Source::Voice).await;

        assert!(outcome.success);
        assert_eq!(h.provider.calls(), vec!["shutdown:true"]);
    }

    #[tokio::test]
    async fn test_cancel_override_beats_classification() {
        let h = harness(Behaviour::Succeed);

        let outcome = h
            .dispatcher
            .handle("type cancel shutdown please", Source::Voice)
            .await;

        assert_eq!(outcome.action_label, "system_cancel_shutdown");
        assert_eq!(h.provider.calls(), vec!["cancel_shutdown"]);
    }

    #[tokio::test]
    async fn test_cancel_clears_pending_shutdown() {
        let h = harness(Behaviour::Succeed);

        h.dispatcher.handle("shutdown", Source::Voice).await;
        assert!(h.dispatcher.pending("voice").await.is_some());

        h.dispatcher.handle("cancel shutdown", Source::Voice).await;
        assert!(h.dispatcher.pending("voice").await.is_none());

        h.dispatcher.handle("confirm", Source::Voice).await;
        assert_eq!(h.provider.calls(), vec!["cancel_shutdown"]);
    }

    #[tokio::test]
    async fn test_typing_beats_app_launch() {
        let h = harness(Behaviour::Succeed);

        let outcome = h.dispatcher.handle("type open chrome", Source::Phone).await;

        assert!(outcome.success);
        assert_eq!(outcome.action_label, "type_text");
        assert_eq!(outcome.spoken_response, "Typed that for you! ⌨️");
        assert_eq!(outcome.characters_typed, Some(11));
        assert_eq!(h.provider.calls(), vec!["type:open chrome"]);
    }

    #[tokio::test]
    async fn test_capability_failure_is_reported_verbatim() {
        let h = harness(Behaviour::Fail);

        let outcome = h.dispatcher.handle("open chrome", Source::Voice).await;

        assert!(!outcome.success);
        assert_eq!(outcome.spoken_response, "could not open:chrome");
        assert_eq!(outcome.error_message.as_deref(), Some("could not open:chrome"));
    }

    #[tokio::test]
    async fn test_capability_error_is_explained_and_logged_once() {
        let h = harness(Behaviour::Error);

        let outcome = h.dispatcher.handle("volume up", Source::Voice).await;

        assert!(!outcome.success);
        assert_eq!(outcome.action_label, "error");
        assert_eq!(
            outcome.spoken_response,
            "Hmm, I hit a snag: provider exploded. Want to try again? 😅"
        );

        let records = h.history.recent(10).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action_label.as_deref(), Some("system_volume_up"));
        assert_eq!(records[0].error_message.as_deref(), Some("provider exploded"));
    }

    #[tokio::test]
    async fn test_capability_panic_is_contained_and_logged_once() {
        let h = harness(Behaviour::Panic);

        let outcome = h.dispatcher.handle("take a screenshot", Source::Api).await;

        assert!(!outcome.success);
        assert_eq!(outcome.error_message.as_deref(), Some("provider panicked"));
        assert_eq!(h.history.len().await, 1);
        assert!(!h.history.recent(1).await[0].success);
    }

    #[tokio::test]
    async fn test_composer_failure_on_success_path() {
        let h = harness_with(
            Behaviour::Succeed,
            Arc::new(BrokenComposer),
            ConfirmationGate::default(),
        );

        let outcome = h.dispatcher.handle("open chrome", Source::Voice).await;

        assert!(!outcome.success);
        assert_eq!(outcome.spoken_response, "explained: Request failed: composer offline");
        assert_eq!(h.provider.calls(), vec!["open:chrome"]);
        assert_eq!(h.history.len().await, 1);
    }

    #[tokio::test]
    async fn test_blank_input_skips_classification() {
        let h = harness(Behaviour::Succeed);

        let outcome = h.dispatcher.handle("   ", Source::Phone).await;

        assert!(!outcome.success);
        assert_eq!(outcome.action_label, "error");
        assert_eq!(outcome.error_message.as_deref(), Some(NO_COMMAND));
        assert!(h.provider.calls().is_empty());
        assert_eq!(h.history.len().await, 1);
    }

    #[tokio::test]
    async fn test_chat_goes_to_composer() {
        let h = harness(Behaviour::Succeed);

        let outcome = h.dispatcher.handle("how are you today", Source::Voice).await;

        assert!(outcome.success);
        assert!(outcome.is_chat);
        assert_eq!(outcome.action_label, "chat");
        assert!(h.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_direct_type_and_ask_are_logged() {
        let h = harness(Behaviour::Succeed);

        let typed = h.dispatcher.type_text("Hello, World", Source::Phone).await;
        let asked = h.dispatcher.ask("tell me a joke", Source::Phone).await;
        let empty = h.dispatcher.type_text("", Source::Phone).await;

        assert_eq!(typed.characters_typed, Some(12));
        assert!(asked.is_chat);
        assert!(!empty.success);
        assert_eq!(h.provider.calls(), vec!["type:Hello, World"]);

        let stats = h.history.stats().await;
        assert_eq!(stats.total_commands, 3);
        assert_eq!(stats.by_action.get("type_text"), Some(&2));
    }

    #[tokio::test]
    async fn test_every_request_logs_exactly_once() {
        let h = harness(Behaviour::Succeed);
        let inputs = [
            "open chrome",
            "delete notes.txt",
            "confirm",
            "what's up",
            "",
            "mute",
            "copy a.txt to b.txt",
        ];

        for input in inputs {
            h.dispatcher.handle(input, Source::Voice).await;
        }

        assert_eq!(h.history.len().await, inputs.len());
    }
}
