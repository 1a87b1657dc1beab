//! Conversation controller behind the support chat widget.
//!
//! Owns the display transcript, the role-tagged history sent to the
//! completion service, and the open/awaiting flags. Both lists only ever
//! grow. At most one completion request is in flight at a time.

use crate::config::CompletionSettings;
use crate::error::CompletionError;
use crate::events::{CompletionTurn, DisplayMessage, PanelState, Sender};
use crate::llm::{CompletionBackend, CompletionReply, CompletionRequest};
use crate::prompts::{APOLOGY, FALLBACK_REPLY, GREETING, SUGGESTION_LIMIT, SYSTEM_PROMPT};
use tracing::Instrument;
use uuid::Uuid;

/// How a submission was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The service answered with content
    Answered,
    /// The service answered without content; the fallback reply was recorded
    Degraded,
    /// The request failed; only the apology was shown
    Failed,
}

/// A submission whose request has been prepared but not yet settled.
///
/// Produced by [`ConversationController::begin_submit`] and consumed by
/// [`ConversationController::resolve`].
#[derive(Debug)]
#[must_use = "a pending exchange must be resolved to release the awaiting state"]
pub struct PendingExchange {
    request: CompletionRequest,
}

impl PendingExchange {
    /// Request carrying the full history plus the new user turn
    pub fn request(&self) -> &CompletionRequest {
        &self.request
    }
}

pub struct ConversationController<B> {
    backend: B,
    settings: CompletionSettings,
    session_id: Uuid,
    is_panel_open: bool,
    display_messages: Vec<DisplayMessage>,
    completion_turns: Vec<CompletionTurn>,
    pending_input: String,
    is_awaiting_response: bool,
}

impl<B: CompletionBackend> ConversationController<B> {
    pub fn new(backend: B, settings: CompletionSettings) -> Self {
        Self {
            backend,
            settings,
            session_id: Uuid::new_v4(),
            is_panel_open: false,
            display_messages: vec![DisplayMessage::new(1, GREETING, Sender::Bot)],
            completion_turns: vec![
                CompletionTurn::system(SYSTEM_PROMPT),
                CompletionTurn::assistant(GREETING),
            ],
            pending_input: String::new(),
            is_awaiting_response: false,
        }
    }

    /// Submit a message and settle it against the backend.
    ///
    /// Returns `None` when the submission was ignored (blank text, or a
    /// request already in flight).
    pub async fn submit(&mut self, text: &str) -> Option<ExchangeOutcome> {
        let pending = self.begin_submit(text)?;
        let span = tracing::info_span!("exchange", session = %self.session_id);
        let outcome = self
            .backend
            .complete(pending.request())
            .instrument(span)
            .await;
        Some(self.resolve(pending, outcome))
    }

    /// Submit one of the suggested quick questions.
    pub async fn submit_suggested(&mut self, question: &str) -> Option<ExchangeOutcome> {
        self.submit(question).await
    }

    /// Record the user's message and prepare the request for it.
    ///
    /// The returned request is built from a locally extended history; the
    /// stored history is only replaced once the exchange succeeds.
    pub fn begin_submit(&mut self, text: &str) -> Option<PendingExchange> {
        if text.trim().is_empty() {
            tracing::debug!(session = %self.session_id, "ignoring blank submission");
            return None;
        }
        if self.is_awaiting_response {
            tracing::debug!(session = %self.session_id, "ignoring submission while awaiting a reply");
            return None;
        }

        self.push_display(text, Sender::User);
        self.pending_input.clear();
        self.is_awaiting_response = true;

        let mut history = self.completion_turns.clone();
        history.push(CompletionTurn::user(text));

        tracing::debug!(
            session = %self.session_id,
            turns = history.len(),
            "issuing completion request"
        );

        Some(PendingExchange {
            request: CompletionRequest::new(history, &self.settings),
        })
    }

    /// Apply the result of a pending exchange.
    ///
    /// Runs for every outcome and always clears the awaiting flag.
    pub fn resolve(
        &mut self,
        pending: PendingExchange,
        outcome: Result<CompletionReply, CompletionError>,
    ) -> ExchangeOutcome {
        let settled = match outcome {
            Ok(reply) => {
                let (text, settled) = match reply.content.filter(|c| !c.is_empty()) {
                    Some(text) => (text, ExchangeOutcome::Answered),
                    None => {
                        tracing::warn!(session = %self.session_id, "completion had no content; using fallback reply");
                        (FALLBACK_REPLY.to_string(), ExchangeOutcome::Degraded)
                    }
                };

                let mut history = pending.request.messages;
                history.push(CompletionTurn::assistant(text.clone()));
                self.completion_turns = history;
                self.push_display(text, Sender::Bot);
                settled
            }
            Err(err) => {
                tracing::error!(session = %self.session_id, error = %err, "completion request failed");
                self.push_display(APOLOGY, Sender::Bot);
                ExchangeOutcome::Failed
            }
        };

        self.is_awaiting_response = false;
        settled
    }

    pub fn toggle_panel(&mut self) {
        self.is_panel_open = !self.is_panel_open;
    }

    pub fn close_panel(&mut self) {
        self.is_panel_open = false;
    }

    pub fn panel_state(&self) -> PanelState {
        match (self.is_panel_open, self.is_awaiting_response) {
            (false, _) => PanelState::Closed,
            (true, false) => PanelState::Idle,
            (true, true) => PanelState::Awaiting,
        }
    }

    /// Whether the quick-question affordance is offered
    pub fn shows_suggestions(&self) -> bool {
        self.display_messages.len() < SUGGESTION_LIMIT
    }

    pub fn is_panel_open(&self) -> bool {
        self.is_panel_open
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.is_awaiting_response
    }

    pub fn display_messages(&self) -> &[DisplayMessage] {
        &self.display_messages
    }

    #[cfg(test)]
    pub fn completion_turns(&self) -> &[CompletionTurn] {
        &self.completion_turns
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn pending_input_mut(&mut self) -> &mut String {
        &mut self.pending_input
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    fn push_display(&mut self, text: impl Into<String>, sender: Sender) {
        let id = self.display_messages.len() as u64 + 1;
        self.display_messages.push(DisplayMessage::new(id, text, sender));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Role;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend that answers from a queue and records what it was sent
    #[derive(Default)]
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<CompletionReply, CompletionError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedBackend {
        fn with(replies: Vec<Result<CompletionReply, CompletionError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_request(&self) -> CompletionRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionReply, CompletionError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CompletionError::Network("script exhausted".to_string())))
        }
    }

    fn controller(
        replies: Vec<Result<CompletionReply, CompletionError>>,
    ) -> ConversationController<ScriptedBackend> {
        ConversationController::new(ScriptedBackend::with(replies), CompletionSettings::default())
    }

    #[test]
    fn starts_with_greeting_and_seed_turns() {
        let chat = controller(vec![]);

        assert_eq!(chat.display_messages().len(), 1);
        let greeting = &chat.display_messages()[0];
        assert_eq!(greeting.id, 1);
        assert_eq!(greeting.text, "Hi there! How can I help you today?");
        assert_eq!(greeting.sender, Sender::Bot);

        let turns = chat.completion_turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::System);
        assert_eq!(turns[1], CompletionTurn::assistant(GREETING));

        assert_eq!(chat.panel_state(), PanelState::Closed);
        assert!(!chat.is_awaiting_response());
    }

    #[tokio::test]
    async fn successful_exchange_appends_to_both_lists() {
        let mut chat = controller(vec![Ok(CompletionReply::text(
            "You can start by uploading your license.",
        ))]);

        let outcome = chat.submit("How do I sell my license?").await;

        assert_eq!(outcome, Some(ExchangeOutcome::Answered));
        let messages = chat.display_messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].id, 2);
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(messages[1].text, "How do I sell my license?");
        assert_eq!(messages[2].id, 3);
        assert_eq!(messages[2].sender, Sender::Bot);
        assert_eq!(messages[2].text, "You can start by uploading your license.");

        let turns = chat.completion_turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[2], CompletionTurn::user("How do I sell my license?"));
        assert_eq!(turns[3], CompletionTurn::assistant("You can start by uploading your license."));
        assert!(!chat.is_awaiting_response());
    }

    #[tokio::test]
    async fn request_includes_new_user_turn_and_fixed_parameters() {
        let mut chat = controller(vec![Ok(CompletionReply::text("Sure."))]);
        chat.submit("What types of licenses do you accept?").await;

        let request = chat.backend().last_request();
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[2], CompletionTurn::user("What types of licenses do you accept?"));
        assert_eq!(request.model, "llama-3.3-70b-versatile");
        assert_eq!(request.max_tokens, 150);
    }

    #[tokio::test]
    async fn transport_failure_shows_apology_and_keeps_history_clean() {
        let mut chat = controller(vec![Err(CompletionError::Status {
            status: 503,
            body: "unavailable".to_string(),
        })]);

        let outcome = chat.submit("How do I sell my license?").await;

        assert_eq!(outcome, Some(ExchangeOutcome::Failed));
        let messages = chat.display_messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].text, APOLOGY);
        assert_eq!(messages[2].sender, Sender::Bot);
        assert_eq!(chat.completion_turns().len(), 2);
        assert!(!chat.is_awaiting_response());
    }

    #[tokio::test]
    async fn blank_submission_is_ignored() {
        let mut chat = controller(vec![Ok(CompletionReply::text("unused"))]);
        chat.pending_input_mut().push_str("   ");

        assert_eq!(chat.submit("   ").await, None);
        assert_eq!(chat.submit("").await, None);
        assert_eq!(chat.submit("\n\t").await, None);

        assert_eq!(chat.display_messages().len(), 1);
        assert_eq!(chat.completion_turns().len(), 2);
        assert!(!chat.is_awaiting_response());
        assert_eq!(chat.backend().calls(), 0);
        assert_eq!(chat.pending_input(), "   ");
    }

    #[tokio::test]
    async fn empty_content_records_fallback_as_success() {
        let mut chat = controller(vec![
            Ok(CompletionReply::empty()),
            Ok(CompletionReply::text("")),
        ]);

        assert_eq!(chat.submit("How long does the process take?").await, Some(ExchangeOutcome::Degraded));
        assert_eq!(chat.display_messages()[2].text, FALLBACK_REPLY);
        assert_eq!(chat.completion_turns().len(), 4);
        assert_eq!(chat.completion_turns()[3], CompletionTurn::assistant(FALLBACK_REPLY));

        assert_eq!(chat.submit("Hello?").await, Some(ExchangeOutcome::Degraded));
        assert_eq!(chat.completion_turns().len(), 6);
    }

    #[tokio::test]
    async fn identifiers_track_positions_across_mixed_outcomes() {
        let mut chat = controller(vec![
            Ok(CompletionReply::text("one")),
            Err(CompletionError::Network("connection reset".to_string())),
            Ok(CompletionReply::text("three")),
        ]);

        for text in ["first", "second", "third"] {
            let before: Vec<_> = chat.display_messages().to_vec();
            chat.submit(text).await;
            assert_eq!(chat.display_messages().len(), before.len() + 2);
            assert_eq!(&chat.display_messages()[..before.len()], before.as_slice());
        }

        for (index, message) in chat.display_messages().iter().enumerate() {
            assert_eq!(message.id, index as u64 + 1);
        }
        // the failed exchange never reached the prompt history
        assert_eq!(chat.completion_turns().len(), 6);
        let last = chat.backend().last_request();
        assert!(last.messages.iter().all(|t| t.content != "second"));
        assert!(last.messages.iter().all(|t| t.content != APOLOGY));
    }

    #[test]
    fn awaiting_flag_spans_the_exchange() {
        let mut chat = controller(vec![]);
        chat.toggle_panel();

        let pending = chat.begin_submit("How do I get paid?").unwrap();
        assert!(chat.is_awaiting_response());
        assert_eq!(chat.panel_state(), PanelState::Awaiting);
        assert_eq!(chat.display_messages().len(), 2);
        assert_eq!(chat.completion_turns().len(), 2);

        chat.resolve(pending, Err(CompletionError::Interrupted));
        assert!(!chat.is_awaiting_response());
        assert_eq!(chat.panel_state(), PanelState::Idle);
    }

    #[test]
    fn second_submission_is_refused_while_awaiting() {
        let mut chat = controller(vec![]);
        let pending = chat.begin_submit("first").unwrap();

        chat.pending_input_mut().push_str("second");
        assert!(chat.begin_submit("second").is_none());
        assert_eq!(chat.display_messages().len(), 2);
        assert_eq!(chat.pending_input(), "second");

        chat.resolve(pending, Ok(CompletionReply::text("reply")));
        assert!(chat.begin_submit("second").is_some());
    }

    #[test]
    fn submission_clears_pending_input() {
        let mut chat = controller(vec![]);
        chat.pending_input_mut().push_str("How do I get paid?");

        let text = chat.pending_input().to_string();
        let pending = chat.begin_submit(&text).unwrap();
        assert_eq!(chat.pending_input(), "");
        chat.resolve(pending, Ok(CompletionReply::text("By bank transfer.")));
    }

    #[test]
    fn closing_mid_request_still_applies_the_reply() {
        let mut chat = controller(vec![]);
        chat.toggle_panel();
        let pending = chat.begin_submit("How do I sell my license?").unwrap();

        chat.toggle_panel();
        assert_eq!(chat.panel_state(), PanelState::Closed);
        assert!(chat.is_awaiting_response());

        chat.resolve(pending, Ok(CompletionReply::text("Upload it.")));
        assert_eq!(chat.display_messages().len(), 3);

        chat.toggle_panel();
        assert_eq!(chat.panel_state(), PanelState::Idle);
        assert_eq!(chat.display_messages()[2].text, "Upload it.");
    }

    #[test]
    fn toggle_preserves_history() {
        let mut chat = controller(vec![]);
        let pending = chat.begin_submit("hi").unwrap();
        chat.resolve(pending, Ok(CompletionReply::text("hello")));

        chat.toggle_panel();
        assert!(chat.is_panel_open());
        chat.toggle_panel();
        assert!(!chat.is_panel_open());
        assert_eq!(chat.display_messages().len(), 3);
        assert_eq!(chat.completion_turns().len(), 4);
    }

    #[tokio::test]
    async fn suggestions_withdrawn_after_first_exchange() {
        let mut chat = controller(vec![Ok(CompletionReply::text("Within 24 hours."))]);
        assert!(chat.shows_suggestions());

        let pending = chat.begin_submit("How long does the process take?").unwrap();
        // user message shown, reply pending: two entries
        assert!(chat.shows_suggestions());
        chat.resolve(pending, Ok(CompletionReply::text("Within 24 hours.")));
        assert!(!chat.shows_suggestions());

        let mut fresh = controller(vec![Ok(CompletionReply::text("Within 24 hours."))]);
        assert_eq!(
            fresh.submit_suggested("How long does the process take?").await,
            Some(ExchangeOutcome::Answered)
        );
        assert_eq!(fresh.display_messages().len(), 3);
        assert!(!fresh.shows_suggestions());
    }
}
