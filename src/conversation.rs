//! Conversation controller
//!
//! Owns the view state, the message log, the input field and the typing
//! indicator. Every mutation goes through the operations on [`Controller`];
//! network calls run on spawned tasks and report back through [`Notice`]s that
//! the main loop feeds into [`Controller::apply_reply`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use crate::grammar::{GrammarService, RequestFailure};

pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process your request. Please try again.";

/// Delay between entering the chat view and focusing the input.
pub const INPUT_FOCUS_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Landing,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
}

/// A single entry in the conversation log
#[derive(Debug, Clone)]
pub struct Message {
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Local>,
}

impl Message {
    pub fn new(content: impl Into<String>, sender: Sender) -> Self {
        Self {
            content: content.into(),
            sender,
            timestamp: Local::now(),
        }
    }
}

/// View plus append-only message log.
#[derive(Debug)]
pub struct ConversationState {
    current_view: View,
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            current_view: View::Landing,
            messages: Vec::new(),
        }
    }

    pub fn current_view(&self) -> View {
        self.current_view
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TypingIndicator {
    visible: bool,
}

impl TypingIndicator {
    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text input with a character cursor.
#[derive(Debug, Default, Clone)]
pub struct InputField {
    text: String,
    cursor: usize,
}

impl InputField {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

/// Outcome of one grammar request
#[derive(Debug)]
pub struct Reply {
    pub id: RequestId,
    pub outcome: Result<String, RequestFailure>,
}

/// Work delivered back to the main loop from spawned tasks
#[derive(Debug)]
pub enum Notice {
    Reply(Reply),
    FocusInput,
}

pub struct Controller {
    state: ConversationState,
    input: InputField,
    typing: TypingIndicator,
    in_flight: usize,
    next_id: u64,
    service: Arc<dyn GrammarService>,
    notices: UnboundedSender<Notice>,
}

impl Controller {
    pub fn new(service: Arc<dyn GrammarService>, notices: UnboundedSender<Notice>) -> Self {
        Self {
            state: ConversationState::new(),
            input: InputField::default(),
            typing: TypingIndicator::default(),
            in_flight: 0,
            next_id: 1,
            service,
            notices,
        }
    }

    pub fn current_view(&self) -> View {
        self.state.current_view()
    }

    pub fn messages(&self) -> &[Message] {
        self.state.messages()
    }

    pub fn input(&self) -> &InputField {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputField {
        &mut self.input
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_visible()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn navigate_to_chat(&mut self) {
        self.state.current_view = View::Chat;

        let notices = self.notices.clone();
        tokio::spawn(async move {
            tokio::time::sleep(INPUT_FOCUS_DELAY).await;
            let _ = notices.send(Notice::FocusInput);
        });
    }

    pub fn navigate_to_landing(&mut self) {
        self.state.current_view = View::Landing;
    }

    pub fn show_typing_indicator(&mut self) {
        self.typing.show();
    }

    pub fn hide_typing_indicator(&mut self) {
        self.typing.hide();
    }

    /// Submit whatever is currently in the input field.
    pub fn submit_input(&mut self) -> Option<RequestId> {
        let raw = self.input.text().to_string();
        self.submit_message(&raw)
    }

    /// Append the user's message and start one request for it.
    ///
    /// Whitespace-only text is ignored and leaves the input untouched.
    pub fn submit_message(&mut self, raw: &str) -> Option<RequestId> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }

        self.state.push(Message::new(text, Sender::User));
        self.input.clear();
        self.show_typing_indicator();
        self.in_flight += 1;

        let id = RequestId(self.next_id);
        self.next_id += 1;
        debug!(id = id.0, chars = text.chars().count(), in_flight = self.in_flight, "submitting message");
        trace!(id = id.0, text, "submission text");

        let service = Arc::clone(&self.service);
        let notices = self.notices.clone();
        let text = text.to_string();
        tokio::spawn(async move {
            let outcome = service.correct(&text).await;
            let _ = notices.send(Notice::Reply(Reply { id, outcome }));
        });

        Some(id)
    }

    /// Record the outcome of a request in the log.
    pub fn apply_reply(&mut self, reply: Reply) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            self.hide_typing_indicator();
        }

        let content = match reply.outcome {
            Ok(result) => {
                debug!(id = reply.id.0, chars = result.chars().count(), "reply received");
                result
            }
            Err(err) => {
                debug!(id = reply.id.0, error = %err, "request failed, using fallback reply");
                FALLBACK_REPLY.to_string()
            }
        };

        self.state.push(Message::new(content, Sender::Ai));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::sync::oneshot;

    /// Answers calls in order from a script and records what it was asked.
    #[derive(Default)]
    struct ScriptedService {
        replies: Mutex<VecDeque<Result<String, RequestFailure>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedService {
        fn with(replies: Vec<Result<String, RequestFailure>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GrammarService for ScriptedService {
        async fn correct(&self, text: &str) -> Result<String, RequestFailure> {
            self.calls.lock().unwrap().push(text.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RequestFailure::Malformed("script exhausted".into())))
        }
    }

    /// Holds each call until the test releases it, so completion order is controllable.
    struct GatedService {
        gates: Mutex<HashMap<String, oneshot::Receiver<String>>>,
    }

    #[async_trait]
    impl GrammarService for GatedService {
        async fn correct(&self, text: &str) -> Result<String, RequestFailure> {
            let gate = self.gates.lock().unwrap().remove(text);
            match gate {
                Some(rx) => rx
                    .await
                    .map_err(|_| RequestFailure::Malformed("gate dropped".into())),
                None => Err(RequestFailure::Malformed("no gate".into())),
            }
        }
    }

    fn controller(service: Arc<dyn GrammarService>) -> (Controller, UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Controller::new(service, tx), rx)
    }

    async fn next_reply(rx: &mut UnboundedReceiver<Notice>) -> Reply {
        loop {
            match rx.recv().await.expect("notice channel closed") {
                Notice::Reply(reply) => return reply,
                Notice::FocusInput => continue,
            }
        }
    }

    fn log(controller: &Controller) -> Vec<(String, Sender)> {
        controller
            .messages()
            .iter()
            .map(|m| (m.content.clone(), m.sender))
            .collect()
    }

    #[tokio::test]
    async fn successful_submission_appends_user_then_ai() {
        let service = ScriptedService::with(vec![Ok("He goes to school.".to_string())]);
        let (mut controller, mut rx) = controller(service.clone());

        let id = controller.submit_message("he go to school");
        assert_eq!(id, Some(RequestId(1)));
        assert_eq!(log(&controller), vec![("he go to school".to_string(), Sender::User)]);
        assert!(controller.is_typing());

        let reply = next_reply(&mut rx).await;
        controller.apply_reply(reply);

        assert_eq!(
            log(&controller),
            vec![
                ("he go to school".to_string(), Sender::User),
                ("He goes to school.".to_string(), Sender::Ai),
            ]
        );
        assert!(!controller.is_typing());
        assert_eq!(service.calls(), vec!["he go to school".to_string()]);
    }

    #[tokio::test]
    async fn failed_request_appends_fallback() {
        let service = ScriptedService::with(vec![Err(RequestFailure::Status(
            StatusCode::INTERNAL_SERVER_ERROR,
        ))]);
        let (mut controller, mut rx) = controller(service);

        controller.submit_message("test");
        let reply = next_reply(&mut rx).await;
        controller.apply_reply(reply);

        assert_eq!(
            log(&controller),
            vec![
                ("test".to_string(), Sender::User),
                (FALLBACK_REPLY.to_string(), Sender::Ai),
            ]
        );
        assert!(!controller.is_typing());
    }

    #[tokio::test]
    async fn whitespace_submission_is_ignored() {
        let service = ScriptedService::with(vec![]);
        let (mut controller, mut rx) = controller(service.clone());
        controller.input_mut().insert(' ');
        controller.input_mut().insert(' ');

        assert_eq!(controller.submit_input(), None);
        assert_eq!(controller.submit_message(""), None);
        assert_eq!(controller.submit_message(" \t\n "), None);

        assert!(controller.messages().is_empty());
        assert_eq!(controller.input().text(), "  ");
        assert!(!controller.is_typing());
        assert_eq!(controller.in_flight(), 0);

        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn submit_input_trims_and_clears_field() {
        let service = ScriptedService::with(vec![Ok("Fine.".to_string())]);
        let (mut controller, mut rx) = controller(service.clone());
        for c in "  she like tea  ".chars() {
            controller.input_mut().insert(c);
        }

        controller.submit_input();
        assert_eq!(controller.input().text(), "");
        assert_eq!(controller.input().cursor(), 0);

        controller.apply_reply(next_reply(&mut rx).await);
        assert_eq!(service.calls(), vec!["she like tea".to_string()]);
        assert_eq!(controller.messages()[0].content, "she like tea");
    }

    #[tokio::test]
    async fn each_cycle_grows_log_by_two() {
        let service = ScriptedService::with(vec![
            Ok("one".to_string()),
            Err(RequestFailure::Malformed("bad".into())),
            Ok("three".to_string()),
        ]);
        let (mut controller, mut rx) = controller(service);

        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            controller.submit_message(text);
            controller.apply_reply(next_reply(&mut rx).await);
            assert_eq!(controller.messages().len(), (i + 1) * 2);
        }
    }

    #[tokio::test]
    async fn overlapping_requests_keep_indicator_until_last_settles() {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        let service = Arc::new(GatedService {
            gates: Mutex::new(HashMap::from([
                ("first".to_string(), first_rx),
                ("second".to_string(), second_rx),
            ])),
        });
        let (mut controller, mut rx) = controller(service);

        let first = controller.submit_message("first").unwrap();
        let second = controller.submit_message("second").unwrap();
        assert_eq!(controller.in_flight(), 2);

        second_tx.send("second reply".to_string()).unwrap();
        let reply = next_reply(&mut rx).await;
        assert_eq!(reply.id, second);
        controller.apply_reply(reply);
        assert!(controller.is_typing());

        first_tx.send("first reply".to_string()).unwrap();
        let reply = next_reply(&mut rx).await;
        assert_eq!(reply.id, first);
        controller.apply_reply(reply);
        assert!(!controller.is_typing());

        let contents: Vec<_> = controller.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "second reply", "first reply"]);
    }

    #[tokio::test]
    async fn navigation_cycle_returns_to_landing() {
        let (mut controller, mut rx) = controller(ScriptedService::with(vec![]));
        assert_eq!(controller.current_view(), View::Landing);

        for _ in 0..5 {
            controller.navigate_to_chat();
            assert_eq!(controller.current_view(), View::Chat);
            controller.navigate_to_landing();
            assert_eq!(controller.current_view(), View::Landing);
        }

        assert!(matches!(rx.recv().await, Some(Notice::FocusInput)));
    }

    #[test]
    fn typing_indicator_is_idempotent() {
        let mut indicator = TypingIndicator::default();
        indicator.hide();
        assert!(!indicator.is_visible());
        indicator.show();
        indicator.show();
        assert!(indicator.is_visible());
        indicator.hide();
        indicator.hide();
        assert!(!indicator.is_visible());
    }

    #[test]
    fn input_field_edits_multibyte_text() {
        let mut input = InputField::default();
        for c in "café".chars() {
            input.insert(c);
        }
        input.move_left();
        input.backspace();
        assert_eq!(input.text(), "caé");

        input.move_home();
        input.delete();
        assert_eq!(input.text(), "aé");

        input.move_end();
        input.insert('!');
        assert_eq!(input.text(), "aé!");
        input.move_right();
        assert_eq!(input.cursor(), 3);
    }
}
