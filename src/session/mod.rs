//! Client-side chat session
//!
//! Holds what the browser UI holds: the active repository, the checked
//! files, the message log and the transport state. The console client
//! drives it; tests drive it with a fake [`ChatBackend`].

use crate::chat::ChatRequest;
use crate::github::RepoData;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod selection;

pub use selection::SelectionTracker;

/// Placeholder shown while a reply is pending
pub const THINKING: &str = "Thinking...";
/// Reply to a submission made before any repository is selected
pub const SELECT_REPOSITORY_FIRST: &str = "Please select a repository first.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Assistant,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "User"),
            Sender::Assistant => write!(f, "Assistant"),
        }
    }
}

/// One entry of the message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}

/// Append-only message log with monotonic ids
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, returning its id
    pub fn push(&mut self, sender: Sender, text: impl Into<String>, is_error: bool) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.messages.push(Message {
            id,
            sender,
            text: text.into(),
            is_error,
            timestamp: Utc::now(),
        });
        id
    }

    /// Remove a message by id; only the pending placeholder is ever removed
    pub fn remove(&mut self, id: u64) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Failure reported by a chat backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatFailure {
    pub message: String,
    pub details: Option<String>,
}

impl ChatFailure {
    pub fn new(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            message: message.into(),
            details,
        }
    }
}

impl fmt::Display for ChatFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {}", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Where chat submissions go
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<String, ChatFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Sending,
}

/// Result of a submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty or whitespace input
    Ignored,
    /// No repository selected; a prompt was appended
    NeedsRepository,
    /// A submission is already in flight
    Busy,
    Replied,
    Failed,
}

/// A submission that has entered `Sending`
#[derive(Debug)]
pub struct PendingChat {
    placeholder_id: u64,
    pub request: ChatRequest,
}

/// Client chat session state machine: `Idle -> Sending -> Idle`
#[derive(Debug)]
pub struct ChatSession {
    session_id: String,
    repository: Option<RepoData>,
    selection: SelectionTracker,
    log: MessageLog,
    state: TransportState,
}

impl ChatSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            repository: None,
            selection: SelectionTracker::new(),
            log: MessageLog::new(),
            state: TransportState::Idle,
        }
    }

    /// Session with a fresh random id
    pub fn random() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn repository(&self) -> Option<&RepoData> {
        self.repository.as_ref()
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    pub fn messages(&self) -> &[Message] {
        self.log.messages()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn input_enabled(&self) -> bool {
        self.state == TransportState::Idle
    }

    /// Make `data` the active repository: clears the selection and greets
    pub fn select_repository(&mut self, data: RepoData) {
        let full_name = data
            .repository
            .owner_and_name()
            .map(|(owner, name)| format!("{}/{}", owner, name))
            .unwrap_or_else(|| data.repository.name.clone());

        self.selection.clear();
        self.repository = Some(data);
        self.log.push(
            Sender::Assistant,
            format!(
                "Now chatting with {}. Select files to ask specific questions about them, or ask general questions about the repository.",
                full_name
            ),
            false,
        );
    }

    pub fn toggle_file(&mut self, path: &str, checked: bool) {
        self.selection.toggle(path, checked);
    }

    /// Validate input and enter `Sending`.
    ///
    /// On success the user message and the placeholder are in the log and
    /// the returned request is ready to send.
    pub fn begin(&mut self, input: &str) -> Result<PendingChat, SubmitOutcome> {
        let message = input.trim();
        if message.is_empty() {
            return Err(SubmitOutcome::Ignored);
        }
        if self.state == TransportState::Sending {
            return Err(SubmitOutcome::Busy);
        }
        let Some(repository) = self.repository.clone() else {
            self.log.push(Sender::Assistant, SELECT_REPOSITORY_FIRST, false);
            return Err(SubmitOutcome::NeedsRepository);
        };

        self.log.push(Sender::User, message, false);
        let placeholder_id = self.log.push(Sender::Assistant, THINKING, false);
        self.state = TransportState::Sending;

        Ok(PendingChat {
            placeholder_id,
            request: ChatRequest {
                message: message.to_string(),
                repo_data: Some(repository),
                file_paths: self.selection.paths(),
                session_id: Some(self.session_id.clone()),
                ..ChatRequest::default()
            },
        })
    }

    /// Leave `Sending`, replacing the placeholder with the outcome
    pub fn finish(&mut self, pending: PendingChat, result: Result<String, ChatFailure>) -> SubmitOutcome {
        self.log.remove(pending.placeholder_id);
        self.state = TransportState::Idle;

        match result {
            Ok(reply) => {
                self.log.push(Sender::Assistant, reply, false);
                SubmitOutcome::Replied
            }
            Err(failure) => {
                self.log.push(Sender::Assistant, format!("Error: {}", failure), true);
                SubmitOutcome::Failed
            }
        }
    }

    /// Submit `input` through `backend` and wait for the outcome
    pub async fn submit(&mut self, input: &str, backend: &dyn ChatBackend) -> SubmitOutcome {
        let pending = match self.begin(input) {
            Ok(pending) => pending,
            Err(outcome) => return outcome,
        };
        let result = backend.send(&pending.request).await;
        self.finish(pending, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::RepositoryInfo;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Counts sends and replays a fixed outcome
    struct CountingBackend {
        outcome: Result<String, ChatFailure>,
        calls: AtomicUsize,
        last: Mutex<Option<ChatRequest>>,
    }

    impl CountingBackend {
        fn new(outcome: Result<String, ChatFailure>) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for CountingBackend {
        async fn send(&self, request: &ChatRequest) -> Result<String, ChatFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request.clone());
            self.outcome.clone()
        }
    }

    fn repo() -> RepoData {
        RepoData {
            repository: RepositoryInfo::named("octo", "hello"),
            issues: Vec::new(),
            token: Some("tok".to_string()),
        }
    }

    fn texts(session: &ChatSession) -> Vec<&str> {
        session.messages().iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn test_select_repository_greets_and_clears_selection() {
        let mut session = ChatSession::new("s");
        session.toggle_file("old.rs", true);
        session.select_repository(repo());

        assert!(session.selection().is_empty());
        assert_eq!(
            session.messages()[0].text,
            "Now chatting with octo/hello. Select files to ask specific questions about them, or ask general questions about the repository."
        );
    }

    #[tokio::test]
    async fn test_blank_input_makes_no_call() {
        let backend = CountingBackend::new(Ok("unused".into()));
        let mut session = ChatSession::new("s");
        session.select_repository(repo());

        assert_eq!(session.submit("", &backend).await, SubmitOutcome::Ignored);
        assert_eq!(session.submit("  \n\t", &backend).await, SubmitOutcome::Ignored);
        assert_eq!(backend.calls(), 0);
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_no_repository_prompts_without_call() {
        let backend = CountingBackend::new(Ok("unused".into()));
        let mut session = ChatSession::new("s");

        let outcome = session.submit("hello?", &backend).await;
        assert_eq!(outcome, SubmitOutcome::NeedsRepository);
        assert_eq!(backend.calls(), 0);
        assert_eq!(texts(&session), vec![SELECT_REPOSITORY_FIRST]);
        assert_eq!(session.messages()[0].sender, Sender::Assistant);
    }

    #[tokio::test]
    async fn test_success_replaces_placeholder() {
        let backend = CountingBackend::new(Ok("It greets.".into()));
        let mut session = ChatSession::new("s");
        session.select_repository(repo());
        session.toggle_file("src/main.rs", true);

        let outcome = session.submit(" What is it? ", &backend).await;
        assert_eq!(outcome, SubmitOutcome::Replied);
        assert!(session.input_enabled());

        let texts = texts(&session);
        assert_eq!(&texts[1..], &["What is it?", "It greets."]);
        assert!(!texts.contains(&THINKING));

        let sent = backend.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.file_paths, vec!["src/main.rs"]);
        assert_eq!(sent.session_id.as_deref(), Some("s"));
        assert_eq!(sent.message, "What is it?");
    }

    #[tokio::test]
    async fn test_failure_appends_error_message() {
        let backend = CountingBackend::new(Err(ChatFailure::new(
            "Unable to process chat message",
            Some("model overloaded".to_string()),
        )));
        let mut session = ChatSession::new("s");
        session.select_repository(repo());

        assert_eq!(session.submit("hi", &backend).await, SubmitOutcome::Failed);
        let last = session.messages().last().unwrap();
        assert!(last.is_error);
        assert_eq!(last.text, "Error: Unable to process chat message: model overloaded");
        assert_eq!(session.state(), TransportState::Idle);
    }

    #[test]
    fn test_sending_blocks_second_submission() {
        let mut session = ChatSession::new("s");
        session.select_repository(repo());

        let pending = session.begin("first").unwrap();
        assert_eq!(session.state(), TransportState::Sending);
        assert!(!session.input_enabled());
        assert_eq!(session.messages().last().unwrap().text, THINKING);
        assert_eq!(session.begin("second").unwrap_err(), SubmitOutcome::Busy);

        session.finish(pending, Ok("done".into()));
        assert!(session.input_enabled());
    }

    #[test]
    fn test_message_ids_are_monotonic() {
        let mut log = MessageLog::new();
        let a = log.push(Sender::User, "a", false);
        let b = log.push(Sender::Assistant, "b", false);
        log.remove(b);
        let c = log.push(Sender::Assistant, "c", false);
        assert!(a < b && b < c);
        assert_eq!(log.len(), 2);
    }
}
