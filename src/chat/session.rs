//! Core chat session management.
//!
//! [`ChatSession`] owns the transcript shown to the user, the backend
//! conversation handle and the active model.  A submitted line is processed
//! in three steps so the front end can decide how to wait for the slow part:
//!
//! 1. [`ChatSession::submit`] echoes the line into the history and classifies
//!    it as a command or a prompt;
//! 2. [`ChatSession::execute`] performs the resulting [`Action`];
//! 3. [`ChatSession::complete`] records the outcome.
//!
//! [`ChatSession::handle_line`] runs all three.

use crate::backend::{Conversation, GenerativeBackend};
use crate::catalog::chat_catalog_markdown;
use crate::chat::commands::{ChatCommand, help_text, parse_command};
use crate::observability::{CHAT_BUSY_REJECTIONS, CHAT_COMMANDS, CHAT_ERRORS, CHAT_PROMPTS};
use crate::types::Model;
use crate::{Error, Result};

/// Who a message in the transcript came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Assistant,
}

/// One entry of the transcript.  Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    content: String,
    origin: Origin,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            origin: Origin::User,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            origin: Origin::Assistant,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_user(&self) -> bool {
        self.origin == Origin::User
    }
}

/// Where the session is in processing a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for input.
    Idle,
    /// Interpreting a submitted line.
    Dispatching,
    /// A slash command is running.
    RunningCommand,
    /// A prompt has been sent and the reply is outstanding.
    AwaitingResponse,
    /// The session has ended.
    Closed,
}

/// Work produced by classifying a submitted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Make the named model active.
    SwitchModel(String),
    /// Fetch and format the model catalog.
    ListModels,
    /// Show the command help.
    Help,
    /// Send the text to the model.
    Prompt(String),
}

/// A chat session that manages the transcript and the backend conversation.
pub struct ChatSession<B: GenerativeBackend> {
    backend: B,
    conversation: Conversation,
    history: Vec<ChatMessage>,
    current_model: Model,
    pending_error: Option<Error>,
    state: SessionState,
}

impl<B: GenerativeBackend> ChatSession<B> {
    /// Creates a new chat session with an empty transcript.
    ///
    /// The session starts on whatever model `backend` has active.
    pub fn new(backend: B) -> Self {
        let conversation = backend.start_session();
        let current_model = backend.model().clone();
        Self {
            backend,
            conversation,
            history: Vec::new(),
            current_model,
            pending_error: None,
            state: SessionState::Idle,
        }
    }

    /// Accepts one line of input.
    ///
    /// Empty lines are ignored.  Otherwise the line is appended to the
    /// history and classified; commands and prompts come back as an
    /// [`Action`] for [`ChatSession::execute`], while `/quit` closes the
    /// session and yields nothing.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Busy`] while a previous action is outstanding and
    /// with a validation error once the session is closed.  Neither changes
    /// the history.
    pub fn submit(&mut self, line: &str) -> Result<Option<Action>> {
        match self.state {
            SessionState::Closed => {
                return Err(Error::validation("chat session is closed", None));
            }
            SessionState::Dispatching
            | SessionState::RunningCommand
            | SessionState::AwaitingResponse => {
                CHAT_BUSY_REJECTIONS.click();
                return Err(Error::busy("a request is already in progress"));
            }
            SessionState::Idle => {}
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }

        self.state = SessionState::Dispatching;
        self.history.push(ChatMessage::user(line));

        let action = match parse_command(line) {
            Some(ChatCommand::Quit) => {
                tracing::debug!("chat session closed by user");
                self.state = SessionState::Closed;
                return Ok(None);
            }
            Some(ChatCommand::Model(name)) => Action::SwitchModel(name),
            Some(ChatCommand::ListModels) => Action::ListModels,
            Some(ChatCommand::Help) => Action::Help,
            None => Action::Prompt(line.to_string()),
        };

        if let Action::Prompt(_) = action {
            CHAT_PROMPTS.click();
            self.state = SessionState::AwaitingResponse;
        } else {
            CHAT_COMMANDS.click();
            self.state = SessionState::RunningCommand;
        }
        Ok(Some(action))
    }

    /// Performs `action`, returning the text to show as the reply.
    ///
    /// A successful model switch starts a fresh backend conversation; the
    /// transcript is kept.  A failed switch leaves the model and the
    /// conversation as they were.
    pub async fn execute(&mut self, action: Action) -> Result<String> {
        match action {
            Action::SwitchModel(name) => {
                self.backend.switch_model(&name).await?;
                self.conversation = self.backend.start_session();
                self.current_model = self.backend.model().clone();
                Ok(format!("Switched to model: {}", self.current_model))
            }
            Action::ListModels => {
                let models = self.backend.list_models().await?;
                Ok(chat_catalog_markdown(&models, self.current_model.id()))
            }
            Action::Help => Ok(help_text().to_string()),
            Action::Prompt(text) => self.backend.send_prompt(&mut self.conversation, &text).await,
        }
    }

    /// Records the outcome of the outstanding action and returns to idle.
    ///
    /// A reply is appended to the history.  An error becomes the pending
    /// error, replacing any earlier one, and leaves the history alone.
    pub fn complete(&mut self, outcome: Result<String>) {
        match outcome {
            Ok(reply) => {
                self.history.push(ChatMessage::assistant(reply));
                self.pending_error = None;
            }
            Err(err) => {
                CHAT_ERRORS.click();
                tracing::warn!(error = %err, "chat request failed");
                self.pending_error = Some(err);
            }
        }
        if self.state != SessionState::Closed {
            self.state = SessionState::Idle;
        }
    }

    /// Submits, executes and completes one line.
    ///
    /// Only the rejections of [`ChatSession::submit`] are returned as errors;
    /// failures of the action itself end up in [`ChatSession::pending_error`].
    pub async fn handle_line(&mut self, line: &str) -> Result<()> {
        let Some(action) = self.submit(line)? else {
            return Ok(());
        };
        let outcome = self.execute(action).await;
        self.complete(outcome);
        Ok(())
    }

    /// Ends the session, abandoning anything outstanding.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// The model prompts are currently sent to.
    pub fn current_model(&self) -> &Model {
        &self.current_model
    }

    /// The error from the most recent action, if it failed.
    pub fn pending_error(&self) -> Option<&Error> {
        self.pending_error.as_ref()
    }

    /// Takes the pending error so it is reported once.
    pub fn take_pending_error(&mut self) -> Option<Error> {
        self.pending_error.take()
    }

    /// The backend conversation handle.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Content, ModelInfo};
    use async_trait::async_trait;

    struct Echo {
        model: Model,
    }

    #[async_trait]
    impl GenerativeBackend for Echo {
        fn model(&self) -> &Model {
            &self.model
        }

        fn start_session(&self) -> Conversation {
            Conversation::new(self.model.clone())
        }

        async fn send_prompt(&self, conversation: &mut Conversation, prompt: &str) -> Result<String> {
            conversation.record(prompt, Content::model(prompt));
            Ok(prompt.to_string())
        }

        async fn send_prompt_streaming(
            &self,
            prompt: &str,
            on_fragment: &mut (dyn for<'f> FnMut(&'f str) -> Result<()> + Send),
        ) -> Result<()> {
            on_fragment(prompt)
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }

        async fn switch_model(&mut self, name: &str) -> Result<()> {
            if name.is_empty() {
                return Err(Error::validation("model name cannot be empty", None));
            }
            self.model = Model::from(name);
            Ok(())
        }
    }

    fn session() -> ChatSession<Echo> {
        ChatSession::new(Echo {
            model: Model::default(),
        })
    }

    #[test]
    fn new_session_empty() {
        let session = session();
        assert!(session.history().is_empty());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.current_model(), &Model::default());
        assert!(session.pending_error().is_none());
        assert!(session.conversation().is_empty());
    }

    #[test]
    fn submit_classifies_lines() {
        let mut session = session();
        assert_eq!(
            session.submit("hello").unwrap(),
            Some(Action::Prompt("hello".to_string()))
        );
        assert_eq!(session.state(), SessionState::AwaitingResponse);
        session.complete(Ok("hi".to_string()));

        assert_eq!(session.submit("/help").unwrap(), Some(Action::Help));
        assert_eq!(session.state(), SessionState::RunningCommand);
        session.complete(Ok(help_text().to_string()));

        assert_eq!(session.submit("/list-models").unwrap(), Some(Action::ListModels));
        session.complete(Ok(String::new()));

        assert_eq!(
            session.submit("/model \n").unwrap(),
            Some(Action::SwitchModel(String::new()))
        );
    }

    #[test]
    fn whitespace_is_ignored() {
        let mut session = session();
        assert_eq!(session.submit("   \t").unwrap(), None);
        assert!(session.history().is_empty());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn second_submit_is_busy() {
        let mut session = session();
        session.submit("first").unwrap();
        let err = session.submit("second").unwrap_err();
        assert!(err.is_busy());
        assert_eq!(session.history().len(), 1);

        session.complete(Ok("reply".to_string()));
        assert!(session.submit("second").is_ok());
    }

    #[test]
    fn errors_are_pending_not_history() {
        let mut session = session();
        session.submit("hello").unwrap();
        session.complete(Err(Error::connection("refused", None)));
        assert_eq!(session.history().len(), 1);
        assert!(session.pending_error().unwrap().is_transport());
        assert_eq!(session.state(), SessionState::Idle);

        session.submit("again").unwrap();
        session.complete(Ok("ok".to_string()));
        assert!(session.pending_error().is_none());
    }

    #[test]
    fn quit_closes() {
        let mut session = session();
        assert_eq!(session.submit("/quit").unwrap(), None);
        assert!(session.is_closed());
        assert!(session.submit("hello").unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn switch_starts_new_conversation() {
        let mut session = session();
        session.handle_line("hello").await.unwrap();
        assert_eq!(session.conversation().contents().len(), 2);

        session.handle_line("/model gemini-2.5-pro").await.unwrap();
        assert_eq!(session.current_model().id(), "gemini-2.5-pro");
        assert!(session.conversation().is_empty());
        assert_eq!(session.conversation().model().id(), "gemini-2.5-pro");
        assert_eq!(session.history().len(), 4);
        assert_eq!(
            session.history()[3].content(),
            "Switched to model: gemini-2.5-pro"
        );
    }
}
