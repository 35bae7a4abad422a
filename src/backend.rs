//! The seam between the chat/CLI front end and the remote model.
//!
//! Everything above this module is written against [`GenerativeBackend`], so
//! the chat state machine can be driven by a mock in tests and by
//! [`Gemini`](crate::client::Gemini) in production.

use async_trait::async_trait;

use crate::Result;
use crate::types::{Content, Model, ModelInfo};

/// One continuous multi-turn conversation with the backend.
///
/// The contents are resent with each prompt, so this is the server-side
/// history of the exchange.  It is independent of the transcript a user sees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    model: Model,
    contents: Vec<Content>,
}

impl Conversation {
    /// Starts an empty conversation with `model`.
    pub fn new(model: Model) -> Self {
        Self {
            model,
            contents: Vec::new(),
        }
    }

    /// The model this conversation talks to.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Turns exchanged so far, oldest first.
    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    /// Returns true if nothing has been exchanged yet.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// The contents to send for a new user turn: the history plus `prompt`.
    pub fn with_prompt(&self, prompt: &str) -> Vec<Content> {
        let mut contents = self.contents.clone();
        contents.push(Content::user(prompt));
        contents
    }

    /// Records a completed exchange.
    pub fn record(&mut self, prompt: &str, reply: Content) {
        self.contents.push(Content::user(prompt));
        self.contents.push(reply);
    }
}

/// The operations the front end needs from a generative model service.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// The model new conversations and one-shot prompts are sent to.
    fn model(&self) -> &Model;

    /// Starts a new conversation bound to the active model.
    fn start_session(&self) -> Conversation;

    /// Sends `prompt` as the next turn of `conversation` and waits for the
    /// full reply.
    ///
    /// On failure the conversation is left unchanged.
    async fn send_prompt(&self, conversation: &mut Conversation, prompt: &str) -> Result<String>;

    /// Sends a single stateless prompt, calling `on_fragment` for each chunk
    /// of the reply in arrival order.
    ///
    /// An error returned from `on_fragment` aborts the stream and is returned.
    async fn send_prompt_streaming(
        &self,
        prompt: &str,
        on_fragment: &mut (dyn for<'f> FnMut(&'f str) -> Result<()> + Send),
    ) -> Result<()>;

    /// Lists every model the service offers.
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Makes `name` the active model.
    ///
    /// Fails if the name is empty or the service does not know it; the active
    /// model is unchanged on failure.
    async fn switch_model(&mut self, name: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;

    #[test]
    fn conversation_records_turns() {
        let mut conversation = Conversation::new(KnownModel::Gemini25Flash.into());
        assert!(conversation.is_empty());

        let request = conversation.with_prompt("hello");
        assert_eq!(request.len(), 1);
        assert!(conversation.is_empty());

        conversation.record("hello", Content::model("hi there"));
        assert_eq!(conversation.contents().len(), 2);
        assert_eq!(conversation.contents()[1].text(), "hi there");

        let request = conversation.with_prompt("again");
        assert_eq!(request.len(), 3);
        assert_eq!(request[2].text(), "again");
        assert_eq!(conversation.model().id(), "gemini-2.5-flash");
    }

    /// Streams words cut from a reply it builds itself.
    struct Shouting {
        model: Model,
    }

    #[async_trait]
    impl GenerativeBackend for Shouting {
        fn model(&self) -> &Model {
            &self.model
        }

        fn start_session(&self) -> Conversation {
            Conversation::new(self.model.clone())
        }

        async fn send_prompt(&self, conversation: &mut Conversation, prompt: &str) -> Result<String> {
            let reply = prompt.to_uppercase();
            conversation.record(prompt, Content::model(reply.clone()));
            Ok(reply)
        }

        async fn send_prompt_streaming(
            &self,
            prompt: &str,
            on_fragment: &mut (dyn for<'f> FnMut(&'f str) -> Result<()> + Send),
        ) -> Result<()> {
            let owned = prompt.to_uppercase();
            for word in owned.split_inclusive(' ') {
                on_fragment(word)?;
            }
            Ok(())
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }

        async fn switch_model(&mut self, name: &str) -> Result<()> {
            self.model = Model::from(name);
            Ok(())
        }
    }

    #[tokio::test]
    async fn fragments_may_borrow_from_the_backend() {
        let backend = Shouting {
            model: KnownModel::Gemini25Flash.into(),
        };
        let mut seen = Vec::new();
        backend
            .send_prompt_streaming("make it loud", &mut |text: &str| {
                seen.push(text.to_string());
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(seen, vec!["MAKE ", "IT ", "LOUD"]);
    }
}
