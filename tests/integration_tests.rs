//! Integration tests for the gemi library.
//! These tests require an API key in the environment to run.

#[cfg(test)]
mod tests {
    use gemi::{Conversation, Gemini, GenerativeBackend, KnownModel, Model};

    fn client() -> Option<Gemini> {
        // This test requires GEMINI_API_KEY to be set
        let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|key| !key.is_empty());
        if api_key.is_none() {
            eprintln!("Skipping test: GEMINI_API_KEY not set");
            return None;
        }
        let client = Gemini::new(api_key).expect("Failed to create client");
        Some(client.with_model(Model::Known(KnownModel::Gemini20Flash)))
    }

    #[tokio::test]
    async fn test_simple_generation() {
        let Some(client) = client() else {
            return;
        };
        let response = client.generate_text("Say 'test passed'").await;
        assert!(
            response.is_ok(),
            "Request should succeed with valid API key"
        );
    }

    #[tokio::test]
    async fn test_streaming_response() {
        let Some(client) = client() else {
            return;
        };
        let mut fragments = 0;
        let result = client
            .generate_text_stream("Count to 3", |_| {
                fragments += 1;
                Ok(())
            })
            .await;
        assert!(result.is_ok(), "Stream request should succeed");
        assert!(fragments > 0);
    }

    #[tokio::test]
    async fn test_conversation_keeps_context() {
        let Some(client) = client() else {
            return;
        };
        let mut conversation: Conversation = client.start_session();
        client
            .send_prompt(&mut conversation, "Remember the word 'kestrel'.")
            .await
            .expect("first turn");
        assert_eq!(conversation.contents().len(), 2);
        client
            .send_prompt(&mut conversation, "Which word did I ask you to remember?")
            .await
            .expect("second turn");
        assert_eq!(conversation.contents().len(), 4);
    }

    #[tokio::test]
    async fn test_list_models() {
        let Some(client) = client() else {
            return;
        };
        let models = client.list_models().await.expect("list models");
        assert!(!models.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_model_switch_fails() {
        let Some(mut client) = client() else {
            return;
        };
        let result = GenerativeBackend::switch_model(&mut client, "no-such-model-xyz").await;
        assert!(result.is_err());
        assert_eq!(GenerativeBackend::model(&client).id(), "gemini-2.0-flash");
    }
}
