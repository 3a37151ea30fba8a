//! Stateful multi-turn conversation
//!
//! A [`ChatSession`] threads conversation identifiers from each answer into
//! the next request. It is owned by its creator and is not synchronized;
//! share it behind a lock if several tasks need it.

use crate::{
    Result,
    session::provider::Provider,
    types::{
        ChatOptions, ConversationMetadata, DEFAULT_MODEL, GenerateOptions, GenerationResponse,
        Message,
    },
};
use std::sync::Arc;

#[derive(Debug)]
pub struct ChatSession {
    provider: Arc<dyn Provider>,
    model: String,
    metadata: ConversationMetadata,
    history: Vec<Message>,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn Provider>, options: ChatOptions) -> Self {
        Self {
            provider,
            model: options.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            metadata: options.metadata.unwrap_or_default(),
            history: Vec::new(),
        }
    }

    /// Send one user turn
    ///
    /// On success the user message and the reply are appended to the
    /// history and the reply's identifiers are used for the next turn. A
    /// failed turn changes nothing.
    pub async fn send_message(&mut self, text: &str) -> Result<GenerationResponse> {
        let options = GenerateOptions::new()
            .with_model(self.model.clone())
            .with_metadata(self.metadata.clone());
        let response = self.provider.generate(text, &options).await?;

        self.history.push(Message::user(text));
        self.history.push(Message::assistant(response.text.clone()));
        if !response.metadata.is_empty() {
            self.metadata = response.metadata.clone();
        }
        Ok(response)
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn metadata(&self) -> &ConversationMetadata {
        &self.metadata
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelInfo;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted results and records the options it was called with
    #[derive(Debug, Default)]
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<GenerationResponse>>>,
        seen: Mutex<Vec<(String, GenerateOptions)>>,
    }

    impl ScriptedProvider {
        fn push(&self, reply: Result<GenerationResponse>) {
            self.replies.lock().unwrap().push_back(reply);
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            prompt: &str,
            options: &GenerateOptions,
        ) -> Result<GenerationResponse> {
            self.seen
                .lock()
                .unwrap()
                .push((prompt.to_string(), options.clone()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(crate::Error::NotInitialized))
        }

        async fn is_healthy(&self) -> bool {
            true
        }

        fn list_models(&self) -> Vec<ModelInfo> {
            Vec::new()
        }
    }

    fn reply(text: &str, cid: &str, rcid: &str) -> GenerationResponse {
        GenerationResponse {
            text: text.to_string(),
            metadata: ConversationMetadata {
                cid: Some(cid.to_string()),
                rid: None,
                rcid: Some(rcid.to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_identifiers_thread_between_turns() {
        let provider = Arc::new(ScriptedProvider::default());
        provider.push(Ok(reply("first answer", "c_1", "rc_1")));
        provider.push(Ok(reply("second answer", "c_1", "rc_2")));

        let mut chat = ChatSession::new(
            provider.clone(),
            ChatOptions::new().with_model("gemini-2.5-flash"),
        );
        chat.send_message("one").await.unwrap();
        chat.send_message("two").await.unwrap();

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].1.metadata, Some(ConversationMetadata::default()));
        assert_eq!(
            seen[1].1.metadata.as_ref().unwrap().rcid.as_deref(),
            Some("rc_1")
        );
        assert_eq!(seen[1].1.model.as_deref(), Some("gemini-2.5-flash"));

        assert_eq!(
            chat.history(),
            &[
                Message::user("one"),
                Message::assistant("first answer"),
                Message::user("two"),
                Message::assistant("second answer"),
            ]
        );
        assert_eq!(chat.metadata().rcid.as_deref(), Some("rc_2"));
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_state_untouched() {
        let provider = Arc::new(ScriptedProvider::default());
        provider.push(Ok(reply("ok", "c_1", "rc_1")));
        provider.push(Err(crate::Error::Generation { status: 500 }));

        let mut chat = ChatSession::new(provider, ChatOptions::new());
        chat.send_message("one").await.unwrap();
        let err = chat.send_message("two").await.unwrap_err();

        assert!(matches!(err, crate::Error::Generation { status: 500 }));
        assert_eq!(chat.history().len(), 2);
        assert_eq!(chat.metadata().cid.as_deref(), Some("c_1"));
        assert_eq!(chat.model(), DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_resume_with_known_metadata() {
        let provider = Arc::new(ScriptedProvider::default());
        provider.push(Ok(GenerationResponse::new("resumed")));

        let known = ConversationMetadata {
            cid: Some("c_9".to_string()),
            ..Default::default()
        };
        let mut chat = ChatSession::new(
            provider.clone(),
            ChatOptions::new().with_metadata(known.clone()),
        );
        chat.send_message("again").await.unwrap();

        assert_eq!(provider.seen.lock().unwrap()[0].1.metadata, Some(known.clone()));
        // An answer without identifiers keeps the previous ones
        assert_eq!(chat.metadata(), &known);
    }
}
