//! Chat session management.
//!
//! A chat session keeps the conversation history and the decoding parameters
//! it was built with. The report flow opens one session per analysis and
//! sends a single multimodal turn through it.

use crate::error::Result;
use crate::llm::broker::LlmBroker;
use crate::llm::gateway::CompletionConfig;
use crate::llm::models::LlmMessage;

/// A conversation with one model through an [`LlmBroker`].
///
/// # Examples
///
/// ```ignore
/// use xray_report::llm::{ChatSession, CompletionConfig, LlmBroker, LlmMessage};
///
/// let mut session = ChatSession::builder(broker)
///     .config(CompletionConfig::sarcoma_report())
///     .build();
///
/// let reply = session.send(LlmMessage::user("Describe this X-ray")).await?;
/// ```
pub struct ChatSession {
    broker: LlmBroker,
    messages: Vec<LlmMessage>,
    config: CompletionConfig,
}

impl ChatSession {
    /// Create a chat session builder for custom configuration.
    pub fn builder(broker: LlmBroker) -> ChatSessionBuilder {
        ChatSessionBuilder::new(broker)
    }

    /// Send a message to the LLM and get a response.
    ///
    /// The message is recorded in history before the call. The reply is only
    /// recorded when the call succeeds.
    pub async fn send(&mut self, message: LlmMessage) -> Result<String> {
        self.messages.push(message);

        let response = self.broker.generate(&self.messages, Some(self.config.clone())).await?;

        self.messages.push(LlmMessage::assistant(&response));

        Ok(response)
    }

    /// Get the current conversation history
    pub fn messages(&self) -> &[LlmMessage] {
        &self.messages
    }
}

/// Builder for constructing a `ChatSession` with custom configuration.
pub struct ChatSessionBuilder {
    broker: LlmBroker,
    config: CompletionConfig,
}

impl ChatSessionBuilder {
    fn new(broker: LlmBroker) -> Self {
        Self {
            broker,
            config: CompletionConfig::default(),
        }
    }

    /// Set the completion configuration used for every turn
    pub fn config(mut self, config: CompletionConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the chat session
    pub fn build(self) -> ChatSession {
        ChatSession {
            broker: self.broker,
            messages: Vec::new(),
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XrayReportError;
    use crate::llm::gateway::LlmGateway;
    use crate::llm::models::{ImageAttachment, LlmGatewayResponse, MessageRole};
    use std::sync::{Arc, Mutex};

    // Mock gateway for testing
    struct MockGateway {
        responses: Vec<Option<String>>,
        call_count: Mutex<usize>,
        last_message_count: Mutex<usize>,
        last_config: Mutex<Option<CompletionConfig>>,
    }

    impl MockGateway {
        fn new(responses: Vec<Option<&str>>) -> Self {
            Self {
                responses: responses.into_iter().map(|r| r.map(String::from)).collect(),
                call_count: Mutex::new(0),
                last_message_count: Mutex::new(0),
                last_config: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmGateway for MockGateway {
        async fn complete(
            &self,
            _model: &str,
            messages: &[LlmMessage],
            config: &CompletionConfig,
        ) -> Result<LlmGatewayResponse> {
            let mut count = self.call_count.lock().unwrap();
            let idx = *count;
            *count += 1;
            *self.last_message_count.lock().unwrap() = messages.len();
            *self.last_config.lock().unwrap() = Some(config.clone());

            Ok(LlmGatewayResponse {
                content: self.responses.get(idx).cloned().flatten(),
                finish_reason: None,
            })
        }
    }

    #[tokio::test]
    async fn test_single_turn_records_history() {
        let gateway = Arc::new(MockGateway::new(vec![Some("Risk: high")]));
        let broker = LlmBroker::new("test-model", gateway);
        let mut session = ChatSession::builder(broker).build();

        let message = LlmMessage::user("Analyze").with_image(ImageAttachment::png(vec![0u8; 4]));
        let reply = session.send(message).await.unwrap();

        assert_eq!(reply, "Risk: high");
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].images.len(), 1);
        assert_eq!(session.messages()[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_second_turn_sends_history() {
        let gateway = Arc::new(MockGateway::new(vec![Some("first"), Some("second")]));
        let broker = LlmBroker::new("test-model", gateway.clone());
        let mut session = ChatSession::builder(broker).build();

        session.send(LlmMessage::user("one")).await.unwrap();
        session.send(LlmMessage::user("two")).await.unwrap();

        assert_eq!(*gateway.last_message_count.lock().unwrap(), 3);
        assert_eq!(session.messages().len(), 4);
        assert_eq!(session.messages()[3].content.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_failed_turn_does_not_record_reply() {
        let gateway = Arc::new(MockGateway::new(vec![None]));
        let broker = LlmBroker::new("test-model", gateway);
        let mut session = ChatSession::builder(broker).build();

        let result = session.send(LlmMessage::user("Analyze")).await;

        assert!(matches!(result, Err(XrayReportError::Inference(_))));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_builder_config_reaches_gateway() {
        let gateway = Arc::new(MockGateway::new(vec![Some("ok")]));
        let broker = LlmBroker::new("test-model", gateway.clone());

        let mut session = ChatSession::builder(broker)
            .config(CompletionConfig::sarcoma_report())
            .build();
        assert!(session.messages().is_empty());

        session.send(LlmMessage::user("Analyze")).await.unwrap();

        assert_eq!(
            *gateway.last_config.lock().unwrap(),
            Some(CompletionConfig::sarcoma_report())
        );
    }
}
