use crate::error::{Result, XrayReportError};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::LlmMessage;
use std::sync::Arc;
use tracing::{info, warn};

/// Main interface for LLM interactions
#[derive(Clone)]
pub struct LlmBroker {
    model: String,
    gateway: Arc<dyn LlmGateway>,
}

impl LlmBroker {
    /// Create a new LLM broker
    pub fn new(model: impl Into<String>, gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            model: model.into(),
            gateway,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text response from LLM
    ///
    /// A reply with no text (or only whitespace) is treated as unusable and
    /// reported as an inference error.
    pub async fn generate(
        &self,
        messages: &[LlmMessage],
        config: Option<CompletionConfig>,
    ) -> Result<String> {
        let config = config.unwrap_or_default();

        let response = self.gateway.complete(&self.model, messages, &config).await?;

        match response.content {
            Some(content) if !content.trim().is_empty() => {
                info!(model = %self.model, chars = content.len(), "Received model response");
                Ok(content)
            }
            _ => {
                warn!(finish_reason = ?response.finish_reason, "Model returned no text");
                Err(XrayReportError::Inference(match response.finish_reason {
                    Some(reason) => format!("model returned no text (finish reason: {})", reason),
                    None => "model returned no text".to_string(),
                }))
            }
        }
    }
}
