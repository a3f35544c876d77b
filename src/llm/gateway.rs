use crate::error::Result;
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use async_trait::async_trait;

/// Configuration for LLM completion
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_tokens: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: None,
            top_k: None,
            max_tokens: 8192,
        }
    }
}

impl CompletionConfig {
    /// Decoding parameters used for the sarcoma risk narrative.
    pub fn sarcoma_report() -> Self {
        Self {
            temperature: 1.0,
            top_p: Some(0.95),
            top_k: Some(64),
            max_tokens: 8192,
        }
    }
}

/// Abstract interface for LLM providers
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Complete an LLM request with text response
    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse>;
}
