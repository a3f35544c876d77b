//! Gemini Gateway for multimodal LLM interactions.
//!
//! Talks to the `generateContent` endpoint of Google's Generative Language
//! API. Images travel inline as base64 next to the text part of the message.

use crate::error::{Result, XrayReportError};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmGatewayResponse, LlmMessage, MessageRole};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Configuration for connecting to the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Option<std::time::Duration>,
}

impl GeminiConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";
}

/// Gateway for Google Gemini models.
pub struct GeminiGateway {
    client: Client,
    config: GeminiConfig,
}

impl GeminiGateway {
    /// Create a new Gemini gateway from an explicit configuration.
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(XrayReportError::Config("Gemini API key is empty".to_string()));
        }

        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build()?;

        Ok(Self { client, config })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.config.base_url.trim_end_matches('/'), model)
    }

    /// Fetch the model resource to confirm the credential works.
    ///
    /// Any rejection is reported as a configuration error so the caller can
    /// refuse to start.
    pub async fn verify_credentials(&self, model: &str) -> Result<()> {
        info!("Verifying Gemini credentials for model {}", model);

        let response = self
            .client
            .get(self.model_url(model))
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| XrayReportError::Config(format!("Gemini API unreachable: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let detail = provider_error_message(&body).unwrap_or_else(|| status.to_string());

        Err(match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                XrayReportError::Config(format!("Gemini API key was rejected: {}", detail))
            }
            StatusCode::NOT_FOUND => {
                XrayReportError::Config(format!("Gemini model {} not found: {}", model, detail))
            }
            _ => XrayReportError::Config(format!("Gemini credential check failed: {}", detail)),
        })
    }
}

#[async_trait]
impl LlmGateway for GeminiGateway {
    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        info!("Delegating to Gemini for completion");
        debug!("Model: {}, Message count: {}", model, messages.len());

        let body = serde_json::json!({
            "contents": adapt_messages_to_gemini(messages),
            "generationConfig": extract_generation_config(config),
        });

        let response = self
            .client
            .post(format!("{}:generateContent", self.model_url(model)))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = provider_error_message(&text).unwrap_or_else(|| text.clone());
            warn!("Gemini API error: {}", status);
            return Err(XrayReportError::Inference(format!(
                "Gemini API error {}: {}",
                status, detail
            )));
        }

        let response_body: Value = response.json().await?;
        parse_generate_response(&response_body)
    }
}

// Message adapter for Gemini format
fn adapt_messages_to_gemini(messages: &[LlmMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| {
            let mut parts = Vec::new();

            if let Some(content) = &msg.content {
                parts.push(serde_json::json!({ "text": content }));
            }

            for image in &msg.images {
                parts.push(serde_json::json!({
                    "inline_data": {
                        "mime_type": image.mime_type,
                        "data": base64::engine::general_purpose::STANDARD.encode(&image.data),
                    }
                }));
            }

            serde_json::json!({
                "role": match msg.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "model",
                },
                "parts": parts,
            })
        })
        .collect()
}

// Extract Gemini generationConfig from config. Reports are always plain text.
fn extract_generation_config(config: &CompletionConfig) -> Value {
    let mut generation_config = serde_json::json!({
        "temperature": config.temperature,
        "maxOutputTokens": config.max_tokens,
        "responseMimeType": "text/plain",
    });

    if let Some(top_p) = config.top_p {
        generation_config["topP"] = serde_json::json!(top_p);
    }

    if let Some(top_k) = config.top_k {
        generation_config["topK"] = serde_json::json!(top_k);
    }

    generation_config
}

fn parse_generate_response(body: &Value) -> Result<LlmGatewayResponse> {
    let Some(candidate) = body["candidates"].as_array().and_then(|c| c.first()) else {
        let reason = body["promptFeedback"]["blockReason"]
            .as_str()
            .map(|r| format!("prompt blocked: {}", r))
            .unwrap_or_else(|| "no candidates in response".to_string());
        return Err(XrayReportError::Inference(reason));
    };

    let finish_reason = candidate["finishReason"].as_str().map(String::from);

    let content = candidate["content"]["parts"].as_array().map(|parts| {
        parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect::<String>()
    });

    Ok(LlmGatewayResponse {
        content,
        finish_reason,
    })
}

fn provider_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(String::from)
}
