/// Message role in LLM conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// Inline image attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageAttachment {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Shorthand for a PNG attachment
    pub fn png(data: Vec<u8>) -> Self {
        Self::new("image/png", data)
    }
}

/// Message in LLM conversation
#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: Option<String>,
    pub images: Vec<ImageAttachment>,
}

/// Response from LLM gateway
#[derive(Debug, Clone)]
pub struct LlmGatewayResponse {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}

impl LlmMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
            images: Vec::new(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: Some(content.into()),
            images: Vec::new(),
        }
    }

    /// Attach an image to this message
    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.images.push(image);
        self
    }
}
