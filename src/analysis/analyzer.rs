use crate::analysis::prompt::AnalysisPrompt;
use crate::analysis::report::AnalysisReport;
use crate::error::Result;
use crate::ingest::UploadedImage;
use crate::llm::{ChatSession, CompletionConfig, ImageAttachment, LlmBroker, LlmMessage};
use async_trait::async_trait;
use tracing::info;

/// Produces a narrative report for an X-ray.
///
/// Implementations fail only with [`XrayReportError::Inference`].
///
/// [`XrayReportError::Inference`]: crate::error::XrayReportError::Inference
#[async_trait]
pub trait XrayAnalyzer: Send + Sync {
    async fn analyze(&self, prompt: &AnalysisPrompt, image: &UploadedImage) -> Result<AnalysisReport>;
}

/// Analyzer backed by a hosted multimodal model.
pub struct LlmAnalyzer {
    broker: LlmBroker,
    config: CompletionConfig,
}

impl LlmAnalyzer {
    pub fn new(broker: LlmBroker, config: CompletionConfig) -> Self {
        Self { broker, config }
    }

    async fn run(&self, prompt: &AnalysisPrompt, image: &UploadedImage) -> Result<String> {
        let attachment = ImageAttachment::png(image.to_png()?);
        let message = LlmMessage::user(prompt.text()).with_image(attachment);

        let mut session = ChatSession::builder(self.broker.clone()).config(self.config.clone()).build();
        session.send(message).await
    }
}

#[async_trait]
impl XrayAnalyzer for LlmAnalyzer {
    async fn analyze(&self, prompt: &AnalysisPrompt, image: &UploadedImage) -> Result<AnalysisReport> {
        info!(model = %self.broker.model(), image_id = %image.id(), "Requesting sarcoma analysis");

        let text = self.run(prompt, image).await.map_err(|e| e.into_inference())?;

        Ok(AnalysisReport::new(image.id(), text))
    }
}
