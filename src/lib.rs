pub mod analysis;
pub mod config;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod render;
pub mod shell;

pub use error::{Result, XrayReportError};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::analysis::{AnalysisPrompt, AnalysisReport, LlmAnalyzer, XrayAnalyzer};
    pub use crate::config::AppConfig;
    pub use crate::error::{Result, XrayReportError};
    pub use crate::ingest::{ImageFormat, UploadedImage};
    pub use crate::llm::gateways::GeminiGateway;
    pub use crate::llm::{CompletionConfig, LlmBroker, LlmGateway, LlmMessage};
    pub use crate::render::{ExportDocument, ReportRenderer};
    pub use crate::shell::Session;
}
