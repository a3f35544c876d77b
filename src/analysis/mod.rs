//! Prompt construction, the narrative report and the analyzer seam.

pub mod analyzer;
pub mod prompt;
pub mod report;

pub use analyzer::{LlmAnalyzer, XrayAnalyzer};
pub use prompt::AnalysisPrompt;
pub use report::AnalysisReport;
