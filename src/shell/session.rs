//! One interactive session: upload, generate, download.

use crate::analysis::{AnalysisPrompt, AnalysisReport, XrayAnalyzer};
use crate::error::{Result, XrayReportError};
use crate::ingest::UploadedImage;
use crate::render::{ExportDocument, ReportRenderer};
use crate::shell::state::{Rejected, ShellEvent, ShellState};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Session {
    state: ShellState,
    upload_error: Option<String>,
    analyzer: Arc<dyn XrayAnalyzer>,
    renderer: ReportRenderer,
}

impl Session {
    pub fn new(analyzer: Arc<dyn XrayAnalyzer>, renderer: ReportRenderer) -> Self {
        Self {
            state: ShellState::Idle,
            upload_error: None,
            analyzer,
            renderer,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Message from the last rejected upload, if the session is still idle
    /// because of it.
    pub fn upload_error(&self) -> Option<&str> {
        self.upload_error.as_deref()
    }

    /// Accept a new file. Any previous image and report are discarded.
    ///
    /// A file that fails to decode leaves the session idle with the error
    /// kept for display.
    pub fn upload(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        match UploadedImage::from_upload(file_name, bytes) {
            Ok(image) => {
                self.upload_error = None;
                step(&mut self.state, ShellEvent::Upload(image))
            }
            Err(e) => {
                warn!(file_name = %file_name, "Rejected upload: {}", e);
                self.state = ShellState::Idle;
                self.upload_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Run analysis and rendering for the loaded image to completion.
    ///
    /// On failure the session moves to `Failed` and the error is returned
    /// as well. If the returned future is dropped before it finishes, the
    /// session also lands in `Failed` so that generation can be retried.
    pub async fn generate(&mut self) -> Result<()> {
        step(&mut self.state, ShellEvent::Generate)?;

        let mut in_flight = InFlight {
            state: &mut self.state,
        };

        let image = in_flight
            .state
            .image()
            .ok_or_else(|| XrayReportError::InvalidState("no image loaded".to_string()))?;

        let outcome = produce(self.analyzer.as_ref(), &self.renderer, image).await;

        match outcome {
            Ok((report, document)) => step(in_flight.state, ShellEvent::Completed { report, document }),
            Err(e) => {
                warn!("Report generation failed: {}", e);
                step(in_flight.state, ShellEvent::Errored(e.to_string()))?;
                Err(e)
            }
        }
    }
}

const INTERRUPTED: &str = "Report generation was interrupted before it finished";

/// Holds the state while a generate call is awaiting the model.
///
/// Dropping it with the state still `Analyzing` marks the run as failed.
struct InFlight<'a> {
    state: &'a mut ShellState,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if matches!(self.state, ShellState::Analyzing { .. }) {
            warn!("{}", INTERRUPTED);
            let _ = step(self.state, ShellEvent::Errored(INTERRUPTED.to_string()));
        }
    }
}

fn step(state: &mut ShellState, event: ShellEvent) -> Result<()> {
    let current = std::mem::take(state);
    let from = current.name();

    match current.apply(event) {
        Ok(next) => {
            debug!(from, to = next.name(), "Shell transition");
            *state = next;
            Ok(())
        }
        Err(Rejected { state: kept, error }) => {
            *state = kept;
            Err(error)
        }
    }
}

async fn produce(
    analyzer: &dyn XrayAnalyzer,
    renderer: &ReportRenderer,
    image: &UploadedImage,
) -> Result<(AnalysisReport, ExportDocument)> {
    let prompt = AnalysisPrompt::today();
    let report = analyzer.analyze(&prompt, image).await?;
    let document = renderer.render(&report, image)?;
    info!(image_id = %image.id(), "Report ready");
    Ok((report, document))
}


#[cfg(test)]
mod tests {
    use super::stub::StubAnalyzer;
    use super::*;
    use crate::ingest::test_images;
    use crate::render::DocumentOutline;
    use std::time::Duration;

    fn session(analyzer: Arc<StubAnalyzer>) -> Session {
        Session::new(analyzer, ReportRenderer::new())
    }

    #[tokio::test]
    async fn test_upload_then_generate() {
        let analyzer = Arc::new(StubAnalyzer::replying("Risk: low\n\nFollow-up: none"));
        let mut session = session(analyzer.clone());

        session.upload("hip.png", test_images::png(10, 10)).unwrap();
        assert_eq!(session.state().name(), "image_loaded");

        session.generate().await.unwrap();

        assert_eq!(analyzer.calls(), 1);
        assert_eq!(session.state().name(), "report_ready");
        let document = session.state().document().unwrap();
        let outline = DocumentOutline::read(document.bytes()).unwrap();
        assert_eq!(outline.paragraphs, vec!["Risk: low", "Follow-up: none"]);
        assert_eq!(outline.images, 1);
    }

    #[tokio::test]
    async fn test_non_image_upload_never_reaches_model() {
        let analyzer = Arc::new(StubAnalyzer::replying("unused"));
        let mut session = session(analyzer.clone());

        let result = session.upload("notes.png", b"plain text, not pixels".to_vec());
        assert!(matches!(result, Err(XrayReportError::ImageDecode(_))));
        assert_eq!(session.state().name(), "idle");
        assert!(session.upload_error().unwrap().starts_with("Image decode error"));

        let result = session.generate().await;
        assert!(matches!(result, Err(XrayReportError::InvalidState(_))));
        assert_eq!(analyzer.calls(), 0);
    }

    #[tokio::test]
    async fn test_session_recovers_after_bad_upload() {
        let analyzer = Arc::new(StubAnalyzer::replying("Risk: medium"));
        let mut session = session(analyzer);

        let _ = session.upload("broken.jpg", vec![0xFF, 0xD8, 0x00]);
        session.upload("good.jpg", test_images::jpeg(8, 8)).unwrap();

        assert!(session.upload_error().is_none());
        session.generate().await.unwrap();
        assert_eq!(session.state().name(), "report_ready");
    }

    #[tokio::test]
    async fn test_inference_failure_moves_to_failed() {
        let analyzer = Arc::new(StubAnalyzer::failing("quota exceeded"));
        let mut session = session(analyzer.clone());

        session.upload("hip.png", test_images::png(4, 4)).unwrap();
        let result = session.generate().await;

        assert!(matches!(result, Err(XrayReportError::Inference(_))));
        assert_eq!(session.state().name(), "failed");
        assert_eq!(session.state().error(), Some("Inference error: quota exceeded"));
        assert!(session.state().can_generate());
    }

    #[tokio::test]
    async fn test_new_upload_discards_report() {
        let analyzer = Arc::new(StubAnalyzer::replying("Risk: high"));
        let mut session = session(analyzer);

        session.upload("a.png", test_images::png(4, 4)).unwrap();
        session.generate().await.unwrap();
        session.upload("b.png", test_images::png(5, 5)).unwrap();

        assert_eq!(session.state().name(), "image_loaded");
        assert!(session.state().report().is_none());
        assert_eq!(session.state().image().unwrap().file_name(), "b.png");
    }

    #[tokio::test]
    async fn test_empty_report_renders_image_only() {
        let analyzer = Arc::new(StubAnalyzer::replying(""));
        let mut session = session(analyzer);

        session.upload("a.png", test_images::png(4, 4)).unwrap();
        session.generate().await.unwrap();

        let document = session.state().document().unwrap();
        assert_eq!(document.paragraph_count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_generate_can_be_retried() {
        let analyzer = Arc::new(StubAnalyzer::replying("Risk: low").after(Duration::from_millis(200)));
        let mut session = session(analyzer.clone());
        session.upload("hip.png", test_images::png(4, 4)).unwrap();

        let abandoned = tokio::time::timeout(Duration::from_millis(10), session.generate()).await;

        assert!(abandoned.is_err());
        assert_eq!(session.state().name(), "failed");
        assert_eq!(session.state().error(), Some(INTERRUPTED));
        assert!(session.state().can_generate());

        session.generate().await.unwrap();

        assert_eq!(analyzer.calls(), 2);
        assert_eq!(session.state().name(), "report_ready");
        assert_eq!(session.state().report().unwrap().text(), "Risk: low");
    }

    #[tokio::test]
    async fn test_rejected_generate_keeps_state() {
        let analyzer = Arc::new(StubAnalyzer::replying("Risk: low"));
        let mut session = session(analyzer.clone());

        let result = session.generate().await;

        assert!(matches!(result, Err(XrayReportError::InvalidState(_))));
        assert_eq!(session.state().name(), "idle");
        assert_eq!(analyzer.calls(), 0);
    }
}
