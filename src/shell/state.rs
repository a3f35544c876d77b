//! Finite-state model of the interactive shell.

use crate::analysis::AnalysisReport;
use crate::error::XrayReportError;
use crate::ingest::UploadedImage;
use crate::render::ExportDocument;

#[derive(Debug, Default)]
pub enum ShellState {
    #[default]
    Idle,
    ImageLoaded {
        image: UploadedImage,
    },
    Analyzing {
        image: UploadedImage,
    },
    ReportReady {
        image: UploadedImage,
        report: AnalysisReport,
        document: ExportDocument,
    },
    Failed {
        image: UploadedImage,
        error: String,
    },
}

#[derive(Debug)]
pub enum ShellEvent {
    Upload(UploadedImage),
    Generate,
    Completed {
        report: AnalysisReport,
        document: ExportDocument,
    },
    Errored(String),
}

/// An event the state refused, with the state handed back unchanged.
#[derive(Debug)]
pub struct Rejected {
    pub state: ShellState,
    pub error: XrayReportError,
}

impl ShellState {
    /// Apply an event, returning the next state.
    ///
    /// Events that make no sense in the current state are rejected with
    /// [`XrayReportError::InvalidState`] and the original state.
    pub fn apply(self, event: ShellEvent) -> std::result::Result<ShellState, Rejected> {
        match (self, event) {
            (_, ShellEvent::Upload(image)) => Ok(ShellState::ImageLoaded { image }),

            (ShellState::ImageLoaded { image }, ShellEvent::Generate)
            | (ShellState::Failed { image, .. }, ShellEvent::Generate)
            | (ShellState::ReportReady { image, .. }, ShellEvent::Generate) => {
                Ok(ShellState::Analyzing { image })
            }

            (ShellState::Analyzing { image }, ShellEvent::Completed { report, document }) => {
                if report.image_id() != image.id() {
                    return Err(Rejected {
                        state: ShellState::Analyzing { image },
                        error: XrayReportError::InvalidState(
                            "report does not belong to the image being analyzed".to_string(),
                        ),
                    });
                }
                Ok(ShellState::ReportReady {
                    image,
                    report,
                    document,
                })
            }

            (ShellState::Analyzing { image }, ShellEvent::Errored(error)) => {
                Ok(ShellState::Failed { image, error })
            }

            (state, event) => {
                let error = XrayReportError::InvalidState(format!(
                    "{} cannot handle {}",
                    state.name(),
                    event_name(&event)
                ));
                Err(Rejected { state, error })
            }
        }
    }

    /// Snake-case state name, as exposed over HTTP.
    pub fn name(&self) -> &'static str {
        match self {
            ShellState::Idle => "idle",
            ShellState::ImageLoaded { .. } => "image_loaded",
            ShellState::Analyzing { .. } => "analyzing",
            ShellState::ReportReady { .. } => "report_ready",
            ShellState::Failed { .. } => "failed",
        }
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        match self {
            ShellState::Idle => None,
            ShellState::ImageLoaded { image }
            | ShellState::Analyzing { image }
            | ShellState::ReportReady { image, .. }
            | ShellState::Failed { image, .. } => Some(image),
        }
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            ShellState::ReportReady { report, .. } => Some(report),
            _ => None,
        }
    }

    pub fn document(&self) -> Option<&ExportDocument> {
        match self {
            ShellState::ReportReady { document, .. } => Some(document),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ShellState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn can_generate(&self) -> bool {
        matches!(
            self,
            ShellState::ImageLoaded { .. } | ShellState::Failed { .. } | ShellState::ReportReady { .. }
        )
    }
}

fn event_name(event: &ShellEvent) -> &'static str {
    match event {
        ShellEvent::Upload(_) => "upload",
        ShellEvent::Generate => "generate",
        ShellEvent::Completed { .. } => "completed",
        ShellEvent::Errored(_) => "errored",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::test_images;
    use crate::render::ReportRenderer;

    fn image() -> UploadedImage {
        UploadedImage::from_upload("x.png", test_images::png(4, 4)).unwrap()
    }

    fn completed_for(image: &UploadedImage) -> ShellEvent {
        let report = AnalysisReport::new(image.id(), "Risk: low");
        let document = ReportRenderer::new().render(&report, image).unwrap();
        ShellEvent::Completed { report, document }
    }

    #[test]
    fn test_starts_idle() {
        let state = ShellState::default();
        assert_eq!(state.name(), "idle");
        assert!(state.image().is_none());
        assert!(!state.can_generate());
    }

    #[test]
    fn test_happy_path() {
        let img = image();
        let done = completed_for(&img);

        let state = ShellState::Idle.apply(ShellEvent::Upload(img)).unwrap();
        assert_eq!(state.name(), "image_loaded");

        let state = state.apply(ShellEvent::Generate).unwrap();
        assert_eq!(state.name(), "analyzing");

        let state = state.apply(done).unwrap();
        assert_eq!(state.name(), "report_ready");
        assert!(state.report().is_some());
        assert!(state.document().is_some());
    }

    #[test]
    fn test_error_during_analysis_fails_and_can_retry() {
        let state = ShellState::Idle
            .apply(ShellEvent::Upload(image()))
            .unwrap()
            .apply(ShellEvent::Generate)
            .unwrap()
            .apply(ShellEvent::Errored("Inference error: quota".to_string()))
            .unwrap();

        assert_eq!(state.name(), "failed");
        assert_eq!(state.error(), Some("Inference error: quota"));
        assert!(state.image().is_some());
        assert!(state.can_generate());

        let state = state.apply(ShellEvent::Generate).unwrap();
        assert_eq!(state.name(), "analyzing");
    }

    #[test]
    fn test_upload_discards_previous_report() {
        let img = image();
        let done = completed_for(&img);
        let ready = ShellState::Idle
            .apply(ShellEvent::Upload(img))
            .unwrap()
            .apply(ShellEvent::Generate)
            .unwrap()
            .apply(done)
            .unwrap();

        let replacement = image();
        let replacement_id = replacement.id();
        let state = ready.apply(ShellEvent::Upload(replacement)).unwrap();

        assert_eq!(state.name(), "image_loaded");
        assert!(state.report().is_none());
        assert_eq!(state.image().unwrap().id(), replacement_id);
    }

    #[test]
    fn test_generate_without_image_is_rejected() {
        let result = ShellState::Idle.apply(ShellEvent::Generate);
        assert!(matches!(
            result,
            Err(Rejected {
                state: ShellState::Idle,
                error: XrayReportError::InvalidState(_),
            })
        ));
    }

    #[test]
    fn test_generate_while_analyzing_is_rejected() {
        let analyzing = ShellState::Analyzing { image: image() };
        assert!(analyzing.apply(ShellEvent::Generate).is_err());
    }

    #[test]
    fn test_completion_outside_analysis_is_rejected() {
        let img = image();
        let done = completed_for(&img);
        let state = ShellState::ImageLoaded { image: img };
        assert!(state.apply(done).is_err());
    }

    #[test]
    fn test_completion_for_other_image_is_rejected() {
        let other = image();
        let done = completed_for(&other);
        let img = image();
        let id = img.id();
        let state = ShellState::Analyzing { image: img };

        let rejected = state.apply(done).unwrap_err();

        assert!(matches!(rejected.error, XrayReportError::InvalidState(_)));
        assert_eq!(rejected.state.name(), "analyzing");
        assert_eq!(rejected.state.image().unwrap().id(), id);
    }

    #[test]
    fn test_rejected_event_hands_back_loaded_image() {
        let img = image();
        let id = img.id();

        let rejected = ShellState::ImageLoaded { image: img }
            .apply(ShellEvent::Errored("late".to_string()))
            .unwrap_err();

        assert_eq!(rejected.state.name(), "image_loaded");
        assert_eq!(rejected.state.image().unwrap().id(), id);
        assert!(rejected.error.to_string().contains("image_loaded cannot handle errored"));
    }
}
