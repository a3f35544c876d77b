use uuid::Uuid;

/// Free-text narrative returned by the model for one uploaded image.
///
/// The text is opaque; it is only ever split into lines for layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    image_id: Uuid,
    text: String,
}

impl AnalysisReport {
    /// Bind a narrative to the id of the image it describes.
    pub fn new(image_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            image_id,
            text: text.into(),
        }
    }

    pub fn image_id(&self) -> Uuid {
        self.image_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Trimmed non-blank lines, in order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim).filter(|line| !line.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.lines().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_drop_blanks_and_trim() {
        let report = AnalysisReport::new(Uuid::new_v4(), "Risk: low\n\nFollow-up: none");
        assert_eq!(report.lines().collect::<Vec<_>>(), vec!["Risk: low", "Follow-up: none"]);
    }

    #[test]
    fn test_lines_handle_crlf_and_indentation() {
        let report = AnalysisReport::new(Uuid::new_v4(), "  **Findings**\r\n\t\r\n - lytic lesion  \r\n");
        assert_eq!(report.lines().collect::<Vec<_>>(), vec!["**Findings**", "- lytic lesion"]);
    }

    #[test]
    fn test_empty_report() {
        let report = AnalysisReport::new(Uuid::new_v4(), "");
        assert!(report.is_empty());
        assert_eq!(report.lines().count(), 0);

        assert!(AnalysisReport::new(Uuid::new_v4(), " \n \n").is_empty());
    }

    #[test]
    fn test_keeps_image_id() {
        let id = Uuid::new_v4();
        assert_eq!(AnalysisReport::new(id, "x").image_id(), id);
    }
}
