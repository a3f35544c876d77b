//! Word document assembly for the narrative report.
//!
//! The document is built in memory: a title, one paragraph per non-blank
//! report line, a subheading and the X-ray scaled to a fixed width.

use crate::analysis::AnalysisReport;
use crate::error::{Result, XrayReportError};
use crate::ingest::UploadedImage;
use docx_rs::{
    read_docx, DocumentChild, Docx, Paragraph, ParagraphChild, Pic, Run, RunChild, Style,
    StyleType,
};
use std::io::Cursor;
use tracing::info;

pub const EMU_PER_INCH: u32 = 914_400;

const TITLE_STYLE: &str = "Title";
const HEADING_STYLE: &str = "Heading1";

/// A rendered `.docx` ready for download.
///
/// Only [`ReportRenderer::render`] creates one.
#[derive(Debug, Clone)]
pub struct ExportDocument {
    bytes: Vec<u8>,
    paragraph_count: usize,
}

impl ExportDocument {
    pub const FILE_NAME: &'static str = "Sarcoma_Xray_Report.docx";
    pub const MIME_TYPE: &'static str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of narrative paragraphs written.
    pub fn paragraph_count(&self) -> usize {
        self.paragraph_count
    }
}

#[derive(Debug, Clone)]
pub struct ReportRenderer {
    title: String,
    image_heading: String,
    image_width_emu: u32,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self {
            title: "Sarcoma Detection Report (X-ray)".to_string(),
            image_heading: "X-ray Image:".to_string(),
            image_width_emu: 6 * EMU_PER_INCH,
        }
    }
}

impl ReportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the document for a report and the image it was produced from.
    ///
    /// Fails with [`XrayReportError::Render`] when the report belongs to a
    /// different upload or the image cannot be embedded. An empty report
    /// still yields a document holding the title and the image.
    pub fn render(&self, report: &AnalysisReport, image: &UploadedImage) -> Result<ExportDocument> {
        if report.image_id() != image.id() {
            return Err(XrayReportError::Render(
                "report was produced for a different image".to_string(),
            ));
        }

        let (width_px, height_px) = image.dimensions();
        if width_px == 0 || height_px == 0 {
            return Err(XrayReportError::Render("image has no pixels".to_string()));
        }
        let height_emu = u32::try_from(
            u64::from(self.image_width_emu) * u64::from(height_px) / u64::from(width_px),
        )
        .map_err(|_| XrayReportError::Render("image aspect ratio is too tall".to_string()))?;

        let png = image.to_png()?;

        let mut docx = Docx::new()
            .add_style(
                Style::new(TITLE_STYLE, StyleType::Paragraph)
                    .name("Title")
                    .size(56)
                    .bold(),
            )
            .add_style(
                Style::new(HEADING_STYLE, StyleType::Paragraph)
                    .name("Heading 1")
                    .size(32)
                    .bold(),
            )
            .add_paragraph(
                Paragraph::new()
                    .style(TITLE_STYLE)
                    .add_run(Run::new().add_text(self.title.as_str())),
            );

        let mut paragraph_count = 0;
        for line in report.lines() {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)));
            paragraph_count += 1;
        }

        let pic = Pic::new_with_dimensions(png, width_px, height_px)
            .size(self.image_width_emu, height_emu);

        docx = docx
            .add_paragraph(
                Paragraph::new()
                    .style(HEADING_STYLE)
                    .add_run(Run::new().add_text(self.image_heading.as_str())),
            )
            .add_paragraph(Paragraph::new().add_run(Run::new().add_image(pic)));

        let mut cursor = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut cursor)
            .map_err(|e| XrayReportError::Render(format!("failed to write document: {}", e)))?;

        let bytes = cursor.into_inner();
        info!(paragraphs = paragraph_count, bytes = bytes.len(), "Rendered report document");

        Ok(ExportDocument {
            bytes,
            paragraph_count,
        })
    }
}

/// Structural view of a rendered document, read back from its bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentOutline {
    pub title: Option<String>,
    pub headings: Vec<String>,
    pub paragraphs: Vec<String>,
    pub images: usize,
}

impl DocumentOutline {
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let docx = read_docx(bytes)
            .map_err(|e| XrayReportError::Render(format!("failed to read document: {}", e)))?;

        let mut outline = DocumentOutline::default();

        for child in &docx.document.children {
            let DocumentChild::Paragraph(paragraph) = child else {
                continue;
            };

            let mut text = String::new();
            for paragraph_child in &paragraph.children {
                if let ParagraphChild::Run(run) = paragraph_child {
                    for run_child in &run.children {
                        match run_child {
                            RunChild::Text(t) => text.push_str(&t.text),
                            RunChild::Drawing(_) => outline.images += 1,
                            _ => {}
                        }
                    }
                }
            }

            match paragraph.property.style.as_ref().map(|s| s.val.as_str()) {
                Some(TITLE_STYLE) if outline.title.is_none() => outline.title = Some(text),
                Some(style) if style.starts_with("Heading") => outline.headings.push(text),
                _ if !text.is_empty() => outline.paragraphs.push(text),
                _ => {}
            }
        }

        Ok(outline)
    }
}
