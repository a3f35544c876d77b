use chrono::{Local, NaiveDate};

const TEMPLATE: &str = "\
Analyze this X-ray image and generate a detailed medical report focusing on *sarcoma detection*. The report should include:
1. *Possible signs of sarcoma* (bone/soft tissue abnormalities, tumor growth, calcifications).
2. *Risk assessment* (low, medium, high).
3. *Possible differential diagnoses* (other conditions that may mimic sarcoma).
4. *Recommended next steps* (further imaging, biopsy, specialist consultation).
5. *Caution and disclaimer* for AI-based analysis.
6. *Reporting date:* {date}.
";

/// The instruction sent alongside the image.
///
/// Only the reporting date varies; no user text is ever interpolated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPrompt {
    text: String,
}

impl AnalysisPrompt {
    pub fn for_date(date: NaiveDate) -> Self {
        let text = TEMPLATE.replace("{date}", &date.format("%Y-%m-%d").to_string());
        Self { text }
    }

    /// Prompt dated with the local calendar day.
    pub fn today() -> Self {
        Self::for_date(Local::now().date_naive())
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
