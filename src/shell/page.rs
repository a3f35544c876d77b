//! Server-rendered HTML for the single page.

use crate::ingest::ImageFormat;
use crate::shell::session::Session;
use crate::shell::state::ShellState;
use pulldown_cmark::{html, Event, Parser, Tag};

const TITLE: &str = "AI-Based Sarcoma Detection from X-ray";
const INTRO: &str = "Upload an X-ray image and let AI generate a detailed sarcoma detection report.";
const ERROR_PREFIX: &str = "Something went wrong: ";

pub fn render_page(session: &Session) -> String {
    let state = session.state();
    let mut body = String::new();

    body.push_str(&upload_form());

    if let Some(error) = session.upload_error() {
        body.push_str(&error_box(error));
    }

    if let Some(image) = state.image() {
        body.push_str(&format!(
            r#"<figure><img class="xray" src="/image?v={id}" alt="Uploaded X-ray"><figcaption>Uploaded X-ray</figcaption></figure>"#,
            id = image.id(),
        ));
    }

    if state.can_generate() {
        body.push_str(
            r#"<form method="post" action="/generate" onsubmit="document.getElementById('spinner').hidden=false;this.querySelector('button').disabled=true;">
<button type="submit">&#128269; Generate Report</button>
<p id="spinner" class="spinner" hidden>Analyzing the X-ray image...</p>
</form>"#,
        );
    }

    match state {
        ShellState::Analyzing { .. } => {
            body.push_str(r#"<p class="spinner">Analyzing the X-ray image...</p>"#);
        }
        ShellState::Failed { error, .. } => body.push_str(&error_box(error)),
        ShellState::ReportReady { report, .. } => {
            body.push_str(r#"<div class="success">Analysis Complete!</div>"#);
            body.push_str("<h2>&#128221; Report</h2>");
            body.push_str(r#"<div class="report">"#);
            body.push_str(&markdown_to_html(report.text()));
            body.push_str("</div>");
            body.push_str(r#"<a class="download" href="/report" download>&#128196; Download Report</a>"#);
        }
        ShellState::Idle | ShellState::ImageLoaded { .. } => {}
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 800px; margin: 2rem auto; padding: 0 1rem; color: #262730; }}
.xray {{ width: 100%; }}
figcaption {{ text-align: center; color: #6b7280; font-size: 0.875rem; }}
.error {{ background: #fde2e2; color: #7d1a1a; border-radius: 8px; padding: 0.75rem 1rem; margin: 1rem 0; }}
.success {{ background: #dcf5e3; color: #17572a; border-radius: 8px; padding: 0.75rem 1rem; margin: 1rem 0; }}
.spinner {{ color: #6b7280; font-style: italic; }}
.report {{ line-height: 1.6; }}
.download {{ display: inline-block; margin-top: 1rem; padding: 0.5rem 1rem; border: 1px solid #d1d5db; border-radius: 8px; text-decoration: none; }}
</style>
</head>
<body>
<h1>&#129755; {title}</h1>
<p>{intro}</p>
{body}
</body>
</html>"#,
        title = TITLE,
        intro = INTRO,
        body = body,
    )
}

fn upload_form() -> String {
    let accept = ImageFormat::ACCEPTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        r#"<form method="post" action="/upload" enctype="multipart/form-data">
<label for="file">Upload X-ray Image (JPG or PNG)</label>
<input id="file" type="file" name="file" accept="{accept}" onchange="this.form.submit()" required>
<noscript><button type="submit">Upload</button></noscript>
</form>"#,
    )
}

fn error_box(error: &str) -> String {
    format!(
        r#"<div class="error">{}{}</div>"#,
        ERROR_PREFIX,
        html_escape(error)
    )
}

/// Render the narrative as Markdown.
///
/// Raw HTML from the model is shown as text. Links and images whose target
/// is not http, https, mailto or relative are unwrapped, leaving only their
/// text.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new(markdown).filter_map(|event| match event {
        Event::Html(raw) => Some(Event::Text(raw)),
        Event::Start(Tag::Link(_, ref dest, _))
        | Event::End(Tag::Link(_, ref dest, _))
        | Event::Start(Tag::Image(_, ref dest, _))
        | Event::End(Tag::Image(_, ref dest, _))
            if !is_safe_url(dest) =>
        {
            None
        }
        other => Some(other),
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn is_safe_url(dest: &str) -> bool {
    // Browsers ignore whitespace and control characters inside a scheme.
    let cleaned: String = dest
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();

    match cleaned.find([':', '/', '?', '#']) {
        Some(at) if cleaned[at..].starts_with(':') => {
            let scheme = cleaned[..at].to_ascii_lowercase();
            matches!(scheme.as_str(), "http" | "https" | "mailto")
        }
        _ => true,
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
