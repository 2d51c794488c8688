// ABOUTME: Rendering of capture results and errors for CLI output.
// ABOUTME: Supports human-readable text and machine-readable JSON formats.

use std::fmt;
use std::str::FromStr;

use serde_json::json;

use crate::capture::{CaptureResult, DryRunResult};
use crate::error::CaptureError;

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render a successful capture as human-readable text.
pub fn format_success_text(result: &CaptureResult) -> String {
    let mut lines = vec![
        format!("Captured: {}", result.url),
        format!("  Saved to: {}", result.file_path.display()),
        format!("  Selector: {}", result.selector_used),
        format!(
            "  Content: {} chars -> {} chars markdown",
            result.extracted_chars, result.markdown_chars
        ),
        format!("  Elapsed: {}ms", result.elapsed.as_millis()),
    ];
    if result.exclusions_applied > 0 {
        lines.push(format!(
            "  Exclusions: {} selectors, {} elements removed",
            result.exclusions_applied, result.elements_excluded
        ));
    }
    lines.join("\n")
}

/// Render a successful capture as JSON.
pub fn format_success_json(result: &CaptureResult) -> String {
    let mut payload = json!({
        "status": "ok",
        "url": result.url,
        "filename": result.file_path.file_name().map(|n| n.to_string_lossy().into_owned()),
        "path": result.file_path.display().to_string(),
        "selector": result.selector_used,
        "extracted_chars": result.extracted_chars,
        "markdown_chars": result.markdown_chars,
        "elapsed_ms": result.elapsed.as_millis() as u64,
        "exclusions_applied": result.exclusions_applied,
        "elements_excluded": result.elements_excluded,
        "fields": serde_json::to_value(&result.front_matter).unwrap_or_default(),
    });

    if let Some(exclusion_elapsed) = result.exclusion_elapsed {
        payload["exclusion_elapsed_ms"] = json!(exclusion_elapsed.as_millis() as u64);
    }
    if let Some(published_at) = &result.metadata.published_at {
        payload["published_at"] = json!(published_at);
    }
    if let Some(author) = &result.metadata.author {
        payload["author"] = json!(author);
    }

    payload.to_string()
}

/// Render a dry-run preview as human-readable text.
pub fn format_dry_run_text(result: &DryRunResult) -> String {
    let front_matter_yaml = serde_yaml::to_string(&result.front_matter)
        .unwrap_or_default()
        .trim_end()
        .to_string();

    let mut out = vec![
        "DRY RUN PREVIEW".to_string(),
        "=".repeat(50),
        format!("Proposed filename: {}", result.proposed_filename),
        format!("Selector used: {}", result.selector_used),
        format!("Content length: {} characters", result.markdown_chars),
        format!("Processing time: {}ms", result.elapsed.as_millis()),
        String::new(),
        "FRONT MATTER PREVIEW:".to_string(),
        "---".to_string(),
        front_matter_yaml,
        "---".to_string(),
        String::new(),
    ];
    out.push("This was a preview only - no files were written.".to_string());
    out.push("Remove --dry to actually capture the article.".to_string());
    out.join("\n")
}

/// Render a dry-run preview as JSON.
pub fn format_dry_run_json(result: &DryRunResult) -> String {
    json!({
        "status": "dry_run_preview",
        "url": result.url,
        "proposed_filename": result.proposed_filename,
        "selector_used": result.selector_used,
        "content_stats": {
            "extracted_chars": result.extracted_chars,
            "markdown_chars": result.markdown_chars,
        },
        "elapsed_ms": result.elapsed.as_millis() as u64,
        "front_matter": serde_json::to_value(&result.front_matter).unwrap_or_default(),
        "metadata": {
            "title": result.metadata.title,
            "author": result.metadata.author,
            "published_at": result.metadata.published_at,
            "description": result.metadata.description,
            "site_name": result.metadata.site_name,
        },
    })
    .to_string()
}

/// Render an error as human-readable text.
pub fn format_error_text(error: &CaptureError) -> String {
    format!("Error: {error}")
}

/// Render an error as JSON with request context.
pub fn format_error_json(error: &CaptureError, url: &str, elapsed_ms: u64) -> String {
    let mut payload = json!({
        "status": "error",
        "message": error.to_string(),
        "code": error.code(),
        "url": url,
        "elapsed_ms": elapsed_ms,
    });

    if let CaptureError::NoSelectorMatch { attempted, .. } = error {
        payload["selector_attempts"] = json!(attempted);
    }

    payload.to_string()
}
