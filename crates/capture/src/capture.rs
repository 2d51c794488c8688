// ABOUTME: Orchestrator for the capture pipeline: fetch, exclude, extract, convert, write.
// ABOUTME: Defines CaptureRequest and the CaptureResult/DryRunResult outputs.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use dom_query::Document;

use crate::config::Config;
use crate::convert::convert_html_to_markdown;
use crate::error::CaptureError;
use crate::exclude::{
    apply_exclusions, log_exclusion_error, log_exclusion_warnings, ExclusionResult,
};
use crate::extract::extract_content;
use crate::fetch::{fetch_source, FetchOptions};
use crate::metadata::{extract_metadata, ArticleMetadata};
use crate::naming::generate_full_path;
use crate::write::{create_note_file, generate_front_matter, FrontMatter};

/// Input parameters for one capture operation.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub url_or_path: String,
    pub vault_path: PathBuf,
    pub config: Config,
    pub timeout: Duration,
    pub max_size: u64,
    pub dry_run: bool,
    pub allow_private_networks: bool,
}

/// Result of a successful capture that wrote a note file.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub url: String,
    pub file_path: PathBuf,
    pub selector_used: String,
    pub extracted_chars: usize,
    pub markdown_chars: usize,
    pub elapsed: Duration,
    pub front_matter: FrontMatter,
    pub metadata: ArticleMetadata,
    pub retrieved_at: DateTime<Local>,
    pub exclusions_applied: usize,
    pub elements_excluded: usize,
    pub exclusion_elapsed: Option<Duration>,
}

/// Result of a dry-run preview; nothing was written.
#[derive(Debug, Clone)]
pub struct DryRunResult {
    pub url: String,
    pub proposed_filename: String,
    pub selector_used: String,
    pub extracted_chars: usize,
    pub markdown_chars: usize,
    pub elapsed: Duration,
    pub front_matter: FrontMatter,
    pub metadata: ArticleMetadata,
}

/// Either outcome of a capture invocation.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Written(Box<CaptureResult>),
    DryRun(Box<DryRunResult>),
}

/// Run the exclusion step as best-effort: any failure is logged and the
/// document proceeds as it stood before exclusion was attempted (the cap
/// check runs before any mutation, so the tree is intact on error).
fn run_exclusions(doc: &Document, selectors: &[String]) -> (Option<ExclusionResult>, Duration) {
    let started = Instant::now();
    match apply_exclusions(doc, selectors) {
        Ok(result) => {
            let elapsed = started.elapsed();
            log_exclusion_warnings(&result);
            (Some(result), elapsed)
        }
        Err(err) => {
            log_exclusion_error(&err);
            (None, started.elapsed())
        }
    }
}

/// Orchestrate the complete capture: fetch the source, apply configured
/// exclusions to the parsed document, extract the content region, gather
/// metadata from the pristine source, convert to Markdown, and write the
/// note (or preview it for a dry run).
pub async fn capture(request: &CaptureRequest) -> Result<CaptureOutcome, CaptureError> {
    let started = Instant::now();

    let fetch_opts = FetchOptions {
        timeout: request.timeout,
        max_size: request.max_size,
        allow_private_networks: request.allow_private_networks,
        ..Default::default()
    };
    let source = fetch_source(&request.url_or_path, &fetch_opts).await?;

    let doc = Document::from(source.content.as_str());

    let mut exclusion_result: Option<ExclusionResult> = None;
    let mut exclusion_elapsed: Option<Duration> = None;
    if !request.config.exclusion_selectors.is_empty() {
        let (result, elapsed) = run_exclusions(&doc, &request.config.exclusion_selectors);
        if result.is_some() {
            exclusion_elapsed = Some(elapsed);
        }
        exclusion_result = result;
    }

    let extraction = extract_content(
        &doc,
        &request.config.selectors,
        request.config.min_content_chars,
    )?;

    // Metadata comes from the source as fetched, before exclusions.
    let metadata = extract_metadata(&source.content, &request.url_or_path);

    let base_url = if crate::fetch::is_url(&request.url_or_path) {
        Some(request.url_or_path.as_str())
    } else {
        None
    };
    let markdown_content = convert_html_to_markdown(&extraction.html_fragment, base_url)?;

    let retrieved_at = Local::now();
    let file_path = generate_full_path(
        &request.vault_path,
        metadata.title.as_deref(),
        &request.url_or_path,
        request.config.subfolder.as_deref(),
        request.config.overwrite,
        retrieved_at,
    )?;

    if request.dry_run {
        let front_matter = generate_front_matter(
            &metadata,
            &request.config,
            &request.url_or_path,
            &extraction.selector,
            retrieved_at,
            Some(&source.content),
        );

        return Ok(CaptureOutcome::DryRun(Box::new(DryRunResult {
            url: request.url_or_path.clone(),
            proposed_filename: file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            selector_used: extraction.selector,
            extracted_chars: extraction.character_count,
            markdown_chars: markdown_content.chars().count(),
            elapsed: started.elapsed(),
            front_matter,
            metadata,
        })));
    }

    let front_matter = create_note_file(
        &file_path,
        &metadata,
        &request.config,
        &markdown_content,
        &request.url_or_path,
        &extraction.selector,
        retrieved_at,
        Some(&source.content),
    )?;

    let (exclusions_applied, elements_excluded) = exclusion_result
        .as_ref()
        .map(|r| (r.summary.selectors_processed, r.summary.elements_removed))
        .unwrap_or((0, 0));

    Ok(CaptureOutcome::Written(Box::new(CaptureResult {
        url: request.url_or_path.clone(),
        file_path,
        selector_used: extraction.selector,
        extracted_chars: extraction.character_count,
        markdown_chars: markdown_content.chars().count(),
        elapsed: started.elapsed(),
        front_matter,
        metadata,
        retrieved_at,
        exclusions_applied,
        elements_excluded,
        exclusion_elapsed,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PAGE: &str = "<html><head><title>Capture Test Page</title>\
        <meta name=\"keywords\" content=\"testing, capture\"></head><body>\
        <nav class=\"menu\">Home | About</nav>\
        <article><h1>Capture Test Page</h1>\
        <p>This paragraph carries more than enough text to clear the default \
        minimum content length used by the extraction step.</p>\
        <div class=\"advertisement\">Buy things!</div></article>\
        <footer>footer text</footer></body></html>";

    fn write_page(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("page.html");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{PAGE}").unwrap();
        path
    }

    fn request(page: &std::path::Path, vault: &std::path::Path, config: Config) -> CaptureRequest {
        CaptureRequest {
            url_or_path: page.to_string_lossy().into_owned(),
            vault_path: vault.to_path_buf(),
            config,
            timeout: Duration::from_secs(5),
            max_size: 2_000_000,
            dry_run: false,
            allow_private_networks: false,
        }
    }

    #[tokio::test]
    async fn capture_local_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let vault = tempfile::tempdir().unwrap();
        let page = write_page(&dir);

        let outcome = capture(&request(&page, vault.path(), Config::default()))
            .await
            .expect("capture succeeds");

        let CaptureOutcome::Written(result) = outcome else {
            panic!("expected a written result");
        };
        assert_eq!(result.selector_used, "article");
        assert!(result.file_path.exists());
        assert_eq!(result.exclusions_applied, 0);

        let written = std::fs::read_to_string(&result.file_path).unwrap();
        assert!(written.starts_with("---\n"));
        assert!(written.contains("Capture Test Page"));
        assert!(written.contains("minimum content length"));
    }

    #[tokio::test]
    async fn capture_applies_exclusions() {
        let dir = tempfile::tempdir().unwrap();
        let vault = tempfile::tempdir().unwrap();
        let page = write_page(&dir);

        let config = Config {
            exclusion_selectors: vec![".advertisement".to_string(), ".menu".to_string()],
            ..Config::default()
        };
        let outcome = capture(&request(&page, vault.path(), config))
            .await
            .expect("capture succeeds");

        let CaptureOutcome::Written(result) = outcome else {
            panic!("expected a written result");
        };
        assert_eq!(result.exclusions_applied, 2);
        assert_eq!(result.elements_excluded, 2);
        assert!(result.exclusion_elapsed.is_some());

        let written = std::fs::read_to_string(&result.file_path).unwrap();
        assert!(!written.contains("Buy things!"));
        assert!(written.contains("minimum content length"));
    }

    #[tokio::test]
    async fn capture_proceeds_when_cap_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let vault = tempfile::tempdir().unwrap();
        let page = write_page(&dir);

        let config = Config {
            exclusion_selectors: (0..101).map(|i| format!(".c{i}")).collect(),
            ..Config::default()
        };
        let outcome = capture(&request(&page, vault.path(), config))
            .await
            .expect("cap failure is best-effort");

        let CaptureOutcome::Written(result) = outcome else {
            panic!("expected a written result");
        };
        // Exclusion was skipped entirely; the document is untouched.
        assert_eq!(result.exclusions_applied, 0);
        assert_eq!(result.elements_excluded, 0);
        let written = std::fs::read_to_string(&result.file_path).unwrap();
        assert!(written.contains("Buy things!"));
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let vault = tempfile::tempdir().unwrap();
        let page = write_page(&dir);

        let mut req = request(&page, vault.path(), Config::default());
        req.dry_run = true;
        let outcome = capture(&req).await.expect("dry run succeeds");

        let CaptureOutcome::DryRun(result) = outcome else {
            panic!("expected a dry-run result");
        };
        assert_eq!(result.proposed_filename, "capture-test-page.md");
        assert!(result.front_matter.contains_key("source"));

        // Only the (empty) date bucket may exist; no note files.
        let mut md_files = Vec::new();
        for entry in walk(vault.path()) {
            if entry.extension().is_some_and(|e| e == "md") {
                md_files.push(entry);
            }
        }
        assert!(md_files.is_empty(), "dry run must not write notes");
    }

    #[tokio::test]
    async fn capture_fails_without_matching_selector() {
        let dir = tempfile::tempdir().unwrap();
        let vault = tempfile::tempdir().unwrap();
        let page = write_page(&dir);

        let config = Config {
            selectors: vec!["#does-not-exist".to_string()],
            ..Config::default()
        };
        let err = capture(&request(&page, vault.path(), config))
            .await
            .expect_err("no selector matches");
        assert_eq!(err.code(), "NO_SELECTOR_MATCH");
        assert_eq!(err.exit_code(), 2);
    }

    fn walk(dir: &std::path::Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    files.extend(walk(&path));
                } else {
                    files.push(path);
                }
            }
        }
        files
    }
}
