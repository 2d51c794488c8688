// ABOUTME: Selector-based element exclusion applied to the parsed document before extraction.
// ABOUTME: Validates user-supplied CSS selectors, removes matches in place, and tracks outcomes.

//! Element exclusion by CSS selectors.
//!
//! User configuration may carry an ordered list of CSS selectors whose
//! matches should be removed from the document before content extraction.
//! This module validates those selectors (syntax, protected roots, a hard
//! cap on intake volume), applies them in order against the live tree, and
//! folds per-selector outcomes into a summary with removal-ratio and
//! empty-primary-content warnings.
//!
//! Key behaviors:
//! - Selectors run in input order; later selectors see earlier removals.
//! - A selector that fails validation or execution is recorded as a failed
//!   outcome and skipped, never fatal.
//! - Only the selector-count cap aborts the exclusion step, via
//!   [`TooManySelectorsError`]; the caller decides whether to proceed with
//!   the unmodified document.

use dom_query::{Document, Matcher, Selection};
use once_cell::sync::Lazy;
use regex::Regex;

/// Selectors identifying primary content landmarks, probed in order.
pub const PRIMARY_CONTENT_SELECTORS: &[&str] = &["article", "main", r#"[role="main"]"#];

/// Hard cap on the number of exclusion selectors accepted per run.
///
/// The cap is on raw intake volume (duplicates and invalid strings count),
/// a guard against unbounded work rather than a limit on distinct rules.
pub const MAX_EXCLUSION_SELECTORS: usize = 100;

/// Removal ratio at or above which a warning is emitted.
const HIGH_REMOVAL_THRESHOLD: f64 = 0.4;

/// Log target for all exclusion diagnostics, for downstream filtering.
const LOG_TARGET: &str = "clipvault::exclude";

/// Tags that make an element count as having meaningful content even
/// without text, links, or images.
const RICH_CONTENT_SELECTOR: &str = "video, audio, iframe, form, table, canvas, svg";

// Leading-token match for the document roots; `\b` keeps `div.body` and
// `html5-player` out while catching `html.foo`, `body *`, etc.
static PROTECTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:html|body)\b").expect("protected-selector pattern"));

/// Raised when the selector count exceeds [`MAX_EXCLUSION_SELECTORS`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("too many exclusion selectors: {count} provided, limit is {limit}")]
pub struct TooManySelectorsError {
    pub count: usize,
    pub limit: usize,
}

/// Result of applying a single exclusion selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorOutcome {
    pub selector: String,
    pub success: bool,
    pub elements_removed: usize,
    pub error_message: Option<String>,
}

impl SelectorOutcome {
    fn succeeded(selector: &str, elements_removed: usize) -> Self {
        Self {
            selector: selector.to_string(),
            success: true,
            elements_removed,
            error_message: None,
        }
    }

    fn failed(selector: &str, reason: impl Into<String>) -> Self {
        Self {
            selector: selector.to_string(),
            success: false,
            elements_removed: 0,
            error_message: Some(reason.into()),
        }
    }
}

/// Aggregate statistics for one exclusion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionSummary {
    pub selectors_processed: usize,
    pub elements_removed: usize,
    pub original_element_count: usize,
    pub successful_selectors: usize,
    pub failed_selectors: usize,
    pub empty_primary_content_warning: bool,
}

impl ExclusionSummary {
    /// Ratio of removed elements to the pre-removal census.
    ///
    /// Defined as 0.0 for an empty document.
    pub fn removal_ratio(&self) -> f64 {
        if self.original_element_count == 0 {
            return 0.0;
        }
        self.elements_removed as f64 / self.original_element_count as f64
    }

    /// True when the removal ratio reaches the warning threshold (40%).
    pub fn high_removal_warning(&self) -> bool {
        self.removal_ratio() >= HIGH_REMOVAL_THRESHOLD
    }
}

/// Result of applying exclusion selectors to a document.
///
/// The document itself is mutated in place through the caller's handle, so
/// it is not re-carried here.
#[derive(Debug, Clone)]
pub struct ExclusionResult {
    pub summary: ExclusionSummary,
    pub outcomes: Vec<SelectorOutcome>,
}

/// A selector rejected during validation, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedSelector {
    pub selector: String,
    pub reason: String,
}

/// Result of batch selector validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub valid: Vec<String>,
    pub invalid: Vec<RejectedSelector>,
    pub total_count: usize,
    /// Vestigial: the cap is enforced through the error path of
    /// [`validate_selectors`], so this is always false on normal return.
    pub cap_exceeded: bool,
}

/// Check if a CSS selector targets a protected root element (html, body).
///
/// Only the leading token of the selector is considered; a nested
/// reference like `div.body` is not protected. Case-insensitive.
pub fn is_protected_selector(selector: &str) -> bool {
    let trimmed = selector.trim().to_lowercase();
    if trimmed.is_empty() {
        return false;
    }
    PROTECTED_RE.is_match(&trimmed)
}

/// Validate a list of CSS selectors against the cap, the protected-root
/// rule, and selector syntax, preserving input order in both partitions.
///
/// The cap check runs before any per-selector classification and counts
/// every entry, duplicates and malformed strings included. Per selector,
/// protection is checked before syntax so a broken selector starting with
/// `html` still reports as protected.
pub fn validate_selectors(
    selectors: &[String],
    max_selectors: usize,
) -> Result<ValidationResult, TooManySelectorsError> {
    let total_count = selectors.len();
    if total_count > max_selectors {
        return Err(TooManySelectorsError {
            count: total_count,
            limit: max_selectors,
        });
    }

    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for selector in selectors {
        if selector.is_empty() {
            invalid.push(RejectedSelector {
                selector: selector.clone(),
                reason: "empty or invalid selector".to_string(),
            });
            continue;
        }

        if is_protected_selector(selector) {
            invalid.push(RejectedSelector {
                selector: selector.clone(),
                reason: "protected selector (html/body cannot be excluded)".to_string(),
            });
            continue;
        }

        match Matcher::new(selector) {
            Ok(matcher) => {
                // Probe against a trivial tree so the selector is known to
                // both compile and execute before it meets the real document.
                let scratch = Document::from("<div></div>");
                let _ = scratch.select_matcher(&matcher);
                valid.push(selector.clone());
            }
            Err(err) => {
                invalid.push(RejectedSelector {
                    selector: selector.clone(),
                    reason: format!("invalid selector syntax: {err:?}"),
                });
            }
        }
    }

    Ok(ValidationResult {
        valid,
        invalid,
        total_count,
        cap_exceeded: false,
    })
}

/// Apply exclusion selectors to a document, removing every match in place.
///
/// Selectors are validated first; a [`TooManySelectorsError`] propagates to
/// the caller before any mutation. Valid selectors execute in input order
/// against the live tree, so later selectors observe earlier removals. Each
/// outcome records the match count of its own query, taken before removal
/// begins for that query. Rejected selectors are appended as failed
/// outcomes after the executed ones.
pub fn apply_exclusions(
    doc: &Document,
    selectors: &[String],
) -> Result<ExclusionResult, TooManySelectorsError> {
    // Census before any mutation.
    let original_element_count = doc.select("*").length();

    let validation = validate_selectors(selectors, MAX_EXCLUSION_SELECTORS)?;

    let mut outcomes = Vec::with_capacity(validation.total_count);

    for selector in &validation.valid {
        match Matcher::new(selector) {
            Ok(matcher) => {
                let matches = doc.select_matcher(&matcher);
                let elements_removed = matches.length();
                matches.remove();
                outcomes.push(SelectorOutcome::succeeded(selector, elements_removed));
            }
            Err(err) => {
                // Validation already probed this selector; reaching here
                // means the query engine rejected it on the real document.
                outcomes.push(SelectorOutcome::failed(
                    selector,
                    format!("failed to apply selector: {err:?}"),
                ));
            }
        }
    }

    for rejected in &validation.invalid {
        outcomes.push(SelectorOutcome::failed(
            &rejected.selector,
            rejected.reason.clone(),
        ));
    }

    let summary = aggregate_exclusion_summary(&outcomes, original_element_count, doc);

    Ok(ExclusionResult { summary, outcomes })
}

/// Check if an element carries meaningful content: an image, a hyperlink,
/// non-whitespace text, or one of the rich-content tags.
pub fn has_meaningful_content(element: &Selection) -> bool {
    if element.select("img").exists() {
        return true;
    }
    if element.select("a").exists() {
        return true;
    }
    if !element.text().trim().is_empty() {
        return true;
    }
    element.select(RICH_CONTENT_SELECTOR).exists()
}

/// Inverse of [`has_meaningful_content`]: purely-structural wrappers with
/// no text, links, images, or rich-content descendants are empty.
pub fn is_content_element_empty(element: &Selection) -> bool {
    !has_meaningful_content(element)
}

/// Detect whether the document's primary content landmarks are all empty.
///
/// Collects every match of every landmark selector. No landmarks at all is
/// a warning condition; otherwise a single non-empty landmark clears the
/// warning, since pages legitimately carry empty template leftovers next to
/// the populated container.
pub fn detect_empty_primary_content(doc: &Document) -> bool {
    for css in PRIMARY_CONTENT_SELECTORS {
        let matches = doc.select(css);
        for element in matches.iter() {
            if has_meaningful_content(&element) {
                return false;
            }
        }
    }

    // No landmarks at all, or every landmark empty: both warn.
    true
}

/// Fold per-selector outcomes into an [`ExclusionSummary`].
///
/// The empty-primary check always runs against the (mutated) document,
/// whether or not anything was removed.
pub fn aggregate_exclusion_summary(
    outcomes: &[SelectorOutcome],
    original_count: usize,
    doc: &Document,
) -> ExclusionSummary {
    let selectors_processed = outcomes.len();
    let successful_selectors = outcomes.iter().filter(|o| o.success).count();
    let failed_selectors = selectors_processed - successful_selectors;
    let elements_removed = outcomes.iter().map(|o| o.elements_removed).sum();

    ExclusionSummary {
        selectors_processed,
        elements_removed,
        original_element_count: original_count,
        successful_selectors,
        failed_selectors,
        empty_primary_content_warning: detect_empty_primary_content(doc),
    }
}

/// Emit warnings and a summary line for an exclusion run.
///
/// Pure render step over already-computed data; performs no decisions and
/// cannot fail. All events carry the exclusion log target.
pub fn log_exclusion_warnings(result: &ExclusionResult) {
    let summary = &result.summary;

    for outcome in result.outcomes.iter().filter(|o| !o.success) {
        tracing::warn!(
            target: LOG_TARGET,
            selector = %outcome.selector,
            error = outcome.error_message.as_deref().unwrap_or(""),
            "exclusion selector failed"
        );
    }

    if summary.high_removal_warning() {
        tracing::warn!(
            target: LOG_TARGET,
            removal_ratio = summary.removal_ratio(),
            elements_removed = summary.elements_removed,
            original_count = summary.original_element_count,
            "high removal ratio: {:.1}% of elements removed ({}/{})",
            summary.removal_ratio() * 100.0,
            summary.elements_removed,
            summary.original_element_count,
        );
    }

    if summary.empty_primary_content_warning {
        tracing::warn!(
            target: LOG_TARGET,
            elements_removed = summary.elements_removed,
            "primary content elements (article, main) appear to be empty after exclusions"
        );
    }

    if summary.elements_removed > 0 {
        tracing::info!(
            target: LOG_TARGET,
            selectors_processed = summary.selectors_processed,
            successful_selectors = summary.successful_selectors,
            failed_selectors = summary.failed_selectors,
            elements_removed = summary.elements_removed,
            removal_ratio = summary.removal_ratio(),
            "exclusion summary: {}/{} selectors successful, {} elements removed ({:.1}% of document)",
            summary.successful_selectors,
            summary.selectors_processed,
            summary.elements_removed,
            summary.removal_ratio() * 100.0,
        );
    }
}

/// Log a selector-cap failure. The caller is expected to proceed with the
/// unmodified document afterwards.
pub fn log_exclusion_error(error: &TooManySelectorsError) {
    tracing::warn!(
        target: LOG_TARGET,
        selector_count = error.count,
        limit = error.limit,
        "too many exclusion selectors provided: {}",
        error,
    );
}
