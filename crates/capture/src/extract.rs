// ABOUTME: Content region extraction using an ordered CSS selector list.
// ABOUTME: Returns the first matching element whose text meets the minimum length requirement.

use dom_query::{Document, Matcher};

use crate::error::CaptureError;

/// Result of content extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub html_fragment: String,
    pub text_content: String,
    pub selector: String,
    pub character_count: usize,
    pub attempted_selectors: Vec<String>,
}

/// Collapse whitespace runs into single spaces and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the primary content region from a document.
///
/// Selectors are tried in order against the document as it currently stands
/// (exclusions, if any, have already mutated it). For each selector, every
/// matching element is considered in document order; the first whose
/// whitespace-normalized text reaches `min_chars` wins. Selectors that fail
/// to compile are skipped, like selectors with no qualifying match.
pub fn extract_content(
    doc: &Document,
    selectors: &[String],
    min_chars: usize,
) -> Result<ExtractionResult, CaptureError> {
    if selectors.is_empty() {
        return Err(CaptureError::NoSelectorMatch {
            min_chars,
            attempted: Vec::new(),
        });
    }

    let mut attempted = Vec::new();

    for selector in selectors {
        attempted.push(selector.clone());

        let Ok(matcher) = Matcher::new(selector) else {
            continue;
        };

        let matches = doc.select_matcher(&matcher);
        for element in matches.iter() {
            let text_content = clean_text(&element.text());
            if text_content.chars().count() >= min_chars {
                let character_count = text_content.chars().count();
                return Ok(ExtractionResult {
                    html_fragment: element.html().to_string(),
                    text_content,
                    selector: selector.clone(),
                    character_count,
                    attempted_selectors: attempted,
                });
            }
        }
    }

    Err(CaptureError::NoSelectorMatch {
        min_chars,
        attempted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = "<html><body>\
        <article><p>This article body is comfortably longer than the minimum \
        character requirement used in these tests.</p></article>\
        <main><p>short</p></main>\
        </body></html>";

    fn selectors(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_sufficient_selector_wins() {
        let doc = Document::from(PAGE);
        let result = extract_content(&doc, &selectors(&["article", "main"]), 40).unwrap();
        assert_eq!(result.selector, "article");
        assert!(result.text_content.starts_with("This article body"));
        assert_eq!(result.attempted_selectors, vec!["article"]);
        assert_eq!(result.character_count, result.text_content.chars().count());
    }

    #[test]
    fn short_match_falls_through_to_next_selector() {
        let doc = Document::from(
            "<html><body><main><p>tiny</p></main>\
             <div class=\"content\"><p>This fallback region holds plenty of text to \
             satisfy the minimum length requirement.</p></div></body></html>",
        );
        let result = extract_content(&doc, &selectors(&["main", ".content"]), 40).unwrap();
        assert_eq!(result.selector, ".content");
        assert_eq!(result.attempted_selectors, vec!["main", ".content"]);
    }

    #[test]
    fn no_match_reports_attempted_selectors() {
        let doc = Document::from(PAGE);
        let err = extract_content(&doc, &selectors(&["#missing", ".also-missing"]), 40)
            .expect_err("nothing matches");
        match err {
            CaptureError::NoSelectorMatch {
                min_chars,
                attempted,
            } => {
                assert_eq!(min_chars, 40);
                assert_eq!(attempted, vec!["#missing", ".also-missing"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_selector_skipped() {
        let doc = Document::from(PAGE);
        let result = extract_content(&doc, &selectors(&["div[unclosed", "article"]), 40).unwrap();
        assert_eq!(result.selector, "article");
    }

    #[test]
    fn empty_selector_list_fails() {
        let doc = Document::from(PAGE);
        assert!(extract_content(&doc, &[], 40).is_err());
    }

    #[test]
    fn whitespace_is_normalized() {
        let doc = Document::from(
            "<html><body><article><p>spaced     out\n\n  text that still has  enough \
             characters to pass the bar</p></article></body></html>",
        );
        let result = extract_content(&doc, &selectors(&["article"]), 40).unwrap();
        assert!(!result.text_content.contains("  "));
        assert!(!result.text_content.contains('\n'));
    }

    #[test]
    fn clean_text_collapses_runs() {
        assert_eq!(clean_text("  a \t b \n c  "), "a b c");
        assert_eq!(clean_text(""), "");
    }
}
