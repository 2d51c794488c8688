// ABOUTME: HTML fragment to Markdown conversion for note content.
// ABOUTME: Sanitizes with ammonia, resolves relative URLs, converts with htmd, post-processes spacing.

use dom_query::Document;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CaptureError;

static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static EMPTY_LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\]\([^)]*\)").unwrap());

/// Sanitize an HTML fragment down to an article-friendly element set.
///
/// Allowed elements: paragraphs, headings, lists, blockquote, pre/code,
/// images, links, tables, and basic inline formatting.
pub fn sanitize_html(html: &str) -> String {
    let allowed_tags = [
        "p", "br", "strong", "b", "em", "i", "u", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol",
        "li", "blockquote", "pre", "code", "img", "a", "span", "div", "table", "thead", "tbody",
        "tr", "th", "td", "figure", "figcaption",
    ];

    let mut builder = ammonia::Builder::new();
    builder.tags(allowed_tags.iter().copied().collect());
    builder.add_tag_attributes("a", &["href", "title"]);
    builder.add_tag_attributes("img", &["src", "alt", "width", "height", "srcset", "sizes"]);

    builder
        .url_schemes(["http", "https", "mailto"].iter().copied().collect())
        .clean(html)
        .to_string()
}

/// Rewrite relative `href`/`src` attributes against the source URL so links
/// survive outside the page they came from.
fn absolutize_urls(html: &str, base_url: &str) -> String {
    let Ok(base) = url::Url::parse(base_url) else {
        return html.to_string();
    };

    let doc = Document::from(html);
    for (css, attr) in [("a[href]", "href"), ("img[src]", "src")] {
        for element in doc.select(css).iter() {
            let Some(value) = element.attr(attr) else {
                continue;
            };
            let value = value.to_string();
            if url::Url::parse(&value).is_ok() {
                continue; // already absolute
            }
            if let Ok(joined) = base.join(&value) {
                element.set_attr(attr, joined.as_str());
            }
        }
    }
    doc.select("body").inner_html().to_string()
}

/// Convert an HTML fragment to Markdown.
///
/// The fragment is sanitized, relative URLs are resolved against `base_url`
/// when given, and the result is converted with htmd (script/style/noscript
/// skipped) and post-processed for spacing.
pub fn convert_html_to_markdown(
    html_fragment: &str,
    base_url: Option<&str>,
) -> Result<String, CaptureError> {
    let sanitized = sanitize_html(html_fragment);
    let resolved = match base_url {
        Some(base) => absolutize_urls(&sanitized, base),
        None => sanitized,
    };

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript"])
        .build();

    let markdown = converter
        .convert(&resolved)
        .map_err(|e| CaptureError::Conversion(e.to_string()))?;

    Ok(post_process_markdown(&markdown))
}

/// Tidy converted markdown: collapse blank-line runs, drop empty links,
/// strip trailing whitespace, end with one newline.
pub fn post_process_markdown(markdown: &str) -> String {
    let collapsed = BLANK_LINES_RE.replace_all(markdown, "\n\n");
    let no_empty_links = EMPTY_LINK_RE.replace_all(&collapsed, "");

    let trimmed_lines: Vec<&str> = no_empty_links.lines().map(str::trim_end).collect();
    let mut result = trimmed_lines.join("\n").trim().to_string();
    result.push('\n');
    result
}

/// Estimate reading time in whole minutes at the given pace.
pub fn estimate_reading_time(markdown: &str, words_per_minute: usize) -> usize {
    let words = markdown.split_whitespace().count();
    std::cmp::max(1, words.div_ceil(words_per_minute.max(1)))
}
