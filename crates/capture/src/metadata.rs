// ABOUTME: Article metadata extraction from HTML: title, author, dates, description, canonical URL.
// ABOUTME: Also generates vault-style #tags from SEO keywords or the URL path.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static CONTROL_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x1f\x7f]").unwrap());
static WWW_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^www\.").unwrap());
static FILE_EXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(html|htm|php|asp|aspx|jsp)$").unwrap());
static TAG_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static TAG_DASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s-]+").unwrap());

/// Extracted article metadata; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub canonical_url: Option<String>,
    pub site_name: Option<String>,
}

impl ArticleMetadata {
    /// Present fields as an ordered map, skipping absent values.
    pub fn to_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        let pairs = [
            ("title", &self.title),
            ("author", &self.author),
            ("published_at", &self.published_at),
            ("description", &self.description),
            ("keywords", &self.keywords),
            ("canonical_url", &self.canonical_url),
            ("site_name", &self.site_name),
        ];
        for (name, value) in pairs {
            if let Some(v) = value {
                fields.insert(name.to_string(), v.clone());
            }
        }
        fields
    }
}

/// Extract metadata from HTML content, with the source URL as fallback for
/// canonical URL and site name.
pub fn extract_metadata(html_content: &str, source_url: &str) -> ArticleMetadata {
    let doc = Html::parse_document(html_content);

    ArticleMetadata {
        title: extract_title(&doc),
        author: extract_author(&doc),
        published_at: extract_published_date(&doc),
        description: extract_description(&doc),
        keywords: extract_keywords(&doc),
        canonical_url: extract_canonical_url(&doc, source_url),
        site_name: extract_site_name(&doc, source_url),
    }
}

fn select_first_attr(doc: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    let element = doc.select(&selector).next()?;
    let value = element.value().attr(attr)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn select_first_text(doc: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    let element = doc.select(&selector).next()?;
    let text = clean_metadata_text(&element.text().collect::<String>());
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Extract the article title; meta tags win over in-page headings.
fn extract_title(doc: &Html) -> Option<String> {
    const META_SELECTORS: &[(&str, &str)] = &[
        ("meta[property='og:title']", "content"),
        ("meta[name='twitter:title']", "content"),
        ("meta[name='title']", "content"),
        ("meta[property='article:title']", "content"),
        ("meta[name='headline']", "content"),
    ];
    for (css, attr) in META_SELECTORS {
        if let Some(content) = select_first_attr(doc, css, attr) {
            return Some(clean_metadata_text(&content));
        }
    }

    const TITLE_SELECTORS: &[&str] = &[
        "h1",
        ".article-title",
        ".post-title",
        ".entry-title",
        ".page-title",
        ".story-title",
        "header h1",
        "article h1",
        ".title",
        "title",
    ];
    for css in TITLE_SELECTORS {
        if let Some(title) = select_first_text(doc, css) {
            return Some(title);
        }
    }

    None
}

fn extract_author(doc: &Html) -> Option<String> {
    for css in ["[rel='author']", ".author", ".byline", ".writer"] {
        if let Some(author) = select_first_text(doc, css) {
            return Some(author);
        }
    }

    for css in ["meta[name='author']", "meta[property='article:author']"] {
        if let Some(content) = select_first_attr(doc, css, "content") {
            return Some(clean_metadata_text(&content));
        }
    }

    None
}

/// Extract the published date as an RFC 3339 string.
fn extract_published_date(doc: &Html) -> Option<String> {
    if let Some(datetime) = select_first_attr(doc, "time[datetime]", "datetime")
        .or_else(|| select_first_attr(doc, "[datetime]", "datetime"))
    {
        if let Ok(parsed) = dateparser::parse(&datetime) {
            return Some(parsed.to_rfc3339());
        }
    }

    if let Some(content) = select_first_attr(doc, "meta[property='article:published_time']", "content")
    {
        if let Ok(parsed) = dateparser::parse(&content) {
            return Some(parsed.to_rfc3339());
        }
    }

    for css in [".published", ".date", ".post-date", ".entry-date"] {
        if let Some(text) = select_first_text(doc, css) {
            if let Ok(parsed) = dateparser::parse(&text) {
                return Some(parsed.to_rfc3339());
            }
        }
    }

    None
}

fn extract_description(doc: &Html) -> Option<String> {
    const SELECTORS: &[&str] = &[
        "meta[property='og:description']",
        "meta[name='description']",
        "meta[name='twitter:description']",
    ];
    for css in SELECTORS {
        if let Some(content) = select_first_attr(doc, css, "content") {
            return Some(clean_metadata_text(&content));
        }
    }
    None
}

fn extract_keywords(doc: &Html) -> Option<String> {
    if let Some(content) = select_first_attr(doc, "meta[name='keywords']", "content") {
        return Some(clean_metadata_text(&content));
    }

    // Fall back to visible tag/category elements, first ten distinct.
    let selector = Selector::parse(".tags a, .tag, .categories a, .category").ok()?;
    let mut tags: Vec<String> = Vec::new();
    for element in doc.select(&selector).take(10) {
        let tag = clean_metadata_text(&element.text().collect::<String>());
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(", "))
    }
}

fn extract_canonical_url(doc: &Html, source_url: &str) -> Option<String> {
    select_first_attr(doc, "link[rel='canonical']", "href")
        .or_else(|| select_first_attr(doc, "meta[property='og:url']", "content"))
        .or_else(|| Some(source_url.to_string()))
}

fn extract_site_name(doc: &Html, source_url: &str) -> Option<String> {
    if let Some(content) = select_first_attr(doc, "meta[property='og:site_name']", "content") {
        return Some(clean_metadata_text(&content));
    }
    if let Some(content) = select_first_attr(doc, "meta[name='application-name']", "content") {
        return Some(clean_metadata_text(&content));
    }

    let parsed = url::Url::parse(source_url).ok()?;
    let domain = parsed.host_str()?;
    Some(WWW_PREFIX_RE.replace(domain, "").to_string())
}

/// Normalize metadata text: trim, collapse whitespace, strip control chars.
pub fn clean_metadata_text(text: &str) -> String {
    let trimmed = text.trim();
    let collapsed = WHITESPACE_RE.replace_all(trimmed, " ");
    CONTROL_CHARS_RE.replace_all(&collapsed, "").to_string()
}

/// Generate a URL-derived slug for filenames when the title yields nothing.
pub fn generate_fallback_slug(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let path = FILE_EXT_RE
            .replace(parsed.path(), "")
            .trim_matches('/')
            .to_string();
        if !path.is_empty() {
            let slug = crate::naming::slugify(&path.replace('/', "-"), 50);
            if !slug.is_empty() {
                return slug;
            }
        }
        if let Some(domain) = parsed.host_str() {
            let domain = WWW_PREFIX_RE.replace(domain, "");
            let slug = crate::naming::slugify(&domain, 20);
            if !slug.is_empty() {
                return slug;
            }
        }
    }
    "article".to_string()
}

/// Generate vault-style tags (with `#` prefix) from SEO keywords, falling
/// back to the last URL path segment. Tags shorter than three characters and
/// numeric-only tags are dropped; duplicates are removed case-insensitively.
pub fn generate_vault_tags(doc: &Html, source_url: &str) -> Vec<String> {
    let mut raw_tags = extract_seo_tags(doc);
    if raw_tags.is_empty() {
        raw_tags = extract_tags_from_url(source_url);
    }

    let mut seen = std::collections::HashSet::new();
    let mut tags = Vec::new();
    for tag in raw_tags {
        let clean = clean_tag_text(&tag);
        if clean.chars().count() > 2 && seen.insert(clean.to_lowercase()) {
            tags.push(format!("#{clean}"));
        }
    }
    tags
}

/// Pull raw tag candidates from meta keywords or tag/category elements.
fn extract_seo_tags(doc: &Html) -> Vec<String> {
    if let Some(content) = select_first_attr(doc, "meta[name='keywords']", "content") {
        return content
            .split([',', ';', '|'])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }

    let Ok(selector) =
        Selector::parse(".tags a, .tag, .categories a, .category, .post-tags a, .article-tags a")
    else {
        return Vec::new();
    };
    doc.select(&selector)
        .take(10)
        .map(|el| clean_metadata_text(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Split the last URL path segment into tag words.
fn extract_tags_from_url(url: &str) -> Vec<String> {
    let Ok(parsed) = url::Url::parse(url) else {
        return Vec::new();
    };
    let path = parsed.path().trim_matches('/').to_string();
    if path.is_empty() {
        return Vec::new();
    }

    let last_segment = path.rsplit('/').next().unwrap_or_default();
    let last_segment = FILE_EXT_RE.replace(last_segment, "");
    if last_segment.is_empty() {
        return Vec::new();
    }

    last_segment
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Clean a single tag: lowercase, alphanumeric/dash only, no numeric-only.
fn clean_tag_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = TAG_STRIP_RE.replace_all(lowered.trim(), "");
    let dashed = TAG_DASH_RE.replace_all(&stripped, "-");
    let tag = dashed.trim_matches('-').to_string();
    if tag.chars().all(|c| c.is_ascii_digit()) {
        return String::new();
    }
    tag
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn og_title_wins_over_h1() {
        let doc = parse(
            "<html><head><meta property=\"og:title\" content=\"OG Title\">\
             <title>Doc Title</title></head><body><h1>Heading</h1></body></html>",
        );
        assert_eq!(extract_title(&doc), Some("OG Title".to_string()));
    }

    #[test]
    fn h1_beats_title_tag() {
        let doc = parse(
            "<html><head><title>Doc Title</title></head>\
             <body><h1>Page Heading</h1></body></html>",
        );
        assert_eq!(extract_title(&doc), Some("Page Heading".to_string()));
    }

    #[test]
    fn title_absent() {
        let doc = parse("<html><body><p>no title anywhere</p></body></html>");
        assert_eq!(extract_title(&doc), None);
    }

    #[test]
    fn author_from_byline_class() {
        let doc = parse("<html><body><div class=\"byline\">Jane Roe</div></body></html>");
        assert_eq!(extract_author(&doc), Some("Jane Roe".to_string()));
    }

    #[test]
    fn author_from_meta() {
        let doc = parse(
            "<html><head><meta name=\"author\" content=\"Sam Chen\"></head><body></body></html>",
        );
        assert_eq!(extract_author(&doc), Some("Sam Chen".to_string()));
    }

    #[test]
    fn published_date_from_time_element() {
        let doc = parse(
            "<html><body><time datetime=\"2024-06-15T12:00:00Z\">June 15</time></body></html>",
        );
        let date = extract_published_date(&doc).expect("date parses");
        assert!(date.starts_with("2024-06-15"));
    }

    #[test]
    fn published_date_from_og_meta() {
        let doc = parse(
            "<html><head><meta property=\"article:published_time\" \
             content=\"2023-01-02T08:30:00+00:00\"></head><body></body></html>",
        );
        let date = extract_published_date(&doc).expect("date parses");
        assert!(date.starts_with("2023-01-02"));
    }

    #[test]
    fn unparseable_date_is_none() {
        let doc = parse("<html><body><time datetime=\"not a date\">x</time></body></html>");
        assert_eq!(extract_published_date(&doc), None);
    }

    #[test]
    fn description_priority() {
        let doc = parse(
            "<html><head><meta name=\"description\" content=\"meta desc\">\
             <meta property=\"og:description\" content=\"og desc\"></head></html>",
        );
        assert_eq!(extract_description(&doc), Some("og desc".to_string()));
    }

    #[test]
    fn canonical_url_falls_back_to_source() {
        let doc = parse("<html><body></body></html>");
        assert_eq!(
            extract_canonical_url(&doc, "https://example.com/a"),
            Some("https://example.com/a".to_string())
        );

        let doc = parse(
            "<html><head><link rel=\"canonical\" href=\"https://example.com/canon\"></head></html>",
        );
        assert_eq!(
            extract_canonical_url(&doc, "https://example.com/a"),
            Some("https://example.com/canon".to_string())
        );
    }

    #[test]
    fn site_name_from_domain() {
        let doc = parse("<html><body></body></html>");
        assert_eq!(
            extract_site_name(&doc, "https://www.example.com/article"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn metadata_fields_skip_absent_values() {
        let metadata = ArticleMetadata {
            title: Some("T".to_string()),
            author: None,
            ..Default::default()
        };
        let fields = metadata.to_fields();
        assert!(fields.contains_key("title"));
        assert!(!fields.contains_key("author"));
    }

    #[test]
    fn clean_metadata_text_normalizes() {
        assert_eq!(clean_metadata_text("  a \n b  "), "a b");
        assert_eq!(clean_metadata_text("x\u{0007}y"), "xy");
        assert_eq!(clean_metadata_text(""), "");
    }

    #[test]
    fn fallback_slug_from_path() {
        assert_eq!(
            generate_fallback_slug("https://example.com/posts/rust-notes.html"),
            "posts-rust-notes"
        );
    }

    #[test]
    fn fallback_slug_from_domain() {
        assert_eq!(
            generate_fallback_slug("https://www.example.com/"),
            "example-com"
        );
    }

    #[test]
    fn fallback_slug_last_resort() {
        assert_eq!(generate_fallback_slug("not a url"), "article");
    }

    #[test]
    fn vault_tags_from_keywords() {
        let doc = parse(
            "<html><head><meta name=\"keywords\" content=\"Rust, Web Scraping; CLI|42\">\
             </head><body></body></html>",
        );
        let tags = generate_vault_tags(&doc, "https://example.com/x");
        assert_eq!(tags, vec!["#rust", "#web-scraping", "#cli"]);
    }

    #[test]
    fn vault_tags_from_url_path() {
        let doc = parse("<html><body></body></html>");
        let tags = generate_vault_tags(&doc, "https://example.com/p/how-to-encode-string");
        assert_eq!(tags, vec!["#how", "#encode", "#string"]);
    }

    #[test]
    fn vault_tags_dedupe_case_insensitively() {
        let doc = parse(
            "<html><head><meta name=\"keywords\" content=\"Rust, rust, RUST\"></head></html>",
        );
        let tags = generate_vault_tags(&doc, "https://example.com/x");
        assert_eq!(tags, vec!["#rust"]);
    }
}
