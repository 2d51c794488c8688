// ABOUTME: Note file writing with YAML front matter generation.
// ABOUTME: Merges metadata, config fields, and vault tags; serializes sorted YAML between --- fences.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Local};
use scraper::Html;
use serde_yaml::Value;

use crate::config::Config;
use crate::error::CaptureError;
use crate::metadata::{generate_vault_tags, ArticleMetadata};

/// Front matter is an ordered field map; BTreeMap keeps serialized keys
/// sorted and stable.
pub type FrontMatter = BTreeMap<String, Value>;

/// Generate the front matter map for a note.
///
/// Field precedence: core fields (source, selector, retrieved_at), then
/// metadata, then config extras. Tags merge metadata tags, config tags, and
/// tags derived from the page itself, deduplicated in order. Fields named in
/// `config.exclude_fields` are removed last.
pub fn generate_front_matter(
    metadata: &ArticleMetadata,
    config: &Config,
    url: &str,
    selector: &str,
    retrieved_at: DateTime<Local>,
    html_content: Option<&str>,
) -> FrontMatter {
    let mut front_matter = FrontMatter::new();
    front_matter.insert("source".to_string(), Value::String(url.to_string()));
    front_matter.insert("selector".to_string(), Value::String(selector.to_string()));
    front_matter.insert(
        "retrieved_at".to_string(),
        Value::String(retrieved_at.to_rfc3339()),
    );

    for (key, value) in metadata.to_fields() {
        front_matter.insert(key, Value::String(value));
    }

    for (key, value) in &config.extra_fields {
        if !value.is_null() {
            front_matter.insert(key.clone(), value.clone());
        }
    }

    let mut all_tags: Vec<String> = Vec::new();
    for tag in &config.tags {
        if !all_tags.contains(tag) {
            all_tags.push(tag.clone());
        }
    }
    if let Some(html) = html_content {
        let doc = Html::parse_document(html);
        for tag in generate_vault_tags(&doc, url) {
            if !all_tags.contains(&tag) {
                all_tags.push(tag);
            }
        }
    }
    if !all_tags.is_empty() {
        front_matter.insert(
            "tags".to_string(),
            Value::Sequence(all_tags.into_iter().map(Value::String).collect()),
        );
    }

    if let Some(summary) = &config.summary {
        front_matter.insert("summary".to_string(), Value::String(summary.clone()));
    }
    if let Some(archived_at) = &config.archived_at {
        front_matter.insert("archived_at".to_string(), Value::String(archived_at.clone()));
    }

    for field in &config.exclude_fields {
        front_matter.remove(field);
    }

    front_matter
}

/// Serialize front matter to a fenced YAML block.
pub fn serialize_front_matter(front_matter: &FrontMatter) -> Result<String, CaptureError> {
    let clean: FrontMatter = front_matter
        .iter()
        .filter(|(_, v)| !v.is_null() && v.as_str() != Some(""))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let yaml = serde_yaml::to_string(&clean)
        .map_err(|e| CaptureError::Write {
            path: String::new(),
            message: format!("failed to serialize front matter: {e}"),
        })?;

    Ok(format!("---\n{yaml}---\n\n"))
}

/// Write the note file: front matter block followed by the markdown body.
pub fn write_markdown_file(
    file_path: &Path,
    front_matter: &FrontMatter,
    markdown_content: &str,
) -> Result<(), CaptureError> {
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CaptureError::Write {
            path: file_path.display().to_string(),
            message: format!("failed to create parent directories: {e}"),
        })?;
    }

    let full_content = format!("{}{}", serialize_front_matter(front_matter)?, markdown_content);

    std::fs::write(file_path, full_content).map_err(|e| CaptureError::Write {
        path: file_path.display().to_string(),
        message: format!("failed to write file: {e}"),
    })
}

/// Create a complete note file and return the front matter that was written.
#[allow(clippy::too_many_arguments)]
pub fn create_note_file(
    file_path: &Path,
    metadata: &ArticleMetadata,
    config: &Config,
    markdown_content: &str,
    url: &str,
    selector: &str,
    retrieved_at: DateTime<Local>,
    html_content: Option<&str>,
) -> Result<FrontMatter, CaptureError> {
    let front_matter =
        generate_front_matter(metadata, config, url, selector, retrieved_at, html_content);
    write_markdown_file(file_path, &front_matter, markdown_content)?;
    Ok(front_matter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn retrieved() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
    }

    fn sample_metadata() -> ArticleMetadata {
        ArticleMetadata {
            title: Some("Test Article".to_string()),
            author: Some("Jane Roe".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn front_matter_core_fields() {
        let fm = generate_front_matter(
            &sample_metadata(),
            &Config::default(),
            "https://example.com/a",
            "article",
            retrieved(),
            None,
        );

        assert_eq!(
            fm.get("source"),
            Some(&Value::String("https://example.com/a".to_string()))
        );
        assert_eq!(fm.get("selector"), Some(&Value::String("article".to_string())));
        assert!(fm.contains_key("retrieved_at"));
        assert_eq!(fm.get("title"), Some(&Value::String("Test Article".to_string())));
        assert_eq!(fm.get("author"), Some(&Value::String("Jane Roe".to_string())));
        assert!(!fm.contains_key("tags"));
    }

    #[test]
    fn front_matter_merges_tags_without_duplicates() {
        let config = Config {
            tags: vec!["#web".to_string(), "#rust".to_string()],
            ..Config::default()
        };
        let html = "<html><head><meta name=\"keywords\" content=\"rust, tooling\">\
                    </head><body></body></html>";
        let fm = generate_front_matter(
            &sample_metadata(),
            &config,
            "https://example.com/a",
            "article",
            retrieved(),
            Some(html),
        );

        let tags = fm.get("tags").and_then(|v| v.as_sequence()).unwrap();
        let tags: Vec<&str> = tags.iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(tags, vec!["#web", "#rust", "#tooling"]);
    }

    #[test]
    fn front_matter_extra_and_excluded_fields() {
        let mut extra = BTreeMap::new();
        extra.insert(
            "project".to_string(),
            Value::String("research".to_string()),
        );
        let config = Config {
            extra_fields: extra,
            exclude_fields: vec!["author".to_string()],
            summary: Some("a summary".to_string()),
            ..Config::default()
        };

        let fm = generate_front_matter(
            &sample_metadata(),
            &config,
            "https://example.com/a",
            "article",
            retrieved(),
            None,
        );

        assert_eq!(fm.get("project"), Some(&Value::String("research".to_string())));
        assert_eq!(fm.get("summary"), Some(&Value::String("a summary".to_string())));
        assert!(!fm.contains_key("author"), "excluded field removed");
        assert!(fm.contains_key("title"));
    }

    #[test]
    fn serialized_front_matter_is_fenced_and_sorted() {
        let mut fm = FrontMatter::new();
        fm.insert("zebra".to_string(), Value::String("z".to_string()));
        fm.insert("alpha".to_string(), Value::String("a".to_string()));
        fm.insert("empty".to_string(), Value::String(String::new()));

        let yaml = serialize_front_matter(&fm).unwrap();
        assert!(yaml.starts_with("---\n"));
        assert!(yaml.ends_with("---\n\n"));
        let alpha_pos = yaml.find("alpha").unwrap();
        let zebra_pos = yaml.find("zebra").unwrap();
        assert!(alpha_pos < zebra_pos);
        assert!(!yaml.contains("empty"), "empty values dropped");
    }

    #[test]
    fn note_file_written_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-06").join("note.md");

        let fm = create_note_file(
            &path,
            &sample_metadata(),
            &Config::default(),
            "# Heading\n\nBody text.\n",
            "https://example.com/a",
            "article",
            retrieved(),
            None,
        )
        .unwrap();

        assert!(fm.contains_key("source"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("---\n"));
        assert!(written.contains("title: Test Article"));
        assert!(written.contains("# Heading"));
        assert!(written.ends_with("Body text.\n"));
    }

    #[test]
    fn write_fails_on_unwritable_path() {
        let err = write_markdown_file(
            Path::new("/proc/definitely/not/writable/note.md"),
            &FrontMatter::new(),
            "x",
        )
        .expect_err("unwritable path");
        assert_eq!(err.code(), "WRITE_ERROR");
    }
}
