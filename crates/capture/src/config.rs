// ABOUTME: Configuration loading and validation for capture runs.
// ABOUTME: Parses YAML config files with selector lists, vault options, and extra front-matter fields.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Default minimum character count for extracted content.
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 80;

fn default_min_content_chars() -> usize {
    DEFAULT_MIN_CONTENT_CHARS
}

/// Capture configuration, typically loaded from a YAML file.
///
/// Unknown top-level keys are collected into `extra_fields` and merged into
/// the generated front matter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ordered CSS selectors tried for content extraction.
    pub selectors: Vec<String>,

    /// Minimum characters an extracted region must contain.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Overwrite existing files instead of suffixing.
    #[serde(default)]
    pub overwrite: bool,

    /// Optional subfolder beneath the date bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subfolder: Option<String>,

    /// Tags added to the front matter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Optional summary text for the front matter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Optional archive timestamp for the front matter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<String>,

    /// Ordered CSS selectors removed from the document before extraction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusion_selectors: Vec<String>,

    /// Optional vault directory, overridable on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<String>,

    /// Front-matter fields to drop from the output.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_fields: Vec<String>,

    /// Any additional fields, passed through to the front matter.
    #[serde(flatten)]
    pub extra_fields: BTreeMap<String, serde_yaml::Value>,
}

impl Config {
    /// Validate field constraints shared by all construction paths.
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.selectors.is_empty() {
            return Err(CaptureError::Config(
                "at least one selector must be specified".to_string(),
            ));
        }
        if self.min_content_chars < 1 {
            return Err(CaptureError::Config(
                "min_content_chars must be at least 1".to_string(),
            ));
        }
        for selector in &self.selectors {
            if selector.trim().is_empty() {
                return Err(CaptureError::Config(format!(
                    "invalid selector: {selector:?}"
                )));
            }
        }
        if let Some(subfolder) = &self.subfolder {
            validate_subfolder(subfolder)?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            selectors: vec![
                "article".to_string(),
                "main".to_string(),
                r#"[role="main"]"#.to_string(),
                ".content".to_string(),
                ".post-content".to_string(),
                ".entry-content".to_string(),
                ".article-content".to_string(),
                "body".to_string(),
            ],
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            overwrite: false,
            subfolder: None,
            tags: Vec::new(),
            summary: None,
            archived_at: None,
            exclusion_selectors: Vec::new(),
            vault: None,
            exclude_fields: Vec::new(),
            extra_fields: BTreeMap::new(),
        }
    }
}

/// Reject subfolders that escape the vault or hide files.
fn validate_subfolder(subfolder: &str) -> Result<(), CaptureError> {
    let normalized = subfolder.replace('\\', "/");
    let unsafe_path = normalized.contains("..")
        || normalized.starts_with('/')
        || normalized
            .split('/')
            .any(|part| part.trim().is_empty() || part.starts_with('.'));
    if unsafe_path {
        return Err(CaptureError::Config(format!(
            "invalid subfolder path: {subfolder}"
        )));
    }
    Ok(())
}

/// Load and validate configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<Config, CaptureError> {
    if !path.exists() {
        return Err(CaptureError::Config(format!(
            "config file does not exist: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        CaptureError::Config(format!("failed to read config file: {e}"))
    })?;

    let config: Config = serde_yaml::from_str(&content)
        .map_err(|e| CaptureError::Config(format!("failed to parse YAML config: {e}")))?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.selectors[0], "article");
        assert_eq!(config.selectors.last().map(String::as_str), Some("body"));
        assert_eq!(config.min_content_chars, 80);
        assert!(!config.overwrite);
        assert!(config.exclusion_selectors.is_empty());
    }

    #[test]
    fn empty_selectors_rejected() {
        let config = Config {
            selectors: vec![],
            ..Config::default()
        };
        let err = config.validate().expect_err("selectors required");
        assert!(err.is_config());
    }

    #[test]
    fn zero_min_chars_rejected() {
        let config = Config {
            min_content_chars: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_selector_rejected() {
        let config = Config {
            selectors: vec!["article".to_string(), "   ".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unsafe_subfolders_rejected() {
        for bad in ["../escape", "a/../b", ".hidden", "a//b", "/absolute"] {
            let config = Config {
                subfolder: Some(bad.to_string()),
                ..Config::default()
            };
            assert!(config.validate().is_err(), "{bad} should be rejected");
        }

        let config = Config {
            subfolder: Some("articles/tech".to_string()),
            ..Config::default()
        };
        config.validate().expect("nested subfolder is fine");
    }

    #[test]
    fn load_config_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "selectors:\n  - article\n  - main\nmin_content_chars: 120\n\
             exclusion_selectors:\n  - \".ads\"\n  - footer\n\
             tags:\n  - \"#web\"\nproject: research"
        )
        .unwrap();

        let config = load_config(file.path()).expect("valid config loads");
        assert_eq!(config.selectors, vec!["article", "main"]);
        assert_eq!(config.min_content_chars, 120);
        assert_eq!(config.exclusion_selectors, vec![".ads", "footer"]);
        assert_eq!(config.tags, vec!["#web"]);
        assert_eq!(
            config.extra_fields.get("project"),
            Some(&serde_yaml::Value::String("research".to_string()))
        );
    }

    #[test]
    fn load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/config.yml")).expect_err("missing file");
        assert!(err.is_config());
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn load_config_requires_selectors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_content_chars: 50").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn load_config_rejects_bad_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "selectors: [unterminated").unwrap();
        let err = load_config(file.path()).expect_err("broken YAML");
        assert!(err.to_string().contains("YAML"));
    }
}
