// ABOUTME: Filename and directory naming for the note vault.
// ABOUTME: Slugified filenames, YYYY-MM date buckets, optional subfolder, collision suffixing.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CaptureError;
use crate::metadata::generate_fallback_slug;

/// Maximum filename length (excluding the `.md` extension).
pub const MAX_FILENAME_LENGTH: usize = 80;

/// Collision suffix attempts before giving up.
const MAX_COLLISION_SUFFIX: u32 = 1000;

static UNSAFE_DIR_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

/// Build a URL-safe slug: lowercase ASCII alphanumerics joined by dashes.
pub fn slugify(text: &str, max_length: usize) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in text.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c);
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > max_length {
        slug.truncate(max_length);
    }
    slug.trim_end_matches(['-', '_']).to_string()
}

/// Generate a safe `.md` filename from the title, falling back to the URL.
pub fn generate_filename(title: Option<&str>, url: &str, max_length: usize) -> String {
    if let Some(title) = title {
        let base = slugify(title, max_length);
        if !base.is_empty() {
            tracing::debug!(target: "clipvault::naming", title, filename = %base, "filename from title");
            return format!("{base}.md");
        }
    }

    let mut base = generate_fallback_slug(url);
    if base.is_empty() {
        base = "article".to_string();
    }
    if base.len() > max_length {
        base.truncate(max_length);
        base = base.trim_end_matches(['-', '_']).to_string();
    }
    format!("{base}.md")
}

/// Clean a subfolder name to be filesystem safe.
pub fn clean_directory_name(name: &str) -> String {
    let cleaned = UNSAFE_DIR_CHARS_RE.replace_all(name, "");
    let mut cleaned: String = cleaned.trim_matches(['.', ' ']).chars().take(50).collect();
    if cleaned.is_empty() {
        cleaned = "misc".to_string();
    }
    cleaned
}

/// Create the date bucket directory (`YYYY-MM`) under the vault.
pub fn create_date_directory(
    vault_path: &Path,
    date: DateTime<Local>,
) -> Result<PathBuf, CaptureError> {
    let date_dir = vault_path.join(date.format("%Y-%m").to_string());
    std::fs::create_dir_all(&date_dir).map_err(|e| CaptureError::Write {
        path: date_dir.display().to_string(),
        message: format!("failed to create date directory: {e}"),
    })?;
    Ok(date_dir)
}

/// Create the full target directory: date bucket plus optional subfolder.
pub fn create_full_directory_path(
    vault_path: &Path,
    subfolder: Option<&str>,
    date: DateTime<Local>,
) -> Result<PathBuf, CaptureError> {
    let mut directory = create_date_directory(vault_path, date)?;

    if let Some(subfolder) = subfolder {
        for part in subfolder.split('/').filter(|p| !p.is_empty()) {
            directory = directory.join(clean_directory_name(part));
        }
        std::fs::create_dir_all(&directory).map_err(|e| CaptureError::Write {
            path: directory.display().to_string(),
            message: format!("failed to create subfolder: {e}"),
        })?;
    }

    Ok(directory)
}

/// Resolve the final file path, suffixing `-N` on collisions unless
/// overwriting.
pub fn resolve_final_path(
    directory: &Path,
    filename: &str,
    overwrite: bool,
) -> Result<PathBuf, CaptureError> {
    let file_path = directory.join(filename);
    if overwrite || !file_path.exists() {
        return Ok(file_path);
    }

    let stem = file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("article")
        .to_string();
    let extension = file_path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("md")
        .to_string();

    for counter in 1..=MAX_COLLISION_SUFFIX {
        let candidate = directory.join(format!("{stem}-{counter}.{extension}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(CaptureError::Write {
        path: file_path.display().to_string(),
        message: format!("too many filename collisions for {filename}"),
    })
}

/// Generate the complete note path: directory structure plus collision-free
/// filename.
pub fn generate_full_path(
    vault_path: &Path,
    title: Option<&str>,
    url: &str,
    subfolder: Option<&str>,
    overwrite: bool,
    date: DateTime<Local>,
) -> Result<PathBuf, CaptureError> {
    let filename = generate_filename(title, url, MAX_FILENAME_LENGTH);
    let directory = create_full_directory_path(vault_path, subfolder, date)?;
    resolve_final_path(&directory, &filename, overwrite)
}

/// Check that the vault path exists, is a directory, and is writable.
pub fn validate_vault_path(vault_path: &Path) -> bool {
    if !vault_path.is_dir() {
        return false;
    }
    let probe = vault_path.join(".clipvault-probe");
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}
