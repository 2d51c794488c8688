// ABOUTME: CLI binary for clipvault: capture a web page or local HTML file into a note vault.
// ABOUTME: Handles argument parsing, config/vault resolution, logging setup, and exit codes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use clipvault_capture::capture::{capture, CaptureOutcome, CaptureRequest};
use clipvault_capture::config::{load_config, Config};
use clipvault_capture::error::CaptureError;
use clipvault_capture::fetch::is_url;
use clipvault_capture::naming::validate_vault_path;
use clipvault_capture::report::{
    format_dry_run_json, format_dry_run_text, format_error_json, format_error_text,
    format_success_json, format_success_text, OutputFormat,
};
use tracing_subscriber::EnvFilter;

/// Capture a web page or local HTML file into a Markdown note vault.
#[derive(Parser, Debug)]
#[command(name = "clipvault")]
#[command(version)]
#[command(about = "HTML to Markdown capture tool for a note vault", long_about = None)]
struct Args {
    /// HTTP/HTTPS URL or local HTML file path to capture
    url_or_path: String,

    /// Path to the vault root (defaults to the config file's vault, then the
    /// current directory)
    #[arg(short, long)]
    vault: Option<PathBuf>,

    /// Path to a YAML config file with selectors and optional fields
    /// (defaults to ~/.clipvault.yml if it exists)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Additional relative folder beneath the date bucket (auto-created)
    #[arg(short, long)]
    subfolder: Option<String>,

    /// Overwrite an existing file instead of suffixing
    #[arg(short, long)]
    overwrite: bool,

    /// Network timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Maximum raw HTML bytes
    #[arg(long, default_value_t = 2_000_000)]
    max_size: u64,

    /// CSS selector to exclude from the page (repeatable, max 100 total)
    #[arg(short = 'e', long = "exclude-selector")]
    exclude_selectors: Vec<String>,

    /// Additional tags for the note (comma-separated; a # prefix is added
    /// when missing)
    #[arg(short, long)]
    tags: Option<String>,

    /// Preview the capture without writing files
    #[arg(long)]
    dry: bool,

    /// Output format
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Allow fetching from private/local networks
    #[arg(long)]
    allow_private_networks: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Validate the positional argument early: a well-formed URL or an existing
/// file.
fn validate_url_or_path(url_or_path: &str) -> Result<(), CaptureError> {
    if is_url(url_or_path) {
        return Ok(());
    }
    let path = expand_home(url_or_path);
    if path.is_file() {
        return Ok(());
    }
    Err(CaptureError::Config(format!(
        "invalid URL format or file does not exist: {url_or_path}"
    )))
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Locate the config: explicit flag, then ~/.clipvault.yml, then defaults.
fn resolve_config(flag: Option<&Path>) -> Result<Config, CaptureError> {
    if let Some(path) = flag {
        return load_config(path);
    }
    if let Some(home) = std::env::var_os("HOME") {
        let default_path = PathBuf::from(home).join(".clipvault.yml");
        if default_path.exists() {
            return load_config(&default_path);
        }
    }
    Ok(Config::default())
}

/// Merge CLI tag input into the config tag list, normalizing the # prefix.
fn merge_cli_tags(config: &mut Config, raw: &str) {
    for tag in raw.split(',') {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        let tag = if tag.starts_with('#') {
            tag.to_string()
        } else {
            format!("#{tag}")
        };
        if !config.tags.contains(&tag) {
            config.tags.push(tag);
        }
    }
}

/// Resolve the vault directory: CLI flag, then config, then cwd.
fn resolve_vault(flag: Option<&Path>, config: &Config) -> Result<PathBuf, CaptureError> {
    if let Some(vault) = flag {
        return Ok(vault.to_path_buf());
    }
    if let Some(vault) = &config.vault {
        return Ok(expand_home(vault));
    }
    std::env::current_dir()
        .map_err(|e| CaptureError::Config(format!("cannot determine current directory: {e}")))
}

fn check_vault(vault_path: &Path) -> Result<(), CaptureError> {
    if !vault_path.exists() {
        return Err(CaptureError::Write {
            path: vault_path.display().to_string(),
            message: "vault directory does not exist".to_string(),
        });
    }
    if !vault_path.is_dir() {
        return Err(CaptureError::Write {
            path: vault_path.display().to_string(),
            message: "vault path is not a directory".to_string(),
        });
    }
    if !validate_vault_path(vault_path) {
        return Err(CaptureError::Write {
            path: vault_path.display().to_string(),
            message: "vault path is not writable".to_string(),
        });
    }
    Ok(())
}

fn report_error(error: &CaptureError, url: &str, started: Instant, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                format_error_json(error, url, started.elapsed().as_millis() as u64)
            );
        }
        OutputFormat::Text => {
            eprintln!("{}", format_error_text(error));
        }
    }
}

async fn run(args: &Args) -> Result<(), CaptureError> {
    validate_url_or_path(&args.url_or_path)?;
    if args.timeout == 0 {
        return Err(CaptureError::Config("timeout must be positive".to_string()));
    }
    if args.max_size == 0 {
        return Err(CaptureError::Config("max-size must be positive".to_string()));
    }

    let mut config = resolve_config(args.config.as_deref())?;
    if args.overwrite {
        config.overwrite = true;
    }
    if let Some(subfolder) = &args.subfolder {
        config.subfolder = Some(subfolder.clone());
    }
    if !args.exclude_selectors.is_empty() {
        config.exclusion_selectors = args.exclude_selectors.clone();
    }
    if let Some(tags) = &args.tags {
        merge_cli_tags(&mut config, tags);
    }
    config.validate()?;

    let vault_path = resolve_vault(args.vault.as_deref(), &config)?;
    check_vault(&vault_path)?;
    tracing::debug!(
        target: "clipvault::cli",
        vault = %vault_path.display(),
        exclusions = config.exclusion_selectors.len(),
        "starting capture"
    );

    let url_or_path = if is_url(&args.url_or_path) {
        args.url_or_path.clone()
    } else {
        expand_home(&args.url_or_path).display().to_string()
    };

    let request = CaptureRequest {
        url_or_path,
        vault_path,
        config,
        timeout: Duration::from_secs(args.timeout),
        max_size: args.max_size,
        dry_run: args.dry,
        allow_private_networks: args.allow_private_networks,
    };

    match capture(&request).await? {
        CaptureOutcome::Written(result) => {
            let output = match args.format {
                OutputFormat::Json => format_success_json(&result),
                OutputFormat::Text => format_success_text(&result),
            };
            println!("{output}");
        }
        CaptureOutcome::DryRun(result) => {
            let output = match args.format {
                OutputFormat::Json => format_dry_run_json(&result),
                OutputFormat::Text => format_dry_run_text(&result),
            };
            println!("{output}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    let started = Instant::now();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_error(&error, &args.url_or_path, started, args.format);
            ExitCode::from(error.exit_code())
        }
    }
}
