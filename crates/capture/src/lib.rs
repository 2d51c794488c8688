// ABOUTME: Main library entry point for the clipvault capture pipeline.
// ABOUTME: Re-exports the public API: capture, Config, CaptureError, exclusion engine types.

//! clipvault-capture - capture web pages into a Markdown note vault.
//!
//! This crate fetches a page (or reads a local HTML file), optionally
//! removes elements matched by user-supplied CSS exclusion selectors,
//! extracts the primary content region, converts it to Markdown, and writes
//! it beneath a vault directory with YAML front matter.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use clipvault_capture::{capture, CaptureRequest, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), clipvault_capture::CaptureError> {
//!     let request = CaptureRequest {
//!         url_or_path: "https://example.com/article".to_string(),
//!         vault_path: "/home/me/vault".into(),
//!         config: Config::default(),
//!         timeout: Duration::from_secs(30),
//!         max_size: 2_000_000,
//!         dry_run: false,
//!         allow_private_networks: false,
//!     };
//!     let outcome = capture(&request).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod config;
pub mod convert;
pub mod error;
pub mod exclude;
pub mod extract;
pub mod fetch;
pub mod metadata;
pub mod naming;
pub mod report;
pub mod write;

pub use crate::capture::{capture, CaptureOutcome, CaptureRequest, CaptureResult, DryRunResult};
pub use crate::config::{load_config, Config};
pub use crate::error::CaptureError;
pub use crate::exclude::{
    apply_exclusions, validate_selectors, ExclusionResult, ExclusionSummary, SelectorOutcome,
    TooManySelectorsError, MAX_EXCLUSION_SELECTORS,
};
pub use crate::fetch::{fetch_source, ArticleSource, FetchOptions};
pub use crate::metadata::{extract_metadata, ArticleMetadata};
pub use crate::report::OutputFormat;
