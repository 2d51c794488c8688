// ABOUTME: Error types for capture operations including the CaptureError enum.
// ABOUTME: Maps each error category to a stable code string and a CLI exit code.

/// The main error type for capture operations.
///
/// Every variant carries enough context to render a useful message and maps
/// to a stable machine-readable code (for JSON output) and a CLI exit code.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no selector matched content with at least {min_chars} characters; tried selectors: {attempted:?}")]
    NoSelectorMatch {
        min_chars: usize,
        attempted: Vec<String>,
    },

    #[error("request timed out after {timeout_secs} seconds: {url}")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("content size {size_bytes} bytes exceeds limit {limit_bytes} bytes")]
    SizeLimit { size_bytes: u64, limit_bytes: u64 },

    #[error("encoding error for {url}: {message}")]
    Encoding { url: String, message: String },

    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("markdown conversion failed: {0}")]
    Conversion(String),

    #[error("write failed for {path}: {message}")]
    Write { path: String, message: String },

    #[error("{0}")]
    Generic(String),
}

impl CaptureError {
    /// Stable code string for structured/JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::Config(_) => "CONFIG_ERROR",
            CaptureError::NoSelectorMatch { .. } => "NO_SELECTOR_MATCH",
            CaptureError::Timeout { .. } => "TIMEOUT",
            CaptureError::SizeLimit { .. } => "SIZE_LIMIT",
            CaptureError::Encoding { .. } => "ENCODING_ERROR",
            CaptureError::Fetch { .. } => "FETCH_ERROR",
            CaptureError::Conversion(_) => "CONVERSION_ERROR",
            CaptureError::Write { .. } => "WRITE_ERROR",
            CaptureError::Generic(_) => "GENERIC_ERROR",
        }
    }

    /// CLI process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CaptureError::Generic(_) => 1,
            CaptureError::NoSelectorMatch { .. } => 2,
            CaptureError::Timeout { .. } => 3,
            CaptureError::SizeLimit { .. } => 4,
            CaptureError::Encoding { .. } => 5,
            CaptureError::Fetch { .. } => 6,
            CaptureError::Conversion(_) => 7,
            CaptureError::Write { .. } => 8,
            CaptureError::Config(_) => 9,
        }
    }

    /// Returns true if this is a Timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CaptureError::Timeout { .. })
    }

    /// Returns true if this is a Fetch error.
    pub fn is_fetch(&self) -> bool {
        matches!(self, CaptureError::Fetch { .. })
    }

    /// Returns true if this is a SizeLimit error.
    pub fn is_size_limit(&self) -> bool {
        matches!(self, CaptureError::SizeLimit { .. })
    }

    /// Returns true if this is a Config error.
    pub fn is_config(&self) -> bool {
        matches!(self, CaptureError::Config(_))
    }
}
