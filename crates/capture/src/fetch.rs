// ABOUTME: Source fetching for capture: HTTP(S) URLs and local HTML files.
// ABOUTME: Enforces timeout, size limits, and private-network blocking; decodes charsets via header hint or detection.

use std::net::IpAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use ipnet::{Ipv4Net, Ipv6Net};

use crate::error::CaptureError;

/// Default User-Agent sent with fetch requests.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; Clipvault/1.0; +https://github.com/clipvault/clipvault)";

/// Options for fetching a source document.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_size: u64,
    pub user_agent: String,
    pub allow_private_networks: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_size: 2_000_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allow_private_networks: false,
        }
    }
}

/// A fetched source document with its transport metadata.
#[derive(Debug, Clone)]
pub struct ArticleSource {
    pub url: String,
    pub content: String,
    pub encoding: String,
    pub content_type: String,
    pub status_code: u16,
    pub elapsed: Duration,
    pub raw_size_bytes: u64,
}

/// Check whether the input names an HTTP(S) URL rather than a local path.
pub fn is_url(url_or_path: &str) -> bool {
    match url::Url::parse(url_or_path) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Check if an IP address is in a private/reserved range.
fn is_private_ip(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(ip) => {
            let private_10: Ipv4Net = "10.0.0.0/8".parse().unwrap();
            let private_172: Ipv4Net = "172.16.0.0/12".parse().unwrap();
            let private_192: Ipv4Net = "192.168.0.0/16".parse().unwrap();
            let loopback: Ipv4Net = "127.0.0.0/8".parse().unwrap();
            let link_local: Ipv4Net = "169.254.0.0/16".parse().unwrap();

            private_10.contains(ip)
                || private_172.contains(ip)
                || private_192.contains(ip)
                || loopback.contains(ip)
                || link_local.contains(ip)
        }
        IpAddr::V6(ip) => {
            if ip.is_loopback() {
                return true;
            }
            let unique_local: Ipv6Net = "fc00::/7".parse().unwrap();
            let link_local: Ipv6Net = "fe80::/10".parse().unwrap();

            unique_local.contains(ip) || link_local.contains(ip)
        }
    }
}

/// Decode body bytes using the content-type charset hint, else detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> (String, String) {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return (decoded.into_owned(), encoding.name().to_lowercase());
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    (decoded.into_owned(), encoding.name().to_lowercase())
}

/// Extract charset value from a Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        let trimmed = part.trim();
        if let Some(charset) = trimmed.strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}

/// Read HTML content from a local file, enforcing the size limit.
fn read_local_file(file_path: &str, opts: &FetchOptions) -> Result<ArticleSource, CaptureError> {
    let start = Instant::now();
    let path = Path::new(file_path);

    if !path.exists() {
        return Err(CaptureError::Fetch {
            url: file_path.to_string(),
            message: "file does not exist".to_string(),
        });
    }
    if !path.is_file() {
        return Err(CaptureError::Fetch {
            url: file_path.to_string(),
            message: "path is not a file".to_string(),
        });
    }

    let file_size = path
        .metadata()
        .map(|m| m.len())
        .map_err(|e| CaptureError::Fetch {
            url: file_path.to_string(),
            message: format!("failed to stat file: {e}"),
        })?;
    if file_size > opts.max_size {
        return Err(CaptureError::SizeLimit {
            size_bytes: file_size,
            limit_bytes: opts.max_size,
        });
    }

    let bytes = std::fs::read(path).map_err(|e| CaptureError::Fetch {
        url: file_path.to_string(),
        message: format!("failed to read file: {e}"),
    })?;

    let (content, encoding) = decode_body(&bytes, None);

    Ok(ArticleSource {
        url: file_path.to_string(),
        content,
        encoding,
        content_type: "text/html".to_string(),
        status_code: 200,
        elapsed: start.elapsed(),
        raw_size_bytes: file_size,
    })
}

/// Resolve a hostname and reject any private address, pre-request.
async fn check_host_private(url: &url::Url, raw_url: &str) -> Result<(), CaptureError> {
    let Some(host) = url.host_str() else {
        return Ok(());
    };

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(CaptureError::Fetch {
                url: raw_url.to_string(),
                message: "private network addresses are not allowed".to_string(),
            });
        }
        return Ok(());
    }

    let port = url
        .port()
        .unwrap_or(if url.scheme() == "https" { 443 } else { 80 });
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| CaptureError::Fetch {
            url: raw_url.to_string(),
            message: format!("DNS lookup failed: {e}"),
        })?;

    for socket_addr in addrs {
        if is_private_ip(&socket_addr.ip()) {
            return Err(CaptureError::Fetch {
                url: raw_url.to_string(),
                message: "private network addresses are not allowed".to_string(),
            });
        }
    }
    Ok(())
}

/// Fetch HTML content over HTTP(S).
async fn fetch_from_url(raw_url: &str, opts: &FetchOptions) -> Result<ArticleSource, CaptureError> {
    let parsed_url = url::Url::parse(raw_url).map_err(|e| CaptureError::Fetch {
        url: raw_url.to_string(),
        message: format!("invalid URL: {e}"),
    })?;

    if !opts.allow_private_networks {
        check_host_private(&parsed_url, raw_url).await?;
    }

    let client = reqwest::Client::builder()
        .user_agent(opts.user_agent.clone())
        .build()
        .map_err(|e| CaptureError::Fetch {
            url: raw_url.to_string(),
            message: format!("failed to build HTTP client: {e}"),
        })?;

    let start = Instant::now();
    let response = client
        .get(raw_url)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.5")
        .timeout(opts.timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                CaptureError::Timeout {
                    url: raw_url.to_string(),
                    timeout_secs: opts.timeout.as_secs(),
                }
            } else {
                CaptureError::Fetch {
                    url: raw_url.to_string(),
                    message: format!("request failed: {e}"),
                }
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(CaptureError::Fetch {
            url: raw_url.to_string(),
            message: format!("HTTP status {}", status.as_u16()),
        });
    }

    // Check the advertised length before reading the body.
    if let Some(len) = response.content_length() {
        if len > opts.max_size {
            return Err(CaptureError::SizeLimit {
                size_bytes: len,
                limit_bytes: opts.max_size,
            });
        }
    }

    let status_code = status.as_u16();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    let body = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            CaptureError::Timeout {
                url: raw_url.to_string(),
                timeout_secs: opts.timeout.as_secs(),
            }
        } else {
            CaptureError::Fetch {
                url: raw_url.to_string(),
                message: format!("failed to read body: {e}"),
            }
        }
    })?;

    if body.len() as u64 > opts.max_size {
        return Err(CaptureError::SizeLimit {
            size_bytes: body.len() as u64,
            limit_bytes: opts.max_size,
        });
    }

    let raw_size_bytes = body.len() as u64;
    let (content, encoding) = decode_body(&body, Some(&content_type));

    Ok(ArticleSource {
        url: raw_url.to_string(),
        content,
        encoding,
        content_type,
        status_code,
        elapsed: start.elapsed(),
        raw_size_bytes,
    })
}

/// Fetch a source document from a URL or read it from a local file.
pub async fn fetch_source(
    url_or_path: &str,
    opts: &FetchOptions,
) -> Result<ArticleSource, CaptureError> {
    if is_url(url_or_path) {
        fetch_from_url(url_or_path, opts).await
    } else {
        read_local_file(url_or_path, opts)
    }
}
