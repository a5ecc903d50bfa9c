//! Byte fetching: retrieve a document and its content-type hint.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::models::config::FetchConfig;
use crate::models::document::{FormatHint, RawDocument};

/// Upper bound on the buffer reserved from a declared `Content-Length`.
const PREALLOCATE_LIMIT: u64 = 16 * 1024 * 1024;

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Source of document bytes.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Retrieve the full content at `url`. No retries.
    async fn fetch(&self, url: &str) -> Result<RawDocument>;
}

/// HTTP(S) byte source.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpFetcher {
    /// Create a fetcher with the configured timeout and user agent.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                source: e,
            })?;

        Ok(Self {
            client,
            max_bytes: config.max_bytes,
        })
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            max_bytes: FetchConfig::default().max_bytes,
        }
    }

    /// Set the largest document accepted, in bytes.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn too_large(&self, url: &str) -> FetchError {
        FetchError::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        }
    }
}

#[async_trait]
impl ByteSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<RawDocument> {
        let parsed = parse_url(url)?;
        info!("Downloading document from {}", parsed);

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let declared = response.content_length().unwrap_or(0);
        if declared > self.max_bytes {
            warn!("Declared length {} exceeds limit {}", declared, self.max_bytes);
            return Err(self.too_large(url));
        }

        let mut bytes = Vec::with_capacity(declared.min(PREALLOCATE_LIMIT) as usize);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Body {
                url: url.to_string(),
                source: e,
            })?;
            if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(self.too_large(url));
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(
            "Downloaded {} bytes (content-type: {})",
            bytes.len(),
            content_type.as_deref().unwrap_or("unknown")
        );

        Ok(RawDocument::new(bytes, format_hint_for(&parsed, content_type)))
    }
}

/// Parse and check a document URL.
fn parse_url(url: &str) -> Result<reqwest::Url> {
    let parsed = reqwest::Url::parse(url.trim()).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Combine the response content type with the URL's last path segment.
fn format_hint_for(url: &reqwest::Url, content_type: Option<String>) -> FormatHint {
    let file_name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|last| !last.is_empty())
        .map(str::to_string);

    FormatHint::new(content_type, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_url_rejects_garbage() {
        assert!(matches!(
            parse_url("not a url"),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_url("ftp://files.example/a.pdf"),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(parse_url("https://files.example/a.pdf").is_ok());
    }

    #[test]
    fn test_format_hint_uses_last_segment() {
        let url = parse_url("https://files.example/bucket/marks.pdf?token=1").unwrap();
        let hint = format_hint_for(&url, Some("application/octet-stream".into()));
        assert_eq!(hint.file_name.as_deref(), Some("marks.pdf"));
        assert!(hint.is_pdf());

        let url = parse_url("https://files.example/bucket/").unwrap();
        let hint = format_hint_for(&url, Some("image/jpeg".into()));
        assert_eq!(hint.file_name, None);
        assert!(!hint.is_pdf());
    }

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(response).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{}/uploads/marks.pdf", addr)
    }

    fn local_fetcher(max_bytes: u64) -> HttpFetcher {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpFetcher::with_client(client).with_max_bytes(max_bytes)
    }

    #[tokio::test]
    async fn test_fetch_reads_body_and_hint() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: 8\r\nConnection: close\r\n\r\n%PDF-1.7",
        )
        .await;

        let document = local_fetcher(1024).fetch(&url).await.unwrap();
        assert_eq!(document.bytes(), b"%PDF-1.7");
        assert!(document.format_hint().is_pdf());
    }

    #[tokio::test]
    async fn test_oversized_content_length_rejected() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: 1125899906842624\r\nConnection: close\r\n\r\n%PDF",
        )
        .await;

        let err = local_fetcher(1024).fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn test_body_over_limit_rejected() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n0123456789abcdef0123456789abcdef",
        )
        .await;

        let err = local_fetcher(16).fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 16, .. }));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_network() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
