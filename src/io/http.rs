//! Range-request reader for archives served over HTTP(S).

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::ReadAt;
use anyhow::{Context, Result, anyhow, bail};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRY: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Reader for archives served over HTTP(S).
///
/// Every read is one `Range` request for exactly the bytes asked for. A scan
/// fetches the archive tail, the central directory and each entry's local
/// header and data, never the archive as a whole.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Open a remote archive with a default client.
    pub async fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Self::with_client(client, url).await
    }

    /// Open a remote archive with a caller-supplied client.
    ///
    /// A HEAD request establishes the archive size and that the server
    /// honours byte ranges.
    pub async fn with_client(client: Client, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let resp = client
            .head(&url)
            .send()
            .await
            .with_context(|| format!("HEAD {}", url))?;
        if !resp.status().is_success() {
            bail!("HEAD {} answered with status {}", url, resp.status());
        }
        let size = remote_size(resp.headers())?;

        debug!(url = %url, size, "remote archive opened");
        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            max_retry: DEFAULT_MAX_RETRY,
        })
    }

    /// How often a timed out, refused or 5xx request is repeated
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Total body bytes received so far
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// Fetch `start..=end` into `buf`, retrying transient failures.
    ///
    /// Returns the number of bytes written, which may fall short of the
    /// requested range if the server sends less.
    async fn fetch_range(&self, start: u64, end: u64, buf: &mut [u8]) -> Result<usize> {
        let range = format!("bytes={}-{}", start, end);
        let mut attempt = 0;

        loop {
            let failure = match self
                .client
                .get(&self.url)
                .header(header::RANGE, &range)
                .send()
                .await
            {
                Ok(resp) if resp.status() == StatusCode::PARTIAL_CONTENT => {
                    check_range_start(resp.headers(), start)?;
                    match resp.bytes().await {
                        Ok(body) => {
                            let n = body.len().min(buf.len());
                            buf[..n].copy_from_slice(&body[..n]);
                            return Ok(n);
                        }
                        Err(e) => anyhow::Error::new(e),
                    }
                }
                Ok(resp) if resp.status().is_server_error() => {
                    anyhow!("server answered with status {}", resp.status())
                }
                Ok(resp) => bail!("Range {} answered with status {}", range, resp.status()),
                Err(e) if e.is_timeout() || e.is_connect() => anyhow::Error::new(e),
                Err(e) => return Err(e.into()),
            };

            attempt += 1;
            if attempt > self.max_retry {
                return Err(failure.context(format!(
                    "Range {} failed after {} retries",
                    range, self.max_retry
                )));
            }
            warn!(
                range = %range,
                attempt,
                max_retry = self.max_retry,
                error = %failure,
                "range request failed, retrying"
            );
            tokio::time::sleep(RETRY_BACKOFF * attempt).await;
        }
    }
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = offset.saturating_add(buf.len() as u64).min(self.size);
        let n = self.fetch_range(offset, end - 1, buf).await?;
        self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// Archive size from a HEAD response, provided the server takes byte ranges.
fn remote_size(headers: &HeaderMap) -> Result<u64> {
    let accepts_bytes = headers
        .get(header::ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|unit| unit.trim() == "bytes"));
    if !accepts_bytes {
        bail!("Remote server does not support Range requests");
    }

    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| anyhow!("Remote server did not return Content-Length"))
}

/// Reject a partial response that does not begin where it was asked to.
fn check_range_start(headers: &HeaderMap, start: u64) -> Result<()> {
    let Some(value) = headers.get(header::CONTENT_RANGE) else {
        return Ok(());
    };
    // bytes <first>-<last>/<total>
    let first = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("bytes "))
        .and_then(|v| v.split_once('-'))
        .and_then(|(first, _)| first.trim().parse::<u64>().ok())
        .ok_or_else(|| anyhow!("Malformed Content-Range: {:?}", value))?;
    if first != start {
        bail!("Server returned range starting at {} instead of {}", first, start);
    }
    Ok(())
}
