//! Stream liveness probing
//!
//! A probe issues one GET, reads a small window of the body and classifies
//! the result against known container magic, error-page signatures and a
//! content-type allowlist. Probe failures are an expected domain condition
//! and are absorbed into a dead verdict rather than surfaced as errors.

pub mod signatures;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::models::{ProbeOutcome, StreamInfo};
use self::signatures::ContainerFormat;

/// Some upstreams only answer media players; present ourselves as one.
const PROBE_USER_AGENT: &str = "VLC/3.0.18 LibVLC/3.0.18";

/// Body-read budget once response headers have arrived. Independent of the
/// outer client timeout, which caps connect plus headers.
const SNIFF_DEADLINE: Duration = Duration::from_secs(8);

/// Stop reading as soon as this much body has arrived.
const SNIFF_TARGET_BYTES: usize = 512;

/// Never keep more than this much body.
const SNIFF_MAX_BYTES: usize = 4096;

/// At most this many chunk reads per probe.
const MAX_READ_ATTEMPTS: usize = 3;

/// Backoff between probe attempts for one URL.
const RETRY_DELAYS: [Duration; 2] = [Duration::from_millis(100), Duration::from_millis(200)];

/// Decides whether a URL points at a live media stream. The trait boundary
/// exists so the scheduler can be driven by a scripted double in tests.
#[async_trait]
pub trait StreamProber: Send + Sync {
    async fn probe(&self, url: &str, cancel: &CancellationToken) -> ProbeOutcome;
}

/// Prober backed by the shared HTTP client.
pub struct HttpStreamProber {
    client: Client,
}

impl HttpStreamProber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn attempt(&self, url: &str) -> ProbeOutcome {
        let response = match self
            .client
            .get(url)
            .header(header::USER_AGENT, PROBE_USER_AGENT)
            .header(header::ACCEPT, "*/*")
            .header(header::CONNECTION, "keep-alive")
            .header("Icy-MetaData", "1")
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                trace!("Probe transport error for {url}: {err}");
                return ProbeOutcome::dead();
            }
        };

        let status = response.status();
        if !status.is_success() || status == StatusCode::NO_CONTENT {
            trace!("Probe rejected {url}: HTTP {status}");
            return ProbeOutcome::dead();
        }

        let header_info = stream_info_from_headers(&response);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = read_sniff_window(response).await;
        if body.is_empty() {
            return ProbeOutcome::dead();
        }
        classify_response(&body, content_type.as_deref(), header_info)
    }
}

#[async_trait]
impl StreamProber for HttpStreamProber {
    async fn probe(&self, url: &str, cancel: &CancellationToken) -> ProbeOutcome {
        let mut last = ProbeOutcome::dead();
        for attempt in 0..=RETRY_DELAYS.len() {
            if attempt > 0 {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return last,
                    _ = tokio::time::sleep(RETRY_DELAYS[attempt - 1]) => {}
                }
            }
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return last,
                outcome = self.attempt(url) => outcome,
            };
            if outcome.alive {
                return outcome;
            }
            last = outcome;
        }
        last
    }
}

/// Shoutcast/Icecast servers advertise the bitrate in `icy-br` (kbit/s).
fn stream_info_from_headers(response: &Response) -> StreamInfo {
    let mut info = StreamInfo::default();
    if let Some(kbps) = response
        .headers()
        .get("icy-br")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        info.bitrate = Some(kbps * 1000);
    }
    info
}

/// Read body chunks until enough bytes arrived for classification, the
/// read budget is spent, or the stream ends.
async fn read_sniff_window(mut response: Response) -> Vec<u8> {
    let deadline = tokio::time::Instant::now() + SNIFF_DEADLINE;
    let mut buf: Vec<u8> = Vec::with_capacity(SNIFF_MAX_BYTES);
    let mut reads = 0;

    while reads < MAX_READ_ATTEMPTS && buf.len() < SNIFF_TARGET_BYTES {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, response.chunk()).await {
            Ok(Ok(Some(chunk))) => {
                buf.extend_from_slice(&chunk);
                reads += 1;
            }
            // End of stream, transport error or deadline: classify what we have.
            Ok(Ok(None)) | Ok(Err(_)) | Err(_) => break,
        }
        if buf.len() >= SNIFF_MAX_BYTES {
            break;
        }
    }

    buf.truncate(SNIFF_MAX_BYTES);
    buf
}

/// The acceptance predicate: error pages lose, container magic wins, then
/// the binary heuristic, then the content-type allowlist.
fn classify_response(
    body: &[u8],
    content_type: Option<&str>,
    header_info: StreamInfo,
) -> ProbeOutcome {
    if signatures::looks_like_error_page(body) {
        return ProbeOutcome::dead();
    }

    if let Some(container) = signatures::detect_container(body) {
        let body_info = match container {
            ContainerFormat::HlsManifest => {
                let text = signatures::ascii_prefix(body, body.len());
                signatures::stream_info_from_manifest(&text)
            }
            other => other.fallback_stream_info(),
        };
        return ProbeOutcome::alive(header_info.merged_over(body_info).into_option());
    }

    if signatures::is_mostly_binary(body) {
        return ProbeOutcome::alive(header_info.into_option());
    }

    if content_type.is_some_and(signatures::is_recognized_media_type) {
        return ProbeOutcome::alive(header_info.into_option());
    }

    ProbeOutcome::dead()
}
