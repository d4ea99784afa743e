//! Source playlist resolution
//!
//! A source is either a local file or an HTTP(S) URL. Remote sources are
//! streamed into a timestamped file under the OS temp directory before
//! decoding, so a crashed run leaves the raw download behind for
//! inspection.

use std::path::PathBuf;

use chrono::Local;
use futures::StreamExt;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::{SourceError, SweepResult};
use crate::utils::encoding::decode_playlist_bytes;
use crate::utils::sanitize_file_component;

/// Subdirectory of the OS temp dir holding downloads and default outputs.
pub const TEMP_SUBDIR: &str = "m3u-sweep";

/// Longest sanitized origin kept in a downloaded file's name.
const MAX_ORIGIN_STEM: usize = 80;

/// A source playlist resolved to text.
#[derive(Debug)]
pub struct LoadedSource {
    /// Decoded playlist text.
    pub text: String,
    /// What the user asked for, for display and reports.
    pub origin: String,
    /// Base name for derived output files.
    pub stem: String,
}

pub struct SourceLoader {
    client: Client,
}

impl SourceLoader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve and read one source argument.
    pub async fn load(&self, source: &str) -> SweepResult<LoadedSource> {
        let source = source.trim();
        if looks_like_url(source) {
            self.download(source).await
        } else {
            self.read_local(source).await
        }
    }

    async fn read_local(&self, path: &str) -> SweepResult<LoadedSource> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|_| SourceError::not_found(path))?;
        let stem = PathBuf::from(path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "playlist".to_string());
        debug!("Read {} bytes from {path}", bytes.len());
        Ok(LoadedSource {
            text: decode_playlist_bytes(&bytes),
            origin: path.to_string(),
            stem,
        })
    }

    async fn download(&self, raw_url: &str) -> SweepResult<LoadedSource> {
        let url = Url::parse(raw_url)
            .map_err(|e| SourceError::invalid_url(raw_url, e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SourceError::invalid_url(raw_url, "unsupported scheme").into());
        }

        info!("Downloading source playlist: {raw_url}");
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            SourceError::invalid_url(raw_url, e.to_string())
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::download_failed(raw_url, status.as_u16()).into());
        }

        let total_size = response.content_length();
        let target = download_target(&url)?;

        let mut bytes: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!("Download aborted for {raw_url}: {err}");
                    return Err(SourceError::invalid_url(raw_url, err.to_string()).into());
                }
            };
            bytes.extend_from_slice(&chunk);
            downloaded += chunk.len() as u64;
            if downloaded % 1_000_000 < chunk.len() as u64 {
                match total_size {
                    Some(total) => debug!("Downloaded {downloaded} / {total} bytes"),
                    None => debug!("Downloaded {downloaded} bytes"),
                }
            }
        }
        info!("Download completed: {downloaded} bytes");

        if let Err(err) = tokio::fs::write(&target, &bytes).await {
            // The copy is a convenience; the run continues from memory.
            warn!("Could not keep a copy at {}: {err}", target.display());
        } else {
            debug!("Saved source copy to {}", target.display());
        }

        let stem = origin_stem(&url);
        Ok(LoadedSource {
            text: decode_playlist_bytes(&bytes),
            origin: raw_url.to_string(),
            stem,
        })
    }
}

/// Directory for downloads and default outputs, created on demand.
pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(TEMP_SUBDIR)
}

fn download_target(url: &Url) -> SweepResult<PathBuf> {
    let dir = temp_dir();
    std::fs::create_dir_all(&dir)?;
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    Ok(dir.join(format!("{}_{timestamp}.m3u", origin_stem(url))))
}

fn origin_stem(url: &Url) -> String {
    let origin = format!("{}{}", url.host_str().unwrap_or("source"), url.path());
    let mut stem = sanitize_file_component(&origin);
    stem.truncate(MAX_ORIGIN_STEM);
    if stem.is_empty() {
        stem.push_str("source");
    }
    stem
}

fn looks_like_url(source: &str) -> bool {
    source.contains("://")
}
