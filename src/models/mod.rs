//! Data model for the playlist cleaning pipeline
//!
//! Every stage consumes an ordered list of [`Channel`] records and produces a
//! new one; no stage mutates a channel another stage still holds. The `id`
//! field is a dense position in the current list and is rewritten by each
//! stage that reorders or drops entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single playlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Position in the current ordered list, `0..N-1`.
    pub id: usize,
    /// Human-readable display name.
    pub name: String,
    /// Absolute stream URL.
    pub link: String,
    /// Category; empty means uncategorized.
    #[serde(default)]
    pub group_name: String,
    pub tvg_id: Option<String>,
    pub tvg_name: Option<String>,
    pub tvg_logo: Option<String>,
    /// EPG URL, inline (`x-tvg-url` on the EXTINF line) or inherited from
    /// the playlist header.
    pub epg_url: Option<String>,
    /// Unrecognized `key="value"` attributes from the source EXTINF line.
    #[serde(default)]
    pub extra_attributes: BTreeMap<String, String>,
    /// Filled after a successful probe.
    pub stream_info: Option<StreamInfo>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub content_hash: Option<String>,
}

impl Channel {
    /// Create a channel with the given position, name and link; everything
    /// else starts unset.
    pub fn new(id: usize, name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            link: link.into(),
            group_name: String::new(),
            tvg_id: None,
            tvg_name: None,
            tvg_logo: None,
            epg_url: None,
            extra_attributes: BTreeMap::new(),
            stream_info: None,
            category: None,
            language: None,
            content_hash: None,
        }
    }

    /// Functional update of the list position.
    pub fn with_id(mut self, id: usize) -> Self {
        self.id = id;
        self
    }

    /// Functional update of the probed stream info.
    pub fn with_stream_info(mut self, info: Option<StreamInfo>) -> Self {
        self.stream_info = info;
        self
    }

    /// Name shown to the user: `tvg-name` when present, else the free-form
    /// display name.
    pub fn display_name(&self) -> &str {
        self.tvg_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Stream characteristics derived from a probe, all best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Bits per second.
    pub bitrate: Option<u64>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
}

impl StreamInfo {
    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.bitrate.is_none()
            && self.video_codec.is_none()
            && self.audio_codec.is_none()
    }

    /// Merge two partial records, preferring `self` field-wise. Used to let
    /// header-derived values win over body-derived ones.
    pub fn merged_over(self, fallback: StreamInfo) -> StreamInfo {
        StreamInfo {
            width: self.width.or(fallback.width),
            height: self.height.or(fallback.height),
            bitrate: self.bitrate.or(fallback.bitrate),
            video_codec: self.video_codec.or(fallback.video_codec),
            audio_codec: self.audio_codec.or(fallback.audio_codec),
        }
    }

    /// `None` when nothing was learned, `Some(self)` otherwise.
    pub fn into_option(self) -> Option<StreamInfo> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Verdict of a single probe attempt. Failures still produce an outcome,
/// with `alive` false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub alive: bool,
    pub stream_info: Option<StreamInfo>,
}

impl ProbeOutcome {
    pub fn dead() -> Self {
        Self::default()
    }

    pub fn alive(stream_info: Option<StreamInfo>) -> Self {
        Self {
            alive: true,
            stream_info,
        }
    }
}

/// Progress snapshot emitted by the probe scheduler.
///
/// `working + not_working` is monotone across successive reports; `percent`
/// may repeat when reports are rate-limited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    pub total: usize,
    pub working: usize,
    pub not_working: usize,
    pub percent: u8,
    pub activity_label: String,
}

impl ProgressReport {
    pub fn processed(&self) -> usize {
        self.working + self.not_working
    }
}

/// End-of-run accounting for one cleaned playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Channels that survived probing (or all kept channels when probing
    /// was skipped).
    pub working_count: usize,
    /// List size after deduplication, before probing.
    pub total_after_dedupe: usize,
    /// Entries removed by the deduplicator.
    pub doubles_removed: usize,
    /// Entries produced by the parser.
    pub original_count: usize,
    /// Distinct groups among the written channels.
    pub group_count: usize,
    /// Where the cleaned playlist was written.
    pub destination: String,
}
