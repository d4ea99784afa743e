//! Byte and header signatures used to classify probed responses
//!
//! Pure classification helpers, no I/O. The error-page scan decodes bytes
//! as Latin-1 rather than UTF-8: every signature is 7-bit, and a binary
//! stream must never fail the decode.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::StreamInfo;

/// How much of the buffer the error-page scan looks at.
pub const ERROR_SCAN_WINDOW: usize = 2048;

/// How much of the buffer the binary heuristic looks at.
const BINARY_SCAN_WINDOW: usize = 100;

/// Media types accepted when neither magic bytes nor the binary heuristic
/// fire.
const RECOGNIZED_MEDIA_TYPES: &[&str] = &[
    "video/mp2t",
    "video/mp4",
    "video/mpeg",
    "video/x-mpegurl",
    "video/x-ms-asf",
    "video/x-msvideo",
    "video/x-flv",
    "video/webm",
    "video/3gpp",
    "video/quicktime",
    "audio/mpeg",
    "audio/aac",
    "audio/mp4",
    "audio/x-mpegurl",
    "audio/x-scpls",
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "application/dash+xml",
    "application/octet-stream",
    "binary/octet-stream",
];

static HLS_RESOLUTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RESOLUTION=(\d+)x(\d+)").expect("resolution pattern is valid"));
static HLS_BANDWIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BANDWIDTH=(\d+)").expect("bandwidth pattern is valid"));
static HLS_CODECS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"CODECS="([^"]*)""#).expect("codecs pattern is valid"));

/// Known container formats detectable from the first bytes of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// MPEG transport stream, sync byte `0x47`.
    MpegTs,
    /// ID3v2 tag, typically fronting MP3 or AAC audio.
    Id3Tagged,
    /// Raw MP3 frame sync.
    Mp3,
    /// AAC in an ADTS envelope.
    AdtsAac,
    /// Flash video container.
    Flv,
    /// HLS or DASH manifest text.
    HlsManifest,
}

impl ContainerFormat {
    /// Best-effort codec labels implied by the container alone.
    pub fn fallback_stream_info(self) -> StreamInfo {
        let mut info = StreamInfo::default();
        match self {
            ContainerFormat::MpegTs => info.video_codec = Some("MPEG-TS".to_string()),
            ContainerFormat::Id3Tagged => info.audio_codec = Some("MP3/AAC".to_string()),
            ContainerFormat::Mp3 => info.audio_codec = Some("MP3".to_string()),
            ContainerFormat::AdtsAac => info.audio_codec = Some("AAC".to_string()),
            ContainerFormat::Flv => info.video_codec = Some("FLV".to_string()),
            ContainerFormat::HlsManifest => {}
        }
        info
    }
}

/// Match the sniffed prefix against known container magic.
pub fn detect_container(buf: &[u8]) -> Option<ContainerFormat> {
    if buf.is_empty() {
        return None;
    }
    if buf[0] == 0x47 {
        return Some(ContainerFormat::MpegTs);
    }
    if buf.starts_with(b"ID3") {
        return Some(ContainerFormat::Id3Tagged);
    }
    if buf.starts_with(b"FLV") {
        return Some(ContainerFormat::Flv);
    }
    if buf.len() >= 2 && buf[0] == 0xFF {
        // ADTS first: its sync condition is a strict subset of MP3's.
        if buf[1] & 0xF0 == 0xF0 {
            return Some(ContainerFormat::AdtsAac);
        }
        if buf[1] & 0xE0 == 0xE0 {
            return Some(ContainerFormat::Mp3);
        }
    }
    if ascii_prefix(buf, ERROR_SCAN_WINDOW)
        .trim_start()
        .starts_with("#EXTM3U")
    {
        return Some(ContainerFormat::HlsManifest);
    }
    None
}

/// Recognize HTML/XML error pages and textual error bodies served with a
/// 2xx status.
pub fn looks_like_error_page(buf: &[u8]) -> bool {
    let text = ascii_prefix(buf, ERROR_SCAN_WINDOW);
    let trimmed = text.trim_start();
    let lowered = trimmed.to_lowercase();

    if lowered.starts_with("<!doctype") || lowered.starts_with("<html") {
        return true;
    }
    if lowered.starts_with("<?xml") && lowered.contains("<html") {
        return true;
    }
    if trimmed.starts_with("404") || trimmed.starts_with("403") || lowered.starts_with("error") {
        return true;
    }
    lowered.contains("not found") || lowered.contains("access denied")
}

/// True when more than 10% of the first hundred bytes are control
/// characters other than CR, LF and TAB.
pub fn is_mostly_binary(buf: &[u8]) -> bool {
    let window = &buf[..buf.len().min(BINARY_SCAN_WINDOW)];
    if window.is_empty() {
        return false;
    }
    let non_printable = window
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\r' | b'\n' | b'\t'))
        .count();
    non_printable * 10 > window.len()
}

/// True when the `Content-Type` media type (parameters stripped) is one of
/// the recognized stream types.
pub fn is_recognized_media_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    RECOGNIZED_MEDIA_TYPES.contains(&media_type.as_str())
}

/// Pull resolution, bandwidth and codec hints out of an HLS/DASH manifest
/// prefix.
pub fn stream_info_from_manifest(text: &str) -> StreamInfo {
    let mut info = StreamInfo::default();

    if let Some(caps) = HLS_RESOLUTION.captures(text) {
        info.width = caps[1].parse().ok();
        info.height = caps[2].parse().ok();
    }
    if let Some(caps) = HLS_BANDWIDTH.captures(text) {
        info.bitrate = caps[1].parse().ok();
    }
    if let Some(caps) = HLS_CODECS.captures(text) {
        for tag in caps[1].split(',') {
            apply_codec_tag(&mut info, tag.trim());
        }
    }
    info
}

fn apply_codec_tag(info: &mut StreamInfo, tag: &str) {
    let lowered = tag.to_lowercase();
    let video = |name: &str| Some(name.to_string());
    if lowered.starts_with("avc1") {
        info.video_codec = video("H.264");
    } else if lowered.starts_with("hvc1") || lowered.starts_with("hev1") {
        info.video_codec = video("HEVC");
    } else if lowered.starts_with("vp9") {
        info.video_codec = video("VP9");
    } else if lowered.starts_with("av01") {
        info.video_codec = video("AV1");
    } else if lowered.starts_with("mp4a") {
        info.audio_codec = Some("AAC".to_string());
    } else if lowered.starts_with("ac-3") {
        info.audio_codec = Some("AC3".to_string());
    } else if lowered.starts_with("opus") {
        info.audio_codec = Some("Opus".to_string());
    }
}

/// Decode a byte prefix as Latin-1 text. Safe on arbitrary binary input.
pub fn ascii_prefix(buf: &[u8], limit: usize) -> String {
    buf[..buf.len().min(limit)]
        .iter()
        .map(|&b| b as char)
        .collect()
}
