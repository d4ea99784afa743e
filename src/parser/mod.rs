//! Forgiving extended-M3U parser
//!
//! Converts playlist text into an ordered list of [`Channel`] records.
//! Malformed lines are skipped silently; an `#EXTINF` entry only survives
//! when a usable stream URL follows it within a few lines.

use std::collections::BTreeMap;

use tracing::{debug, trace};
use url::Url;

use crate::models::Channel;

/// Schemes a stream URL may use. Everything else is dropped at parse time.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "rtmp", "rtsp", "mms", "mmsh", "rtp"];

/// Path suffixes that mark a URL as an image, document or web page rather
/// than a stream endpoint.
const REJECTED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".ico", ".svg", ".webp", ".html", ".htm", ".php",
    ".asp", ".aspx", ".jsp", ".css", ".js", ".json", ".xml", ".txt", ".pdf", ".doc", ".docx",
    ".zip", ".rar", ".7z", ".tar", ".gz",
];

/// How many lines after an `#EXTINF` directive are searched for the URL.
const URL_LOOKAHEAD_LINES: usize = 5;

/// EXTINF attributes the parser lifts into dedicated [`Channel`] fields.
const RECOGNIZED_ATTRIBUTES: &[&str] = &[
    "tvg-id",
    "tvg-name",
    "tvg-logo",
    "group-title",
    "x-tvg-url",
    "url-tvg",
];

pub struct M3uParser;

impl M3uParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse playlist text into channels, preserving source order. The
    /// returned ids are dense positions `0..N-1`.
    pub fn parse(&self, content: &str) -> Vec<Channel> {
        let lines: Vec<&str> = content.lines().collect();
        let global_epg = extract_global_epg(&lines);

        let mut channels: Vec<Channel> = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i].trim();
            if line.is_empty() || !has_ci_prefix(line, "#EXTINF") {
                i += 1;
                continue;
            }

            let entry = parse_extinf_line(line);
            let mut group_override: Option<String> = None;
            let mut found: Option<(String, usize)> = None;

            let mut j = i + 1;
            while j < lines.len() && j <= i + URL_LOOKAHEAD_LINES {
                let candidate = lines[j].trim();
                if candidate.is_empty() {
                    j += 1;
                    continue;
                }
                if let Some(group) = strip_ci_prefix(candidate, "#EXTGRP:") {
                    group_override = Some(group.trim().to_string());
                    j += 1;
                    continue;
                }
                if candidate.starts_with('#') {
                    j += 1;
                    continue;
                }
                let candidate = candidate.trim_matches('"');
                if is_valid_stream_url(candidate) {
                    found = Some((candidate.to_string(), j));
                } else {
                    trace!("Rejecting stream URL candidate: {candidate}");
                }
                break;
            }

            match found {
                Some((link, url_index)) => {
                    let group_name = group_override
                        .or(entry.group_title)
                        .unwrap_or_default();
                    let epg_url = entry.epg_url.or_else(|| global_epg.clone());
                    channels.push(Channel {
                        id: channels.len(),
                        name: entry.name,
                        link,
                        group_name,
                        tvg_id: entry.tvg_id,
                        tvg_name: entry.tvg_name,
                        tvg_logo: entry.tvg_logo,
                        epg_url,
                        extra_attributes: entry.extra_attributes,
                        stream_info: None,
                        category: None,
                        language: None,
                        content_hash: None,
                    });
                    i = url_index + 1;
                }
                None => {
                    i += 1;
                }
            }
        }

        debug!("Parsed {} channels from {} lines", channels.len(), lines.len());
        channels
    }
}

impl Default for M3uParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata gathered from a single `#EXTINF` line.
struct ExtinfEntry {
    name: String,
    tvg_id: Option<String>,
    tvg_name: Option<String>,
    tvg_logo: Option<String>,
    group_title: Option<String>,
    epg_url: Option<String>,
    extra_attributes: BTreeMap<String, String>,
}

fn parse_extinf_line(line: &str) -> ExtinfEntry {
    let rest = &line[7..];
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    let (attrs, display) = scan_attributes(rest);

    let mut tvg_id = None;
    let mut tvg_name = None;
    let mut tvg_logo = None;
    let mut group_title = None;
    let mut epg_url = None;
    let mut extra_attributes = BTreeMap::new();

    for (key, value) in attrs {
        let lowered = key.to_lowercase();
        match lowered.as_str() {
            "tvg-id" => tvg_id = non_empty(value),
            "tvg-name" => tvg_name = non_empty(value),
            "tvg-logo" => tvg_logo = non_empty(value),
            "group-title" => group_title = non_empty(value),
            "x-tvg-url" | "url-tvg" => {
                if epg_url.is_none() {
                    epg_url = non_empty(value);
                }
            }
            _ => {
                extra_attributes.insert(key, value);
            }
        }
    }

    let name = display
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .or_else(|| tvg_name.clone())
        .unwrap_or_else(|| line.to_string());

    ExtinfEntry {
        name,
        tvg_id,
        tvg_name,
        tvg_logo,
        group_title,
        epg_url,
        extra_attributes,
    }
}

/// Walk an EXTINF payload collecting `key="value"` attributes until the
/// display-name comma. The duration token falls out naturally: its
/// characters never see a `="` pair and are discarded at the first
/// whitespace or comma.
///
/// Quotes are required around values; a bare `key=value` token is dropped.
fn scan_attributes(rest: &str) -> (Vec<(String, String)>, Option<String>) {
    let mut attrs = Vec::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut in_quotes = false;

    let mut iter = rest.char_indices();
    while let Some((idx, ch)) = iter.next() {
        if in_quotes {
            if ch == '"' {
                attrs.push((key.trim().to_string(), value.clone()));
                key.clear();
                value.clear();
                in_quotes = false;
            } else {
                value.push(ch);
            }
            continue;
        }
        match ch {
            ',' => {
                let display = &rest[idx + ch.len_utf8()..];
                return (attrs, Some(display.to_string()));
            }
            '=' => {
                if matches!(iter.clone().next(), Some((_, '"'))) {
                    iter.next();
                    in_quotes = true;
                } else {
                    key.clear();
                }
            }
            c if c.is_whitespace() => key.clear(),
            _ => key.push(ch),
        }
    }
    (attrs, None)
}

/// Pull a global EPG URL off the `#EXTM3U` header, when present.
fn extract_global_epg(lines: &[&str]) -> Option<String> {
    let first = lines.iter().map(|l| l.trim()).find(|l| !l.is_empty())?;
    if !has_ci_prefix(first, "#EXTM3U") {
        return None;
    }
    let (attrs, _) = scan_attributes(&first[7..]);
    attrs
        .into_iter()
        .find(|(key, value)| {
            let key = key.to_lowercase();
            (key == "x-tvg-url" || key == "url-tvg") && !value.is_empty()
        })
        .map(|(_, value)| value)
}

/// Accept only absolute URLs on a known streaming scheme, pointing at a
/// plausible remote host, and not at a static image/document path.
pub fn is_valid_stream_url(raw: &str) -> bool {
    let parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => return false,
    };
    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return false;
    }
    let host = match parsed.host_str() {
        Some(host) => host,
        None => return false,
    };
    if host.len() < 3 || matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0") {
        return false;
    }
    let path = parsed.path().to_lowercase();
    !REJECTED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn has_ci_prefix(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn strip_ci_prefix<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if has_ci_prefix(text, prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
