//! URL and channel-name canonicalization
//!
//! Pure functions, no I/O. The deduplicator keys its equality sets on these
//! forms; the stored channels keep their original `link` and `name`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Query parameters dropped during URL normalization. Entries ending in `=`
/// anchor a whole parameter name; the rest match any parameter starting with
/// the prefix.
const VOLATILE_QUERY_PREFIXES: &[&str] = &[
    "utm_",
    "session",
    "sid=",
    "token=",
    "t=",
    "ts=",
    "timestamp=",
    "_=",
    "random=",
    "r=",
    "cache=",
    "nocache=",
];

/// Names too generic to participate in name-based deduplication.
static GENERIC_NAMES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "channel",
        "test",
        "live",
        "stream",
        "tv",
        "video",
        "audio",
        "radio",
        "news",
        "sports",
        "movie",
        "music",
        "entertainment",
    ]
    .into_iter()
    .collect()
});

static QUALITY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(hd|sd|fhd|uhd|4k|1080p|720p|480p|360p)\s*$")
        .expect("quality suffix pattern is valid")
});

/// Canonicalize a stream URL for equality comparison.
///
/// Folds case, trailing slashes, default ports, a leading `www.` and a set
/// of volatile tracking/session query parameters; the surviving parameters
/// are sorted so ordering differences disappear.
pub fn normalize_url(url: &str) -> String {
    let mut normalized = url.trim().to_lowercase();
    if normalized.is_empty() {
        return normalized;
    }

    if normalized.ends_with('/') {
        normalized.pop();
    }

    if let Some((base, query)) = normalized.split_once('?') {
        let mut base = base.to_string();
        if base.ends_with('/') {
            base.pop();
        }
        let mut params: Vec<&str> = query
            .split('&')
            .filter(|p| !p.is_empty() && !is_volatile_param(p))
            .collect();
        params.sort_unstable();
        normalized = if params.is_empty() {
            base
        } else {
            format!("{}?{}", base, params.join("&"))
        };
    }

    normalized = normalized.replace(":80/", "/").replace(":443/", "/");
    normalized = normalized.replace("://www.", "://");
    normalized
}

fn is_volatile_param(param: &str) -> bool {
    VOLATILE_QUERY_PREFIXES
        .iter()
        .any(|prefix| param.starts_with(prefix))
}

/// Canonicalize a channel name for equality comparison.
///
/// Strips an EXTINF prefix, a trailing quality suffix and all punctuation,
/// then collapses whitespace.
pub fn normalize_name(name: &str) -> String {
    let mut text = name;
    let starts_extinf = text
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("#extinf"));
    if starts_extinf {
        text = match text.split_once(',') {
            Some((_, rest)) => rest,
            None => text,
        };
    }

    let lowered = text.trim().to_lowercase();
    let stripped = QUALITY_SUFFIX.replace(&lowered, "");

    let cleaned: String = stripped
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A name takes part in name-based deduplication only when it is long
/// enough and not one of the generic placeholders.
pub fn is_meaningful_name(normalized: &str) -> bool {
    normalized.chars().count() > 3 && !GENERIC_NAMES.contains(normalized)
}
