//! Cosmetic metadata enrichment
//!
//! Pure table lookups over channel names; never touches links or probing
//! state. Categories fill an empty group, language lands in
//! `tvg-language` on output, and the content hash fingerprints the
//! name/link pair for downstream tooling.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::models::Channel;
use crate::utils::normalize::normalize_name;

/// Keyword fragments mapped to a category label. Checked in order against
/// the normalized name; first hit wins.
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("news", "News"),
    ("sport", "Sports"),
    ("espn", "Sports"),
    ("football", "Sports"),
    ("soccer", "Sports"),
    ("racing", "Sports"),
    ("movie", "Movies"),
    ("cinema", "Movies"),
    ("film", "Movies"),
    ("music", "Music"),
    ("radio", "Music"),
    ("hits", "Music"),
    ("kids", "Kids"),
    ("cartoon", "Kids"),
    ("junior", "Kids"),
    ("documentary", "Documentary"),
    ("discovery", "Documentary"),
    ("history", "Documentary"),
    ("nature", "Documentary"),
    ("weather", "News"),
];

/// Whole-word tokens mapped to an ISO 639-1 language code.
const LANGUAGE_TOKENS: &[(&str, &str)] = &[
    ("uk", "en"),
    ("us", "en"),
    ("usa", "en"),
    ("english", "en"),
    ("fr", "fr"),
    ("france", "fr"),
    ("french", "fr"),
    ("de", "de"),
    ("germany", "de"),
    ("german", "de"),
    ("es", "es"),
    ("spain", "es"),
    ("spanish", "es"),
    ("it", "it"),
    ("italy", "it"),
    ("italian", "it"),
    ("pt", "pt"),
    ("portugal", "pt"),
    ("nl", "nl"),
    ("pl", "pl"),
    ("tr", "tr"),
    ("turkish", "tr"),
    ("ar", "ar"),
    ("arabic", "ar"),
    ("ru", "ru"),
    ("russian", "ru"),
    ("hindi", "hi"),
];

/// Run the enrichment pass over a channel list. Order and ids are
/// untouched.
pub fn enrich_channels(channels: Vec<Channel>) -> Vec<Channel> {
    let total = channels.len();
    let enriched: Vec<Channel> = channels.into_iter().map(enrich_channel).collect();
    debug!("Enriched {total} channels");
    enriched
}

fn enrich_channel(mut channel: Channel) -> Channel {
    let normalized = normalize_name(&channel.name);

    if channel.category.is_none() {
        channel.category = detect_category(&normalized).map(str::to_string);
    }
    if channel.group_name.is_empty() {
        if let Some(category) = &channel.category {
            channel.group_name = category.clone();
        }
    }
    if channel.language.is_none() {
        channel.language = detect_language(&normalized).map(str::to_string);
    }
    if channel.content_hash.is_none() {
        channel.content_hash = Some(content_hash(&channel.name, &channel.link));
    }
    channel
}

fn detect_category(normalized_name: &str) -> Option<&'static str> {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| normalized_name.contains(keyword))
        .map(|(_, category)| *category)
}

fn detect_language(normalized_name: &str) -> Option<&'static str> {
    normalized_name.split_whitespace().find_map(|token| {
        LANGUAGE_TOKENS
            .iter()
            .find(|(word, _)| *word == token)
            .map(|(_, code)| *code)
    })
}

/// SHA-256 over `name|link`, hex encoded.
fn content_hash(name: &str, link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(b"|");
    hasher.update(link.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
