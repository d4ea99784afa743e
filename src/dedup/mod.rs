//! Duplicate suppression under normalized link and name keys
//!
//! A single ordered pass with two equality sets. The stored channels keep
//! their original `link` and `name`; only the set keys are normalized.

use std::collections::HashSet;

use tracing::debug;

use crate::models::Channel;
use crate::utils::normalize::{is_meaningful_name, normalize_name, normalize_url};

/// Result of a dedup pass: the surviving channels with dense ids, plus how
/// many entries were dropped.
#[derive(Debug)]
pub struct DedupOutcome {
    pub channels: Vec<Channel>,
    pub removed: usize,
}

/// Remove channels whose normalized link or (meaningful) normalized name
/// was already seen, preserving source order among survivors.
///
/// A name collision also retracts the loser's link key, so the collision
/// does not mask a later, legitimately distinct channel reusing that link.
pub fn remove_duplicates(channels: Vec<Channel>) -> DedupOutcome {
    let total = channels.len();
    let mut links: HashSet<String> = HashSet::with_capacity(total);
    let mut names: HashSet<String> = HashSet::with_capacity(total);
    let mut kept: Vec<Channel> = Vec::with_capacity(total);

    for channel in channels {
        let link_key = normalize_url(&channel.link);
        if links.contains(&link_key) {
            continue;
        }
        links.insert(link_key.clone());

        let name_key = normalize_name(&channel.name);
        if is_meaningful_name(&name_key) {
            if names.contains(&name_key) {
                links.remove(&link_key);
                continue;
            }
            names.insert(name_key);
        }

        let id = kept.len();
        kept.push(channel.with_id(id));
    }

    let removed = total - kept.len();
    debug!("Deduplication removed {removed} of {total} channels");
    DedupOutcome {
        channels: kept,
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str, link: &str) -> Channel {
        Channel::new(0, name, link)
    }

    fn names(outcome: &DedupOutcome) -> Vec<&str> {
        outcome.channels.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn collapses_normalized_url_variants() {
        let outcome = remove_duplicates(vec![
            channel("Alpha News Desk", "http://h/ch?utm_source=x&a=1"),
            channel("Beta News Desk", "http://h/ch/?a=1"),
        ]);
        assert_eq!(outcome.channels.len(), 1);
        assert_eq!(outcome.removed, 1);
        assert_eq!(outcome.channels[0].link, "http://h/ch?utm_source=x&a=1");
    }

    #[test]
    fn collapses_meaningful_name_collisions() {
        let outcome = remove_duplicates(vec![
            channel("BBC One HD", "http://h.example/url1"),
            channel("bbc one", "http://h.example/url2"),
        ]);
        assert_eq!(names(&outcome), ["BBC One HD"]);
        assert_eq!(outcome.removed, 1);
    }

    #[test]
    fn generic_names_do_not_collide() {
        let outcome = remove_duplicates(vec![
            channel("News", "http://h.example/1"),
            channel("News", "http://h.example/2"),
            channel("TV", "http://h.example/3"),
        ]);
        assert_eq!(outcome.channels.len(), 3);
        assert_eq!(outcome.removed, 0);
    }

    #[test]
    fn name_collision_retracts_link_key() {
        // The second channel loses on name; its link key must not block the
        // third channel, which reuses that link under a fresh name.
        let outcome = remove_duplicates(vec![
            channel("Gamma Movies", "http://h.example/a"),
            channel("gamma movies", "http://h.example/b"),
            channel("Delta Movies", "http://h.example/b"),
        ]);
        assert_eq!(names(&outcome), ["Gamma Movies", "Delta Movies"]);
        assert_eq!(outcome.removed, 1);
    }

    #[test]
    fn survivors_keep_source_order_with_dense_ids() {
        let outcome = remove_duplicates(vec![
            channel("Alpha Prime", "http://h.example/1"),
            channel("Alpha Prime", "http://h.example/2"),
            channel("Beta Prime", "http://h.example/3"),
            channel("Gamma Prime", "http://h.example/4"),
        ]);
        assert_eq!(names(&outcome), ["Alpha Prime", "Beta Prime", "Gamma Prime"]);
        let ids: Vec<usize> = outcome.channels.iter().map(|c| c.id).collect();
        assert_eq!(ids, [0, 1, 2]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let input = vec![
            channel("Alpha Prime", "http://h.example/1"),
            channel("alpha prime", "http://h.example/2"),
            channel("Beta Prime", "http://h.example/1/"),
            channel("Gamma Prime", "http://h.example/3"),
        ];
        let first = remove_duplicates(input);
        let survivors = first.channels.clone();
        let second = remove_duplicates(survivors);
        assert_eq!(second.channels, first.channels);
        assert_eq!(second.removed, 0);
    }
}
