//! Run options for the cleaning pipeline
//!
//! All configuration arrives through the command line; there is no config
//! file surface. The structs here are the validated form the engine
//! consumes.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hard bounds on concurrent probes.
pub const MIN_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOptions {
    /// Source playlists, local paths or HTTP(S) URLs.
    pub sources: Vec<String>,
    /// Output path; when absent a per-source default under the OS temp
    /// directory is used.
    pub destination: Option<PathBuf>,
    /// Per-request total timeout for downloads and probes.
    pub timeout: Duration,
    /// Maximum concurrent probes, clamped to `[MIN_CONCURRENCY, MAX_CONCURRENCY]`.
    pub concurrency: usize,
    /// Remove duplicate entries before probing.
    pub remove_duplicates: bool,
    /// Keep all parsed channels without probing them.
    pub skip_validation: bool,
    /// Concatenate all sources into one working set.
    pub merge: bool,
    /// Write one output file per group.
    pub split: bool,
    /// Fill category/language/content-hash metadata before writing.
    pub enrich: bool,
    /// Verbose error output.
    pub verbose: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            destination: None,
            timeout: Duration::from_secs(10),
            concurrency: 10,
            remove_duplicates: true,
            skip_validation: false,
            merge: false,
            split: false,
            enrich: false,
            verbose: false,
        }
    }
}

impl SweepOptions {
    /// Concurrency with the `[1, 50]` clamp applied.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
    }
}

/// Lenient boolean parsing for flag values: `false`, `f`, `0` and `no`
/// (any case) are false, everything else is true.
pub fn parse_lenient_bool(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "f" | "0" | "no"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_is_clamped() {
        let mut opts = SweepOptions {
            concurrency: 0,
            ..Default::default()
        };
        assert_eq!(opts.effective_concurrency(), 1);
        opts.concurrency = 500;
        assert_eq!(opts.effective_concurrency(), 50);
        opts.concurrency = 17;
        assert_eq!(opts.effective_concurrency(), 17);
    }

    #[test]
    fn lenient_bool_false_forms() {
        for v in ["false", "f", "0", "no", "NO", "False", " F "] {
            assert!(!parse_lenient_bool(v), "{v:?} should parse as false");
        }
        for v in ["true", "t", "1", "yes", "anything"] {
            assert!(parse_lenient_bool(v), "{v:?} should parse as true");
        }
    }
}
