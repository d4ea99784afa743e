//! Pipeline composition
//!
//! The engine wires the stages together: load → parse → dedup → enrich →
//! probe → write, producing one [`SweepReport`] per output playlist.
//! Per-probe failures never reach this level; cancellation is treated as
//! partial success, not as an error.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::SweepOptions;
use crate::dedup::remove_duplicates;
use crate::enrich::enrich_channels;
use crate::errors::SweepResult;
use crate::models::{Channel, ProgressReport, SweepReport};
use crate::parser::M3uParser;
use crate::probe::{HttpStreamProber, StreamProber};
use crate::scheduler::ProbeScheduler;
use crate::sources::{temp_dir, SourceLoader};
use crate::writer::{M3uWriter, UNCATEGORIZED};

pub struct SweepEngine {
    options: SweepOptions,
    client: Client,
    prober: Arc<dyn StreamProber>,
}

impl SweepEngine {
    /// Build the engine and its shared HTTP client. The same client serves
    /// source downloads and stream probes.
    pub fn new(options: SweepOptions) -> SweepResult<Self> {
        let client = Client::builder().timeout(options.timeout).build()?;
        let prober: Arc<dyn StreamProber> = Arc::new(HttpStreamProber::new(client.clone()));
        Ok(Self {
            options,
            client,
            prober,
        })
    }

    /// Engine with a replacement prober. Lets tests drive the full
    /// pipeline without a network.
    pub fn with_prober(options: SweepOptions, prober: Arc<dyn StreamProber>) -> SweepResult<Self> {
        let client = Client::builder().timeout(options.timeout).build()?;
        Ok(Self {
            options,
            client,
            prober,
        })
    }

    /// Clean every configured source and return one report per output.
    pub async fn run<F>(
        &self,
        mut on_progress: F,
        cancel: &CancellationToken,
    ) -> SweepResult<Vec<SweepReport>>
    where
        F: FnMut(ProgressReport),
    {
        let loader = SourceLoader::new(self.client.clone());
        let parser = M3uParser::new();

        let mut loaded = Vec::with_capacity(self.options.sources.len());
        for source in &self.options.sources {
            loaded.push(loader.load(source).await?);
        }

        let mut reports = Vec::new();
        if self.options.merge {
            let mut channels: Vec<Channel> = Vec::new();
            for source in &loaded {
                let parsed = parser.parse(&source.text);
                info!("Source '{}': {} channels", source.origin, parsed.len());
                channels.extend(parsed);
            }
            let channels = reindex(channels);
            let stem = loaded
                .first()
                .map(|s| s.stem.as_str())
                .unwrap_or("playlist");
            let dest = self.destination_for(stem, true);
            reports.push(self.clean_set(channels, dest, &mut on_progress, cancel).await?);
        } else {
            let single = loaded.len() == 1;
            for source in &loaded {
                let channels = parser.parse(&source.text);
                if channels.is_empty() {
                    warn!("Source '{}' produced no channels", source.origin);
                }
                let dest = self.destination_for(&source.stem, single);
                reports.push(self.clean_set(channels, dest, &mut on_progress, cancel).await?);
                if cancel.is_cancelled() {
                    break;
                }
            }
        }
        Ok(reports)
    }

    /// Output path for one working set. An explicit `-dest` is honored
    /// verbatim for a single output; with several un-merged sources each
    /// output lands next to it under a derived name.
    fn destination_for(&self, stem: &str, single_output: bool) -> PathBuf {
        let default_name = format!("{stem}-Cleaned.m3u");
        match &self.options.destination {
            Some(dest) if single_output => dest.clone(),
            Some(dest) => dest
                .parent()
                .map(|p| p.join(&default_name))
                .unwrap_or_else(|| PathBuf::from(&default_name)),
            None => temp_dir().join(default_name),
        }
    }

    async fn clean_set<F>(
        &self,
        channels: Vec<Channel>,
        dest: PathBuf,
        on_progress: &mut F,
        cancel: &CancellationToken,
    ) -> SweepResult<SweepReport>
    where
        F: FnMut(ProgressReport),
    {
        let original_count = channels.len();

        let (channels, doubles_removed) = if self.options.remove_duplicates {
            let outcome = remove_duplicates(channels);
            (outcome.channels, outcome.removed)
        } else {
            (channels, 0)
        };
        let total_after_dedupe = channels.len();

        let channels = if self.options.enrich {
            enrich_channels(channels)
        } else {
            channels
        };

        let channels = if self.options.skip_validation || channels.is_empty() {
            channels
        } else {
            let scheduler = ProbeScheduler::new(
                Arc::clone(&self.prober),
                self.options.effective_concurrency(),
            );
            scheduler
                .filter_working(channels, &mut *on_progress, cancel)
                .await
        };

        let working_count = channels.len();
        let group_count = channels
            .iter()
            .map(|c| {
                if c.group_name.is_empty() {
                    UNCATEGORIZED
                } else {
                    c.group_name.as_str()
                }
            })
            .collect::<HashSet<_>>()
            .len();

        let report = SweepReport {
            working_count,
            total_after_dedupe,
            doubles_removed,
            original_count,
            group_count,
            destination: dest.display().to_string(),
        };

        if cancel.is_cancelled() {
            info!("Cancelled; leaving {} untouched", dest.display());
            return Ok(report);
        }

        let writer = M3uWriter::new();
        if self.options.split {
            writer.write_split(&dest, &channels).await?;
        } else {
            writer.write(&dest, &channels).await?;
        }

        info!(
            "Cleaned playlist: {}/{} channels working, {} duplicates removed",
            working_count, original_count, doubles_removed
        );
        Ok(report)
    }
}

fn reindex(channels: Vec<Channel>) -> Vec<Channel> {
    channels
        .into_iter()
        .enumerate()
        .map(|(id, channel)| channel.with_id(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn options_for(src: &str, dest: &std::path::Path) -> SweepOptions {
        SweepOptions {
            sources: vec![src.to_string()],
            destination: Some(dest.to_path_buf()),
            skip_validation: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn skip_validation_keeps_all_unique_channels() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "#EXTM3U\n\
             #EXTINF:-1 group-title=\"News\",Alpha One\nhttp://h.example/a\n\
             #EXTINF:-1 group-title=\"News\",Alpha One\nhttp://h.example/a\n\
             #EXTINF:-1,Beta Two\nhttp://h.example/b\n"
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.m3u");
        let engine = SweepEngine::new(options_for(file.path().to_str().unwrap(), &dest)).unwrap();
        let cancel = CancellationToken::new();

        let reports = engine.run(|_| {}, &cancel).await.unwrap();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.original_count, 3);
        assert_eq!(report.doubles_removed, 1);
        assert_eq!(report.total_after_dedupe, 2);
        assert_eq!(report.working_count, 2);
        assert_eq!(report.group_count, 2);

        let written = std::fs::read_to_string(&dest).unwrap();
        assert!(written.contains("Alpha One"));
        assert!(written.contains("Beta Two"));
    }

    #[tokio::test]
    async fn empty_source_reports_zeros_and_still_writes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "#EXTM3U\n").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("empty.m3u");
        let engine = SweepEngine::new(options_for(file.path().to_str().unwrap(), &dest)).unwrap();
        let cancel = CancellationToken::new();

        let reports = engine.run(|_| {}, &cancel).await.unwrap();
        assert_eq!(reports[0].working_count, 0);
        assert_eq!(reports[0].original_count, 0);
        assert!(std::fs::read_to_string(&dest).unwrap().starts_with("#EXTM3U"));
    }

    #[tokio::test]
    async fn missing_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.m3u");
        let engine = SweepEngine::new(options_for("/no/such/file.m3u", &dest)).unwrap();
        let cancel = CancellationToken::new();
        assert!(engine.run(|_| {}, &cancel).await.is_err());
    }
}
