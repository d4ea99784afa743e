//! Bounded-concurrency probe fan-out
//!
//! Spawns one task per channel behind a counting semaphore, collects
//! completions over an unordered channel, and restores source order with a
//! single sort at the end. Survivor order therefore depends only on the
//! probe verdicts, never on completion timing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use crate::models::{Channel, ProgressReport};
use crate::probe::StreamProber;

/// Progress counters shared with the emitting side.
#[derive(Default)]
struct Counters {
    working: AtomicUsize,
    not_working: AtomicUsize,
    processed: AtomicUsize,
}

enum TaskOutcome {
    Done {
        index: usize,
        channel: Box<Channel>,
        alive: bool,
    },
    Cancelled,
}

pub struct ProbeScheduler {
    prober: Arc<dyn StreamProber>,
    concurrency: usize,
}

impl ProbeScheduler {
    /// The concurrency bound is clamped to `[1, 50]`.
    pub fn new(prober: Arc<dyn StreamProber>, concurrency: usize) -> Self {
        Self {
            prober,
            concurrency: concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY),
        }
    }

    /// Probe every channel and return the live ones in input order with
    /// dense ids. On cancellation, returns the survivors accumulated so
    /// far after emitting a terminal progress report.
    pub async fn filter_working<F>(
        &self,
        channels: Vec<Channel>,
        mut on_progress: F,
        cancel: &CancellationToken,
    ) -> Vec<Channel>
    where
        F: FnMut(ProgressReport),
    {
        let total = channels.len();
        if total == 0 {
            return Vec::new();
        }

        let interval = progress_interval(total);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let counters = Arc::new(Counters::default());
        let (tx, mut rx) = mpsc::unbounded_channel::<TaskOutcome>();

        debug!(
            "Probing {total} channels with up to {} in flight",
            self.concurrency
        );

        for (index, channel) in channels.into_iter().enumerate() {
            let prober = Arc::clone(&self.prober);
            let semaphore = Arc::clone(&semaphore);
            let counters = Arc::clone(&counters);
            let cancel = cancel.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => TaskOutcome::Cancelled,
                    permit = semaphore.acquire_owned() => {
                        let _permit = permit.expect("probe semaphore is never closed");
                        let result = prober.probe(&channel.link, &cancel).await;
                        if result.alive {
                            counters.working.fetch_add(1, Ordering::Relaxed);
                        } else {
                            counters.not_working.fetch_add(1, Ordering::Relaxed);
                        }
                        counters.processed.fetch_add(1, Ordering::Relaxed);
                        TaskOutcome::Done {
                            index,
                            channel: Box::new(channel.with_stream_info(result.stream_info)),
                            alive: result.alive,
                        }
                    }
                };
                // The receiver may already be gone on cancellation.
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        let mut survivors: Vec<(usize, Channel)> = Vec::new();
        while let Some(outcome) = rx.recv().await {
            let (index, channel, alive, label) = match outcome {
                TaskOutcome::Done {
                    index,
                    channel,
                    alive,
                } => {
                    let label = channel.display_name().to_string();
                    (index, channel, alive, label)
                }
                TaskOutcome::Cancelled => continue,
            };

            if alive {
                survivors.push((index, *channel));
            }

            let processed = counters.processed.load(Ordering::Relaxed);
            if processed % interval == 0 || processed == total {
                on_progress(snapshot(&counters, total, label));
            }
        }

        let cancelled = cancel.is_cancelled();
        let label = if cancelled {
            "Validation cancelled".to_string()
        } else {
            "Validation complete".to_string()
        };
        on_progress(snapshot(&counters, total, label));

        survivors.sort_by_key(|(index, _)| *index);
        let kept: Vec<Channel> = survivors
            .into_iter()
            .enumerate()
            .map(|(id, (_, channel))| channel.with_id(id))
            .collect();

        info!(
            "Probe pass kept {}/{} channels{}",
            kept.len(),
            total,
            if cancelled { " (cancelled)" } else { "" }
        );
        kept
    }
}

fn snapshot(counters: &Counters, total: usize, activity_label: String) -> ProgressReport {
    let working = counters.working.load(Ordering::Relaxed);
    let not_working = counters.not_working.load(Ordering::Relaxed);
    let processed = working + not_working;
    ProgressReport {
        total,
        working,
        not_working,
        percent: (100 * processed / total.max(1)) as u8,
        activity_label,
    }
}

/// Progress is reported every N completions, N growing with list size so
/// large runs do not flood the terminal.
fn progress_interval(total: usize) -> usize {
    match total {
        0..=19 => 1,
        20..=99 => 2,
        100..=499 => 5,
        500..=999 => 10,
        _ => (total / 100).max(1),
    }
}
