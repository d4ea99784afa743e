//! Terminal presentation
//!
//! Banner, probe progress bar and the end-of-run report. Colors come from
//! `colored`, which already stands down when `NO_COLOR` is set or stdout
//! is not a terminal. None of this is load-bearing: the engine works the
//! same with a silent progress callback.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::models::{ProgressReport, SweepReport};

pub fn print_banner() {
    println!(
        "{}",
        format!("m3u-sweep v{}", env!("CARGO_PKG_VERSION")).bold().cyan()
    );
    println!("{}", "Removes duplicate and dead entries from M3U playlists".dimmed());
    println!();
}

/// Progress bar fed by scheduler reports. Created lazily because the
/// total is only known once probing starts.
pub struct ProgressDisplay {
    bar: Option<ProgressBar>,
}

impl ProgressDisplay {
    pub fn new() -> Self {
        Self { bar: None }
    }

    pub fn update(&mut self, report: &ProgressReport) {
        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(report.total as u64);
            bar.set_style(
                ProgressStyle::with_template(
                    "  [{bar:40}] {pos}/{len} ({percent}%) {msg}",
                )
                .expect("progress template is valid")
                .progress_chars("=> "),
            );
            bar
        });
        bar.set_position(report.processed() as u64);
        bar.set_message(report.activity_label.clone());
    }

    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

pub fn print_report(report: &SweepReport) {
    let dead = report.total_after_dedupe.saturating_sub(report.working_count);
    println!();
    println!("{}", "Results".bold());
    println!(
        "  Parsed entries     {}",
        report.original_count.to_string().bold()
    );
    println!(
        "  Duplicates removed {}",
        report.doubles_removed.to_string().yellow()
    );
    println!(
        "  Working channels   {}",
        report.working_count.to_string().green().bold()
    );
    println!("  Dead channels      {}", dead.to_string().red());
    println!("  Groups             {}", report.group_count.to_string().bold());
    println!("  Output             {}", report.destination.cyan());
}
