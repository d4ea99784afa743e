use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m3u_sweep::{
    config::{parse_lenient_bool, SweepOptions},
    engine::SweepEngine,
    ui,
};

/// Exit code for a user-initiated cancel, mirroring 128+SIGINT.
const EXIT_CANCELLED: i32 = 130;

#[derive(Parser)]
#[command(name = "m3u-sweep")]
#[command(version)]
#[command(about = "Removes duplicate and dead entries from M3U/M3U8 playlists")]
struct Cli {
    /// Source playlist, local path or HTTP(S) URL (repeatable)
    #[arg(short = 's', long = "src", value_name = "PATH|URL")]
    src: Vec<String>,

    /// Output path; defaults to a temp-dir file named after the source
    #[arg(short = 'd', long = "dest", value_name = "PATH")]
    dest: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(short = 't', long, value_name = "SECONDS", default_value_t = 10)]
    timeout: u64,

    /// Maximum concurrent probes, clamped to 1-50
    #[arg(short = 'c', long = "concurrency", value_name = "N", default_value_t = 10)]
    concurrency: usize,

    /// Remove duplicate entries; pass false/f/0/no to keep them
    #[arg(long = "rd", value_name = "BOOL", default_value = "true")]
    remove_duplicates: String,

    /// Keep all parsed channels without probing them
    #[arg(long)]
    skip_validation: bool,

    /// Concatenate all sources into one playlist
    #[arg(long)]
    merge: bool,

    /// Write one output file per group
    #[arg(long)]
    split: bool,

    /// Fill category/language metadata before writing
    #[arg(long)]
    enrich: bool,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", format!("error: {err:#}").red());
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    if !cli.json {
        ui::print_banner();
    }

    let mut sources = cli.src;
    if sources.is_empty() {
        if std::io::stdin().is_terminal() {
            sources.push(prompt_for_source()?);
        } else {
            anyhow::bail!("no source playlist given; pass --src <path|url>");
        }
    }

    let verbose = cli.verbose;
    let options = SweepOptions {
        sources,
        destination: cli.dest,
        timeout: Duration::from_secs(cli.timeout.max(1)),
        concurrency: cli.concurrency,
        remove_duplicates: parse_lenient_bool(&cli.remove_duplicates),
        skip_validation: cli.skip_validation,
        merge: cli.merge,
        split: cli.split,
        enrich: cli.enrich,
        verbose,
    };

    let engine = SweepEngine::new(options)?;
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let show_progress = !cli.json;
    let mut progress = ui::ProgressDisplay::new();
    let result = engine
        .run(
            |report| {
                if show_progress {
                    progress.update(&report);
                }
            },
            &cancel,
        )
        .await;
    progress.finish();

    match result {
        Ok(reports) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    ui::print_report(report);
                }
            }
            if cancel.is_cancelled() {
                eprintln!("{}", "cancelled".yellow());
                Ok(EXIT_CANCELLED)
            } else {
                Ok(0)
            }
        }
        Err(err) => {
            if verbose {
                eprintln!("{}", format!("error: {err:?}").red());
            } else {
                eprintln!("{}", format!("error: {err}").red());
            }
            Ok(1)
        }
    }
}

fn prompt_for_source() -> Result<String> {
    print!("Source playlist (path or URL): ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let line = line.trim().to_string();
    if line.is_empty() {
        anyhow::bail!("no source playlist given");
    }
    Ok(line)
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "m3u_sweep=debug"
    } else {
        "m3u_sweep=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
