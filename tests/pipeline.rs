//! End-to-end pipeline tests driving the engine through the public API
//! with a scripted prober instead of a network.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use m3u_sweep::config::SweepOptions;
use m3u_sweep::engine::SweepEngine;
use m3u_sweep::models::{ProbeOutcome, ProgressReport, StreamInfo};
use m3u_sweep::parser::M3uParser;
use m3u_sweep::probe::StreamProber;
use m3u_sweep::writer::M3uWriter;

/// Prober double: URLs ending in one of `dead_suffixes` are dead, the
/// rest are alive with a fixed stream info.
struct ScriptedProber {
    dead_suffixes: Vec<&'static str>,
    delay: Duration,
}

impl ScriptedProber {
    fn new(dead_suffixes: Vec<&'static str>) -> Self {
        Self {
            dead_suffixes,
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl StreamProber for ScriptedProber {
    async fn probe(&self, url: &str, cancel: &CancellationToken) -> ProbeOutcome {
        if !self.delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return ProbeOutcome::dead(),
                _ = tokio::time::sleep(self.delay) => {}
            }
        }
        if self.dead_suffixes.iter().any(|s| url.ends_with(s)) {
            ProbeOutcome::dead()
        } else {
            ProbeOutcome::alive(Some(StreamInfo {
                video_codec: Some("MPEG-TS".to_string()),
                ..Default::default()
            }))
        }
    }
}

fn write_source(path: &Path, text: &str) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

const SOURCE: &str = "#EXTM3U x-tvg-url=\"http://epg.example/guide.xml\"\n\
    #EXTINF:-1 tvg-id=\"a1\" group-title=\"News\",Alpha One\n\
    http://h.example/alpha\n\
    #EXTINF:-1 group-title=\"News\",Alpha One FHD\n\
    http://h.example/alpha?utm_source=promo\n\
    #EXTINF:-1 group-title=\"Sports\",Beta Arena\n\
    http://h.example/beta\n\
    #EXTINF:-1,Gamma Varieties\n\
    http://h.example/gamma\n";

fn options(source: &Path, dest: &Path) -> SweepOptions {
    SweepOptions {
        sources: vec![source.to_string_lossy().into_owned()],
        destination: Some(dest.to_path_buf()),
        ..Default::default()
    }
}

#[tokio::test]
async fn full_clean_drops_duplicates_and_dead_streams() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("list.m3u");
    let dest = dir.path().join("list-clean.m3u");
    write_source(&src, SOURCE);

    let prober = Arc::new(ScriptedProber::new(vec!["/beta"]));
    let engine = SweepEngine::with_prober(options(&src, &dest), prober).unwrap();
    let cancel = CancellationToken::new();

    let reports = engine.run(|_| {}, &cancel).await.unwrap();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    // 4 parsed; the utm_source variant of /alpha is a duplicate; /beta dies.
    assert_eq!(report.original_count, 4);
    assert_eq!(report.doubles_removed, 1);
    assert_eq!(report.total_after_dedupe, 3);
    assert_eq!(report.working_count, 2);

    let written = std::fs::read_to_string(&dest).unwrap();
    assert!(written.starts_with("#EXTM3U x-tvg-url=\"http://epg.example/guide.xml\""));
    assert!(written.contains("http://h.example/alpha"));
    assert!(written.contains("Gamma Varieties"));
    assert!(!written.contains("/beta"));
    assert!(!written.contains("utm_source"));
}

#[tokio::test]
async fn cleaned_output_reparses_to_the_same_channels() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("list.m3u");
    let dest = dir.path().join("list-clean.m3u");
    write_source(&src, SOURCE);

    let mut opts = options(&src, &dest);
    opts.skip_validation = true;
    opts.remove_duplicates = false;
    let engine = SweepEngine::new(opts).unwrap();
    let cancel = CancellationToken::new();
    engine.run(|_| {}, &cancel).await.unwrap();

    let parser = M3uParser::new();
    let writer = M3uWriter::new();
    let first = parser.parse(&std::fs::read_to_string(&dest).unwrap());
    let second = parser.parse(&writer.render(&first));
    assert_eq!(first, second);
}

#[tokio::test]
async fn progress_reports_are_monotone_and_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("list.m3u");
    let dest = dir.path().join("out.m3u");

    let mut text = String::from("#EXTM3U\n");
    for i in 0..60 {
        text.push_str(&format!(
            "#EXTINF:-1,Entry Number {i}\nhttp://h.example/{i}\n"
        ));
    }
    write_source(&src, &text);

    let prober = Arc::new(ScriptedProber::new(vec![]));
    let engine = SweepEngine::with_prober(options(&src, &dest), prober).unwrap();
    let cancel = CancellationToken::new();

    let mut reports: Vec<ProgressReport> = Vec::new();
    engine.run(|r| reports.push(r), &cancel).await.unwrap();

    assert!(!reports.is_empty());
    for pair in reports.windows(2) {
        assert!(pair[1].processed() >= pair[0].processed());
    }
    assert_eq!(reports.last().unwrap().processed(), 60);
}

#[tokio::test]
async fn cancellation_skips_the_write_and_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("list.m3u");
    let dest = dir.path().join("out.m3u");
    write_source(&src, SOURCE);

    let prober = Arc::new(ScriptedProber {
        dead_suffixes: vec![],
        delay: Duration::from_secs(30),
    });
    let engine = SweepEngine::with_prober(options(&src, &dest), prober).unwrap();
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let reports = engine.run(|_| {}, &cancel).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].working_count, 0);
    assert!(!dest.exists(), "cancelled run must not write output");
}

#[tokio::test]
async fn merge_concatenates_sources_into_one_output() {
    let dir = tempfile::tempdir().unwrap();
    let src_a = dir.path().join("a.m3u");
    let src_b = dir.path().join("b.m3u");
    let dest = dir.path().join("merged.m3u");
    write_source(
        &src_a,
        "#EXTM3U\n#EXTINF:-1,Alpha One\nhttp://h.example/a\n",
    );
    write_source(
        &src_b,
        "#EXTM3U\n#EXTINF:-1,Beta Two\nhttp://h.example/b\n",
    );

    let opts = SweepOptions {
        sources: vec![
            src_a.to_string_lossy().into_owned(),
            src_b.to_string_lossy().into_owned(),
        ],
        destination: Some(dest.clone()),
        merge: true,
        skip_validation: true,
        ..Default::default()
    };
    let engine = SweepEngine::new(opts).unwrap();
    let cancel = CancellationToken::new();

    let reports = engine.run(|_| {}, &cancel).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].working_count, 2);

    let written = std::fs::read_to_string(&dest).unwrap();
    assert!(written.contains("Alpha One"));
    assert!(written.contains("Beta Two"));
}

#[tokio::test]
async fn split_produces_one_file_per_group() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("list.m3u");
    let dest = dir.path().join("out.m3u");
    write_source(&src, SOURCE);

    let mut opts = options(&src, &dest);
    opts.split = true;
    opts.skip_validation = true;
    let engine = SweepEngine::new(opts).unwrap();
    let cancel = CancellationToken::new();
    engine.run(|_| {}, &cancel).await.unwrap();

    assert!(dir.path().join("out-News.m3u").exists());
    assert!(dir.path().join("out-Sports.m3u").exists());
    assert!(dir.path().join("out-Uncategorized.m3u").exists());
}

#[tokio::test]
async fn enrichment_adds_language_attribute_to_output() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("list.m3u");
    let dest = dir.path().join("out.m3u");
    write_source(
        &src,
        "#EXTM3U\n#EXTINF:-1,TF1 France Nightly\nhttp://h.example/tf1\n",
    );

    let mut opts = options(&src, &dest);
    opts.enrich = true;
    opts.skip_validation = true;
    let engine = SweepEngine::new(opts).unwrap();
    let cancel = CancellationToken::new();
    engine.run(|_| {}, &cancel).await.unwrap();

    let written = std::fs::read_to_string(&dest).unwrap();
    assert!(written.contains("tvg-language=\"fr\""));
}
