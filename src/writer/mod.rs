//! Extended-M3U output
//!
//! Rendering is pure and synchronous; the async wrappers only touch the
//! filesystem. Output is UTF-8 and truncates any existing file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{SweepError, SweepResult};
use crate::models::Channel;
use crate::utils::sanitize_file_component;

/// Group label used for channels without one.
pub const UNCATEGORIZED: &str = "Uncategorized";

pub struct M3uWriter;

impl M3uWriter {
    pub fn new() -> Self {
        Self
    }

    /// Render a complete playlist document.
    ///
    /// The header carries `x-tvg-url` from the first channel with a
    /// non-empty EPG URL. When several sources disagree the rest are
    /// silently dropped; known wart, kept for compatibility.
    pub fn render(&self, channels: &[Channel]) -> String {
        let mut out = String::new();
        match channels
            .iter()
            .find_map(|c| c.epg_url.as_deref().filter(|e| !e.is_empty()))
        {
            Some(epg) => {
                out.push_str("#EXTM3U x-tvg-url=\"");
                out.push_str(epg);
                out.push_str("\"\n");
            }
            None => out.push_str("#EXTM3U\n"),
        }

        for channel in channels {
            let extinf = if starts_with_extinf(&channel.name) {
                channel.name.clone()
            } else {
                render_extinf(channel)
            };
            out.push_str(&extinf);
            out.push('\n');

            if !channel.group_name.is_empty() && !extinf.contains("group-title=") {
                out.push_str("#EXTGRP:");
                out.push_str(&channel.group_name);
                out.push('\n');
            }

            out.push_str(&channel.link);
            out.push('\n');
        }
        out
    }

    /// Write the playlist to `path`, creating parent directories as needed.
    pub async fn write(&self, path: &Path, channels: &[Channel]) -> SweepResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SweepError::write_failed(parent.display().to_string(), e))?;
        }
        let rendered = self.render(channels);
        tokio::fs::write(path, rendered.as_bytes())
            .await
            .map_err(|e| SweepError::write_failed(path.display().to_string(), e))?;
        info!("Wrote {} channels to {}", channels.len(), path.display());
        Ok(())
    }

    /// Write one playlist per group next to `dest`, named
    /// `<stem>-<group>.m3u`. Returns the paths written, in group
    /// first-appearance order.
    pub async fn write_split(
        &self,
        dest: &Path,
        channels: &[Channel],
    ) -> SweepResult<Vec<PathBuf>> {
        let mut order: Vec<String> = Vec::new();
        let mut by_group: BTreeMap<String, Vec<Channel>> = BTreeMap::new();
        for channel in channels {
            let group = if channel.group_name.is_empty() {
                UNCATEGORIZED.to_string()
            } else {
                channel.group_name.clone()
            };
            if !by_group.contains_key(&group) {
                order.push(group.clone());
            }
            by_group.entry(group).or_default().push(channel.clone());
        }

        let stem = dest
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "playlist".to_string());
        let parent = dest.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut written = Vec::with_capacity(order.len());
        for group in order {
            let members = &by_group[&group];
            let reindexed: Vec<Channel> = members
                .iter()
                .cloned()
                .enumerate()
                .map(|(id, c)| c.with_id(id))
                .collect();
            let file_name = format!("{stem}-{}.m3u", sanitize_file_component(&group));
            let path = parent.join(file_name);
            self.write(&path, &reindexed).await?;
            debug!("Split group '{group}' into {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

impl Default for M3uWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn starts_with_extinf(name: &str) -> bool {
    name.get(..7)
        .is_some_and(|head| head.eq_ignore_ascii_case("#extinf"))
}

fn render_extinf(channel: &Channel) -> String {
    let mut line = String::from("#EXTINF:-1");
    let mut push_attr = |key: &str, value: &str| {
        line.push(' ');
        line.push_str(key);
        line.push_str("=\"");
        line.push_str(value);
        line.push('"');
    };

    if let Some(tvg_id) = channel.tvg_id.as_deref().filter(|v| !v.is_empty()) {
        push_attr("tvg-id", tvg_id);
    }
    if let Some(tvg_name) = channel.tvg_name.as_deref().filter(|v| !v.is_empty()) {
        push_attr("tvg-name", tvg_name);
    }
    if let Some(tvg_logo) = channel.tvg_logo.as_deref().filter(|v| !v.is_empty()) {
        push_attr("tvg-logo", tvg_logo);
    }
    if let Some(language) = channel.language.as_deref().filter(|v| !v.is_empty()) {
        push_attr("tvg-language", language);
    }
    if !channel.group_name.is_empty() {
        push_attr("group-title", &channel.group_name);
    }
    for (key, value) in &channel.extra_attributes {
        // An enriched language wins over a stale source attribute.
        if key.eq_ignore_ascii_case("tvg-language") && channel.language.is_some() {
            continue;
        }
        push_attr(key, value);
    }

    line.push(',');
    line.push_str(channel.display_name());
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::M3uParser;

    fn channel(name: &str, link: &str) -> Channel {
        Channel::new(0, name, link)
    }

    #[test]
    fn renders_plain_header_without_epg() {
        let writer = M3uWriter::new();
        let rendered = writer.render(&[channel("Alpha", "http://h.example/a")]);
        assert!(rendered.starts_with("#EXTM3U\n"));
        assert!(rendered.contains("#EXTINF:-1,Alpha\nhttp://h.example/a\n"));
    }

    #[test]
    fn header_uses_first_epg_url() {
        let writer = M3uWriter::new();
        let mut a = channel("Alpha", "http://h.example/a");
        let mut b = channel("Beta", "http://h.example/b");
        a.epg_url = Some(String::new());
        b.epg_url = Some("http://epg.example/g.xml".to_string());
        let rendered = writer.render(&[a, b]);
        assert!(rendered.starts_with("#EXTM3U x-tvg-url=\"http://epg.example/g.xml\"\n"));
    }

    #[test]
    fn attribute_order_and_group_title() {
        let writer = M3uWriter::new();
        let mut ch = channel("Alpha", "http://h.example/a");
        ch.tvg_id = Some("a1".to_string());
        ch.tvg_name = Some("Alpha".to_string());
        ch.tvg_logo = Some("http://l/a.png".to_string());
        ch.group_name = "News".to_string();
        ch.extra_attributes
            .insert("catchup".to_string(), "shift".to_string());
        let rendered = writer.render(&[ch]);
        assert!(rendered.contains(
            "#EXTINF:-1 tvg-id=\"a1\" tvg-name=\"Alpha\" tvg-logo=\"http://l/a.png\" \
             group-title=\"News\" catchup=\"shift\",Alpha\n"
        ));
        // group-title is on the line, so no EXTGRP follows
        assert!(!rendered.contains("#EXTGRP"));
    }

    #[test]
    fn verbatim_extinf_name_gets_extgrp_line() {
        let writer = M3uWriter::new();
        let mut ch = channel("#EXTINF:-1,Raw Entry", "http://h.example/a");
        ch.group_name = "Docs".to_string();
        let rendered = writer.render(&[ch]);
        assert!(rendered.contains("#EXTINF:-1,Raw Entry\n#EXTGRP:Docs\nhttp://h.example/a\n"));
    }

    #[test]
    fn enriched_language_is_written() {
        let writer = M3uWriter::new();
        let mut ch = channel("Alpha", "http://h.example/a");
        ch.language = Some("en".to_string());
        ch.extra_attributes
            .insert("tvg-language".to_string(), "de".to_string());
        let rendered = writer.render(&[ch]);
        assert!(rendered.contains("tvg-language=\"en\""));
        assert!(!rendered.contains("tvg-language=\"de\""));
    }

    #[test]
    fn parse_write_parse_round_trip() {
        let text = "#EXTM3U x-tvg-url=\"http://epg.example/g.xml\"\n\
                    #EXTINF:-1 tvg-id=\"a1\" group-title=\"News\" catchup=\"shift\",Alpha\n\
                    http://host.example/a\n\
                    #EXTINF:-1 tvg-id=\"b2\",Beta\n\
                    #EXTGRP:Sports\n\
                    http://host.example/b\n\
                    #EXTINF:-1,Gamma\n\
                    http://host.example/c\n";
        let parser = M3uParser::new();
        let writer = M3uWriter::new();

        let first = parser.parse(text);
        let rendered = writer.render(&first);
        let second = parser.parse(&rendered);

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/list.m3u");
        let writer = M3uWriter::new();
        writer
            .write(&path, &[channel("Alpha", "http://h.example/a")])
            .await
            .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("#EXTM3U\n"));
    }

    #[tokio::test]
    async fn split_writes_one_file_per_group() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("list.m3u");
        let writer = M3uWriter::new();

        let mut a = channel("Alpha News Desk", "http://h.example/a");
        a.group_name = "News".to_string();
        let mut b = channel("Beta Sports Arena", "http://h.example/b");
        b.group_name = "Sports".to_string();
        let c = channel("Gamma Variety", "http://h.example/c");

        let written = writer.write_split(&dest, &[a, b, c]).await.unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["list-News.m3u", "list-Sports.m3u", "list-Uncategorized.m3u"]);
        for path in &written {
            let content = std::fs::read_to_string(path).unwrap();
            assert!(content.starts_with("#EXTM3U"));
        }
    }
}
