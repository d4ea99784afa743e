pub mod encoding;
pub mod normalize;

/// Reduce an arbitrary string to a safe file-name component: alphanumerics,
/// dashes and dots survive, runs of anything else become one underscore.
pub fn sanitize_file_component(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_filler = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
            out.push(c);
            last_was_filler = false;
        } else if !last_was_filler {
            out.push('_');
            last_was_filler = true;
        }
    }
    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_and_trims() {
        assert_eq!(sanitize_file_component("News & Sport / UK"), "News_Sport_UK");
        assert_eq!(
            sanitize_file_component("http://host.example/list.m3u"),
            "http_host.example_list.m3u"
        );
        assert_eq!(sanitize_file_component("___"), "");
    }
}
