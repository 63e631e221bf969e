//! Tab URL classification for group pages.

use url::Url;

pub const UNKNOWN_GROUP: &str = "unknown-group";

/// Which hosts count as the monitored site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePattern {
    hosts: Vec<String>,
}

impl SitePattern {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.into().trim().trim_start_matches('.').to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn facebook() -> Self {
        Self::new(["facebook.com", "fb.com"])
    }

    /// True for http(s) URLs on a configured host (or subdomain) under `/groups/`.
    pub fn is_group_page(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        let on_site = self
            .hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{h}")));

        on_site && group_segment(&parsed).is_some()
    }
}

impl Default for SitePattern {
    fn default() -> Self {
        Self::facebook()
    }
}

/// Group identifier taken from the path segment after `/groups/`.
pub fn canonical_group(page_url: &str) -> String {
    Url::parse(page_url)
        .ok()
        .and_then(|parsed| group_segment(&parsed))
        .map(|segment| {
            urlencoding::decode(&segment)
                .map(|s| s.into_owned())
                .unwrap_or(segment)
        })
        .unwrap_or_else(|| UNKNOWN_GROUP.to_string())
}

fn group_segment(parsed: &Url) -> Option<String> {
    let mut segments = parsed.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("groups") {
            return segments
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string);
        }
    }
    None
}

/// Prefix match that stops at a path boundary, so `.../groups/g1` covers
/// `.../groups/g1/posts/9` but not `.../groups/g10`.
pub fn url_has_prefix(url: &str, prefix: &str) -> bool {
    let prefix = prefix.trim();
    if prefix.is_empty() || !url.starts_with(prefix) {
        return false;
    }
    if prefix.ends_with(['/', '?', '#']) {
        return true;
    }
    matches!(url[prefix.len()..].chars().next(), None | Some('/' | '?' | '#'))
}

/// Empty allow-list means every group page is monitored.
pub fn is_monitored(url: &str, monitored: &[&str]) -> bool {
    monitored.is_empty() || monitored.iter().any(|prefix| url_has_prefix(url, prefix))
}
