//! Keyword matching over extracted post text.
//!
//! DOM extraction stays in the content script; this is the part that decides
//! which posts match which keywords and how the resulting records look.

use crate::pages::canonical_group;
use crate::types::{MatchRecord, FULL_TEXT_MAX_CHARS};

/// Text and metadata pulled from one post on a page.
#[derive(Debug, Clone, Default)]
pub struct PostSnapshot {
    pub text: String,
    pub post_url: Option<String>,
    pub timestamp: Option<String>,
}

/// Splits a comma/newline separated keyword string.
pub fn normalize_keywords(input: &str) -> Vec<String> {
    dedupe_keywords(input.split([',', '\n']).map(str::to_string))
}

/// Trims, drops blanks and removes repeats while keeping first-seen order.
pub fn dedupe_keywords<I>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for keyword in keywords {
        let keyword = keyword.trim();
        if keyword.is_empty() || out.iter().any(|k| k == keyword) {
            continue;
        }
        out.push(keyword.to_string());
    }
    out
}

/// Produces one record per (post, keyword) hit, case-insensitively.
pub fn collect_matches(
    page_url: &str,
    keywords: &[String],
    posts: &[PostSnapshot],
) -> Vec<MatchRecord> {
    let keywords: Vec<(&str, String)> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| (k, k.to_lowercase()))
        .collect();
    if keywords.is_empty() {
        return Vec::new();
    }

    let group = canonical_group(page_url);
    let mut out = Vec::new();

    for post in posts {
        let text = crate::types::truncate_chars(&post.text, FULL_TEXT_MAX_CHARS);
        if text.trim().is_empty() {
            continue;
        }
        let haystack = text.to_lowercase();

        for (keyword, needle) in &keywords {
            if !haystack.contains(needle.as_str()) {
                continue;
            }
            let post_url = post
                .post_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string);
            let mut record = MatchRecord::new(*keyword, group.clone(), post_url, &text);
            if let Some(ts) = &post.timestamp {
                record = record.with_timestamp(ts.clone());
            }
            out.push(record);
        }
    }

    out
}
