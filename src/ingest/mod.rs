// src/ingest/mod.rs
pub mod aggregator;
pub mod providers;
pub mod sources;
pub mod types;

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::category::Category;
use crate::ingest::types::{RawItem, Source};

pub use aggregator::{Aggregation, Aggregator};

/// Entries published before `now - RECENCY_WINDOW_HOURS` are dropped.
pub const RECENCY_WINDOW_HOURS: i64 = 24;
/// Summary cap for fetched items (characters, including the truncation marker).
pub const SUMMARY_MAX_CHARS: usize = 300;

const TRUNCATION_MARKER: &str = "...";

/// One entry as parsed from a feed document, before any filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// Normalize feed text: decode entities, strip markup tags, collapse whitespace, trim.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    // Block-level tags become a space so adjacent paragraphs don't glue together.
    static RE_BLOCK: OnceCell<Regex> = OnceCell::new();
    let re_block = RE_BLOCK.get_or_init(|| {
        Regex::new(r"(?i)</?(?:p|br|div|li|ul|ol|h[1-6]|figure|figcaption)\b[^>]*>").unwrap()
    });
    out = re_block.replace_all(&out, " ").to_string();

    static RE_INLINE: OnceCell<Regex> = OnceCell::new();
    let re_inline = RE_INLINE.get_or_init(|| {
        Regex::new(r"(?i)</?(?:span|a|strong|b|i|em|u|img)\b[^>]*>").unwrap()
    });
    out = re_inline.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Cap `s` at `max_chars` characters, ending with `...` when something was cut.
pub fn truncate_with_marker(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.len());
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Apply recency window, category filter, normalization and the per-source cap to
/// parsed entries. Feed order is preserved; the first `per_source_cap` survivors win.
pub fn select_items(
    entries: Vec<FeedEntry>,
    source: &Source,
    category: Category,
    now: DateTime<Utc>,
) -> Vec<RawItem> {
    let cutoff = now - Duration::hours(RECENCY_WINDOW_HOURS);
    let cap = category.per_source_cap();
    let mut out = Vec::with_capacity(cap.min(entries.len()));

    for entry in entries {
        let published_at = entry.published.or(entry.updated).unwrap_or(now);
        if published_at < cutoff {
            continue;
        }

        let raw_title = entry.title.unwrap_or_default();
        let raw_desc = entry.description.unwrap_or_default();
        if !category.matches(&format!("{raw_title} {raw_desc}")) {
            continue;
        }

        let title = clean_text(&raw_title);
        let url = entry.link.map(|l| l.trim().to_string()).unwrap_or_default();
        if title.is_empty() || url.is_empty() {
            continue;
        }

        out.push(RawItem {
            title,
            summary: truncate_with_marker(&clean_text(&raw_desc), SUMMARY_MAX_CHARS),
            url,
            source_name: source.name.clone(),
            published_at,
        });

        if out.len() >= cap {
            break;
        }
    }

    out
}
