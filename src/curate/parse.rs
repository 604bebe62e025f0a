// src/curate/parse.rs
//! Tolerant decoding of the ranking model's text output.

use serde::Deserialize;

/// Shape the ranking model is asked to return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RankedPayload {
    #[serde(default)]
    pub news: Vec<RankedEntry>,
}

/// One entry as returned by the model, before validation. Missing or `null` fields decode
/// to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RankedEntry {
    #[serde(deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub summary: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub source: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub relevance: String,
}

fn null_as_empty<'de, D>(de: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

/// Remove a surrounding markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    let inner = if let Some(rest) = t.strip_prefix("```json") {
        rest
    } else if let Some(rest) = t.strip_prefix("```") {
        rest
    } else {
        return t;
    };
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Decode ranking output: direct decode after fence stripping, then a salvage pass over
/// the span between the first `{` and the last `}`.
pub fn parse_ranked(text: &str) -> Option<RankedPayload> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return None;
    }
    if let Ok(p) = serde_json::from_str::<RankedPayload>(body) {
        return Some(p);
    }

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    let candidate = &body[start..=end];
    tracing::debug!(target: "curate", len = candidate.len(), "salvaging embedded json");
    serde_json::from_str::<RankedPayload>(candidate).ok()
}
