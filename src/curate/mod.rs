// src/curate/mod.rs
//! Curation engine: shape a bounded ranking request, make one external call, decode and
//! validate the ranked result.

pub mod ai_adapter;
pub mod parse;
pub mod prompt;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::category::Category;
use crate::error::PipelineError;
use crate::ingest::truncate_with_marker;
use crate::ingest::types::RawItem;

pub use ai_adapter::{DynRankingClient, RankingClient, RankingReply, Usage};
pub use parse::{parse_ranked, RankedEntry, RankedPayload};

/// Per-item summary cap inside the ranking request.
pub const PROMPT_SUMMARY_MAX_CHARS: usize = 200;

pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Bounded input for one ranking call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurationRequest {
    pub category: Category,
    pub items: Vec<RawItem>,
    pub max_output: usize,
}

impl CurationRequest {
    /// Keep the first `curation_ceiling` items (input order) and cap each summary.
    pub fn build(mut items: Vec<RawItem>, category: Category, max_output: usize) -> Self {
        let ceiling = category.curation_ceiling();
        if items.len() > ceiling {
            info!(
                target: "curate",
                from = items.len(),
                to = ceiling,
                "limiting news items to bound the ranking payload"
            );
            items.truncate(ceiling);
        }
        for it in &mut items {
            it.summary = truncate_with_marker(&it.summary, PROMPT_SUMMARY_MAX_CHARS);
        }
        Self {
            category,
            items,
            max_output,
        }
    }

    pub fn render_prompt(&self) -> Result<String, PipelineError> {
        let articles = serde_json::to_string_pretty(&self.items).map_err(|e| {
            PipelineError::external("ranking", &anyhow::Error::new(e).context("serialize items"))
        })?;
        info!(
            target: "curate",
            estimated_tokens = articles.len() / 4,
            articles = self.items.len(),
            "estimated ranking input"
        );
        Ok(prompt::render(self.category, self.max_output, &articles))
    }
}

/// Validated, ranked digest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedItem {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub relevance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurationResult {
    #[serde(rename = "news")]
    pub items: Vec<CuratedItem>,
    #[serde(rename = "token_usage", skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Drop entries without title/url, repair summary and source, cap at `max_output`.
pub fn validate(entries: Vec<RankedEntry>, max_output: usize) -> Vec<CuratedItem> {
    let mut out = Vec::with_capacity(entries.len().min(max_output));
    for (i, e) in entries.into_iter().enumerate() {
        let title = e.title.trim().to_string();
        let url = e.url.trim().to_string();
        if title.is_empty() {
            warn!(target: "curate", index = i + 1, "news item has empty title, skipping");
            continue;
        }
        if url.is_empty() {
            warn!(target: "curate", index = i + 1, "news item has empty url, skipping");
            continue;
        }
        let summary = match e.summary.trim() {
            "" => title.clone(),
            s => s.to_string(),
        };
        let source = match e.source.trim() {
            "" => UNKNOWN_SOURCE.to_string(),
            s => s.to_string(),
        };
        out.push(CuratedItem {
            title,
            summary,
            url,
            source,
            relevance: e.relevance.trim().to_string(),
        });
    }
    out.truncate(max_output);
    out
}

/// Turn a provider reply into a validated result.
pub fn interpret_reply(
    reply: RankingReply,
    max_output: usize,
) -> Result<CurationResult, PipelineError> {
    let payload = parse_ranked(&reply.text).ok_or_else(|| PipelineError::MalformedResponse {
        raw: reply.text.clone(),
    })?;
    let items = validate(payload.news, max_output);
    if items.is_empty() {
        return Err(PipelineError::EmptyCuration);
    }
    Ok(CurationResult {
        items,
        usage: reply.usage,
    })
}

/// Wraps a ranking client; one `curate` call makes at most one remote call.
#[derive(Clone)]
pub struct Curator {
    client: DynRankingClient,
}

impl Curator {
    pub fn new(client: DynRankingClient) -> Self {
        Self { client }
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    pub async fn curate(
        &self,
        items: Vec<RawItem>,
        category: Category,
        max_output: usize,
    ) -> Result<CurationResult, PipelineError> {
        if items.is_empty() || max_output == 0 {
            return Err(PipelineError::EmptyCuration);
        }
        if items.len() < max_output + 2 {
            warn!(
                target: "curate",
                available = items.len(),
                max_output,
                "few articles available for a meaningful selection"
            );
        }

        let request = CurationRequest::build(items, category, max_output);
        let prompt = request.render_prompt()?;

        info!(
            target: "curate",
            provider = self.client.provider_name(),
            %category,
            articles = request.items.len(),
            "requesting ranking"
        );
        let reply = self.client.generate(&prompt).await.map_err(|e| {
            counter!("digest_ranking_errors_total").increment(1);
            PipelineError::external("ranking", &e)
        })?;

        if let Some(u) = reply.usage {
            counter!("digest_ranking_tokens_total", "kind" => "input")
                .increment(u64::from(u.input_tokens));
            counter!("digest_ranking_tokens_total", "kind" => "output")
                .increment(u64::from(u.output_tokens));
            info!(
                target: "curate",
                input = u.input_tokens,
                output = u.output_tokens,
                total = u.total_tokens,
                "token usage"
            );
        }

        let result = interpret_reply(reply, max_output)?;
        info!(
            target: "curate",
            %category,
            considered = request.items.len(),
            selected = result.items.len(),
            "curation finished"
        );
        Ok(result)
    }
}
