// src/error.rs
use std::fmt;

/// One source that could not be fetched during an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub reason: String,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.reason)
    }
}

fn join_failures(failures: &[SourceFailure]) -> String {
    if failures.is_empty() {
        return "none".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A single feed could not be fetched or parsed. Absorbed by the aggregator.
    #[error("failed to fetch {source_name}: {reason}")]
    FetchFailed { source_name: String, reason: String },

    #[error("no news articles scraped from any source. Errors: {}", join_failures(.failures))]
    NoItemsScraped { failures: Vec<SourceFailure> },

    /// Transport-level failure talking to the ranking service or the delivery channel.
    #[error("{stage} call failed: {reason}")]
    ExternalCallFailed { stage: &'static str, reason: String },

    #[error("failed to parse ranking response as JSON\nResponse: {raw}")]
    MalformedResponse { raw: String },

    #[error("ranking returned no usable news items")]
    EmptyCuration,

    #[error("news job is already running")]
    AlreadyRunning,
}

impl PipelineError {
    pub fn fetch(source: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::FetchFailed {
            source_name: source.into(),
            reason: format!("{err:#}"),
        }
    }

    pub fn external(stage: &'static str, err: &anyhow::Error) -> Self {
        Self::ExternalCallFailed {
            stage,
            reason: format!("{err:#}"),
        }
    }

    /// Short machine-friendly label, used for metrics and API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchFailed { .. } => "fetch_failed",
            Self::NoItemsScraped { .. } => "no_items_scraped",
            Self::ExternalCallFailed { .. } => "external_call_failed",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::EmptyCuration => "empty_curation",
            Self::AlreadyRunning => "already_running",
        }
    }
}
