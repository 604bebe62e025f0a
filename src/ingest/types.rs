// src/ingest/types.rs
use chrono::{DateTime, Utc};

use crate::category::Category;
use crate::error::PipelineError;

/// One feed endpoint. Defined at startup, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Source {
    pub name: String,
    pub endpoint: String,
    pub category: Category,
}

impl Source {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            category,
        }
    }
}

/// A normalized feed entry. `title` and `url` are never empty.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub summary: String,
    pub url: String,
    #[serde(rename = "source")]
    pub source_name: String,
    pub published_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &Source, category: Category)
        -> Result<Vec<RawItem>, PipelineError>;
}
