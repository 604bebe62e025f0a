// src/ingest/aggregator.rs
use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::category::Category;
use crate::error::{PipelineError, SourceFailure};
use crate::ingest::sources::SourceRegistry;
use crate::ingest::types::{FeedFetcher, RawItem};

/// Merged output of one category fan-out.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub category: Category,
    /// Items in fetch-completion order.
    pub items: Vec<RawItem>,
    /// Sources that failed; they contributed nothing.
    pub failures: Vec<SourceFailure>,
    pub source_count: usize,
}

/// Runs the feed fetcher for every source of a category in parallel.
#[derive(Clone)]
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    fetcher: Arc<dyn FeedFetcher>,
}

impl Aggregator {
    pub fn new(registry: Arc<SourceRegistry>, fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self { registry, fetcher }
    }

    /// Fetch all sources of `category` concurrently and merge what succeeded.
    /// Fails only when no source produced a single item.
    pub async fn aggregate_by_category(
        &self,
        category: Category,
    ) -> Result<Aggregation, PipelineError> {
        let sources = self.registry.sources_for(category);
        let source_count = sources.len();

        let mut tasks = JoinSet::new();
        let mut names = HashMap::with_capacity(source_count);
        for source in sources.iter().cloned() {
            let fetcher = Arc::clone(&self.fetcher);
            let name = source.name.clone();
            let handle = tasks.spawn(async move { fetcher.fetch(&source, category).await });
            names.insert(handle.id(), name);
        }

        // Single join point: the only place results are merged.
        let mut items = Vec::new();
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, res) = match joined {
                Ok((id, res)) => (id, res.map_err(|e| e.to_string())),
                Err(join_err) => (join_err.id(), Err(format!("fetch task aborted: {join_err}"))),
            };
            let name = names.remove(&id).unwrap_or_default();
            match res {
                Ok(mut fetched) => {
                    info!(
                        target: "ingest",
                        source = %name,
                        count = fetched.len(),
                        "scraped articles"
                    );
                    items.append(&mut fetched);
                }
                Err(reason) => {
                    warn!(target: "ingest", source = %name, error = %reason, "source failed");
                    failures.push(SourceFailure {
                        source: name,
                        reason,
                    });
                }
            }
        }

        counter!("digest_items_scraped_total", "category" => category.as_str())
            .increment(items.len() as u64);

        if items.is_empty() {
            return Err(PipelineError::NoItemsScraped { failures });
        }

        info!(
            target: "ingest",
            %category,
            total = items.len(),
            sources = source_count,
            failed = failures.len(),
            "aggregation finished"
        );

        Ok(Aggregation {
            category,
            items,
            failures,
            source_count,
        })
    }
}
