// src/lib.rs
// Public library surface for the service binary, the preview tool and integration tests.

pub mod api;
pub mod category;
pub mod config;
pub mod curate;
pub mod error;
pub mod ingest;
pub mod job;
pub mod metrics;
pub mod notify;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::category::Category;
pub use crate::config::AppConfig;
pub use crate::curate::{CurationResult, Curator};
pub use crate::error::PipelineError;
pub use crate::job::{JobState, JobStatus, Orchestrator, Preview};

use crate::ingest::providers::HttpFeedFetcher;
use crate::ingest::sources::SourceRegistry;
use crate::ingest::Aggregator;
use crate::notify::DiscordNotifier;

/// Wire the production pipeline from config: feed fetcher, source registry, ranking
/// client and Discord delivery.
pub fn build_orchestrator(cfg: &AppConfig) -> Result<Arc<Orchestrator>> {
    let registry = match &cfg.sources_path {
        Some(path) => SourceRegistry::load_from(path)?,
        None => SourceRegistry::load_default()?,
    };
    let fetcher = HttpFeedFetcher::new(std::time::Duration::from_secs(cfg.feed_timeout_secs))
        .context("building feed fetcher")?;
    let aggregator = Aggregator::new(Arc::new(registry), Arc::new(fetcher));

    let curator = Curator::new(cfg.ai.build_client()?);
    let notifier = DiscordNotifier::new(
        cfg.discord_webhook.clone(),
        cfg.discord_webhook_global.clone(),
    );

    info!(
        provider = curator.provider_name(),
        max_items = cfg.max_news_items,
        schedule = %cfg.schedule.describe(),
        "pipeline configured"
    );

    Ok(Arc::new(Orchestrator::new(
        aggregator,
        curator,
        Arc::new(notifier),
        cfg.max_news_items,
        cfg.schedule,
    )))
}
