// src/config/mod.rs
//! Process configuration from the environment (`.env` honoured via dotenvy).

pub mod ai;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::category::Category;
use crate::ingest::providers::rss::DEFAULT_FEED_TIMEOUT;
use crate::ingest::sources::ENV_SOURCES_CONFIG_PATH;
use crate::job::DailySchedule;

pub use ai::AiConfig;

pub const DEFAULT_MAX_NEWS_ITEMS: usize = 5;
pub const DEFAULT_SCHEDULE_TIME: &str = "08:00";
pub const DEFAULT_TIME_ZONE: &str = "Asia/Jakarta";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ai: AiConfig,
    pub discord_webhook: String,
    /// Falls back to `discord_webhook` when unset.
    pub discord_webhook_global: String,
    pub max_news_items: usize,
    pub schedule: DailySchedule,
    pub scheduled_categories: Vec<Category>,
    pub feed_timeout_secs: u64,
    pub sources_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; `from_env` with the environment swapped out.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| get(k).filter(|v| !v.trim().is_empty());

        let ai = AiConfig::from_lookup(&get)?;

        let discord_webhook = get("DISCORD_WEBHOOK")
            .map(|v| v.trim().to_string())
            .context("DISCORD_WEBHOOK environment variable is required")?;
        let discord_webhook_global = get("DISCORD_WEBHOOK_GLOBAL")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| discord_webhook.clone());

        let max_news_items = match get("MAX_NEWS_ITEMS") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("MAX_NEWS_ITEMS must be a number, got {v:?}"))?,
            None => DEFAULT_MAX_NEWS_ITEMS,
        };
        if max_news_items == 0 {
            bail!("MAX_NEWS_ITEMS must be at least 1");
        }

        let schedule = DailySchedule::parse(
            &get("SCHEDULE_TIME").unwrap_or_else(|| DEFAULT_SCHEDULE_TIME.to_string()),
            &get("TZ").unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string()),
        )?;

        let scheduled_categories = match get("SCHEDULED_CATEGORIES") {
            Some(raw) => parse_categories(&raw)?,
            None => vec![Category::Ai],
        };

        let feed_timeout_secs = match get("FEED_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("FEED_TIMEOUT_SECS must be a number, got {v:?}"))?,
            None => DEFAULT_FEED_TIMEOUT.as_secs(),
        };

        Ok(Self {
            ai,
            discord_webhook,
            discord_webhook_global,
            max_news_items,
            schedule,
            scheduled_categories,
            feed_timeout_secs: feed_timeout_secs.max(1),
            sources_path: get(ENV_SOURCES_CONFIG_PATH).map(PathBuf::from),
        })
    }
}

/// Comma-separated list, e.g. `ai,global`. Unknown names are an error here.
fn parse_categories(raw: &str) -> Result<Vec<Category>> {
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let cat: Category = part
            .parse()
            .with_context(|| format!("invalid SCHEDULED_CATEGORIES entry {part:?}"))?;
        if !out.contains(&cat) {
            out.push(cat);
        }
    }
    if out.is_empty() {
        bail!("SCHEDULED_CATEGORIES is empty");
    }
    Ok(out)
}
