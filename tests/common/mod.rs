// tests/common/mod.rs
//
// Shared helpers for integration tests: local HTTP stubs, in-memory fetchers and a
// recording notifier.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use shuttle_axum::axum::Router;
use tokio::sync::{Notify, Semaphore};

use news_digest::category::Category;
use news_digest::curate::ai_adapter::MockRanking;
use news_digest::curate::{CurationResult, Curator};
use news_digest::error::PipelineError;
use news_digest::ingest::sources::SourceRegistry;
use news_digest::ingest::types::{FeedFetcher, RawItem, Source};
use news_digest::ingest::Aggregator;
use news_digest::job::{DailySchedule, Orchestrator};
use news_digest::notify::DigestNotifier;

/// Serve `router` on an ephemeral localhost port; returns `http://127.0.0.1:PORT`.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = shuttle_axum::axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

/// Minimal RSS 2.0 document. Each item: (title, description, link, hours_ago).
pub fn rss(items: &[(&str, &str, &str, i64)]) -> String {
    let body: String = items
        .iter()
        .map(|(title, desc, link, hours_ago)| {
            let ts = (Utc::now() - Duration::hours(*hours_ago)).to_rfc2822();
            format!(
                "<item><title>{title}</title><link>{link}</link>\
                 <description>{desc}</description><pubDate>{ts}</pubDate></item>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>t</title>{body}</channel></rss>"#
    )
}

pub fn raw_item(i: usize, source: &str) -> RawItem {
    RawItem {
        title: format!("AI story {i}"),
        summary: format!("Summary {i}"),
        url: format!("https://news.test/{source}/{i}"),
        source_name: source.to_string(),
        published_at: Utc::now(),
    }
}

pub const RANKED_ONE: &str = r#"{"news":[{"title":"A","url":"u1","summary":"","source":"X","relevance":"r"}]}"#;

/// Fetcher returning canned items per source; names listed in `failing` error out.
pub struct StaticFetcher {
    pub items_per_source: usize,
    pub failing: Vec<String>,
}

#[async_trait]
impl FeedFetcher for StaticFetcher {
    async fn fetch(&self, source: &Source, _category: Category) -> Result<Vec<RawItem>, PipelineError> {
        if self.failing.contains(&source.name) {
            return Err(PipelineError::fetch(&source.name, &anyhow!("connection refused")));
        }
        Ok((0..self.items_per_source)
            .map(|i| raw_item(i, &source.name))
            .collect())
    }
}

/// Parks every fetch until `release` gets permits; `entered` fires when a fetch starts.
pub struct GateFetcher {
    pub entered: Arc<Notify>,
    pub release: Arc<Semaphore>,
}

impl GateFetcher {
    pub fn new() -> Self {
        Self {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Semaphore::new(0)),
        }
    }

    pub fn open(&self) {
        self.release.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

#[async_trait]
impl FeedFetcher for GateFetcher {
    async fn fetch(&self, source: &Source, _category: Category) -> Result<Vec<RawItem>, PipelineError> {
        self.entered.notify_one();
        let _permit = self.release.acquire().await;
        Ok(vec![raw_item(0, &source.name)])
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub digests: Mutex<Vec<(Category, CurationResult)>>,
    pub texts: Mutex<Vec<(Category, String)>>,
    pub fail_digest: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail_digest: true,
            ..Self::default()
        }
    }

    pub fn digest_count(&self) -> usize {
        self.digests.lock().unwrap().len()
    }

    pub fn texts(&self) -> Vec<(Category, String)> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DigestNotifier for RecordingNotifier {
    async fn send_digest(&self, category: Category, digest: &CurationResult) -> Result<()> {
        if self.fail_digest {
            return Err(anyhow!("webhook returned 500"));
        }
        self.digests.lock().unwrap().push((category, digest.clone()));
        Ok(())
    }

    async fn send_text(&self, category: Category, text: &str) -> Result<()> {
        self.texts.lock().unwrap().push((category, text.to_string()));
        Ok(())
    }
}

pub fn registry() -> SourceRegistry {
    SourceRegistry::new(
        vec![
            Source::new("One", "http://one.invalid/feed", Category::Ai),
            Source::new("Two", "http://two.invalid/feed", Category::Ai),
        ],
        vec![Source::new("Three", "http://three.invalid/feed", Category::Global)],
    )
}

pub fn orchestrator(
    fetcher: Arc<dyn FeedFetcher>,
    ranking: Arc<MockRanking>,
    notifier: Arc<RecordingNotifier>,
) -> Arc<Orchestrator> {
    let aggregator = Aggregator::new(Arc::new(registry()), fetcher);
    let schedule = DailySchedule::parse("08:00", "Asia/Jakarta").expect("schedule");
    Arc::new(Orchestrator::new(
        aggregator,
        Curator::new(ranking),
        notifier,
        5,
        schedule,
    ))
}
