// tests/aggregate_feeds.rs
//
// Aggregation over real HTTP against local feed stubs:
// - partial failure (one source times out) keeps the other sources' items
// - old items never make it through the recency window
// - every source failing surfaces NoItemsScraped with per-source diagnostics

mod common;

use std::sync::Arc;
use std::time::Duration;

use shuttle_axum::axum::{http::StatusCode, routing::get, Router};

use news_digest::category::Category;
use news_digest::error::PipelineError;
use news_digest::ingest::providers::HttpFeedFetcher;
use news_digest::ingest::sources::SourceRegistry;
use news_digest::ingest::types::Source;
use news_digest::ingest::Aggregator;

fn fresh_feed(prefix: &'static str) -> String {
    common::rss(&[
        ("OpenAI ships a new model", "Details inside", &format!("https://{prefix}/1"), 1),
        ("Machine learning at scale", "Notes", &format!("https://{prefix}/2"), 2),
        ("Robotics lab demo", "Video", &format!("https://{prefix}/3"), 3),
        ("Anthropic publishes research", "Paper", &format!("https://{prefix}/4"), 5),
        // outside the 24h window
        ("Old OpenAI story", "Stale", &format!("https://{prefix}/old1"), 30),
        ("Old GPT story", "Stale", &format!("https://{prefix}/old2"), 72),
    ])
}

async fn feed_server() -> String {
    let a = fresh_feed("a.test");
    let b = fresh_feed("b.test");
    let router = Router::new()
        .route("/a", get(move || async move { a }))
        .route("/b", get(move || async move { b }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                common::rss(&[("OpenAI late item", "x", "https://slow.test/1", 1)])
            }),
        )
        .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/garbage", get(|| async { "<html>not a feed" }));
    common::serve(router).await
}

fn aggregator(sources: Vec<Source>) -> Aggregator {
    let fetcher = HttpFeedFetcher::new(Duration::from_millis(500)).expect("fetcher");
    Aggregator::new(
        Arc::new(SourceRegistry::new(sources, Vec::new())),
        Arc::new(fetcher),
    )
}

#[tokio::test]
async fn timed_out_source_is_excluded_and_others_merge() {
    let base = feed_server().await;
    let agg = aggregator(vec![
        Source::new("Feed A", format!("{base}/a"), Category::Ai),
        Source::new("Feed B", format!("{base}/b"), Category::Ai),
        Source::new("Slow", format!("{base}/slow"), Category::Ai),
    ]);

    let out = agg
        .aggregate_by_category(Category::Ai)
        .await
        .expect("partial failure is still a success");

    assert_eq!(out.items.len(), 8, "4 fresh items from each healthy feed");
    assert_eq!(out.source_count, 3);
    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.failures[0].source, "Slow");

    assert!(out.items.iter().all(|i| !i.url.contains("/old")));
    assert_eq!(out.items.iter().filter(|i| i.source_name == "Feed A").count(), 4);
    assert_eq!(out.items.iter().filter(|i| i.source_name == "Feed B").count(), 4);
}

#[tokio::test]
async fn all_sources_failing_is_no_items_scraped() {
    let base = feed_server().await;
    let agg = aggregator(vec![
        Source::new("Broken", format!("{base}/broken"), Category::Ai),
        Source::new("Garbage", format!("{base}/garbage"), Category::Ai),
        Source::new("Slow", format!("{base}/slow"), Category::Ai),
    ]);

    match agg.aggregate_by_category(Category::Ai).await {
        Err(PipelineError::NoItemsScraped { failures }) => {
            let mut names: Vec<_> = failures.iter().map(|f| f.source.as_str()).collect();
            names.sort();
            assert_eq!(names, ["Broken", "Garbage", "Slow"]);
        }
        other => panic!("expected NoItemsScraped, got {other:?}"),
    }
}

#[tokio::test]
async fn keyword_filter_applies_per_category() {
    let base = feed_server().await;
    // The AI feed contains no global keywords.
    let fetcher = HttpFeedFetcher::new(Duration::from_millis(500)).expect("fetcher");
    let registry = SourceRegistry::new(
        Vec::new(),
        vec![Source::new("Feed A", format!("{base}/a"), Category::Global)],
    );
    let agg = Aggregator::new(Arc::new(registry), Arc::new(fetcher));

    assert!(matches!(
        agg.aggregate_by_category(Category::Global).await,
        Err(PipelineError::NoItemsScraped { .. })
    ));
}
