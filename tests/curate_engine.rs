// tests/curate_engine.rs
//
// Curation engine end to end with a mock ranking client:
// - summary backfill and source defaulting
// - prose / code-fence wrapped JSON salvaged
// - output never exceeds max_output
// - exactly one remote call, usage attached, request pre-trimmed

mod common;

use std::sync::Arc;

use news_digest::category::Category;
use news_digest::curate::ai_adapter::MockRanking;
use news_digest::curate::{Curator, RankingReply, Usage};
use news_digest::error::PipelineError;
use news_digest::ingest::types::RawItem;

fn items(n: usize) -> Vec<RawItem> {
    (0..n).map(|i| common::raw_item(i, "Wire")).collect()
}

#[tokio::test]
async fn empty_summary_is_backfilled_from_title() {
    let mock = Arc::new(MockRanking::fixed(common::RANKED_ONE));
    let curator = Curator::new(mock.clone());

    let out = curator.curate(items(8), Category::Ai, 5).await.unwrap();
    assert_eq!(out.items.len(), 1);
    assert_eq!(out.items[0].title, "A");
    assert_eq!(out.items[0].summary, "A");
    assert_eq!(out.items[0].source, "X");
    assert_eq!(out.items[0].relevance, "r");
    assert!(out.usage.is_none());
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn prose_and_fences_parse_like_clean_json() {
    let clean = Curator::new(Arc::new(MockRanking::fixed(common::RANKED_ONE)))
        .curate(items(8), Category::Ai, 5)
        .await
        .unwrap();

    let wrapped = [
        format!("Here is the ranking you asked for:\n{}\nHope this helps!", common::RANKED_ONE),
        format!("```json\n{}\n```", common::RANKED_ONE),
    ];
    for text in wrapped {
        let out = Curator::new(Arc::new(MockRanking::fixed(text)))
            .curate(items(8), Category::Ai, 5)
            .await
            .unwrap();
        assert_eq!(out, clean);
    }
}

#[tokio::test]
async fn unparsable_reply_is_malformed_with_raw_text() {
    let curator = Curator::new(Arc::new(MockRanking::fixed("I cannot help with that.")));
    match curator.curate(items(8), Category::Ai, 5).await {
        Err(PipelineError::MalformedResponse { raw }) => {
            assert_eq!(raw, "I cannot help with that.")
        }
        other => panic!("expected MalformedResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn output_is_capped_at_max_output() {
    let many: Vec<String> = (0..9)
        .map(|i| format!(r#"{{"title":"T{i}","url":"https://u/{i}","summary":"s","source":"S"}}"#))
        .collect();
    let text = format!(r#"{{"news":[{}]}}"#, many.join(","));
    let curator = Curator::new(Arc::new(MockRanking::fixed(text)));

    let out = curator.curate(items(10), Category::Global, 3).await.unwrap();
    assert_eq!(out.items.len(), 3);
    assert_eq!(out.items[0].title, "T0");
    assert_eq!(out.items[2].title, "T2");
}

#[tokio::test]
async fn request_is_trimmed_to_category_ceiling_and_sent_once() {
    let mock = Arc::new(MockRanking::fixed(common::RANKED_ONE));
    let curator = Curator::new(mock.clone());

    curator.curate(items(40), Category::Ai, 5).await.unwrap();

    let prompts = mock.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("AI story 14"));
    assert!(!prompts[0].contains("AI story 15"), "ai ceiling is 15 items");
    assert!(prompts[0].contains("TOP 5"));
}

#[tokio::test]
async fn usage_is_attached_when_reported() {
    let usage = Usage {
        input_tokens: 1200,
        output_tokens: 300,
        total_tokens: 1500,
    };
    let mock = Arc::new(MockRanking::scripted(vec![Ok(RankingReply {
        text: common::RANKED_ONE.to_string(),
        usage: Some(usage),
    })]));
    let out = Curator::new(mock)
        .curate(items(8), Category::Ai, 5)
        .await
        .unwrap();
    assert_eq!(out.usage, Some(usage));
}

#[tokio::test]
async fn transport_failure_is_external_call_failed_without_retry() {
    let mock = Arc::new(MockRanking::failing("upstream 503"));
    let curator = Curator::new(mock.clone());

    match curator.curate(items(8), Category::Ai, 5).await {
        Err(PipelineError::ExternalCallFailed { stage, reason }) => {
            assert_eq!(stage, "ranking");
            assert!(reason.contains("upstream 503"));
        }
        other => panic!("expected ExternalCallFailed, got {other:?}"),
    }
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn empty_input_never_calls_the_service() {
    let mock = Arc::new(MockRanking::fixed(common::RANKED_ONE));
    let curator = Curator::new(mock.clone());
    assert!(matches!(
        curator.curate(Vec::new(), Category::Ai, 5).await,
        Err(PipelineError::EmptyCuration)
    ));
    assert_eq!(mock.call_count(), 0);
}
