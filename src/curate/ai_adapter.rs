//! Ranking service adapter: provider abstraction + Gemini/OpenAI clients + mock.
//!
//! A provider makes exactly one remote call per `generate`; there is no retry loop here,
//! every call is billed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// Raw provider answer: generated text plus optional usage counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingReply {
    pub text: String,
    pub usage: Option<Usage>,
}

#[async_trait]
pub trait RankingClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<RankingReply>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynRankingClient = Arc<dyn RankingClient>;

/// Which remote model family to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => bail!("Unsupported AI provider: {other}"),
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenAi => "gpt-4o-mini",
        }
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("news-digest/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .build()
        .context("building ranking http client")
}

// ------------------------------------------------------------
// Gemini (generateContent REST API)
// ------------------------------------------------------------

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model: model
                .unwrap_or(ProviderKind::Gemini.default_model())
                .to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Point the client at another endpoint (local stubs in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContentReq<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContentReq<'a> {
    parts: Vec<GeminiPartReq<'a>>,
}

#[derive(Serialize)]
struct GeminiPartReq<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

fn gemini_reply(resp: GeminiResponse) -> Result<RankingReply> {
    let first = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no candidates returned from Gemini"))?;
    let text: String = first
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        tracing::warn!(
            target: "curate",
            finish_reason = ?first.finish_reason,
            "empty response from Gemini"
        );
    }
    Ok(RankingReply {
        text,
        usage: resp.usage_metadata.map(|u| Usage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        }),
    })
}

#[async_trait]
impl RankingClient for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<RankingReply> {
        let req = GeminiRequest {
            contents: vec![GeminiContentReq {
                parts: vec![GeminiPartReq { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.3,
                top_k: 40,
                top_p: 0.95,
            },
        };
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .context("gemini request")?
            .error_for_status()
            .context("gemini non-2xx")?;
        let body: GeminiResponse = resp.json().await.context("gemini response body")?;
        gemini_reply(body)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// OpenAI (Chat Completions API)
// ------------------------------------------------------------

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            model: model
                .unwrap_or(ProviderKind::OpenAi.default_model())
                .to_string(),
            url: OPENAI_URL.to_string(),
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Serialize)]
struct OpenAiMsg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMsg<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMsg,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMsg {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

fn openai_reply(resp: OpenAiResponse) -> Result<RankingReply> {
    let first = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no choices returned from OpenAI"))?;
    Ok(RankingReply {
        text: first.message.content.unwrap_or_default(),
        usage: resp.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
    })
}

#[async_trait]
impl RankingClient for OpenAiProvider {
    async fn generate(&self, prompt: &str) -> Result<RankingReply> {
        let req = OpenAiRequest {
            model: &self.model,
            messages: vec![
                OpenAiMsg {
                    role: "system",
                    content: "You are a news curator. Answer with a single JSON object only.",
                },
                OpenAiMsg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
        };
        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai request")?
            .error_for_status()
            .context("openai non-2xx")?;
        let body: OpenAiResponse = resp.json().await.context("openai response body")?;
        openai_reply(body)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Mock provider (tests, AI_TEST_MODE=mock)
// ------------------------------------------------------------

/// Returns scripted replies in order (the last one repeats) and records every prompt.
pub struct MockRanking {
    replies: Vec<Result<RankingReply, String>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockRanking {
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::scripted(vec![Ok(RankingReply {
            text: text.into(),
            usage: None,
        })])
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self::scripted(vec![Err(reason.into())])
    }

    pub fn scripted(replies: Vec<Result<RankingReply, String>>) -> Self {
        Self {
            replies,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Canned digest used when `AI_TEST_MODE=mock`.
    pub fn demo() -> Self {
        Self::fixed(
            r#"{"news":[{"title":"Mock headline","summary":"Deterministic mock digest entry.","url":"https://example.com/mock","source":"Mock","relevance":"Mock mode is enabled"}]}"#,
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RankingClient for MockRanking {
    async fn generate(&self, prompt: &str) -> Result<RankingReply> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut g) = self.prompts.lock() {
            g.push(prompt.to_string());
        }
        let idx = n.min(self.replies.len().saturating_sub(1));
        match self.replies.get(idx) {
            Some(Ok(reply)) => Ok(reply.clone()),
            Some(Err(reason)) => Err(anyhow!("{reason}")),
            None => Err(anyhow!("mock has no scripted replies")),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Factory: mock when requested, otherwise the configured remote provider.
pub fn build_ranking_client(
    kind: ProviderKind,
    api_key: String,
    model: Option<&str>,
    timeout: Duration,
    mock: bool,
) -> Result<DynRankingClient> {
    if mock {
        return Ok(Arc::new(MockRanking::demo()));
    }
    if api_key.trim().is_empty() {
        bail!("missing API key for provider {kind:?}");
    }
    Ok(match kind {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(api_key, model, timeout)?),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(api_key, model, timeout)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_reply_joins_parts_and_maps_usage() {
        let body: GeminiResponse = serde_json::from_str(
            r#"{
                "candidates":[{"content":{"parts":[{"text":"{\"news\":"},{"text":"[]}"}]},"finishReason":"STOP"}],
                "usageMetadata":{"promptTokenCount":120,"candidatesTokenCount":30,"totalTokenCount":150}
            }"#,
        )
        .unwrap();
        let reply = gemini_reply(body).unwrap();
        assert_eq!(reply.text, r#"{"news":[]}"#);
        assert_eq!(
            reply.usage,
            Some(Usage {
                input_tokens: 120,
                output_tokens: 30,
                total_tokens: 150
            })
        );
    }

    #[test]
    fn gemini_without_candidates_is_an_error() {
        let body: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(gemini_reply(body).is_err());
    }

    #[test]
    fn openai_reply_maps_usage_when_present() {
        let body: OpenAiResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#,
        )
        .unwrap();
        let reply = openai_reply(body).unwrap();
        assert_eq!(reply.text, "hi");
        assert!(reply.usage.is_none());
    }

    #[test]
    fn provider_kind_parsing() {
        assert_eq!(ProviderKind::parse("Gemini").unwrap(), ProviderKind::Gemini);
        assert_eq!(ProviderKind::parse("openai").unwrap(), ProviderKind::OpenAi);
        assert!(ProviderKind::parse("claude").is_err());
    }

    #[test]
    fn factory_requires_key_unless_mock() {
        let t = Duration::from_secs(5);
        assert!(build_ranking_client(ProviderKind::Gemini, String::new(), None, t, false).is_err());
        let mock = build_ranking_client(ProviderKind::Gemini, String::new(), None, t, true).unwrap();
        assert_eq!(mock.provider_name(), "mock");
    }

    #[tokio::test]
    async fn mock_repeats_last_reply_and_records_prompts() {
        let mock = MockRanking::scripted(vec![
            Err("boom".into()),
            Ok(RankingReply {
                text: "ok".into(),
                usage: None,
            }),
        ]);
        assert!(mock.generate("p1").await.is_err());
        assert_eq!(mock.generate("p2").await.unwrap().text, "ok");
        assert_eq!(mock.generate("p3").await.unwrap().text, "ok");
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.prompts(), vec!["p1", "p2", "p3"]);
    }
}
