// src/config/ai.rs
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::curate::ai_adapter::{build_ranking_client, DynRankingClient, ProviderKind};

pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;

/// Ranking provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    pub provider: ProviderKind,
    /// Empty only in mock mode.
    pub api_key: String,
    pub model: Option<String>,
    pub timeout: Duration,
    /// `AI_TEST_MODE=mock`: canned replies, no network.
    pub mock: bool,
}

impl AiConfig {
    pub fn from_lookup<F>(get: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match get("AI_PROVIDER") {
            Some(p) if !p.trim().is_empty() => ProviderKind::parse(&p)?,
            _ => ProviderKind::Gemini,
        };
        let mock = get("AI_TEST_MODE").is_some_and(|v| v.trim().eq_ignore_ascii_case("mock"));

        let key_var = match provider {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        };
        let api_key = get(key_var).map(|k| k.trim().to_string()).unwrap_or_default();
        if api_key.is_empty() && !mock {
            bail!("Missing {key_var} env var");
        }

        let model = get("AI_MODEL")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let timeout_secs = match get("AI_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("AI_TIMEOUT_SECS must be a number, got {v:?}"))?,
            None => DEFAULT_AI_TIMEOUT_SECS,
        };

        Ok(Self {
            provider,
            api_key,
            model,
            timeout: Duration::from_secs(timeout_secs.max(1)),
            mock,
        })
    }

    pub fn build_client(&self) -> Result<DynRankingClient> {
        build_ranking_client(
            self.provider,
            self.api_key.clone(),
            self.model.as_deref(),
            self.timeout,
            self.mock,
        )
    }
}
