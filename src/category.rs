// src/category.rs
//! News categories. Each variant carries its own keyword filter, size ceilings and label;
//! everything category-specific is selected by `match` on this enum.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// AI / technology news.
    Ai,
    /// Global business, markets and crypto news.
    Global,
}

const AI_KEYWORDS: &[&str] = &[
    "artificial intelligence",
    "ai",
    "machine learning",
    "ml",
    "deep learning",
    "neural network",
    "chatgpt",
    "openai",
    "google ai",
    "microsoft ai",
    "anthropic",
    "claude",
    "generative ai",
    "llm",
    "large language model",
    "computer vision",
    "natural language processing",
    "nlp",
    "automation",
    "robotics",
    "algorithm",
    "data science",
    "tensorflow",
    "pytorch",
    "hugging face",
];

const GLOBAL_KEYWORDS: &[&str] = &[
    // markets & economics
    "stock",
    "market",
    "nasdaq",
    "dow",
    "s&p",
    "earnings",
    "revenue",
    "profit",
    "economy",
    "inflation",
    "recession",
    "gdp",
    "interest rate",
    "federal reserve",
    "economic",
    "fiscal",
    "monetary",
    "trade war",
    "tariff",
    // crypto & finance
    "bitcoin",
    "ethereum",
    "crypto",
    "cryptocurrency",
    "blockchain",
    "defi",
    "fintech",
    "banking",
    "payment",
    "financial services",
    "lending",
    // business & corporate
    "merger",
    "acquisition",
    "ipo",
    "funding",
    "investment",
    "venture capital",
    "startup",
    "unicorn",
    "valuation",
    "ceo",
    "executive",
    "leadership",
    "corporate",
    "business strategy",
    "partnerships",
    // politics & policy
    "regulation",
    "policy",
    "government",
    "senate",
    "congress",
    "biden",
    "trump",
    "china",
    "trade",
    "sanctions",
    "antitrust",
    "monopoly",
    // major companies
    "apple",
    "microsoft",
    "google",
    "amazon",
    "meta",
    "tesla",
    "nvidia",
    "samsung",
    "tsmc",
    "intel",
    "amd",
];

impl Category {
    pub const ALL: [Category; 2] = [Category::Ai, Category::Global];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Ai => "ai",
            Category::Global => "global",
        }
    }

    /// Human-readable label used in logs and messages.
    pub fn label(self) -> &'static str {
        match self {
            Category::Ai => "AI tech",
            Category::Global => "Global tech",
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Category::Ai => AI_KEYWORDS,
            Category::Global => GLOBAL_KEYWORDS,
        }
    }

    /// Max items returned by a single feed.
    pub fn per_source_cap(self) -> usize {
        match self {
            Category::Ai => 12,
            Category::Global => 8,
        }
    }

    /// Max items embedded in one ranking request.
    pub fn curation_ceiling(self) -> usize {
        match self {
            Category::Ai => 15,
            Category::Global => 20,
        }
    }

    /// Case-insensitive substring match against the category keyword list.
    pub fn matches(self, content: &str) -> bool {
        let lower = content.to_lowercase();
        self.keywords().iter().any(|kw| lower.contains(kw))
    }

    /// Lenient parse used at the HTTP boundary: unknown values fall back to `Ai`
    /// and the fallback is logged.
    pub fn parse_or_default(raw: Option<&str>) -> Category {
        match raw {
            None => Category::Ai,
            Some(s) => s.parse().unwrap_or_else(|_| {
                tracing::warn!(requested = s, fallback = "ai", "unknown news category");
                Category::Ai
            }),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown news category '{0}' (expected 'ai' or 'global')")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ai" => Ok(Category::Ai),
            "global" => Ok(Category::Global),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}
