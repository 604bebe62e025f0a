// src/ingest/sources.rs
//! Source registry: the feed list for each category.
//!
//! Built-in lists are used unless a TOML override is found:
//! 1) `$SOURCES_CONFIG_PATH`
//! 2) `config/sources.toml`
//!
//! ```toml
//! [[ai]]
//! name = "TechCrunch AI"
//! url = "https://techcrunch.com/category/artificial-intelligence/feed/"
//!
//! [[global]]
//! name = "Bloomberg Markets"
//! url = "https://feeds.bloomberg.com/markets/news.rss"
//! ```
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::category::Category;
use crate::ingest::types::Source;

pub const ENV_SOURCES_CONFIG_PATH: &str = "SOURCES_CONFIG_PATH";
const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    ai: Vec<Source>,
    global: Vec<Source>,
}

impl SourceRegistry {
    pub fn new(ai: Vec<Source>, global: Vec<Source>) -> Self {
        Self { ai, global }
    }

    pub fn builtin() -> Self {
        let ai = [
            (
                "TechCrunch AI",
                "https://techcrunch.com/category/artificial-intelligence/feed/",
            ),
            (
                "The Verge AI",
                "https://www.theverge.com/ai-artificial-intelligence/rss/index.xml",
            ),
            ("AI News", "https://artificialintelligence-news.com/feed/"),
            (
                "Bloomberg Technology",
                "https://feeds.bloomberg.com/technology/news.rss",
            ),
        ];
        let global = [
            (
                "Bloomberg Technology",
                "https://feeds.bloomberg.com/technology/news.rss",
            ),
            ("Bloomberg Crypto", "https://feeds.bloomberg.com/crypto/news.rss"),
            (
                "Bloomberg Politics",
                "https://feeds.bloomberg.com/politics/news.rss",
            ),
            (
                "Bloomberg Economics",
                "https://feeds.bloomberg.com/economics/news.rss",
            ),
        ];
        Self {
            ai: ai
                .iter()
                .map(|(n, u)| Source::new(*n, *u, Category::Ai))
                .collect(),
            global: global
                .iter()
                .map(|(n, u)| Source::new(*n, *u, Category::Global))
                .collect(),
        }
    }

    pub fn sources_for(&self, category: Category) -> &[Source] {
        match category {
            Category::Ai => &self.ai,
            Category::Global => &self.global,
        }
    }

    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading sources from {}", path.display()))?;
        parse_sources(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Env path, then `config/sources.toml`, then the built-in lists.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_SOURCES_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_SOURCES_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_SOURCES_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::builtin())
    }
}

#[derive(serde::Deserialize)]
struct SourceEntry {
    name: String,
    url: String,
}

#[derive(serde::Deserialize)]
struct SourcesFile {
    #[serde(default)]
    ai: Vec<SourceEntry>,
    #[serde(default)]
    global: Vec<SourceEntry>,
}

fn parse_sources(s: &str) -> Result<SourceRegistry> {
    let file: SourcesFile = toml::from_str(s)?;
    let ai = clean_list(file.ai, Category::Ai);
    let global = clean_list(file.global, Category::Global);
    if ai.is_empty() && global.is_empty() {
        return Err(anyhow!("sources file defines no feeds"));
    }
    Ok(SourceRegistry { ai, global })
}

fn clean_list(entries: Vec<SourceEntry>, category: Category) -> Vec<Source> {
    let mut out: Vec<Source> = Vec::with_capacity(entries.len());
    for e in entries {
        let name = e.name.trim();
        let url = e.url.trim();
        if name.is_empty() || url.is_empty() {
            continue;
        }
        if out.iter().any(|s| s.endpoint == url) {
            continue;
        }
        out.push(Source::new(name, url, category));
    }
    out
}
