use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::DigestNotifier;
use crate::category::Category;
use crate::curate::{CuratedItem, CurationResult};
use crate::ingest::truncate_with_marker;

// Discord API limits.
const MAX_EMBEDS_PER_MESSAGE: usize = 10;
const MAX_CONTENT: usize = 2000;
const MAX_EMBED_TITLE: usize = 256;
const MAX_EMBED_DESCRIPTION: usize = 4096;
const MAX_FIELD_VALUE: usize = 1024;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct DiscordNotifier {
    ai_webhook: String,
    global_webhook: String,
    client: Client,
}

impl DiscordNotifier {
    /// An empty `global_webhook` falls back to the AI one.
    pub fn new(ai_webhook: String, global_webhook: String) -> Self {
        let global_webhook = if global_webhook.trim().is_empty() {
            ai_webhook.clone()
        } else {
            global_webhook
        };
        Self {
            ai_webhook,
            global_webhook,
            client: Client::new(),
        }
    }

    fn webhook(&self, category: Category) -> &str {
        match category {
            Category::Ai => &self.ai_webhook,
            Category::Global => &self.global_webhook,
        }
    }

    async fn post(&self, category: Category, payload: &DiscordWebhookPayload) -> Result<()> {
        let rsp = self
            .client
            .post(self.webhook(category))
            .timeout(WEBHOOK_TIMEOUT)
            .json(payload)
            .send()
            .await
            .map_err(|e| anyhow!("Discord webhook request failed: {e}"))?;
        rsp.error_for_status_ref()
            .map_err(|e| anyhow!("Discord webhook HTTP error: {e}"))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DigestNotifier for DiscordNotifier {
    async fn send_digest(&self, category: Category, digest: &CurationResult) -> Result<()> {
        let messages = digest_messages(category, digest, Utc::now());
        tracing::info!(
            target: "notify",
            %category,
            items = digest.items.len(),
            messages = messages.len(),
            "sending digest to Discord"
        );
        for msg in &messages {
            self.post(category, msg).await?;
        }
        Ok(())
    }

    async fn send_text(&self, category: Category, text: &str) -> Result<()> {
        self.post(category, &DiscordWebhookPayload::text(text)).await
    }
}

struct Style {
    heading: &'static str,
    color: u32,
}

fn style(category: Category) -> Style {
    match category {
        Category::Ai => Style {
            heading: "🤖 **Daily AI Tech News**",
            color: 0x5865F2,
        },
        Category::Global => Style {
            heading: "🌍 **Daily Global Business & Tech News**",
            color: 0x2ECC71,
        },
    }
}

/// Render a digest as one or more webhook messages (10 embeds each).
pub(crate) fn digest_messages(
    category: Category,
    digest: &CurationResult,
    now: DateTime<Utc>,
) -> Vec<DiscordWebhookPayload> {
    let st = style(category);
    let mut embeds: Vec<DiscordEmbed> = digest
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| item_embed(i + 1, item, st.color))
        .collect();

    if let (Some(u), Some(last)) = (digest.usage, embeds.last_mut()) {
        last.footer = Some(DiscordFooter {
            text: format!(
                "Tokens: {} in / {} out / {} total",
                u.input_tokens, u.output_tokens, u.total_tokens
            ),
        });
    }

    let header = format!(
        "{} · {}\nTop {} stories",
        st.heading,
        now.format("%Y-%m-%d"),
        digest.items.len()
    );

    let mut messages = Vec::new();
    let mut rest = embeds.into_iter().peekable();
    let mut first = true;
    while rest.peek().is_some() {
        let chunk: Vec<_> = rest.by_ref().take(MAX_EMBEDS_PER_MESSAGE).collect();
        messages.push(DiscordWebhookPayload {
            content: first.then(|| header.clone()),
            embeds: chunk,
        });
        first = false;
    }
    if messages.is_empty() {
        messages.push(DiscordWebhookPayload::text(&header));
    }
    messages
}

fn item_embed(rank: usize, item: &CuratedItem, color: u32) -> DiscordEmbed {
    let mut fields = vec![DiscordField {
        name: "Source".to_string(),
        value: truncate_with_marker(&item.source, MAX_FIELD_VALUE),
        inline: true,
    }];
    if !item.relevance.is_empty() {
        fields.push(DiscordField {
            name: "Why it matters".to_string(),
            value: truncate_with_marker(&item.relevance, MAX_FIELD_VALUE),
            inline: false,
        });
    }
    DiscordEmbed {
        title: truncate_with_marker(&format!("{rank}. {}", item.title), MAX_EMBED_TITLE),
        description: truncate_with_marker(&item.summary, MAX_EMBED_DESCRIPTION),
        url: Some(item.url.clone()),
        color,
        fields,
        footer: None,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DiscordField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct DiscordFooter {
    text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DiscordEmbed {
    title: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<DiscordField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<DiscordFooter>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DiscordWebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn text(text: &str) -> Self {
        Self {
            content: Some(truncate_with_marker(text, MAX_CONTENT)),
            embeds: Vec::new(),
        }
    }
}
