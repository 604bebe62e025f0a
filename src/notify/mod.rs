pub mod discord;

use anyhow::Result;

use crate::category::Category;
use crate::curate::CurationResult;

pub use discord::DiscordNotifier;

/// Delivery channel for digests and plain-text notices. Implementations report failures
/// and never retry.
#[async_trait::async_trait]
pub trait DigestNotifier: Send + Sync {
    /// Render and send a curated digest; `category` selects the channel and styling.
    async fn send_digest(&self, category: Category, digest: &CurationResult) -> Result<()>;

    /// Send a plain-text message (error notices, webhook tests).
    async fn send_text(&self, category: Category, text: &str) -> Result<()>;
}
