// src/ingest/providers/rss.rs
//! HTTP feed provider: fetches a syndication document and parses RSS 2.0, RSS 1.0 (RDF)
//! or Atom into [`FeedEntry`] values.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::{Captures, Regex};
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::category::Category;
use crate::error::PipelineError;
use crate::ingest::types::{FeedFetcher, RawItem, Source};
use crate::ingest::{select_items, FeedEntry};

/// Default ceiling for one feed request (connect + body).
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("news-digest/", env!("CARGO_PKG_VERSION"));

// ---- RSS 2.0 ----

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date")]
    dc_date: Option<String>,
    description: Option<String>,
}

// ---- RSS 1.0 (RDF): items are siblings of <channel> ----

#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

// ---- Atom ----

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl From<RssItem> for FeedEntry {
    fn from(it: RssItem) -> Self {
        let published = it
            .pub_date
            .as_deref()
            .or(it.dc_date.as_deref())
            .and_then(parse_feed_date);
        FeedEntry {
            title: it.title,
            link: it.link,
            description: it.description,
            published,
            updated: None,
        }
    }
}

impl From<AtomEntry> for FeedEntry {
    fn from(e: AtomEntry) -> Self {
        let link = e
            .links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| e.links.first())
            .and_then(|l| l.href.clone());
        FeedEntry {
            title: e.title.map(|t| t.value),
            link,
            description: e.summary.or(e.content).map(|t| t.value),
            published: e.published.as_deref().and_then(parse_feed_date),
            updated: e.updated.as_deref().and_then(parse_feed_date),
        }
    }
}

/// Parse RFC 2822 (RSS) or RFC 3339 (Atom, Dublin Core) timestamps.
pub fn parse_feed_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    let from_time =
        |dt: OffsetDateTime| DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond());

    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .and_then(from_time)
        .or_else(|| OffsetDateTime::parse(ts, &Rfc3339).ok().and_then(from_time))
        // chrono is more lenient about obsolete zone names ("GMT", "EST", ...)
        .or_else(|| {
            DateTime::parse_from_rfc2822(ts)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedFormat {
    Rss,
    Rdf,
    Atom,
}

/// Name of the first element in the document, skipping the prolog and comments.
fn root_element(xml: &str) -> Option<&str> {
    let mut rest = xml;
    while let Some(pos) = rest.find('<') {
        rest = &rest[pos + 1..];
        if rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .unwrap_or(rest.len());
            return Some(&rest[..end]);
        }
    }
    None
}

fn detect_format(xml: &str) -> Result<FeedFormat> {
    match root_element(xml) {
        Some("rss") => Ok(FeedFormat::Rss),
        Some("feed") => Ok(FeedFormat::Atom),
        Some(name) if name.eq_ignore_ascii_case("rdf:RDF") => Ok(FeedFormat::Rdf),
        Some(other) => Err(anyhow!("unsupported feed root element <{other}>")),
        None => Err(anyhow!("document has no root element")),
    }
}

/// Parse a syndication document into entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let xml = scrub_html_entities_for_xml(xml);
    let entries = match detect_format(&xml)? {
        FeedFormat::Rss => {
            let rss: Rss = from_str(&xml).context("parsing rss xml")?;
            rss.channel.item.into_iter().map(FeedEntry::from).collect()
        }
        FeedFormat::Rdf => {
            let rdf: Rdf = from_str(&xml).context("parsing rdf xml")?;
            rdf.item.into_iter().map(FeedEntry::from).collect()
        }
        FeedFormat::Atom => {
            let feed: AtomFeed = from_str(&xml).context("parsing atom xml")?;
            feed.entry.into_iter().map(FeedEntry::from).collect()
        }
    };
    Ok(entries)
}

/// HTML entities are not defined in XML. The common punctuation ones fold to ASCII; any
/// other named entity becomes numeric character references, and unknown names are
/// kept as literal text.
fn scrub_html_entities_for_xml(s: &str) -> String {
    let folded = s
        .replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'");

    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY.get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());
    re.replace_all(&folded, |caps: &Captures<'_>| {
        let name = &caps[1];
        if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
            return caps[0].to_string();
        }
        let decoded = html_escape::decode_html_entities(&caps[0]);
        if *decoded == caps[0] {
            format!("&amp;{name};")
        } else {
            decoded.chars().map(|c| format!("&#{};", u32::from(c))).collect()
        }
    })
    .into_owned()
}

/// Fetches feeds over HTTP with a bounded timeout.
#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self { client })
    }

    async fn fetch_body(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await.context("http get()")?;
        let resp = resp.error_for_status().context("feed returned non-2xx")?;
        resp.text().await.context("http .text()")
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(
        &self,
        source: &Source,
        category: Category,
    ) -> Result<Vec<RawItem>, PipelineError> {
        let t0 = Instant::now();

        let entries = self
            .fetch_body(&source.endpoint)
            .await
            .and_then(|body| parse_feed(&body))
            .map_err(|e| {
                counter!("digest_fetch_errors_total").increment(1);
                PipelineError::fetch(&source.name, &e)
            })?;

        let parsed = entries.len();
        let items = select_items(entries, source, category, Utc::now());

        histogram!("digest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::debug!(
            target: "ingest",
            source = %source.name,
            %category,
            parsed,
            kept = items.len(),
            "feed parsed"
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example</title>
    <link>https://example.test</link>
    <item>
      <title>OpenAI releases &ldquo;o5&rdquo;</title>
      <link>https://example.test/o5</link>
      <pubDate>Tue, 10 Jun 2025 08:00:00 +0000</pubDate>
      <description><![CDATA[<p>New <b>model</b>&nbsp;out</p>]]></description>
    </item>
    <item>
      <title>Undated</title>
      <link>https://example.test/undated</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- generated -->
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <entry>
    <title type="html">Anthropic news</title>
    <link rel="self" href="https://example.test/self"/>
    <link rel="alternate" href="https://example.test/post"/>
    <updated>2025-06-10T09:30:00Z</updated>
    <summary>Claude update</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items_in_order() {
        let entries = parse_feed(RSS).expect("rss parses");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title.as_deref(), Some("OpenAI releases \"o5\""));
        assert_eq!(entries[0].link.as_deref(), Some("https://example.test/o5"));
        assert_eq!(
            entries[0].published.map(|d| d.to_rfc3339()),
            Some("2025-06-10T08:00:00+00:00".to_string())
        );
        assert!(entries[0]
            .description
            .as_deref()
            .unwrap_or_default()
            .contains("<b>model</b>"));
        assert_eq!(entries[1].published, None);
    }

    #[test]
    fn parses_atom_and_prefers_alternate_link() {
        let entries = parse_feed(ATOM).expect("atom parses");
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.title.as_deref(), Some("Anthropic news"));
        assert_eq!(e.link.as_deref(), Some("https://example.test/post"));
        assert_eq!(e.description.as_deref(), Some("Claude update"));
        assert!(e.published.is_none());
        assert!(e.updated.is_some());
    }

    #[test]
    fn atom_links_split_by_other_elements_still_parse() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>OpenAI news</title>
    <link rel="alternate" type="text/html" href="https://blog.test/openai"/>
    <id>https://blog.test/?p=1</id>
    <updated>2025-06-10T09:30:00Z</updated>
    <summary>AI</summary>
    <link rel="replies" type="application/atom+xml" href="https://blog.test/openai/feed"/>
  </entry>
  <entry>
    <title>Second</title>
    <link href="https://blog.test/second"/>
  </entry>
</feed>"#;
        let entries = parse_feed(xml).expect("interleaved links parse");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].link.as_deref(), Some("https://blog.test/openai"));
        assert_eq!(entries[1].link.as_deref(), Some("https://blog.test/second"));
    }

    #[test]
    fn rss_items_split_by_channel_metadata_still_parse() {
        let xml = r#"<rss version="2.0"><channel>
  <item><title>First</title><link>https://example.test/1</link></item>
  <image><url>https://example.test/logo.png</url></image>
  <item><title>Second</title><link>https://example.test/2</link></item>
</channel></rss>"#;
        let entries = parse_feed(xml).expect("interleaved items parse");
        let titles: Vec<_> = entries.iter().filter_map(|e| e.title.as_deref()).collect();
        assert_eq!(titles, ["First", "Second"]);
    }

    #[test]
    fn html_named_entities_do_not_sink_the_feed() {
        let xml = r#"<rss version="2.0"><channel>
  <item><title>Caf&eacute; AI launch &copy; 2025</title><link>https://example.test/cafe</link></item>
  <item><title>OpenAI model &trade; &bogus; &amp; more</title><link>https://example.test/model</link></item>
</channel></rss>"#;
        let entries = parse_feed(xml).expect("html entities are tolerated");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title.as_deref(), Some("Café AI launch © 2025"));
        assert_eq!(
            entries[1].title.as_deref(),
            Some("OpenAI model ™ &bogus; & more")
        );
    }

    #[test]
    fn rejects_non_feed_documents() {
        assert!(parse_feed("<html><body>nope</body></html>").is_err());
        assert!(parse_feed("not xml at all").is_err());
    }

    #[test]
    fn feed_dates_accept_rfc2822_and_rfc3339() {
        assert!(parse_feed_date("Tue, 10 Jun 2025 08:00:00 GMT").is_some());
        assert!(parse_feed_date("2025-06-10T08:00:00+07:00").is_some());
        assert!(parse_feed_date("yesterday").is_none());
    }

    #[test]
    fn root_element_skips_prolog_and_comments() {
        assert_eq!(root_element(ATOM), Some("feed"));
        assert_eq!(root_element(RSS), Some("rss"));
    }
}
