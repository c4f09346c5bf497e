//! Feed summary section.
//!
//! Fetches an RSS/Atom feed and summarizes its first `items` entries:
//!
//! ```text
//! { "title": "...", "items": [{ "href": "...", "title": "...", "pub_date": "..." }] }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::model::Feed;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{options, Process, Section, SectionConfig};
use crate::error::{BulletinError, Result};
use crate::template::DefaultTemplate;

/// Default number of feed entries summarized.
pub const DEFAULT_ITEMS: usize = 5;

const fn default_items() -> usize {
    DEFAULT_ITEMS
}

/// Options read from the section configuration.
#[derive(Debug, Deserialize)]
struct FeedOptions {
    url: String,
    #[serde(default = "default_items")]
    items: usize,
    /// Accepted for compatibility; previously sent entries are not tracked.
    #[serde(default)]
    #[allow(dead_code)]
    since_last: bool,
}

/// Summary of a feed passed to the template as `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSummary {
    pub title: String,
    pub items: Vec<FeedItem>,
}

/// One summarized feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub href: String,
    pub title: String,
    pub pub_date: Option<DateTime<Utc>>,
}

impl FeedSummary {
    /// Summarize at most `limit` entries, keeping feed order.
    #[must_use]
    pub fn from_feed(feed: Feed, limit: usize) -> Self {
        let title = feed.title.map(|t| t.content).unwrap_or_default();
        let items = feed
            .entries
            .into_iter()
            .take(limit)
            .map(|entry| FeedItem {
                href: entry
                    .links
                    .into_iter()
                    .next()
                    .map(|link| link.href)
                    .unwrap_or_default(),
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                pub_date: entry.published.or(entry.updated),
            })
            .collect();

        Self { title, items }
    }
}

/// Processor fetching and summarizing a feed.
#[derive(Debug, Clone, Default)]
pub struct FeedProcessor {
    client: reqwest::Client,
}

impl FeedProcessor {
    /// Create a processor using the given HTTP client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Read the raw feed document from `http(s)://` or `file://` URLs.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url)
            .map_err(|e| BulletinError::InvalidConfig(format!("invalid feed url '{url}': {e}")))?;

        if parsed.scheme() == "file" {
            let path = parsed.to_file_path().map_err(|()| {
                BulletinError::InvalidConfig(format!("invalid feed file url '{url}'"))
            })?;
            return Ok(tokio::fs::read(path).await?);
        }

        let response = self.client.get(parsed).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Process for FeedProcessor {
    async fn process(&self, config: &SectionConfig) -> Result<Value> {
        let options: FeedOptions = options(config)?;
        let body = self.fetch(&options.url).await?;
        let feed = feed_rs::parser::parse(body.as_slice())?;

        let summary = FeedSummary::from_feed(feed, options.items);
        debug!(
            url = %options.url,
            items = summary.items.len(),
            "Summarized feed"
        );
        Ok(serde_json::to_value(summary)?)
    }
}

/// Builder for a feed summary section.
#[derive(Debug, Clone)]
pub struct FeedSection {
    config: SectionConfig,
    processor: FeedProcessor,
}

impl FeedSection {
    pub fn new(url: impl Into<String>) -> Self {
        let mut config = SectionConfig::new();
        config.insert("url".to_string(), Value::String(url.into()));
        config.insert("items".to_string(), Value::from(DEFAULT_ITEMS));
        config.insert("since_last".to_string(), Value::Bool(false));
        Self {
            config,
            processor: FeedProcessor::default(),
        }
    }

    /// Maximum number of entries to summarize.
    #[must_use]
    pub fn items(mut self, items: usize) -> Self {
        self.config.insert("items".to_string(), Value::from(items));
        self
    }

    #[must_use]
    pub fn since_last(mut self, since_last: bool) -> Self {
        self.config
            .insert("since_last".to_string(), Value::Bool(since_last));
        self
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.processor = FeedProcessor::with_client(client);
        self
    }

    #[must_use]
    pub fn into_section(self) -> Section {
        Section::with_default(self.processor, self.config, DefaultTemplate::FEED)
    }
}

impl From<FeedSection> for Section {
    fn from(section: FeedSection) -> Self {
        section.into_section()
    }
}
