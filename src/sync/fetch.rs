use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;

const FEED_TIMEOUT: Duration = Duration::from_secs(10);
const ARTICLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Outbound HTTP for the pipeline: feed documents and article pages.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self, url: &str) -> Result<Bytes>;
    async fn fetch_article(&self, url: &str) -> Result<String>;
}

pub struct HttpFeedSource {
    http: Client,
}

impl HttpFeedSource {
    pub fn new() -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_feed(&self, url: &str) -> Result<Bytes> {
        let bytes = self
            .http
            .get(url)
            .timeout(FEED_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes)
    }

    async fn fetch_article(&self, url: &str) -> Result<String> {
        let text = self
            .http
            .get(url)
            .timeout(ARTICLE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }
}

/// Canned responses for tests; unknown URLs fail like a dead host.
#[derive(Default)]
pub struct MockFeedSource {
    feeds: HashMap<String, Bytes>,
    articles: HashMap<String, String>,
}

impl MockFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: &str, xml: &str) -> Self {
        self.feeds.insert(url.to_string(), Bytes::from(xml.to_string()));
        self
    }

    pub fn with_article(mut self, url: &str, html: &str) -> Self {
        self.articles.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    async fn fetch_feed(&self, url: &str) -> Result<Bytes> {
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("mock feed source has no feed for {url}"))
    }

    async fn fetch_article(&self, url: &str) -> Result<String> {
        self.articles
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("mock feed source has no article for {url}"))
    }
}
