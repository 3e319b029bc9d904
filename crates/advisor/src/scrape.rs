//! Fetches a business website and reduces it to plain text for the advisor.

use crate::error::{AdvisorError, AdvisorResult};
use campaign_core::config::ScraperConfig;
use reqwest::Client;
use scraper::{Html, Node, Selector};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "svg", "template", "head"];

/// Reduces HTML documents to their visible text.
pub struct TextExtractor {
    body: Option<Selector>,
}

impl TextExtractor {
    pub fn new() -> Self {
        Self {
            body: Selector::parse("body").ok(),
        }
    }

    /// Visible text of `html`, whitespace-collapsed and cut to `max_chars`.
    pub fn extract(&self, html: &str, max_chars: usize) -> String {
        let document = Html::parse_document(html);
        let root = self
            .body
            .as_ref()
            .and_then(|body| document.select(body).next())
            .unwrap_or_else(|| document.root_element());

        let mut text_parts = Vec::new();
        for node in root.descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
            });
            if !hidden {
                text_parts.push(&**text);
            }
        }

        let joined = text_parts.join(" ");
        let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.chars().take(max_chars).collect()
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Accept only absolute http(s) URLs. A bare host gets `https://` prepended.
pub fn normalize_url(raw: &str) -> AdvisorResult<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AdvisorError::InvalidUrl("url is required".to_string()));
    }
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    let url = Url::parse(&candidate).map_err(|e| AdvisorError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(AdvisorError::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }
}

pub struct ScrapeClient {
    client: Client,
    extractor: TextExtractor,
    max_chars: usize,
}

impl ScrapeClient {
    pub fn new(config: &ScraperConfig) -> AdvisorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            extractor: TextExtractor::new(),
            max_chars: config.max_content_chars,
        })
    }

    /// Fetch `url` and return its visible text.
    pub async fn fetch_text(&self, url: &str) -> AdvisorResult<String> {
        let url = normalize_url(url)?;
        info!(url = %url, "Scraping website");

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            warn!(url = %url, %status, "Scrape target returned an error");
            return Err(AdvisorError::Api(format!("scrape target returned {status}")));
        }

        let html = response.text().await?;
        let text = self.extractor.extract(&html, self.max_chars);
        metrics::counter!("advisor.scrapes").increment(1);
        Ok(text)
    }
}
