//! HTTP side of the scraper: fetch with bounded retry and exponential backoff.

use std::time::Duration;

use agora_config::ScraperConfig;
use agora_core::error::ScrapeError;
use agora_core::scrape::{ScrapeResult, Scraper};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::extract::extract_page;

pub struct WebScraper {
    client: reqwest::Client,
    max_retries: u32,
    link_limit: usize,
    backoff_base: Duration,
}

impl WebScraper {
    pub fn new(config: &ScraperConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            max_retries: config.max_retries.max(1),
            link_limit: config.link_limit,
            backoff_base: Duration::from_secs(1),
        }
    }

    /// Base delay; attempt `n` waits `base * 2^n` before retrying.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    async fn fetch_once(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| ScrapeError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Fetch a page body, retrying up to `max_retries` attempts in total.
    pub async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let mut last_error = String::new();

        for attempt in 0..self.max_retries {
            match self.fetch_once(url).await {
                Ok(body) => {
                    debug!(url, attempt, bytes = body.len(), "Fetched page");
                    return Ok(body);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt + 1 < self.max_retries {
                        let delay = self.backoff_base * 2u32.saturating_pow(attempt);
                        debug!(url, attempt, ?delay, error = %e, "Fetch failed, backing off");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(ScrapeError::RetriesExhausted {
            url: url.to_string(),
            attempts: self.max_retries,
            last_error,
        })
    }
}

#[async_trait]
impl Scraper for WebScraper {
    fn name(&self) -> &str {
        "web"
    }

    async fn scrape(&self, url: &str) -> ScrapeResult {
        match self.fetch(url).await {
            Ok(body) => {
                let page = extract_page(url, &body, self.link_limit);
                info!(
                    url,
                    text_len = page.text.len(),
                    tables = page.tables.len(),
                    links = page.links.len(),
                    "Scraped page"
                );
                ScrapeResult::Page(page)
            }
            Err(e) => {
                warn!(url, error = %e, "Scrape failed");
                ScrapeResult::Failed {
                    url: url.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    // No search backend is wired in; callers get an empty result set.
    async fn search_and_scrape(&self, query: &str, max_results: usize) -> Vec<ScrapeResult> {
        debug!(query, max_results, "search_and_scrape has no search backend");
        Vec::new()
    }
}
