//! Scraper trait: fetch a URL and extract its readable content.
//!
//! Only the research agent consumes this. Failures come back as
//! [`ScrapeResult::Failed`] values so a broken page never aborts a run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An HTML table; the first row is treated as the header row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Cell values of the named column, skipping short rows.
    pub fn column(&self, header: &str) -> Vec<&str> {
        let Some(idx) = self.headers.iter().position(|h| h == header) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(idx).map(String::as_str))
            .collect()
    }
}

/// Content extracted from a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    pub text: String,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub links: Vec<String>,
    /// title, description, author, date when present
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub scraped_at: DateTime<Utc>,
}

/// Outcome of a scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapeResult {
    Page(ScrapedPage),
    Failed { url: String, error: String },
}

impl ScrapeResult {
    pub fn url(&self) -> &str {
        match self {
            Self::Page(page) => &page.url,
            Self::Failed { url, .. } => url,
        }
    }

    pub fn page(&self) -> Option<&ScrapedPage> {
        match self {
            Self::Page(page) => Some(page),
            Self::Failed { .. } => None,
        }
    }
}

#[async_trait]
pub trait Scraper: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch and extract a page. Never returns an error; failures are values.
    async fn scrape(&self, url: &str) -> ScrapeResult;

    /// Search the web and scrape the top results.
    async fn search_and_scrape(&self, _query: &str, _max_results: usize) -> Vec<ScrapeResult> {
        Vec::new()
    }
}
