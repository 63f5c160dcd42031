//! Web scraping collaborator for the research agent.
//!
//! [`WebScraper`] fetches pages with bounded retry and exponential backoff;
//! the [`extract`] functions turn HTML into text, tables, links and metadata.

pub mod client;
pub mod extract;

pub use client::WebScraper;
pub use extract::extract_page;
