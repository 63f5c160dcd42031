//! # Agora Core
//!
//! Domain types, traits, and error definitions for the Agora multi-agent
//! research runtime. This crate has **no I/O**: it defines the shared-memory
//! data model and the collaborator seams that every other crate implements.
//!
//! ## Design Philosophy
//!
//! Every collaborator is a trait here; implementations live in their own
//! crates:
//! - [`DocumentBackend`]: append-only document collection (memory crate)
//! - [`Embedder`]: text → vector (memory and providers crates)
//! - [`Provider`]: language model completion (providers crate)
//! - [`Scraper`]: URL → extracted page (scraper crate)
//!
//! Agents never talk to each other directly; they only read and write
//! [`Document`]s through the content store.

pub mod error;
pub mod message;
pub mod provider;
pub mod memory;
pub mod embedding;
pub mod scrape;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use memory::{Document, DocumentBackend, DocumentType, Metadata, MetadataFilter};
pub use embedding::Embedder;
pub use scrape::{ScrapeResult, ScrapedPage, Scraper, Table};
