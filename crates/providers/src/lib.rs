//! LLM Provider implementations for Agora.
//!
//! All providers implement the `agora_core::Provider` trait.
//! The router selects the correct provider based on configuration, and
//! [`ProviderEmbedder`] exposes a provider's embedding endpoint to the
//! content store.

pub mod embedder;
pub mod openai_compat;
pub mod router;

pub use embedder::ProviderEmbedder;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
