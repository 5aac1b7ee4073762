//! c4rag-embed
//!
//! Embedder implementations and the failure-tolerant batch driver used while
//! preprocessing. Callers receive an explicitly constructed
//! `Arc<dyn Embedder>`; nothing here keeps a global model.

use std::sync::Arc;

use c4rag_core::config::{EmbeddingBackend, EmbeddingConfig, expand_path};
use c4rag_core::error::{Error, Result};
use c4rag_core::traits::Embedder;

pub mod batch;
pub mod bge;
pub mod device;
pub mod hash;
pub mod pool;
pub mod tokenize;

pub use batch::{embed_passages, EmbeddedPassages, FailureBudget};
pub use bge::BgeEmbedder;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Empty or whitespace-only; embeds to the zero vector.
    Blank,
    Text,
}

/// Input policy shared by all embedders: blank text is valid and maps to
/// the zero vector, text containing NUL is malformed.
pub fn check_input(text: &str) -> Result<InputKind> {
    if text.contains('\0') {
        return Err(Error::Encoding("input contains a NUL character".into()));
    }
    if text.trim().is_empty() { Ok(InputKind::Blank) } else { Ok(InputKind::Text) }
}

pub fn build_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    match config.backend {
        EmbeddingBackend::Hash => {
            tracing::info!("🧪 Using HashEmbedder (dim={})", config.dimension);
            Ok(Arc::new(HashEmbedder::new(config.dimension, config.max_len)))
        }
        EmbeddingBackend::Bge => {
            let dir = config
                .model_dir
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("embedding.model_dir is required for the bge backend"))?;
            Ok(Arc::new(BgeEmbedder::load(&expand_path(dir), config)?))
        }
    }
}
