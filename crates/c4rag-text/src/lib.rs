//! c4rag-text
//!
//! Tantivy-based BM25 indexing and search over passages. The preprocessing
//! run writes the index next to the passage store; experiments open it
//! read-only through [`Bm25Searcher`].

pub mod tantivy_utils;
pub mod index;

pub use index::{Bm25Searcher, PassageTextIndexer};
