//! c4rag-retrieval
//!
//! The retrieval strategies compared by experiments, all behind
//! [`c4rag_core::traits::Retriever`], plus [`build_retriever`] to pick one
//! from configuration.

pub mod catalog;
pub mod dense;
pub mod hybrid;
pub mod random;

use std::sync::Arc;

use c4rag_core::config::{RetrievalConfig, RetrievalStrategy};
use c4rag_core::traits::{Embedder, Retriever};
use c4rag_text::Bm25Searcher;
use c4rag_vector::VectorIndex;

pub use catalog::PassageCatalog;
pub use dense::{Bm25Retriever, DenseRetriever};
pub use hybrid::{HybridRetriever, TriRetriever};
pub use random::RandomRetriever;

/// Everything a retriever may need, loaded once per experiment.
#[derive(Clone)]
pub struct RetrieverParts {
    pub catalog: Arc<PassageCatalog>,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<VectorIndex>,
    pub bm25: Arc<Bm25Searcher>,
}

pub fn build_retriever(config: &RetrievalConfig, parts: RetrieverParts) -> Box<dyn Retriever> {
    let RetrieverParts { catalog, embedder, index, bm25 } = parts;
    match config.strategy {
        RetrievalStrategy::Dense => Box::new(DenseRetriever::new(embedder, index, catalog)),
        RetrievalStrategy::Bm25 => Box::new(Bm25Retriever::new(bm25, catalog)),
        RetrievalStrategy::Hybrid => Box::new(HybridRetriever::new(bm25, embedder, index, catalog, config.candidate_k)),
        RetrievalStrategy::Tri => {
            let hybrid = HybridRetriever::new(bm25, embedder, index, catalog, config.candidate_k);
            Box::new(TriRetriever::new(hybrid, config.alpha, config.beta))
        }
        RetrievalStrategy::Random => Box::new(RandomRetriever::new(catalog, config.seed)),
    }
}
