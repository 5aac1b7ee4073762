use std::sync::Arc;

use c4rag_core::error::{Error, Result};
use c4rag_core::traits::{Embedder, Retriever};
use c4rag_core::types::{QueryResult, SearchHit};
use c4rag_text::Bm25Searcher;
use c4rag_vector::VectorIndex;
use tracing::debug;

use crate::catalog::PassageCatalog;

/// Embed the query and search the vector index.
pub struct DenseRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    catalog: Arc<PassageCatalog>,
}

impl DenseRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<VectorIndex>, catalog: Arc<PassageCatalog>) -> Self {
        Self { embedder, index, catalog }
    }
}

impl Retriever for DenseRetriever {
    fn name(&self) -> &str { "dense" }

    fn retrieve(&self, query: &str, top_k: usize) -> Result<QueryResult> {
        let q = self.embedder.embed(query)?;
        let hits = self.index.search(&q, top_k)?;
        Ok(self.catalog.resolve(hits, top_k))
    }
}

pub struct Bm25Retriever {
    searcher: Arc<Bm25Searcher>,
    catalog: Arc<PassageCatalog>,
}

impl Bm25Retriever {
    pub fn new(searcher: Arc<Bm25Searcher>, catalog: Arc<PassageCatalog>) -> Self {
        Self { searcher, catalog }
    }
}

impl Retriever for Bm25Retriever {
    fn name(&self) -> &str { "bm25" }

    fn retrieve(&self, query: &str, top_k: usize) -> Result<QueryResult> {
        let hits = bm25_candidates(&self.searcher, query, top_k)?;
        Ok(self.catalog.resolve(hits, top_k))
    }
}

pub(crate) fn bm25_candidates(searcher: &Bm25Searcher, query: &str, k: usize) -> Result<Vec<SearchHit>> {
    let hits = searcher.search(query, k).map_err(|e| Error::TextSearch(format!("{e:#}")))?;
    debug!(query, candidates = hits.len(), "bm25 candidates");
    Ok(hits)
}
