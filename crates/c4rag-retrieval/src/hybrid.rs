//! Two-stage retrieval: BM25 proposes `candidate_k` passages, dense
//! similarity picks the final `top_k` among them.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use c4rag_core::error::Result;
use c4rag_core::traits::{Embedder, Retriever};
use c4rag_core::types::{QueryResult, SearchHit, SourceKind};
use c4rag_text::Bm25Searcher;
use c4rag_vector::VectorIndex;

use crate::catalog::PassageCatalog;
use crate::dense::bm25_candidates;

pub struct HybridRetriever {
    searcher: Arc<Bm25Searcher>,
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    catalog: Arc<PassageCatalog>,
    candidate_k: usize,
}

impl HybridRetriever {
    pub fn new(
        searcher: Arc<Bm25Searcher>,
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        catalog: Arc<PassageCatalog>,
        candidate_k: usize,
    ) -> Self {
        Self { searcher, embedder, index, catalog, candidate_k }
    }

    /// Returns the reranked hits for `query_vec`, best first, along with the
    /// raw BM25 candidates they were picked from.
    /// Falls back to a plain dense search when BM25 finds nothing.
    fn rerank(&self, query: &str, query_vec: &[f32], k: usize) -> Result<(Vec<SearchHit>, Vec<SearchHit>)> {
        let candidates = bm25_candidates(&self.searcher, query, self.candidate_k.max(k))?;
        if candidates.is_empty() {
            debug!(query, "no lexical candidates, using dense search");
            return Ok((self.index.search(query_vec, k)?, candidates));
        }
        let hits = self.index.rerank(query_vec, candidates.iter().map(|h| h.id.as_str()), k)?;
        Ok((hits, candidates))
    }

    /// The final ranking plus the lexical candidates in BM25 order, for
    /// inspecting what the dense stage changed.
    pub fn retrieve_with_candidates(&self, query: &str, top_k: usize) -> Result<(QueryResult, Vec<SearchHit>)> {
        let q = self.embedder.embed(query)?;
        let (hits, candidates) = self.rerank(query, &q, top_k)?;
        Ok((self.catalog.resolve(hits, top_k), candidates))
    }
}

impl Retriever for HybridRetriever {
    fn name(&self) -> &str { "hybrid" }

    fn retrieve(&self, query: &str, top_k: usize) -> Result<QueryResult> {
        self.retrieve_with_candidates(query, top_k).map(|(result, _)| result)
    }
}

/// Hybrid retrieval that also pulls toward a supplied context document:
/// `alpha * sim(query, p) + beta * sim(context, p)` over the BM25 candidates.
pub struct TriRetriever {
    hybrid: HybridRetriever,
    alpha: f32,
    beta: f32,
}

impl TriRetriever {
    pub fn new(hybrid: HybridRetriever, alpha: f32, beta: f32) -> Self {
        Self { hybrid, alpha, beta }
    }
}

impl Retriever for TriRetriever {
    fn name(&self) -> &str { "tri" }

    fn retrieve(&self, query: &str, top_k: usize) -> Result<QueryResult> {
        self.hybrid.retrieve(query, top_k)
    }

    fn retrieve_with_context(&self, query: &str, context: Option<&str>, top_k: usize) -> Result<QueryResult> {
        let context = match context {
            Some(c) if !c.trim().is_empty() => c,
            _ => return self.retrieve(query, top_k),
        };
        let h = &self.hybrid;
        let q = h.embedder.embed(query)?;
        let c = h.embedder.embed(context)?;
        let pool = h.candidate_k.max(top_k);
        let (by_query, _) = h.rerank(query, &q, pool)?;
        let ids: Vec<&str> = by_query.iter().map(|hit| hit.id.as_str()).collect();
        let by_context: HashMap<String, f32> = h
            .index
            .rerank(&c, ids.iter().copied(), pool)?
            .into_iter()
            .map(|hit| (hit.id, hit.score))
            .collect();

        let mut hits: Vec<SearchHit> = by_query
            .iter()
            .map(|hit| SearchHit {
                id: hit.id.clone(),
                score: self.alpha * hit.score + self.beta * by_context.get(&hit.id).copied().unwrap_or(0.0),
                source: SourceKind::Vector,
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        Ok(h.catalog.resolve(hits, top_k))
    }
}
