use std::hash::Hasher;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use twox_hash::XxHash64;

use c4rag_core::error::Result;
use c4rag_core::traits::Retriever;
use c4rag_core::types::{QueryResult, SearchHit, SourceKind};

use crate::catalog::PassageCatalog;

/// Uniformly random passages; the floor every real strategy has to beat.
/// The draw depends only on the seed and the query text.
pub struct RandomRetriever {
    catalog: Arc<PassageCatalog>,
    seed: u64,
}

impl RandomRetriever {
    pub fn new(catalog: Arc<PassageCatalog>, seed: u64) -> Self {
        Self { catalog, seed }
    }

    /// Draws `min(top_k, n)` distinct passages; scores decay with draw order.
    pub fn draw(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        let n = self.catalog.len();
        let k = top_k.min(n);
        if k == 0 { return Vec::new(); }
        let mut hasher = XxHash64::with_seed(self.seed);
        hasher.write(query.as_bytes());
        let mut rng = StdRng::seed_from_u64(hasher.finish());
        rand::seq::index::sample(&mut rng, n, k)
            .into_iter()
            .enumerate()
            .filter_map(|(rank, i)| {
                self.catalog.by_position(i).map(|p| SearchHit {
                    id: p.id.clone(),
                    score: 1.0 / (rank + 1) as f32,
                    source: SourceKind::Random,
                })
            })
            .collect()
    }
}

impl Retriever for RandomRetriever {
    fn name(&self) -> &str { "random" }

    fn retrieve(&self, query: &str, top_k: usize) -> Result<QueryResult> {
        Ok(self.catalog.resolve(self.draw(query, top_k), top_k))
    }
}
