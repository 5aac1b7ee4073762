use std::collections::{HashMap, HashSet};

use c4rag_core::types::{Passage, QueryResult, ScoredPassage, SearchHit};

/// Passage lookup by id, shared by every retriever over one store.
#[derive(Debug, Default)]
pub struct PassageCatalog {
    passages: Vec<Passage>,
    by_id: HashMap<String, usize>,
}

impl PassageCatalog {
    pub fn new(passages: Vec<Passage>) -> Self {
        let by_id = passages.iter().enumerate().map(|(i, p)| (p.id.clone(), i)).collect();
        Self { passages, by_id }
    }

    pub fn len(&self) -> usize { self.passages.len() }

    pub fn is_empty(&self) -> bool { self.passages.is_empty() }

    pub fn get(&self, id: &str) -> Option<&Passage> {
        self.by_id.get(id).map(|&i| &self.passages[i])
    }

    pub fn by_position(&self, i: usize) -> Option<&Passage> { self.passages.get(i) }

    pub fn passages(&self) -> &[Passage] { &self.passages }

    /// Turns ranked hits into a result: unknown ids and repeats are dropped,
    /// order is kept, at most `top_k` entries.
    pub fn resolve(&self, hits: Vec<SearchHit>, top_k: usize) -> QueryResult {
        let mut seen = HashSet::new();
        let hits = hits
            .into_iter()
            .filter(|h| seen.insert(h.id.clone()))
            .filter_map(|h| self.get(&h.id).map(|p| ScoredPassage { passage: p.clone(), score: h.score }))
            .take(top_k)
            .collect();
        QueryResult { hits }
    }
}
