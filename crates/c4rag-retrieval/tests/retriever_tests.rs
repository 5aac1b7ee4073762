use std::sync::Arc;

use c4rag_core::config::{IndexConfig, RetrievalConfig, RetrievalStrategy};
use c4rag_core::traits::{Embedder, Retriever};
use c4rag_core::types::{Passage, SourceKind};
use c4rag_embed::HashEmbedder;
use c4rag_retrieval::{build_retriever, HybridRetriever, PassageCatalog, RandomRetriever, RetrieverParts};
use c4rag_text::Bm25Searcher;
use c4rag_vector::{IndexEntry, PassageMeta, VectorIndex};

fn passage(doc: &str, text: &str) -> Passage {
    Passage {
        id: Passage::make_id(doc, 0),
        document_id: doc.to_string(),
        title: doc.to_string(),
        text: text.to_string(),
        start_offset: 0,
        end_offset: text.chars().count(),
        chunk_index: 0,
        total_chunks: 1,
    }
}

fn corpus() -> Vec<Passage> {
    vec![
        passage("paris", "Paris is the capital of France and sits on the Seine"),
        passage("berlin", "Berlin is the capital of Germany"),
        passage("seine", "The Seine river flows through Paris to the English Channel"),
        passage("rhine", "The Rhine river flows from the Alps to the North Sea"),
        passage("alps", "The Alps are the highest mountain range in Europe"),
        passage("bread", "Sourdough bread rises slowly with wild yeast"),
    ]
}

fn parts() -> RetrieverParts {
    let passages = corpus();
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(256, 256));
    let entries = passages
        .iter()
        .map(|p| IndexEntry {
            passage_id: p.id.clone(),
            vector: embedder.embed(&p.text).unwrap(),
            metadata: PassageMeta { document_id: p.document_id.clone(), start_offset: p.start_offset, end_offset: p.end_offset },
        })
        .collect();
    let mut index = VectorIndex::new(IndexConfig::default()).unwrap();
    index.build(entries).unwrap();
    RetrieverParts {
        bm25: Arc::new(Bm25Searcher::in_memory(&passages).unwrap()),
        catalog: Arc::new(PassageCatalog::new(passages)),
        embedder,
        index: Arc::new(index),
    }
}

fn retriever(strategy: RetrievalStrategy) -> Box<dyn Retriever> {
    let config = RetrievalConfig { strategy, candidate_k: 4, ..RetrievalConfig::default() };
    build_retriever(&config, parts())
}

fn assert_well_formed(result: &c4rag_core::types::QueryResult, top_k: usize) {
    assert!(result.len() <= top_k);
    let mut ids: Vec<_> = result.passage_ids().collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), result.len());
    for pair in result.hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn every_strategy_returns_ranked_unique_passages() {
    for strategy in [
        RetrievalStrategy::Dense,
        RetrievalStrategy::Bm25,
        RetrievalStrategy::Hybrid,
        RetrievalStrategy::Tri,
        RetrievalStrategy::Random,
    ] {
        let r = retriever(strategy);
        assert_eq!(r.name(), strategy.to_string());
        let result = r.retrieve("which river flows through Paris", 3).unwrap();
        assert_eq!(result.len(), 3, "{strategy}");
        assert_well_formed(&result, 3);
    }
}

#[test]
fn lexical_strategies_find_the_obvious_passage() {
    for strategy in [RetrievalStrategy::Dense, RetrievalStrategy::Bm25, RetrievalStrategy::Hybrid] {
        let result = retriever(strategy).retrieve("sourdough bread yeast", 2).unwrap();
        assert_eq!(result.hits[0].passage.id, "bread:0", "{strategy}");
    }
}

#[test]
fn hybrid_only_returns_bm25_candidates() {
    let result = retriever(RetrievalStrategy::Hybrid).retrieve("capital", 5).unwrap();
    let ids: Vec<_> = result.passage_ids().collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"paris:0") && ids.contains(&"berlin:0"));
}

#[test]
fn hybrid_falls_back_to_dense_without_lexical_match() {
    let result = retriever(RetrievalStrategy::Hybrid).retrieve("the of and", 2).unwrap();
    assert_eq!(result.len(), 2);
}

#[test]
fn top_k_larger_than_corpus() {
    let result = retriever(RetrievalStrategy::Dense).retrieve("capital", 100).unwrap();
    assert_eq!(result.len(), corpus().len());
    let random = retriever(RetrievalStrategy::Random).retrieve("capital", 100).unwrap();
    assert_eq!(random.len(), corpus().len());
    assert_well_formed(&random, 100);
}

#[test]
fn random_baseline_is_deterministic_per_query() {
    let r = retriever(RetrievalStrategy::Random);
    let a = r.retrieve("what is the capital of France", 3).unwrap();
    let b = r.retrieve("what is the capital of France", 3).unwrap();
    assert_eq!(a, b);
    assert!(r.retrieve("anything", 0).unwrap().is_empty());
}

#[test]
fn random_draws_are_labelled_and_resolved() {
    let p = parts();
    let random = RandomRetriever::new(p.catalog.clone(), 7);
    let drawn = random.draw("glaciers", 4);
    assert_eq!(drawn.len(), 4);
    assert!(drawn.iter().all(|h| h.source == SourceKind::Random));
    let result = random.retrieve("glaciers", 4).unwrap();
    let ids: Vec<_> = result.passage_ids().collect();
    assert_eq!(ids, drawn.iter().map(|h| h.id.as_str()).collect::<Vec<_>>());
}

#[test]
fn hybrid_exposes_its_lexical_candidates() {
    let p = parts();
    let hybrid = HybridRetriever::new(p.bm25.clone(), p.embedder.clone(), p.index.clone(), p.catalog.clone(), 4);
    let (result, candidates) = hybrid.retrieve_with_candidates("river flows", 1).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().all(|h| h.source == SourceKind::Text));
    assert!(candidates.iter().any(|h| h.id == result.hits[0].passage.id));
    assert_eq!(result, hybrid.retrieve("river flows", 1).unwrap());

    let (fallback, none) = hybrid.retrieve_with_candidates("the of and", 2).unwrap();
    assert!(none.is_empty());
    assert_eq!(fallback.len(), 2);
}

#[test]
fn tri_context_shifts_the_ranking() {
    let r = retriever(RetrievalStrategy::Tri);
    let plain = r.retrieve_with_context("river", None, 2).unwrap();
    let hybrid = retriever(RetrievalStrategy::Hybrid).retrieve("river", 2).unwrap();
    assert_eq!(plain, hybrid);

    let pulled = r.retrieve_with_context("river", Some("Alps North Sea Rhine"), 1).unwrap();
    assert_eq!(pulled.hits[0].passage.id, "rhine:0");
    let pulled = r.retrieve_with_context("river", Some("Paris English Channel Seine"), 1).unwrap();
    assert_eq!(pulled.hits[0].passage.id, "seine:0");
}

#[test]
fn to_text_joins_passages() {
    let result = retriever(RetrievalStrategy::Bm25).retrieve("sourdough", 1).unwrap();
    assert_eq!(result.to_text(), "Sourdough bread rises slowly with wild yeast");
}
