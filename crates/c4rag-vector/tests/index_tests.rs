use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use c4rag_core::config::{IndexBackend, IndexConfig, IvfConfig, SimilarityMetric};
use c4rag_core::traits::Embedder;
use c4rag_core::Error;
use c4rag_embed::HashEmbedder;
use c4rag_vector::{IndexEntry, PassageMeta, VectorIndex};

fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
    IndexEntry {
        passage_id: id.to_string(),
        vector,
        metadata: PassageMeta { document_id: id.split(':').next().unwrap_or(id).to_string(), start_offset: 0, end_offset: 10 },
    }
}

fn texts() -> Vec<(&'static str, &'static str)> {
    vec![
        ("solar:0", "solar panels charge batteries during the day"),
        ("well:0", "a hand pump draws water from a deep well"),
        ("garden:0", "raised garden beds warm quickly in spring"),
        ("stove:0", "a rocket stove burns small sticks efficiently"),
        ("radio:0", "ham radio operators relay emergency messages"),
    ]
}

fn embedded_index(config: IndexConfig) -> (HashEmbedder, VectorIndex) {
    let embedder = HashEmbedder::new(64, 256);
    let mut index = VectorIndex::new(config).unwrap();
    let entries = texts().into_iter().map(|(id, text)| entry(id, embedder.embed(text).unwrap())).collect();
    index.build(entries).unwrap();
    (embedder, index)
}

#[test]
fn every_passage_retrieves_itself_first() {
    let (embedder, index) = embedded_index(IndexConfig::default());
    for (id, text) in texts() {
        let hits = index.search(&embedder.embed(text).unwrap(), 1).unwrap();
        assert_eq!(hits[0].id, id);
    }
}

#[test]
fn five_passages_top_three() {
    let (embedder, index) = embedded_index(IndexConfig::default());
    let hits = index.search(&embedder.embed("water pump for the well").unwrap(), 3).unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].id, "well:0");
    let mut ids: Vec<_> = hits.iter().map(|h| h.id.clone()).collect();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn top_k_beyond_size_returns_everything_ranked() {
    let (embedder, index) = embedded_index(IndexConfig::default());
    let hits = index.search(&embedder.embed("stove").unwrap(), 50).unwrap();
    assert_eq!(hits.len(), 5);
    assert!(index.search(&embedder.embed("stove").unwrap(), 0).unwrap().is_empty());
}

#[test]
fn rebuilding_with_same_entries_gives_same_results() {
    let (embedder, mut index) = embedded_index(IndexConfig::default());
    let q = embedder.embed("batteries and radio").unwrap();
    let before = index.search(&q, 5).unwrap();
    let entries = texts().into_iter().map(|(id, text)| entry(id, embedder.embed(text).unwrap())).collect();
    index.build(entries).unwrap();
    assert_eq!(index.search(&q, 5).unwrap(), before);
}

#[test]
fn searching_before_build_or_after_empty_build_fails() {
    let mut index = VectorIndex::new(IndexConfig::default()).unwrap();
    assert!(matches!(index.search(&[1.0, 0.0], 3), Err(Error::IndexEmpty)));
    index.build(Vec::new()).unwrap();
    assert!(matches!(index.search(&[1.0, 0.0], 3), Err(Error::IndexEmpty)));
}

#[test]
fn mismatched_dimensions_are_rejected() {
    let mut index = VectorIndex::new(IndexConfig::default()).unwrap();
    let err = index.build(vec![entry("a:0", vec![1.0, 0.0]), entry("b:0", vec![1.0, 0.0, 0.0])]).unwrap_err();
    match err {
        Error::DimensionMismatch { id, expected, actual } => {
            assert_eq!(id, "b:0");
            assert_eq!((expected, actual), (2, 3));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let mut fixed = VectorIndex::new(IndexConfig { dimension: Some(3), ..IndexConfig::default() }).unwrap();
    assert!(matches!(fixed.build(vec![entry("a:0", vec![1.0, 0.0])]), Err(Error::DimensionMismatch { .. })));

    index.build(vec![entry("a:0", vec![1.0, 0.0])]).unwrap();
    assert!(matches!(index.search(&[1.0, 0.0, 0.0], 1), Err(Error::DimensionMismatch { .. })));
}

#[test]
fn failed_build_keeps_previous_contents() {
    let mut index = VectorIndex::new(IndexConfig::default()).unwrap();
    index.build(vec![entry("a:0", vec![1.0, 0.0]), entry("b:0", vec![0.0, 1.0])]).unwrap();

    let err = index.build(vec![entry("c:0", vec![1.0, 1.0]), entry("c:0", vec![1.0, 0.5])]).unwrap_err();
    assert!(matches!(err, Error::DuplicatePassage(ref id) if id == "c:0"));
    assert_eq!(index.len(), 2);
    assert!(index.get("c:0").is_none());
    assert_eq!(index.search(&[0.0, 1.0], 1).unwrap()[0].id, "b:0");
}

#[test]
fn inner_product_prefers_longer_vectors() {
    let config = IndexConfig { metric: SimilarityMetric::InnerProduct, ..IndexConfig::default() };
    let mut index = VectorIndex::new(config).unwrap();
    index.build(vec![entry("short:0", vec![1.0, 0.0]), entry("long:0", vec![3.0, 0.5])]).unwrap();
    assert_eq!(index.search(&[1.0, 0.0], 1).unwrap()[0].id, "long:0");

    let mut cosine = VectorIndex::new(IndexConfig::default()).unwrap();
    cosine.build(vec![entry("short:0", vec![1.0, 0.0]), entry("long:0", vec![3.0, 0.5])]).unwrap();
    assert_eq!(cosine.search(&[1.0, 0.0], 1).unwrap()[0].id, "short:0");
}

fn clustered(seed: u64, clusters: usize, per_cluster: usize, dim: usize) -> (Vec<IndexEntry>, Vec<Vec<f32>>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let centers: Vec<Vec<f32>> = (0..clusters)
        .map(|_| (0..dim).map(|_| if rng.gen::<bool>() { 1.0 } else { -1.0 }).collect())
        .collect();
    let mut entries = Vec::new();
    for (c, center) in centers.iter().enumerate() {
        for j in 0..per_cluster {
            let v = center.iter().map(|x| x + rng.gen_range(-0.1..0.1)).collect();
            entries.push(entry(&format!("c{c}:{j}"), v));
        }
    }
    let queries = centers
        .iter()
        .map(|center| center.iter().map(|x| x + rng.gen_range(-0.05..0.05)).collect())
        .collect();
    (entries, queries)
}

#[test]
fn ivf_recall_matches_brute_force_on_clustered_data() {
    let (entries, queries) = clustered(11, 8, 40, 32);
    let config = IndexConfig {
        backend: IndexBackend::Ivf,
        ivf: IvfConfig { nlist: 8, nprobe: 2, max_iterations: 25, seed: 3 },
        ..IndexConfig::default()
    };
    let mut ivf = VectorIndex::new(config).unwrap();
    ivf.build(entries.clone()).unwrap();
    assert!(ivf.recall_against_exact(&queries, 10).unwrap() >= 0.9);

    let mut exact = VectorIndex::new(IndexConfig::default()).unwrap();
    exact.build(entries).unwrap();
    assert_eq!(exact.recall_against_exact(&queries, 10).unwrap(), 1.0);
}

#[test]
fn exhaustive_ivf_is_exact() {
    let (entries, queries) = clustered(5, 6, 20, 16);
    let config = IndexConfig {
        backend: IndexBackend::Ivf,
        ivf: IvfConfig { nlist: 6, nprobe: 6, max_iterations: 10, seed: 1 },
        ..IndexConfig::default()
    };
    let mut ivf = VectorIndex::new(config).unwrap();
    ivf.build(entries).unwrap();
    assert_eq!(ivf.recall_against_exact(&queries, 15).unwrap(), 1.0);
    for q in &queries {
        assert_eq!(ivf.search(q, 15).unwrap(), ivf.search_exact(q, 15).unwrap());
    }
}
