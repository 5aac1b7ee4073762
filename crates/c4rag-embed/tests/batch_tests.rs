use c4rag_core::error::{Error, Result};
use c4rag_core::traits::Embedder;
use c4rag_core::types::{Passage, Vector};
use c4rag_embed::{embed_passages, FailureBudget, HashEmbedder};

fn passage(i: usize, text: &str) -> Passage {
    Passage {
        id: format!("doc:{}", i),
        document_id: "doc".into(),
        title: String::new(),
        text: text.to_string(),
        start_offset: i,
        end_offset: i + text.chars().count(),
        chunk_index: i,
        total_chunks: 0,
    }
}

#[test]
fn bad_passages_are_skipped_and_counted() {
    let embedder = HashEmbedder::new(16, 64);
    let passages = vec![passage(0, "fine"), passage(1, "bro\0ken"), passage(2, "also fine")];
    let mut budget = FailureBudget::new(0.5, 1);

    let out = embed_passages(&embedder, &passages, 8, &mut budget).expect("within budget");
    let ids: Vec<_> = out.passages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["doc:0", "doc:2"], "order preserved, failure dropped");
    assert_eq!(out.vectors.len(), 2);
    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.failures[0].0, "doc:1");
    assert_eq!((budget.attempted(), budget.failed()), (3, 1));
}

#[test]
fn exceeding_the_failure_rate_aborts() {
    let embedder = HashEmbedder::new(16, 64);
    let passages = vec![passage(0, "\0"), passage(1, "\0"), passage(2, "ok")];
    let mut budget = FailureBudget::new(0.1, 2);
    let err = embed_passages(&embedder, &passages, 3, &mut budget).unwrap_err();
    assert!(matches!(err, Error::Encoding(msg) if msg.contains("threshold")));
}

#[test]
fn final_check_applies_below_min_samples() {
    let mut budget = FailureBudget::new(0.0, 100);
    budget.record_success(3);
    budget.record_failure();
    assert!(budget.check(false).is_ok());
    assert!(budget.check(true).is_err());
}

struct WrongDim;
impl Embedder for WrongDim {
    fn embedder_id(&self) -> &str { "wrong" }
    fn dim(&self) -> usize { 4 }
    fn max_len(&self) -> usize { 8 }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>> {
        Ok(texts.iter().map(|_| vec![0.0; 3]).collect())
    }
}

#[test]
fn wrong_dimension_is_fatal() {
    let mut budget = FailureBudget::new(1.0, 1);
    let err = embed_passages(&WrongDim, &[passage(0, "x")], 4, &mut budget).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 3, .. }));
}
