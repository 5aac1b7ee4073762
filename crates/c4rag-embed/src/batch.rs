use tracing::{debug, warn};

use c4rag_core::config::EmbeddingConfig;
use c4rag_core::error::{Error, Result};
use c4rag_core::traits::Embedder;
use c4rag_core::types::{Passage, PassageId, Vector};

/// Tracks per-passage embedding failures against the configured tolerance.
#[derive(Debug, Clone)]
pub struct FailureBudget {
    max_rate: f64,
    min_samples: usize,
    attempted: usize,
    failed: usize,
}

impl FailureBudget {
    pub fn new(max_rate: f64, min_samples: usize) -> Self {
        Self { max_rate, min_samples, attempted: 0, failed: 0 }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.max_failure_rate, config.min_failure_samples)
    }

    pub fn record_success(&mut self, n: usize) {
        self.attempted += n;
    }

    pub fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    pub fn attempted(&self) -> usize { self.attempted }
    pub fn failed(&self) -> usize { self.failed }

    pub fn rate(&self) -> f64 {
        if self.attempted == 0 { 0.0 } else { self.failed as f64 / self.attempted as f64 }
    }

    /// Mid-run the rate is only enforced once `min_samples` passages were
    /// attempted; `final_check` enforces it unconditionally.
    pub fn check(&self, final_check: bool) -> Result<()> {
        let enough = final_check || self.attempted >= self.min_samples;
        if enough && self.attempted > 0 && self.rate() > self.max_rate {
            return Err(Error::Encoding(format!(
                "{} of {} passages failed to embed ({:.1}%), above the {:.1}% threshold",
                self.failed,
                self.attempted,
                self.rate() * 100.0,
                self.max_rate * 100.0
            )));
        }
        Ok(())
    }
}

/// Passages that embedded successfully, in input order, and the ones skipped.
#[derive(Debug, Default)]
pub struct EmbeddedPassages {
    pub passages: Vec<Passage>,
    pub vectors: Vec<Vector>,
    pub failures: Vec<(PassageId, String)>,
}

impl EmbeddedPassages {
    fn push(&mut self, embedder: &dyn Embedder, passage: &Passage, vector: Vector) -> Result<()> {
        if vector.len() != embedder.dim() {
            return Err(Error::DimensionMismatch { id: passage.id.clone(), expected: embedder.dim(), actual: vector.len() });
        }
        self.passages.push(passage.clone());
        self.vectors.push(vector);
        Ok(())
    }
}

/// Embeds `passages` in batches of `batch_size`.
///
/// A batch that fails with `Error::Encoding` is retried one passage at a
/// time so a single bad passage only costs itself; those are logged, counted
/// in `budget` and skipped. Any other error is fatal, as is exceeding the
/// budget.
pub fn embed_passages(
    embedder: &dyn Embedder,
    passages: &[Passage],
    batch_size: usize,
    budget: &mut FailureBudget,
) -> Result<EmbeddedPassages> {
    let mut out = EmbeddedPassages::default();
    for chunk in passages.chunks(batch_size.max(1)) {
        let texts: Vec<String> = chunk.iter().map(|p| p.text.clone()).collect();
        match embedder.embed_batch(&texts) {
            Ok(vectors) => {
                if vectors.len() != chunk.len() {
                    return Err(Error::Encoding(format!("embedder returned {} vectors for {} inputs", vectors.len(), chunk.len())));
                }
                for (passage, vector) in chunk.iter().zip(vectors) {
                    out.push(embedder, passage, vector)?;
                }
                budget.record_success(chunk.len());
            }
            Err(Error::Encoding(msg)) => {
                debug!(error = %msg, size = chunk.len(), "batch failed, retrying passages one by one");
                for passage in chunk {
                    match embedder.embed(&passage.text) {
                        Ok(vector) => {
                            out.push(embedder, passage, vector)?;
                            budget.record_success(1);
                        }
                        Err(Error::Encoding(msg)) => {
                            warn!(passage_id = %passage.id, error = %msg, "⚠️  skipping passage");
                            out.failures.push((passage.id.clone(), msg));
                            budget.record_failure();
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
            Err(e) => return Err(e),
        }
        budget.check(false)?;
    }
    Ok(out)
}
