use crate::error::Result;
use crate::types::{QueryResult, Vector};

/// Maps text to fixed-dimension dense vectors.
///
/// Every returned vector has exactly `dim()` elements. Empty or
/// whitespace-only text maps to the zero vector; malformed text fails with
/// `Error::Encoding`.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model and its dimensionality.
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>>;

    fn embed(&self, text: &str) -> Result<Vector> {
        let mut out = self.embed_batch(&[text.to_string()])?;
        out.pop()
            .ok_or_else(|| crate::error::Error::Encoding("embedder returned no vector".into()))
    }
}

pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;

    fn retrieve(&self, query: &str, top_k: usize) -> Result<QueryResult>;

    /// Retrieval with an auxiliary text (e.g. a known-irrelevant document).
    /// Retrievers that have no use for it ignore it.
    fn retrieve_with_context(
        &self,
        query: &str,
        _context: Option<&str>,
        top_k: usize,
    ) -> Result<QueryResult> {
        self.retrieve(query, top_k)
    }
}
