//! In-memory vector index over passage embeddings.
//!
//! Built once from the passage store, then queried read-only. Cosine
//! vectors are normalized at build time so every score is a dot product.

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use c4rag_core::config::{IndexBackend, IndexConfig, SimilarityMetric};
use c4rag_core::error::{Error, Result};
use c4rag_core::types::{PassageId, SearchHit, SourceKind, Vector};

use crate::ivf::IvfLists;
use crate::metric;

/// Where a vector came from inside its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassageMeta {
	pub document_id: String,
	pub start_offset: usize,
	pub end_offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
	pub passage_id: PassageId,
	pub vector: Vector,
	pub metadata: PassageMeta,
}

#[derive(Debug, Default)]
struct Contents {
	dim: usize,
	entries: Vec<IndexEntry>,
	positions: HashMap<PassageId, usize>,
	ivf: Option<IvfLists>,
}

#[derive(Debug)]
pub struct VectorIndex {
	config: IndexConfig,
	contents: Option<Contents>,
}

impl VectorIndex {
	pub fn new(config: IndexConfig) -> Result<Self> {
		config.validate()?;
		Ok(Self { config, contents: None })
	}

	pub fn config(&self) -> &IndexConfig { &self.config }

	pub fn metric(&self) -> SimilarityMetric { self.config.metric }

	pub fn len(&self) -> usize { self.contents.as_ref().map_or(0, |c| c.entries.len()) }

	pub fn is_empty(&self) -> bool { self.len() == 0 }

	/// Vector length of the built contents, if any.
	pub fn dim(&self) -> Option<usize> { self.contents.as_ref().filter(|c| !c.entries.is_empty()).map(|c| c.dim) }

	pub fn get(&self, passage_id: &str) -> Option<&IndexEntry> {
		let contents = self.contents.as_ref()?;
		contents.positions.get(passage_id).map(|&i| &contents.entries[i])
	}

	/// Replace the index contents with `entries`.
	///
	/// Everything is validated before anything is swapped in: on error the
	/// previous contents remain searchable.
	pub fn build(&mut self, entries: Vec<IndexEntry>) -> Result<()> {
		let dim = self.config.dimension.or_else(|| entries.first().map(|e| e.vector.len())).unwrap_or(0);
		let mut seen = HashSet::with_capacity(entries.len());
		for entry in &entries {
			if entry.vector.len() != dim {
				return Err(Error::DimensionMismatch { id: entry.passage_id.clone(), expected: dim, actual: entry.vector.len() });
			}
			if !seen.insert(entry.passage_id.as_str()) {
				return Err(Error::DuplicatePassage(entry.passage_id.clone()));
			}
		}

		let metric = self.config.metric;
		let entries: Vec<IndexEntry> = entries
			.into_iter()
			.map(|e| IndexEntry { vector: metric::prepare(metric, e.vector), ..e })
			.collect();
		let positions = entries.iter().enumerate().map(|(i, e)| (e.passage_id.clone(), i)).collect();
		let ivf = match self.config.backend {
			IndexBackend::Ivf if !entries.is_empty() => {
				let vectors: Vec<Vector> = entries.iter().map(|e| e.vector.clone()).collect();
				let lists = IvfLists::train(&vectors, &self.config.ivf);
				debug!(nlist = lists.nlist(), "trained ivf lists");
				Some(lists)
			}
			_ => None,
		};
		info!(entries = entries.len(), dim, backend = ?self.config.backend, "vector index built");
		self.contents = Some(Contents { dim, entries, positions, ivf });
		Ok(())
	}

	fn contents(&self) -> Result<&Contents> {
		match &self.contents {
			Some(c) if !c.entries.is_empty() => Ok(c),
			_ => Err(Error::IndexEmpty),
		}
	}

	fn prepare_query(&self, contents: &Contents, query: &[f32]) -> Result<Vector> {
		if query.len() != contents.dim {
			return Err(Error::DimensionMismatch { id: "<query>".into(), expected: contents.dim, actual: query.len() });
		}
		Ok(metric::prepare(self.config.metric, query.to_vec()))
	}

	/// Top `top_k` entries by similarity, ties broken by passage id.
	pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
		let contents = self.contents()?;
		let q = self.prepare_query(contents, query)?;
		if top_k == 0 { return Ok(Vec::new()); }
		let positions: Vec<usize> = match &contents.ivf {
			Some(ivf) => ivf.candidates(&q, top_k),
			None => (0..contents.entries.len()).collect(),
		};
		Ok(self.rank(contents, &q, positions, top_k))
	}

	/// Exact search regardless of the configured backend.
	pub fn search_exact(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
		let contents = self.contents()?;
		let q = self.prepare_query(contents, query)?;
		if top_k == 0 { return Ok(Vec::new()); }
		Ok(self.rank(contents, &q, (0..contents.entries.len()).collect(), top_k))
	}

	/// Scores the given candidates exactly and keeps the best `top_k`.
	/// Unknown and repeated ids are skipped.
	pub fn rerank<'a, I>(&self, query: &[f32], candidate_ids: I, top_k: usize) -> Result<Vec<SearchHit>>
	where
		I: IntoIterator<Item = &'a str>,
	{
		let contents = self.contents()?;
		let q = self.prepare_query(contents, query)?;
		if top_k == 0 { return Ok(Vec::new()); }
		let mut seen = HashSet::new();
		let positions: Vec<usize> = candidate_ids
			.into_iter()
			.filter_map(|id| contents.positions.get(id).copied())
			.filter(|&i| seen.insert(i))
			.collect();
		Ok(self.rank(contents, &q, positions, top_k))
	}

	/// Fraction of the exact top-`k` neighbours the configured backend finds,
	/// pooled over `queries`.
	pub fn recall_against_exact(&self, queries: &[Vector], k: usize) -> Result<f64> {
		let mut expected = 0usize;
		let mut found = 0usize;
		for q in queries {
			let exact: HashSet<PassageId> = self.search_exact(q, k)?.into_iter().map(|h| h.id).collect();
			let approx = self.search(q, k)?;
			expected += exact.len();
			found += approx.iter().filter(|h| exact.contains(&h.id)).count();
		}
		if expected == 0 { return Ok(1.0); }
		Ok(found as f64 / expected as f64)
	}

	fn rank(&self, contents: &Contents, q: &[f32], positions: Vec<usize>, top_k: usize) -> Vec<SearchHit> {
		let mut hits: Vec<SearchHit> = positions
			.into_iter()
			.map(|i| {
				let entry = &contents.entries[i];
				SearchHit { id: entry.passage_id.clone(), score: metric::score(self.config.metric, q, &entry.vector), source: SourceKind::Vector }
			})
			.collect();
		hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
		hits.truncate(top_k);
		hits
	}
}
