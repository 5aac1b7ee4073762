use anyhow::Result;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, TantivyDocument};
use tracing::debug;

use c4rag_core::types::{Passage, SearchHit, SourceKind};

use crate::tantivy_utils::{build_schema, register_tokenizer};

const WRITER_HEAP: usize = 50_000_000;

#[derive(Clone, Copy)]
struct Fields {
	id: Field,
	document_id: Field,
	text: Field,
	title: Field,
}

impl Fields {
	fn resolve(index: &Index) -> Result<Self> {
		let schema = index.schema();
		Ok(Self {
			id: schema.get_field("id")?,
			document_id: schema.get_field("document_id")?,
			text: schema.get_field("text")?,
			title: schema.get_field("title")?,
		})
	}
}

/// Writes passages into a BM25 index. Nothing is visible to searchers
/// until [`PassageTextIndexer::commit`].
pub struct PassageTextIndexer {
	writer: IndexWriter,
	fields: Fields,
}

impl PassageTextIndexer {
	/// Recreates `index_dir` from scratch.
	pub fn create(index_dir: &Path) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		Self::from_index(Index::create_in_dir(index_dir, build_schema())?)
	}

	fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let fields = Fields::resolve(&index)?;
		let writer = index.writer(WRITER_HEAP)?;
		Ok(Self { writer, fields })
	}

	pub fn add(&mut self, passages: &[Passage]) -> Result<()> {
		for p in passages {
			self.writer.add_document(doc!(
				self.fields.id => p.id.clone(),
				self.fields.document_id => p.document_id.clone(),
				self.fields.text => p.text.clone(),
				self.fields.title => p.title.clone(),
			))?;
		}
		Ok(())
	}

	pub fn commit(&mut self) -> Result<()> {
		self.writer.commit()?;
		Ok(())
	}
}

/// BM25 search over passage text and titles.
pub struct Bm25Searcher {
	index: Index,
	reader: IndexReader,
	fields: Fields,
}

impl Bm25Searcher {
	pub fn open(index_dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(index_dir)?;
		Self::from_index(index)
	}

	/// An in-memory index over `passages`; used for small corpora and tests.
	pub fn in_memory(passages: &[Passage]) -> Result<Self> {
		let index = Index::create_in_ram(build_schema());
		register_tokenizer(&index);
		let fields = Fields::resolve(&index)?;
		let mut writer: IndexWriter = index.writer(WRITER_HEAP)?;
		for p in passages {
			writer.add_document(doc!(
				fields.id => p.id.clone(),
				fields.document_id => p.document_id.clone(),
				fields.text => p.text.clone(),
				fields.title => p.title.clone(),
			))?;
		}
		writer.commit()?;
		Self::from_index(index)
	}

	fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let fields = Fields::resolve(&index)?;
		let reader = index.reader()?;
		Ok(Self { index, reader, fields })
	}

	pub fn num_passages(&self) -> u64 {
		self.reader.searcher().num_docs()
	}

	/// Top `k` passages by BM25, ties broken by passage id ascending.
	/// Query syntax errors are tolerated: the parsable part is searched.
	pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
		if k == 0 { return Ok(Vec::new()); }
		let searcher = self.reader.searcher();
		let qp = QueryParser::for_index(&self.index, vec![self.fields.text, self.fields.title]);
		let (q, errors) = qp.parse_query_lenient(query);
		if !errors.is_empty() { debug!(query, errors = errors.len(), "lenient query parse"); }
		// equal scores come back in segment order; widen until the tie at rank k is complete
		let mut limit = k;
		let top_docs = loop {
			let top_docs = searcher.search(&q, &TopDocs::with_limit(limit))?;
			if top_docs.len() < limit || top_docs[limit - 1].0 < top_docs[k - 1].0 { break top_docs; }
			limit *= 2;
		};
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let id = doc.get_first(self.fields.id).and_then(|v| v.as_str()).unwrap_or("").to_string();
			hits.push(SearchHit { id, score, source: SourceKind::Text });
		}
		hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
		hits.truncate(k);
		Ok(hits)
	}
}
