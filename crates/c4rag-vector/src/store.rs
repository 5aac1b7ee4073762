//! The on-disk passage store.
//!
//! `<root>/lance` holds the `passages` table (passage fields plus the
//! embedding) and the `meta` key/value table describing how it was built.
//! Rows are appended whole documents at a time, so the set of document ids
//! present doubles as the resume checkpoint.

use anyhow::{anyhow, bail, Context, Result};
use arrow_array::cast::AsArray;
use arrow_array::{FixedSizeListArray, Int32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::Connection;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use c4rag_core::config::ChunkingConfig;
use c4rag_core::error::Error;
use c4rag_core::types::{Passage, Vector};

use crate::index::{IndexEntry, PassageMeta};
use crate::schema::{build_passages_schema, META_TABLE, PASSAGES_TABLE};
use crate::table::{ensure_table, get_meta, open_db, set_meta, table_exists};

pub const META_EMBEDDER_ID: &str = "embedder_id";
pub const META_DIMENSION: &str = "dimension";
pub const META_FINGERPRINT: &str = "fingerprint";
pub const META_DOCUMENTS: &str = "documents";
pub const META_PASSAGES: &str = "passages";

/// Identity of the embedding and chunking setup a store was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreManifest {
	pub embedder_id: String,
	pub dimension: usize,
	pub fingerprint: String,
}

impl StoreManifest {
	pub fn new(embedder_id: &str, dimension: usize, chunking: &ChunkingConfig, normalize: bool) -> Self {
		let mut hasher = blake3::Hasher::new();
		hasher.update(embedder_id.as_bytes());
		hasher.update(format!("|dim={}|size={}|overlap={}|mode={:?}|normalize={}", dimension, chunking.chunk_size, chunking.overlap, chunking.mode, normalize).as_bytes());
		Self { embedder_id: embedder_id.to_string(), dimension, fingerprint: hasher.finalize().to_hex().to_string() }
	}
}

/// Everything needed to serve queries from a store.
#[derive(Debug, Default)]
pub struct StoredPassages {
	pub passages: Vec<Passage>,
	pub entries: Vec<IndexEntry>,
}

pub struct PassageStore {
	db: Connection,
	dim: usize,
}

impl PassageStore {
	pub fn lance_dir(root: &Path) -> PathBuf { root.join("lance") }

	/// Fresh store under `root`, discarding any previous one.
	pub async fn create(root: &Path, manifest: &StoreManifest) -> Result<Self> {
		let dir = Self::lance_dir(root);
		if dir.exists() {
			std::fs::remove_dir_all(&dir).with_context(|| format!("removing old store at {}", dir.display()))?;
		}
		std::fs::create_dir_all(&dir)?;
		let db = open_db(&dir.to_string_lossy()).await?;
		ensure_table(&db, PASSAGES_TABLE, build_passages_schema(manifest.dimension)).await?;
		set_meta(&db, META_TABLE, META_EMBEDDER_ID, &manifest.embedder_id).await?;
		set_meta(&db, META_TABLE, META_DIMENSION, &manifest.dimension.to_string()).await?;
		set_meta(&db, META_TABLE, META_FINGERPRINT, &manifest.fingerprint).await?;
		info!(dir = %dir.display(), embedder = %manifest.embedder_id, "created passage store");
		Ok(Self { db, dim: manifest.dimension })
	}

	/// Reopen a store to continue an interrupted build; creates it if absent.
	/// A store built with a different setup is rejected.
	pub async fn resume(root: &Path, manifest: &StoreManifest) -> Result<Self> {
		let dir = Self::lance_dir(root);
		if !dir.exists() {
			return Self::create(root, manifest).await;
		}
		let db = open_db(&dir.to_string_lossy()).await?;
		if !table_exists(&db, PASSAGES_TABLE).await? {
			drop(db);
			return Self::create(root, manifest).await;
		}
		let stored = get_meta(&db, META_TABLE, META_FINGERPRINT).await?;
		if stored.as_deref() != Some(manifest.fingerprint.as_str()) {
			return Err(Error::InvalidConfig(format!(
				"store at {} was built with different chunking or embedding settings; rerun without --resume",
				root.display()
			))
			.into());
		}
		Ok(Self { db, dim: manifest.dimension })
	}

	/// Open an existing store for reading.
	pub async fn open(root: &Path) -> Result<Self> {
		let dir = Self::lance_dir(root);
		if !dir.exists() {
			bail!("no passage store at {}; run preprocess first", root.display());
		}
		let db = open_db(&dir.to_string_lossy()).await?;
		let dim = get_meta(&db, META_TABLE, META_DIMENSION)
			.await?
			.ok_or_else(|| anyhow!("store at {} has no dimension recorded", root.display()))?
			.parse::<usize>()
			.context("parsing stored dimension")?;
		Ok(Self { db, dim })
	}

	pub fn dim(&self) -> usize { self.dim }

	pub async fn manifest(&self) -> Result<StoreManifest> {
		let embedder_id = self.get_meta(META_EMBEDDER_ID).await?.unwrap_or_default();
		let fingerprint = self.get_meta(META_FINGERPRINT).await?.unwrap_or_default();
		Ok(StoreManifest { embedder_id, dimension: self.dim, fingerprint })
	}

	pub async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
		set_meta(&self.db, META_TABLE, key, value).await
	}

	pub async fn get_meta(&self, key: &str) -> Result<Option<String>> {
		get_meta(&self.db, META_TABLE, key).await
	}

	/// Append passages and their vectors as one batch.
	pub async fn append(&self, passages: &[Passage], vectors: &[Vector]) -> Result<()> {
		if passages.is_empty() { return Ok(()); }
		if passages.len() != vectors.len() {
			bail!("{} passages but {} vectors", passages.len(), vectors.len());
		}
		let record_batch = self.to_record_batch(passages, vectors)?;
		let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		self.db.open_table(PASSAGES_TABLE).execute().await?.add(reader).execute().await?;
		debug!(rows = passages.len(), "appended passages");
		Ok(())
	}

	pub async fn count_passages(&self) -> Result<usize> {
		Ok(self.db.open_table(PASSAGES_TABLE).execute().await?.count_rows(None).await?)
	}

	/// Document ids with passages in the store.
	pub async fn completed_document_ids(&self) -> Result<HashSet<String>> {
		let t = self.db.open_table(PASSAGES_TABLE).execute().await?;
		let mut stream = t.query().select(Select::columns(&["document_id"])).execute().await?;
		let mut out = HashSet::new();
		while let Some(batch) = stream.try_next().await? {
			let col = string_column(&batch, "document_id")?;
			for i in 0..batch.num_rows() { out.insert(col.value(i).to_string()); }
		}
		Ok(out)
	}

	/// Stream every row back, batch by batch.
	pub async fn load(&self) -> Result<StoredPassages> {
		let t = self.db.open_table(PASSAGES_TABLE).execute().await?;
		let mut stream = t.query().execute().await?;
		let mut out = StoredPassages::default();
		while let Some(batch) = stream.try_next().await? {
			let ids = string_column(&batch, "id")?;
			let doc_ids = string_column(&batch, "document_id")?;
			let titles = string_column(&batch, "title")?;
			let texts = string_column(&batch, "text")?;
			let starts = typed_column::<Int64Array>(&batch, "start_offset")?;
			let ends = typed_column::<Int64Array>(&batch, "end_offset")?;
			let chunk_indices = typed_column::<Int32Array>(&batch, "chunk_index")?;
			let totals = typed_column::<Int32Array>(&batch, "total_chunks")?;
			let vectors = typed_column::<FixedSizeListArray>(&batch, "vector")?;
			for i in 0..batch.num_rows() {
				let passage = Passage {
					id: ids.value(i).to_string(),
					document_id: doc_ids.value(i).to_string(),
					title: titles.value(i).to_string(),
					text: texts.value(i).to_string(),
					start_offset: starts.value(i) as usize,
					end_offset: ends.value(i) as usize,
					chunk_index: chunk_indices.value(i) as usize,
					total_chunks: totals.value(i) as usize,
				};
				let vector = vectors.value(i).as_primitive::<arrow_array::types::Float32Type>().values().to_vec();
				out.entries.push(IndexEntry {
					passage_id: passage.id.clone(),
					vector,
					metadata: PassageMeta { document_id: passage.document_id.clone(), start_offset: passage.start_offset, end_offset: passage.end_offset },
				});
				out.passages.push(passage);
			}
		}
		info!(passages = out.passages.len(), "loaded passage store");
		Ok(out)
	}

	fn to_record_batch(&self, passages: &[Passage], vectors: &[Vector]) -> Result<RecordBatch> {
		let schema = build_passages_schema(self.dim);
		let mut rows: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(vectors.len());
		for (p, v) in passages.iter().zip(vectors) {
			if v.len() != self.dim {
				return Err(Error::DimensionMismatch { id: p.id.clone(), expected: self.dim, actual: v.len() }.into());
			}
			rows.push(Some(v.iter().map(|&x| Some(x)).collect()));
		}
		let record_batch = RecordBatch::try_new(schema, vec![
			Arc::new(StringArray::from_iter_values(passages.iter().map(|p| p.id.as_str()))),
			Arc::new(StringArray::from_iter_values(passages.iter().map(|p| p.document_id.as_str()))),
			Arc::new(StringArray::from_iter_values(passages.iter().map(|p| p.title.as_str()))),
			Arc::new(StringArray::from_iter_values(passages.iter().map(|p| p.text.as_str()))),
			Arc::new(Int64Array::from_iter_values(passages.iter().map(|p| p.start_offset as i64))),
			Arc::new(Int64Array::from_iter_values(passages.iter().map(|p| p.end_offset as i64))),
			Arc::new(Int32Array::from_iter_values(passages.iter().map(|p| p.chunk_index as i32))),
			Arc::new(Int32Array::from_iter_values(passages.iter().map(|p| p.total_chunks as i32))),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(rows.into_iter(), self.dim as i32)),
		])?;
		Ok(record_batch)
	}
}

fn typed_column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<T>())
		.ok_or_else(|| anyhow!("passages.{} column missing", name))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	typed_column::<StringArray>(batch, name)
}
