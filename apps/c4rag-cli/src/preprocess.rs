//! `c4rag preprocess`: corpus → passages → embeddings → passage store and
//! BM25 index.
//!
//! Work is flushed at document boundaries once a batch worth of passages is
//! pending, so an interrupted run can continue with `--resume`.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use c4rag_core::config::Settings;
use c4rag_core::corpus::CorpusLoader;
use c4rag_core::preprocess::Preprocessor;
use c4rag_core::traits::Embedder;
use c4rag_core::types::Passage;
use c4rag_embed::{embed_passages, FailureBudget};
use c4rag_text::PassageTextIndexer;
use c4rag_vector::store::{META_DOCUMENTS, META_PASSAGES};
use c4rag_vector::{PassageStore, StoreManifest};

use crate::{tantivy_dir, Stage};

#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    pub dump_path: PathBuf,
    pub output_dir: PathBuf,
    pub resume: bool,
    /// Stop after this many new documents.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub documents: usize,
    /// Documents already in the store from an earlier run.
    pub resumed_documents: usize,
    pub duplicate_documents: usize,
    pub passages: usize,
    pub failed_passages: usize,
}

struct Sink<'a> {
    embedder: &'a dyn Embedder,
    batch_size: usize,
    budget: FailureBudget,
    store: PassageStore,
    text: PassageTextIndexer,
    pending: Vec<Passage>,
}

impl Sink<'_> {
    async fn flush(&mut self, summary: &mut PreprocessSummary) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending);
        let embedded = embed_passages(self.embedder, &pending, self.batch_size, &mut self.budget).context(Stage::Embedding)?;
        self.store.append(&embedded.passages, &embedded.vectors).await.context(Stage::Store)?;
        self.text.add(&embedded.passages).context(Stage::TextIndex)?;
        self.text.commit().context(Stage::TextIndex)?;
        summary.passages += embedded.passages.len();
        summary.failed_passages += embedded.failures.len();
        Ok(())
    }
}

pub async fn preprocess(settings: &Settings, embedder: Arc<dyn Embedder>, opts: &PreprocessOptions) -> Result<PreprocessSummary> {
    let loader = CorpusLoader::open(&opts.dump_path, settings.corpus.format)
        .with_context(|| format!("opening {}", opts.dump_path.display()))
        .context(Stage::CorpusLoad)?;
    let preprocessor = Preprocessor::new(settings.chunking.clone(), &settings.corpus).context(Stage::Config)?;
    let manifest = StoreManifest::new(embedder.embedder_id(), embedder.dim(), &settings.chunking, settings.corpus.normalize);
    info!(dump = %opts.dump_path.display(), format = ?loader.format(), output = %opts.output_dir.display(), resume = opts.resume, "preprocessing corpus");

    let store = if opts.resume {
        PassageStore::resume(&opts.output_dir, &manifest).await
    } else {
        PassageStore::create(&opts.output_dir, &manifest).await
    }
    .context(Stage::Store)?;

    // The BM25 index is derived from the store: rebuild it from whatever an
    // earlier run left behind before appending.
    let mut text = PassageTextIndexer::create(&tantivy_dir(&opts.output_dir)).context(Stage::TextIndex)?;
    let done: HashSet<String> = if opts.resume {
        let stored = store.load().await.context(Stage::Store)?;
        text.add(&stored.passages).context(Stage::TextIndex)?;
        text.commit().context(Stage::TextIndex)?;
        store.completed_document_ids().await.context(Stage::Store)?
    } else {
        HashSet::new()
    };
    if !done.is_empty() {
        info!(documents = done.len(), "resuming after completed documents");
    }

    let mut sink = Sink {
        embedder: embedder.as_ref(),
        batch_size: settings.embedding.batch_size,
        budget: FailureBudget::from_config(&settings.embedding),
        store,
        text,
        pending: Vec::new(),
    };
    let flush_at = settings.embedding.batch_size.max(1) * 8;

    let pb = match opts.limit {
        Some(limit) => ProgressBar::new(limit as u64),
        None => ProgressBar::new_spinner(),
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos} documents {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut summary = PreprocessSummary::default();
    let mut seen = HashSet::new();
    let documents = loader.documents().context(Stage::CorpusLoad)?;
    for processed in preprocessor.process(documents) {
        let processed = processed.context(Stage::CorpusLoad)?;
        let doc_id = processed.document.id.clone();
        if done.contains(&doc_id) {
            summary.resumed_documents += 1;
            continue;
        }
        if !seen.insert(doc_id.clone()) {
            warn!(doc_id = %doc_id, "⚠️  duplicate document id, keeping the first occurrence");
            summary.duplicate_documents += 1;
            continue;
        }
        if opts.limit.is_some_and(|limit| summary.documents >= limit) {
            break;
        }
        sink.pending.extend(processed.passages);
        summary.documents += 1;
        pb.inc(1);
        if sink.pending.len() >= flush_at {
            pb.set_message(format!("{} passages", summary.passages + sink.pending.len()));
            sink.flush(&mut summary).await?;
        }
    }
    sink.flush(&mut summary).await?;
    sink.budget.check(true).context(Stage::Embedding)?;
    pb.finish_and_clear();

    let total_docs = sink.store.completed_document_ids().await.context(Stage::Store)?.len();
    let total_passages = sink.store.count_passages().await.context(Stage::Store)?;
    sink.store.set_meta(META_DOCUMENTS, &total_docs.to_string()).await.context(Stage::Store)?;
    sink.store.set_meta(META_PASSAGES, &total_passages.to_string()).await.context(Stage::Store)?;

    info!(
        documents = summary.documents,
        resumed = summary.resumed_documents,
        passages = summary.passages,
        failed = summary.failed_passages,
        store_documents = total_docs,
        store_passages = total_passages,
        "✅ preprocessing complete"
    );
    if summary.failed_passages > 0 {
        warn!(failed = summary.failed_passages, rate = sink.budget.rate(), "some passages could not be embedded and were skipped");
    }
    Ok(summary)
}
