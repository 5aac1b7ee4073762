//! `c4rag run_experiment`: load a preprocessed store, build the configured
//! retriever and score a query set against it.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use c4rag_core::config::{IndexConfig, RetrievalStrategy, Settings};
use c4rag_core::error::Error;
use c4rag_core::traits::Embedder;
use c4rag_experiment::{load_queries, ExperimentPlan, ExperimentReport, ExperimentRunner};
use c4rag_retrieval::{build_retriever, PassageCatalog, RetrieverParts};
use c4rag_text::Bm25Searcher;
use c4rag_vector::{PassageStore, VectorIndex};

use crate::{tantivy_dir, Stage};

#[derive(Debug, Clone)]
pub struct ExperimentOptions {
    pub name: String,
    pub queries_path: PathBuf,
    pub store_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Runs the experiment and returns the path of the written report.
pub async fn run_experiment(settings: &Settings, embedder: Arc<dyn Embedder>, opts: &ExperimentOptions) -> Result<PathBuf> {
    let queries = load_queries(&opts.queries_path)
        .with_context(|| format!("reading {}", opts.queries_path.display()))
        .context(Stage::QueryLoad)?;
    let runner = ExperimentRunner::new(ExperimentPlan {
        name: opts.name.clone(),
        top_k: settings.retrieval.top_k,
        bootstrap_count: settings.experiment.bootstrap_count,
        seed: settings.experiment.seed,
    })
    .context(Stage::Config)?;

    let store = PassageStore::open(&opts.store_dir).await.context(Stage::Store)?;
    let manifest = store.manifest().await.context(Stage::Store)?;
    if manifest.embedder_id != embedder.embedder_id() {
        let mismatch = format!(
            "store was embedded with '{}' but the configured embedder is '{}'",
            manifest.embedder_id,
            embedder.embedder_id()
        );
        match settings.retrieval.strategy {
            RetrievalStrategy::Bm25 | RetrievalStrategy::Random => warn!("{}", mismatch),
            _ => return Err(Error::InvalidConfig(mismatch)).context(Stage::Config),
        }
    }
    let stored = store.load().await.context(Stage::Store)?;

    let mut index = VectorIndex::new(IndexConfig {
        dimension: settings.index.dimension.or(Some(store.dim())),
        ..settings.index.clone()
    })
    .context(Stage::Config)?;
    index.build(stored.entries).context(Stage::IndexBuild)?;
    let bm25 = Bm25Searcher::open(&tantivy_dir(&opts.store_dir))
        .with_context(|| format!("opening BM25 index under {}", opts.store_dir.display()))
        .context(Stage::IndexBuild)?;

    let parts = RetrieverParts {
        catalog: Arc::new(PassageCatalog::new(stored.passages)),
        embedder,
        index: Arc::new(index),
        bm25: Arc::new(bm25),
    };
    let retriever = build_retriever(&settings.retrieval, parts);
    info!(strategy = retriever.name(), queries = queries.len(), "retriever ready");

    let outcome = runner.run(retriever.as_ref(), &queries).context(Stage::Retrieval)?;
    let report = ExperimentReport::new(runner.plan(), retriever.name(), outcome);
    let path = report.write_to(&opts.output_dir).context(Stage::Report)?;
    Ok(path)
}
