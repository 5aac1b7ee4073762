use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use c4rag_core::error::Result;
use c4rag_core::types::ScoreRecord;

use crate::metrics::MetricSummary;
use crate::runner::{ExperimentOutcome, ExperimentPlan};

/// The JSON artifact of one experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub experiment_name: String,
    pub bootstrap_count: usize,
    pub top_k: usize,
    pub retriever: String,
    pub query_count: usize,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<ScoreRecord>,
    pub summary: Vec<MetricSummary>,
}

impl ExperimentReport {
    pub fn new(plan: &ExperimentPlan, retriever: &str, outcome: ExperimentOutcome) -> Self {
        Self {
            experiment_name: plan.name.clone(),
            bootstrap_count: plan.bootstrap_count,
            top_k: plan.top_k,
            retriever: retriever.to_string(),
            query_count: outcome.ranks.len(),
            generated_at: Utc::now(),
            records: outcome.records,
            summary: outcome.summary,
        }
    }

    pub fn file_name(&self) -> String {
        artifact_file_name(&self.experiment_name, self.bootstrap_count)
    }

    /// Writes `<dir>/scores_<name>-<N>bootstrap.json`, creating `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!(path = %path.display(), records = self.records.len(), "wrote experiment report");
        Ok(path)
    }
}

pub fn artifact_file_name(experiment_name: &str, bootstrap_count: usize) -> String {
    format!("scores_{}-{}bootstrap.json", experiment_name, bootstrap_count)
}
