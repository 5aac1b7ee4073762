//! c4rag-experiment
//!
//! Runs a labelled query set through a retriever, scores recall@k and
//! mrr@k (optionally over bootstrap resamples) and writes the JSON report.

pub mod metrics;
pub mod queries;
pub mod report;
pub mod runner;

pub use metrics::{Metric, MetricSummary};
pub use queries::{load_queries, EvalQuery};
pub use report::{artifact_file_name, ExperimentReport};
pub use runner::{ExperimentOutcome, ExperimentPlan, ExperimentRunner};
