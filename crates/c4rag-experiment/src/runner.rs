use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use c4rag_core::error::{Error, Result};
use c4rag_core::traits::Retriever;
use c4rag_core::types::ScoreRecord;

use crate::metrics::{first_hit_rank, Metric, MetricSummary};
use crate::queries::EvalQuery;

/// What to run: experiment name, cut-off, and resampling.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentPlan {
    pub name: String,
    pub top_k: usize,
    /// 0 evaluates once on the full query set.
    pub bootstrap_count: usize,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    pub records: Vec<ScoreRecord>,
    /// Per-metric spread over the bootstrap samples; empty without resampling.
    pub summary: Vec<MetricSummary>,
    /// First-hit rank per query, in query order.
    pub ranks: Vec<Option<usize>>,
}

pub struct ExperimentRunner {
    plan: ExperimentPlan,
}

impl ExperimentRunner {
    pub fn new(plan: ExperimentPlan) -> Result<Self> {
        if plan.name.trim().is_empty() || plan.name.contains(['/', '\\']) {
            return Err(Error::InvalidConfig(format!("experiment name '{}' must be a non-empty file name", plan.name)));
        }
        if plan.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be greater than 0".into()));
        }
        Ok(Self { plan })
    }

    pub fn plan(&self) -> &ExperimentPlan {
        &self.plan
    }

    pub fn run(&self, retriever: &dyn Retriever, queries: &[EvalQuery]) -> Result<ExperimentOutcome> {
        if queries.is_empty() {
            return Err(Error::InvalidConfig("query set is empty".into()));
        }
        let k = self.plan.top_k;
        info!(experiment = %self.plan.name, retriever = retriever.name(), queries = queries.len(), top_k = k, "running experiment");

        let pb = ProgressBar::new(queries.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} queries {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        let mut ranks = Vec::with_capacity(queries.len());
        for q in queries {
            let result = retriever.retrieve_with_context(&q.query, q.irrelevant_document.as_deref(), k)?;
            let rank = first_hit_rank(q, &result);
            debug!(query_id = %q.id, ?rank, "judged");
            ranks.push(rank);
            pb.inc(1);
        }
        pb.finish_and_clear();

        let mut records = Vec::new();
        let mut summary = Vec::new();
        if self.plan.bootstrap_count == 0 {
            for metric in Metric::ALL {
                records.push(self.record(metric, metric.compute(&ranks), None));
            }
        } else {
            let n = ranks.len();
            let mut rng = StdRng::seed_from_u64(self.plan.seed);
            let mut values: Vec<Vec<f64>> = vec![Vec::with_capacity(self.plan.bootstrap_count); Metric::ALL.len()];
            for sample in 0..self.plan.bootstrap_count {
                let resample: Vec<Option<usize>> = (0..n).map(|_| ranks[rng.gen_range(0..n)]).collect();
                for (m, metric) in Metric::ALL.iter().enumerate() {
                    let value = metric.compute(&resample);
                    values[m].push(value);
                    records.push(self.record(*metric, value, Some(sample)));
                }
            }
            for (metric, vals) in Metric::ALL.iter().zip(&values) {
                summary.push(MetricSummary::from_values(metric.name(k), vals));
            }
        }
        for s in &summary {
            info!(metric = %s.metric_name, mean = s.mean, std_dev = s.std_dev, p2_5 = s.p2_5, p97_5 = s.p97_5, "bootstrap summary");
        }
        if summary.is_empty() {
            for r in &records {
                info!(metric = %r.metric_name, value = r.value, "score");
            }
        }
        Ok(ExperimentOutcome { records, summary, ranks })
    }

    fn record(&self, metric: Metric, value: f64, sample: Option<usize>) -> ScoreRecord {
        ScoreRecord {
            experiment_name: self.plan.name.clone(),
            bootstrap_count: self.plan.bootstrap_count,
            metric_name: metric.name(self.plan.top_k),
            value,
            sample,
        }
    }
}
