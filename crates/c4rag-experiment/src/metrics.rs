use serde::{Deserialize, Serialize};

use c4rag_core::types::QueryResult;

use crate::queries::EvalQuery;

/// Rank (1-based) of the first passage that answers `query`, if any.
///
/// A passage answers when its id is among the relevant ids, or its text
/// contains one of the answer strings, ignoring case.
pub fn first_hit_rank(query: &EvalQuery, result: &QueryResult) -> Option<usize> {
    let answers: Vec<String> = query.answers.iter().map(|a| a.to_lowercase()).collect();
    result
        .hits
        .iter()
        .position(|hit| {
            query.relevant_passage_ids.iter().any(|id| id == &hit.passage.id) || {
                let text = hit.passage.text.to_lowercase();
                answers.iter().any(|a| text.contains(a.as_str()))
            }
        })
        .map(|i| i + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Recall,
    Mrr,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Recall, Metric::Mrr];

    pub fn name(&self, k: usize) -> String {
        match self {
            Metric::Recall => format!("recall@{}", k),
            Metric::Mrr => format!("mrr@{}", k),
        }
    }

    /// Mean over a (re)sample of per-query first-hit ranks.
    pub fn compute<'a, I>(&self, ranks: I) -> f64
    where
        I: IntoIterator<Item = &'a Option<usize>>,
    {
        let mut total = 0.0;
        let mut n = 0usize;
        for rank in ranks {
            n += 1;
            total += match (self, rank) {
                (_, None) => 0.0,
                (Metric::Recall, Some(_)) => 1.0,
                (Metric::Mrr, Some(r)) => 1.0 / *r as f64,
            };
        }
        if n == 0 { 0.0 } else { total / n as f64 }
    }
}

/// Spread of one metric across bootstrap samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric_name: String,
    pub samples: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub p2_5: f64,
    pub p97_5: f64,
}

impl MetricSummary {
    pub fn from_values(metric_name: String, values: &[f64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self { metric_name, samples: 0, mean: 0.0, std_dev: 0.0, p2_5: 0.0, p97_5: 0.0 };
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Self {
            metric_name,
            samples: n,
            mean,
            std_dev: var.sqrt(),
            p2_5: percentile(&sorted, 2.5),
            p97_5: percentile(&sorted, 97.5),
        }
    }
}

/// Linear interpolation between closest ranks; `sorted` must be ascending
/// and non-empty.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let pos = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
