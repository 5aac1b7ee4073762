//! Domain types shared by the loader, chunker, engines and experiment runner.

use serde::{Deserialize, Serialize};

pub type PassageId = String;
pub type Vector = Vec<f32>;

/// One record of the source corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
}

/// A bounded span of a document and the unit of retrieval.
///
/// - `id`: `"<document_id>:<start_offset>"`, unique within a corpus
/// - `start_offset`/`end_offset`: half-open character range into the
///   (normalized) document text
/// - `chunk_index`/`total_chunks`: position within the parent document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub id: PassageId,
    pub document_id: String,
    pub title: String,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

impl Passage {
    pub fn make_id(document_id: &str, start_offset: usize) -> PassageId {
        format!("{}:{}", document_id, start_offset)
    }

    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
    Random,
}

/// The minimal surface returned by all engines.
///
/// `id` matches `Passage::id`. `score` is engine-specific but
/// higher is always better. `source` labels the origin engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: PassageId,
    pub score: f32,
    pub source: SourceKind,
}

/// A passage paired with the score it was retrieved with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

/// Ranked answer to one query: descending by score, no duplicate ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub hits: Vec<ScoredPassage>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn passage_ids(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|h| h.passage.id.as_str())
    }

    /// Passage texts joined by newlines, as handed to a reader model.
    pub fn to_text(&self) -> String {
        self.hits
            .iter()
            .map(|h| h.passage.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One metric value of one experiment (re)sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub experiment_name: String,
    pub bootstrap_count: usize,
    pub metric_name: String,
    pub value: f64,
    /// Bootstrap sample index; `None` for the unsampled evaluation.
    pub sample: Option<usize>,
}
