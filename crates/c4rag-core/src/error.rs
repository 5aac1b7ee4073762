use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Corpus format error in {path} at line {line}: {message}")]
    CorpusFormat { path: String, line: usize, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Dimension mismatch for '{id}': expected {expected}, got {actual}")]
    DimensionMismatch { id: String, expected: usize, actual: usize },

    #[error("Vector index is empty; build it before searching")]
    IndexEmpty,

    #[error("Duplicate passage id '{0}' in index build")]
    DuplicatePassage(String),

    #[error("Text search failed: {0}")]
    TextSearch(String),

    #[error("Query set error at line {line}: {message}")]
    QuerySet { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
