//! Library side of the `c4rag` binary: the two pipelines it drives, kept
//! here so they can be exercised end to end from tests.

use std::fmt;
use std::path::{Path, PathBuf};

pub mod experiment;
pub mod preprocess;

pub use experiment::{run_experiment, ExperimentOptions};
pub use preprocess::{preprocess, PreprocessOptions, PreprocessSummary};

/// Pipeline stage named in fatal error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    CorpusLoad,
    Embedding,
    Store,
    TextIndex,
    IndexBuild,
    QueryLoad,
    Retrieval,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "configuration",
            Stage::CorpusLoad => "corpus load",
            Stage::Embedding => "embedding",
            Stage::Store => "passage store",
            Stage::TextIndex => "text indexing",
            Stage::IndexBuild => "index build",
            Stage::QueryLoad => "query set load",
            Stage::Retrieval => "retrieval",
            Stage::Report => "report writing",
        };
        write!(f, "error during {}", name)
    }
}

pub fn tantivy_dir(store_dir: &Path) -> PathBuf {
    store_dir.join("tantivy")
}
