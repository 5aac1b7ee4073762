//! Typed configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `C4RAG_*` env vars into one validated [`Settings`] value.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Every tunable of the pipeline, validated once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub data: DataConfig,
    pub corpus: CorpusConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub experiment: ExperimentConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding the passage store written by `preprocess`.
    pub store_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { store_dir: "data/store".to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CorpusFormat {
    /// Directory → `TextDir`, anything else → `JsonLines`.
    #[default]
    Auto,
    #[serde(rename = "jsonl")]
    JsonLines,
    TextDir,
}

impl FromStr for CorpusFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "jsonl" | "json_lines" | "jsonlines" => Ok(Self::JsonLines),
            "text_dir" | "txt" => Ok(Self::TextDir),
            other => Err(format!("unknown corpus format '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub format: CorpusFormat,
    /// Normalize whitespace and line endings before chunking.
    pub normalize: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self { format: CorpusFormat::Auto, normalize: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkMode {
    /// Exactly `chunk_size` characters per window.
    #[default]
    Fixed,
    /// Windows shortened to end on whitespace when possible.
    Boundary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows.
    pub overlap: usize,
    pub mode: ChunkMode,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, overlap: 100, mode: ChunkMode::Fixed }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be greater than 0".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// Deterministic hashed bag-of-words; no model files needed.
    #[default]
    Hash,
    /// BGE-M3 (XLM-RoBERTa) weights loaded through candle.
    Bge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    #[default]
    Cpu,
    Metal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub dimension: usize,
    pub model_dir: Option<String>,
    pub device: DeviceKind,
    /// Token budget per passage; longer inputs are truncated.
    pub max_len: usize,
    pub batch_size: usize,
    /// Fraction of failed passages tolerated before preprocessing aborts.
    pub max_failure_rate: f64,
    /// Attempts required before the failure rate is enforced mid-run.
    pub min_failure_samples: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Hash,
            dimension: 384,
            model_dir: None,
            device: DeviceKind::Cpu,
            max_len: 256,
            batch_size: 32,
            max_failure_rate: 0.05,
            min_failure_samples: 100,
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be greater than 0".into()));
        }
        if self.max_len == 0 || self.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.max_len and embedding.batch_size must be greater than 0".into()));
        }
        if !(0.0..=1.0).contains(&self.max_failure_rate) {
            return Err(Error::InvalidConfig(format!(
                "embedding.max_failure_rate must be within [0, 1], got {}",
                self.max_failure_rate
            )));
        }
        if self.backend == EmbeddingBackend::Bge && self.model_dir.is_none() {
            return Err(Error::InvalidConfig("embedding.model_dir is required for the bge backend".into()));
        }
        Ok(())
    }
}

/// Similarity used for ranking. Fixed per index since it changes the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    InnerProduct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    /// Exact scan of every entry.
    #[default]
    BruteForce,
    /// Inverted file over k-means lists; see `IvfConfig`.
    Ivf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IvfConfig {
    /// Number of k-means lists (clamped to the entry count).
    pub nlist: usize,
    /// Lists scanned per query.
    pub nprobe: usize,
    pub max_iterations: usize,
    pub seed: u64,
}

impl Default for IvfConfig {
    fn default() -> Self {
        Self { nlist: 64, nprobe: 8, max_iterations: 20, seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IndexConfig {
    pub metric: SimilarityMetric,
    pub backend: IndexBackend,
    pub ivf: IvfConfig,
    /// Expected vector length; `None` takes it from the first entry.
    pub dimension: Option<usize>,
}

impl IndexConfig {
    pub fn validate(&self) -> Result<()> {
        if self.backend == IndexBackend::Ivf
            && (self.ivf.nlist == 0 || self.ivf.nprobe == 0 || self.ivf.max_iterations == 0)
        {
            return Err(Error::InvalidConfig("index.ivf nlist, nprobe and max_iterations must be greater than 0".into()));
        }
        if self.dimension == Some(0) {
            return Err(Error::InvalidConfig("index.dimension must be greater than 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Embed the query and search the vector index.
    #[default]
    Dense,
    /// BM25 over passage text.
    Bm25,
    /// BM25 candidates reranked by dense similarity.
    Hybrid,
    /// Hybrid candidates scored against the query and an irrelevant document.
    Tri,
    /// Seeded random passages; the baseline guess.
    Random,
}

impl FromStr for RetrievalStrategy {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "dense" => Ok(Self::Dense),
            "bm25" => Ok(Self::Bm25),
            "hybrid" => Ok(Self::Hybrid),
            "tri" => Ok(Self::Tri),
            "random" | "baseline" => Ok(Self::Random),
            other => Err(format!("unknown retrieval strategy '{other}'")),
        }
    }
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RetrievalStrategy::Dense => "dense",
            RetrievalStrategy::Bm25 => "bm25",
            RetrievalStrategy::Hybrid => "hybrid",
            RetrievalStrategy::Tri => "tri",
            RetrievalStrategy::Random => "random",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub strategy: RetrievalStrategy,
    pub top_k: usize,
    /// BM25 candidates handed to the dense reranker.
    pub candidate_k: usize,
    /// Weight of query similarity in tri retrieval.
    pub alpha: f32,
    /// Weight of irrelevant-document similarity in tri retrieval.
    pub beta: f32,
    pub seed: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: RetrievalStrategy::Dense,
            top_k: 5,
            candidate_k: 100,
            alpha: 1.0,
            beta: 0.7,
            seed: 42,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 || self.candidate_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k and retrieval.candidate_k must be greater than 0".into()));
        }
        if !self.alpha.is_finite() || !self.beta.is_finite() {
            return Err(Error::InvalidConfig("retrieval.alpha and retrieval.beta must be finite".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// 0 evaluates once on the full query set.
    pub bootstrap_count: usize,
    pub seed: u64,
    pub output_dir: String,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self { bootstrap_count: 0, seed: 42, output_dir: "results".to_string() }
    }
}

impl Settings {
    /// Defaults → `config.toml` → `config.<RUST_ENV>.toml` → `C4RAG_*` env vars.
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Like [`Settings::load`], with an explicit file merged last.
    pub fn load_with(extra: Option<&Path>) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("C4RAG_").split("__"));
        if let Some(path) = extra {
            if !path.exists() {
                return Err(Error::InvalidConfig(format!("config file {} does not exist", path.display())));
            }
            figment = figment.merge(Toml::file(path));
        }
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.embedding.validate()?;
        self.index.validate()?;
        self.retrieval.validate()?;
        if let Some(dim) = self.index.dimension {
            if dim != self.embedding.dimension {
                return Err(Error::InvalidConfig(format!(
                    "index.dimension ({}) differs from embedding.dimension ({})",
                    dim, self.embedding.dimension
                )));
            }
        }
        Ok(())
    }

    pub fn store_dir(&self) -> PathBuf {
        expand_path(&self.data.store_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        expand_path(&self.experiment.output_dir)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
