use tracing::debug;

use crate::chunker::{normalize_text, Chunker};
use crate::config::{ChunkingConfig, CorpusConfig};
use crate::corpus::Documents;
use crate::error::Result;
use crate::types::{Document, Passage};

/// A loaded document together with the passages cut from it.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub document: Document,
    pub passages: Vec<Passage>,
}

/// Normalization + chunking applied to every document of a corpus pass.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    chunker: Chunker,
    normalize: bool,
}

impl Preprocessor {
    pub fn new(chunking: ChunkingConfig, corpus: &CorpusConfig) -> Result<Self> {
        Ok(Self { chunker: Chunker::new(chunking)?, normalize: corpus.normalize })
    }

    /// Returns `None` for documents without any text (redirect stubs and the like).
    pub fn prepare(&self, mut document: Document) -> Option<ProcessedDocument> {
        if self.normalize {
            document.text = normalize_text(&document.text);
        }
        if document.text.trim().is_empty() {
            debug!(doc_id = %document.id, "skipping blank document");
            return None;
        }
        let passages = self.chunker.chunk(&document);
        Some(ProcessedDocument { document, passages })
    }

    /// Lazily prepares every document of `docs`; loader errors are passed through.
    pub fn process<'a>(&'a self, docs: Documents) -> impl Iterator<Item = Result<ProcessedDocument>> + 'a {
        docs.filter_map(move |doc| match doc {
            Ok(doc) => self.prepare(doc).map(Ok),
            Err(e) => Some(Err(e)),
        })
    }
}
