//! Splitting documents into passages.
//!
//! Offsets are counted in characters, not bytes, so multi-byte text never
//! splits inside a code point. Windows advance by `chunk_size - overlap`
//! and the last window always ends at the end of the text.

use crate::config::{ChunkMode, ChunkingConfig};
use crate::error::Result;
use crate::types::{Document, Passage};

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn chunk(&self, doc: &Document) -> Vec<Passage> {
        // byte offset of every char, plus the end of the text
        let mut bounds: Vec<usize> = doc.text.char_indices().map(|(b, _)| b).collect();
        bounds.push(doc.text.len());
        let n = bounds.len() - 1;

        let spans = self.spans(&doc.text, &bounds, n);
        let total = spans.len();
        spans
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| Passage {
                id: Passage::make_id(&doc.id, start),
                document_id: doc.id.clone(),
                title: doc.title.clone(),
                text: doc.text[bounds[start]..bounds[end]].to_string(),
                start_offset: start,
                end_offset: end,
                chunk_index,
                total_chunks: total,
            })
            .collect()
    }

    fn spans(&self, text: &str, bounds: &[usize], n: usize) -> Vec<(usize, usize)> {
        let size = self.config.chunk_size;
        if n <= size {
            return vec![(0, n)];
        }
        let mut spans = Vec::with_capacity(n / (size - self.config.overlap) + 1);
        let mut start = 0usize;
        loop {
            let mut end = (start + size).min(n);
            if self.config.mode == ChunkMode::Boundary && end < n {
                end = whitespace_end(text, bounds, start + size / 2, end).unwrap_or(end);
            }
            spans.push((start, end));
            if end >= n {
                break;
            }
            start = end.saturating_sub(self.config.overlap).max(start + 1);
        }
        spans
    }
}

/// End offset just past the last whitespace char in `[from, end)`.
fn whitespace_end(text: &str, bounds: &[usize], from: usize, end: usize) -> Option<usize> {
    (from..end)
        .rev()
        .find(|&i| text[bounds[i]..bounds[i + 1]].chars().all(char::is_whitespace))
        .map(|i| i + 1)
}

/// Rebuild the document text from its passages, dropping the part each
/// passage shares with its predecessor.
pub fn reconstruct(passages: &[Passage]) -> String {
    let mut out = String::new();
    let mut covered = 0usize;
    for p in passages {
        let skip = covered.saturating_sub(p.start_offset);
        out.extend(p.text.chars().skip(skip));
        covered = covered.max(p.end_offset);
    }
    out
}

/// CRLF/CR → LF, runs of spaces and tabs → one space, three or more
/// newlines → two, surrounding whitespace trimmed.
pub fn normalize_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    let mut newlines = 0usize;
    for ch in text.chars() {
        match ch {
            '\n' => {
                pending_space = false;
                newlines += 1;
            }
            ' ' | '\t' => pending_space = true,
            _ => {
                if newlines > 0 {
                    if !out.is_empty() {
                        out.push_str(if newlines >= 2 { "\n\n" } else { "\n" });
                    }
                    newlines = 0;
                    pending_space = false;
                } else if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(ch);
            }
        }
    }
    out
}
