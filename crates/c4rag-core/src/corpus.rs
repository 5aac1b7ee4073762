//! Corpus loading.
//!
//! A [`CorpusLoader`] validates the dump location once; every call to
//! [`CorpusLoader::documents`] reopens it, so the sequence is lazy and
//! restartable. Two layouts are understood:
//!
//! - JSON Lines as produced by WikiExtractor: `{"id", "title", "text", ...}`
//!   per line, only `text` being mandatory.
//! - A directory tree of `.txt` files, one document per file.

use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::config::CorpusFormat;
use crate::error::{Error, Result};
use crate::types::Document;

#[derive(Debug, Clone)]
pub struct CorpusLoader {
    path: PathBuf,
    format: CorpusFormat,
}

impl CorpusLoader {
    pub fn open(path: impl AsRef<Path>, format: CorpusFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let meta = fs::metadata(&path)?;
        let format = match format {
            CorpusFormat::Auto if meta.is_dir() => CorpusFormat::TextDir,
            CorpusFormat::Auto => CorpusFormat::JsonLines,
            explicit => explicit,
        };
        match format {
            CorpusFormat::TextDir if !meta.is_dir() => {
                return Err(Error::CorpusFormat {
                    path: path.display().to_string(),
                    line: 0,
                    message: "text_dir corpus must be a directory".into(),
                })
            }
            CorpusFormat::JsonLines if meta.is_dir() => {
                return Err(Error::CorpusFormat {
                    path: path.display().to_string(),
                    line: 0,
                    message: "jsonl corpus must be a file".into(),
                })
            }
            _ => {}
        }
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The resolved format; never `Auto`.
    pub fn format(&self) -> CorpusFormat {
        self.format
    }

    /// Starts a fresh pass over the corpus.
    pub fn documents(&self) -> Result<Documents> {
        match self.format {
            CorpusFormat::TextDir => Ok(Documents::Files(TextDirDocuments::new(&self.path))),
            _ => {
                let reader = BufReader::new(File::open(&self.path)?);
                Ok(Documents::Lines(JsonLinesDocuments {
                    path: self.path.display().to_string(),
                    lines: reader.lines(),
                    line_no: 0,
                }))
            }
        }
    }
}

pub enum Documents {
    Lines(JsonLinesDocuments),
    Files(TextDirDocuments),
}

impl Iterator for Documents {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Documents::Lines(inner) => inner.next(),
            Documents::Files(inner) => inner.next(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default)]
    title: Option<String>,
    text: String,
}

pub struct JsonLinesDocuments {
    path: String,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl JsonLinesDocuments {
    fn parse(&self, line: &str) -> Result<Document> {
        let raw: RawRecord = serde_json::from_str(line).map_err(|e| Error::CorpusFormat {
            path: self.path.clone(),
            line: self.line_no,
            message: e.to_string(),
        })?;
        let id = match raw.id {
            Some(RawId::Text(s)) if !s.trim().is_empty() => s,
            Some(RawId::Number(n)) => n.to_string(),
            _ => format!("line-{}", self.line_no),
        };
        Ok(Document { id, title: raw.title.unwrap_or_default(), text: raw.text })
    }
}

impl Iterator for JsonLinesDocuments {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    return Some(Err(Error::CorpusFormat {
                        path: self.path.clone(),
                        line: self.line_no,
                        message: "line is not valid UTF-8".into(),
                    }))
                }
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(self.parse(&line));
        }
    }
}

pub struct TextDirDocuments {
    root: PathBuf,
    files: std::vec::IntoIter<PathBuf>,
}

impl TextDirDocuments {
    fn new(root: &Path) -> Self {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        Self { root: root.to_path_buf(), files: files.into_iter() }
    }

    fn load(&self, file: &Path) -> Result<Document> {
        let text = match fs::read_to_string(file) {
            Ok(content) => content,
            Err(_) => String::from_utf8_lossy(&fs::read(file)?).to_string(),
        };
        let relative = file.strip_prefix(&self.root).unwrap_or(file).with_extension("");
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let title = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Document { id, title, text })
    }
}

impl Iterator for TextDirDocuments {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        let file = self.files.next()?;
        Some(self.load(&file))
    }
}
