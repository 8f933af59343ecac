//! Data types for documents, chunks, and search results.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{RagError, Result};

/// The file formats the extractor understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word processing document.
    Docx,
    /// Plain text.
    Txt,
}

impl DocumentKind {
    /// Detect the kind from the file extension, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" => Ok(Self::Txt),
            _ => Err(RagError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// The canonical lower-case extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One extraction unit: a PDF page, or the whole body of a DOCX/TXT file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    /// The extracted text.
    pub text: String,
}

/// An extracted source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Content-hash identifier. Identical bytes give identical ids.
    pub id: String,
    /// File name the document was loaded from.
    pub source: String,
    /// Detected format.
    pub kind: DocumentKind,
    /// Pages in source order.
    pub pages: Vec<Page>,
}

impl Document {
    /// Build a single-page text document, hashing the text for its id.
    pub fn from_text(source: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: content_id(text.as_bytes()),
            source: source.into(),
            kind: DocumentKind::Txt,
            pages: vec![Page { number: 1, text }],
        }
    }

    /// Build a document from already-split pages.
    pub fn from_pages<I, S>(source: impl Into<String>, kind: DocumentKind, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages: Vec<Page> = pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| Page { number: i + 1, text: text.into() })
            .collect();
        let mut hasher = Sha256::new();
        for page in &pages {
            hasher.update(page.text.as_bytes());
            hasher.update([0u8]);
        }
        Self { id: short_hex(&hasher.finalize()), source: source.into(), kind, pages }
    }

    /// Whether no page carries any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.text.trim().is_empty())
    }
}

/// A bounded span of a [`Document`] page, optionally with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `{document_id}_{index}`.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// The embedding vector; empty until embedded.
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// The parent document id.
    pub document_id: String,
    /// The parent document's file name.
    pub source: String,
    /// 1-based page number within the document.
    pub page: usize,
    /// Position of the chunk within the whole document.
    pub index: usize,
    /// Byte offset of the chunk text within its page.
    pub start: usize,
}

impl Chunk {
    /// Whether an embedding has been attached.
    pub fn is_embedded(&self) -> bool {
        !self.embedding.is_empty()
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// Hex content hash used for document ids.
pub fn content_id(bytes: &[u8]) -> String {
    short_hex(&Sha256::digest(bytes))
}

fn short_hex(digest: &[u8]) -> String {
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}
