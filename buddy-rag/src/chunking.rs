//! Recursive separator-based chunking.
//!
//! [`RecursiveChunker`] splits on the coarsest separator present in the text
//! (paragraphs, then lines, then words, then characters), recurses into any
//! piece that is still too long, and merges the remaining pieces into windows
//! of at most `chunk_size` characters that overlap by up to `chunk_overlap`.
//! Lengths are counted in Unicode scalar values.

use crate::config::ChunkingConfig;
use crate::document::{Chunk, Document};

/// Separators tried in order: paragraph, line, word, character.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and provenance but no
/// embeddings. Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text hierarchically by a list of separators.
///
/// # Example
///
/// ```rust,ignore
/// use buddy_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a chunker with the default separators.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: maximum number of characters shared by consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a chunker from validated settings.
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replace the separator hierarchy. Coarsest first.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Split raw text into trimmed, non-empty windows.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_recursive(text, &separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut finer: &[&str] = &[];
        for (i, &candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = candidate;
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if finer.is_empty() {
                if let Some(piece) = trimmed(piece) {
                    chunks.push(piece);
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Greedily pack pieces into windows, carrying trailing pieces forward
    /// as overlap into the next window.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut windows = Vec::new();
        let mut current: std::collections::VecDeque<(&str, usize)> = Default::default();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !current.is_empty() {
                if let Some(window) = join(&current) {
                    windows.push(window);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            current.push_back((piece, len));
            total += len;
        }

        if let Some(window) = join(&current) {
            windows.push(window);
        }
        windows
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in &document.pages {
            let mut search_from = 0usize;
            let mut previous: Option<(usize, usize)> = None;
            for text in self.split_text(&page.text) {
                if let Some((start, len)) = previous {
                    search_from = floor_boundary(
                        &page.text,
                        (start + len).saturating_sub(self.chunk_overlap_bytes(&page.text, start, len)),
                    );
                }
                let start = page.text[search_from..]
                    .find(text.as_str())
                    .map(|offset| search_from + offset)
                    .or_else(|| page.text.find(text.as_str()))
                    .unwrap_or(0);
                previous = Some((start, text.len()));

                let index = chunks.len();
                chunks.push(Chunk {
                    id: format!("{}_{index}", document.id),
                    text,
                    embedding: Vec::new(),
                    document_id: document.id.clone(),
                    source: document.source.clone(),
                    page: page.number,
                    index,
                    start,
                });
            }
        }
        chunks
    }
}

impl RecursiveChunker {
    /// Byte length of the last `chunk_overlap` characters of the chunk at
    /// `start..start + len`.
    fn chunk_overlap_bytes(&self, text: &str, start: usize, len: usize) -> usize {
        text.get(start..start + len)
            .map(|chunk| {
                chunk.chars().rev().take(self.chunk_overlap).map(char::len_utf8).sum()
            })
            .unwrap_or(0)
    }
}

/// Split `text` on `separator`, attaching each separator occurrence to the
/// start of the piece that follows it. An empty separator splits into
/// characters. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, _) in text.match_indices(separator) {
        if i > start {
            pieces.push(&text[start..i]);
        }
        start = i;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces.into_iter().filter(|piece| !piece.is_empty()).collect()
}

fn join(pieces: &std::collections::VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = pieces.iter().map(|(piece, _)| *piece).collect();
    trimmed(&joined)
}

fn trimmed(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = RecursiveChunker::new(100, 10);
        assert_eq!(chunker.split_text("  hello world  "), vec!["hello world"]);
    }

    #[test]
    fn whitespace_only_text_has_no_chunks() {
        let chunker = RecursiveChunker::new(100, 10);
        assert!(chunker.split_text(" \n\n \n").is_empty());
        assert!(chunker.split_text("").is_empty());
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let chunker = RecursiveChunker::new(30, 0);
        let text = "First paragraph here.\n\nSecond paragraph here.";
        assert_eq!(
            chunker.split_text(text),
            vec!["First paragraph here.", "Second paragraph here."]
        );
    }

    #[test]
    fn separator_is_kept_with_the_following_piece() {
        assert_eq!(split_keeping_separator("a b c", " "), vec!["a", " b", " c"]);
        assert_eq!(split_keeping_separator(" a", " "), vec![" a"]);
        assert_eq!(split_keeping_separator("ab", ""), vec!["a", "b"]);
    }

    #[test]
    fn words_overlap_between_windows() {
        let chunker = RecursiveChunker::new(10, 5);
        let chunks = chunker.split_text("one two three four");
        assert_eq!(chunks, vec!["one two", "two three", "four"]);

        let chunker = RecursiveChunker::new(12, 6);
        let chunks = chunker.split_text("aa bb cc dd ee ff");
        assert_eq!(chunks, vec!["aa bb cc dd", "cc dd ee ff"]);
    }

    #[test]
    fn long_words_fall_back_to_characters() {
        let chunker = RecursiveChunker::new(4, 0);
        let chunks = chunker.split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunker = RecursiveChunker::new(3, 0);
        let chunks = chunker.split_text("ééé");
        assert_eq!(chunks, vec!["ééé"]);
    }

    #[test]
    fn chunks_carry_provenance() {
        let doc = Document::from_pages(
            "paper.pdf",
            crate::document::DocumentKind::Pdf,
            ["alpha beta gamma", "delta epsilon"],
        );
        let chunks = RecursiveChunker::new(11, 0).chunk(&doc);
        let summary: Vec<(&str, usize, usize, usize)> =
            chunks.iter().map(|c| (c.text.as_str(), c.page, c.index, c.start)).collect();
        assert_eq!(
            summary,
            vec![
                ("alpha beta", 1, 0, 0),
                ("gamma", 1, 1, 11),
                ("delta", 2, 2, 0),
                ("epsilon", 2, 3, 6),
            ]
        );
        assert_eq!(chunks[3].id, format!("{}_3", doc.id));
        assert!(chunks.iter().all(|c| c.source == "paper.pdf" && c.embedding.is_empty()));
    }
}
