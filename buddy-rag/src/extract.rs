//! Text extraction from PDF, DOCX and plain-text files.
//!
//! Parsing is synchronous and CPU-bound; async callers should go through
//! [`load_document`], which runs it on the blocking pool.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};

use crate::document::{Document, DocumentKind, Page, content_id};
use crate::error::{RagError, Result};

const DOCX_BODY: &str = "word/document.xml";

/// Read and extract a document from disk.
///
/// # Errors
///
/// - [`RagError::UnsupportedFormat`] when the extension is not recognized
/// - [`RagError::ExtractionError`] when the file cannot be read or parsed
pub fn extract_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let kind = DocumentKind::from_path(path)?;
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let bytes = std::fs::read(path)
        .map_err(|e| RagError::extraction(&source, format!("failed to read file: {e}")))?;
    extract_bytes(source, kind, &bytes)
}

/// Extract a document already held in memory.
pub fn extract_bytes(source: impl Into<String>, kind: DocumentKind, bytes: &[u8]) -> Result<Document> {
    let source = source.into();
    let texts = match kind {
        DocumentKind::Pdf => extract_pdf(&source, bytes)?,
        DocumentKind::Docx => vec![extract_docx(&source, bytes)?],
        DocumentKind::Txt => vec![String::from_utf8_lossy(bytes).into_owned()],
    };

    let pages: Vec<Page> = texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page { number: i + 1, text })
        .collect();
    debug!(source = %source, %kind, page_count = pages.len(), "extracted document");

    Ok(Document { id: content_id(bytes), source, kind, pages })
}

/// [`extract_document`] on the blocking thread pool.
pub async fn load_document(path: PathBuf) -> Result<Document> {
    tokio::task::spawn_blocking(move || extract_document(&path))
        .await
        .map_err(|e| RagError::PipelineError(format!("extraction task failed: {e}")))?
}

fn extract_pdf(source: &str, bytes: &[u8]) -> Result<Vec<String>> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let outcome =
        std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    match outcome {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(RagError::extraction(source, format!("invalid PDF: {e}"))),
        Err(_) => {
            warn!(source, "PDF parser panicked");
            Err(RagError::extraction(source, "invalid PDF: parser failed"))
        }
    }
}

fn extract_docx(source: &str, bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| RagError::extraction(source, format!("invalid DOCX container: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| RagError::extraction(source, format!("missing {DOCX_BODY}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| RagError::extraction(source, format!("unreadable {DOCX_BODY}: {e}")))?;
    docx_xml_to_text(&xml).map_err(|e| RagError::extraction(source, e))
}

/// Flatten WordprocessingML into plain text.
///
/// Paragraphs end with a newline, `w:tab` becomes a tab and `w:br`/`w:cr`
/// become newlines. Only the contents of `w:t` runs are kept.
pub(crate) fn docx_xml_to_text(xml: &str) -> std::result::Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_run_text => {
                let unescaped = t.unescape().map_err(|e| format!("malformed XML text: {e}"))?;
                text.push_str(&unescaped);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "malformed XML at position {}: {e}",
                    reader.error_position()
                ));
            }
        }
    }

    Ok(text)
}
