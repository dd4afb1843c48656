//! Text Extraction — turns uploaded candidate documents into plain text.
//!
//! `extract` never fails: every document yields exactly one `ExtractedText`,
//! degraded to `Partial` or `Empty` when parsers give up. Diagnostics are
//! logged, not returned.
//!
//! Dispatch is by file extension:
//! - `.txt` / `.text` / `.md` → strict UTF-8 decode
//! - `.docx` → `docx::extract_docx`
//! - `.pdf`  → `pdf::extract_pdf` (page-granular, two engines)
//! - anything else → `Empty`, no parser is run

pub mod docx;
pub mod pdf;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Format hint derived from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PlainText,
    Docx,
    Pdf,
    Unsupported,
}

impl DocumentFormat {
    pub fn from_filename(filename: &str) -> Self {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "txt" | "text" | "md" => DocumentFormat::PlainText,
            "docx" => DocumentFormat::Docx,
            "pdf" => DocumentFormat::Pdf,
            _ => DocumentFormat::Unsupported,
        }
    }
}

/// One uploaded file. Owned by the request that produced it.
#[derive(Debug, Clone)]
pub struct CandidateDocument {
    pub filename: String,
    pub raw_bytes: Bytes,
    pub format: DocumentFormat,
}

impl CandidateDocument {
    pub fn new(filename: impl Into<String>, raw_bytes: impl Into<Bytes>) -> Self {
        let filename = filename.into();
        let format = DocumentFormat::from_filename(&filename);
        Self {
            filename,
            raw_bytes: raw_bytes.into(),
            format,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Full,
    /// Some pages or segments were lost.
    Partial,
    /// Nothing could be recovered; text is "".
    Empty,
}

#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub filename: String,
    pub text: String,
    pub status: ExtractionStatus,
}

impl ExtractedText {
    pub fn empty(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            text: String::new(),
            status: ExtractionStatus::Empty,
        }
    }

    pub fn summary(&self) -> ExtractionSummary {
        ExtractionSummary {
            filename: self.filename.clone(),
            status: self.status,
            chars: self.text.chars().count(),
        }
    }
}

/// Per-document extraction outcome surfaced to callers alongside the ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionSummary {
    pub filename: String,
    pub status: ExtractionStatus,
    pub chars: usize,
}

/// Internal parser failures. Never escapes `extract`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("DOCX container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("DOCX XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{engine} could not open PDF: {message}")]
    PdfOpen {
        engine: &'static str,
        message: String,
    },

    #[error("{engine} failed on page {page}: {message}")]
    PdfPage {
        engine: &'static str,
        page: usize,
        message: String,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction
// ────────────────────────────────────────────────────────────────────────────

/// Extracts text from one document. Total: failures degrade the status.
pub fn extract(document: &CandidateDocument) -> ExtractedText {
    let filename = document.filename.as_str();
    let bytes = document.raw_bytes.as_ref();

    let extracted = match document.format {
        DocumentFormat::PlainText => match decode_plain_text(bytes) {
            Ok(text) => with_status(filename, text),
            Err(e) => {
                warn!("Text extraction failed for '{filename}': {e}");
                ExtractedText::empty(filename)
            }
        },
        DocumentFormat::Docx => match docx::extract_docx(bytes) {
            Ok(text) => with_status(filename, text),
            Err(e) => {
                warn!("DOCX extraction failed for '{filename}': {e}");
                ExtractedText::empty(filename)
            }
        },
        DocumentFormat::Pdf => {
            let outcome = pdf::extract_pdf(bytes);
            ExtractedText {
                filename: filename.to_string(),
                text: outcome.text,
                status: outcome.status,
            }
        }
        DocumentFormat::Unsupported => {
            warn!("Unsupported format for '{filename}'; skipping extraction");
            ExtractedText::empty(filename)
        }
    };

    debug!(
        "Extracted {} chars from '{}' ({:?})",
        extracted.text.len(),
        extracted.filename,
        extracted.status
    );
    extracted
}

/// Extracts every document on the blocking pool, preserving input order.
///
/// A parser panic inside a task still yields an `Empty` entry for that file.
pub async fn extract_all(documents: Vec<CandidateDocument>) -> Vec<ExtractedText> {
    let handles: Vec<_> = documents
        .into_iter()
        .map(|document| {
            let filename = document.filename.clone();
            let handle = tokio::task::spawn_blocking(move || extract(&document));
            (filename, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (filename, handle) in handles {
        match handle.await {
            Ok(extracted) => results.push(extracted),
            Err(e) => {
                warn!("Extraction task for '{filename}' aborted: {e}");
                results.push(ExtractedText::empty(filename));
            }
        }
    }
    results
}

fn decode_plain_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    Ok(std::str::from_utf8(bytes)?.to_string())
}

/// Whitespace-only text counts as nothing recovered.
fn with_status(filename: &str, text: String) -> ExtractedText {
    if text.trim().is_empty() {
        return ExtractedText::empty(filename);
    }
    ExtractedText {
        filename: filename.to_string(),
        text,
        status: ExtractionStatus::Full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_filename("cv.PDF"), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_filename("cv.Docx"), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::from_filename("notes.txt"), DocumentFormat::PlainText);
        assert_eq!(DocumentFormat::from_filename("notes.md"), DocumentFormat::PlainText);
        assert_eq!(DocumentFormat::from_filename("cv.doc"), DocumentFormat::Unsupported);
        assert_eq!(DocumentFormat::from_filename("README"), DocumentFormat::Unsupported);
    }

    #[test]
    fn test_plain_text_extracts_full() {
        let doc = CandidateDocument::new("alice.txt", "Rust engineer, 7 years".as_bytes().to_vec());
        let out = extract(&doc);
        assert_eq!(out.status, ExtractionStatus::Full);
        assert_eq!(out.text, "Rust engineer, 7 years");
        assert_eq!(out.filename, "alice.txt");
    }

    #[test]
    fn test_plain_text_strips_bom() {
        let doc = CandidateDocument::new("bom.txt", b"\xEF\xBB\xBFhello".to_vec());
        assert_eq!(extract(&doc).text, "hello");
    }

    #[test]
    fn test_invalid_utf8_is_empty_not_lossy() {
        let doc = CandidateDocument::new("bad.txt", vec![b'o', b'k', 0xFF, 0xFE]);
        let out = extract(&doc);
        assert_eq!(out.status, ExtractionStatus::Empty);
        assert!(out.text.is_empty());
    }

    #[test]
    fn test_whitespace_only_text_is_empty_with_no_text() {
        let out = extract(&CandidateDocument::new("blank.txt", b"   \n ".to_vec()));
        assert_eq!(out.status, ExtractionStatus::Empty);
        assert_eq!(out.text, "");
    }

    #[test]
    fn test_docx_without_text_runs_is_empty_with_no_text() {
        let bytes = docx::tests::build_docx("<w:p></w:p><w:p><w:r><w:t> </w:t></w:r></w:p>");
        let out = extract(&CandidateDocument::new("blank.docx", bytes));
        assert_eq!(out.status, ExtractionStatus::Empty);
        assert_eq!(out.text, "");
    }

    #[test]
    fn test_docx_extracts_full() {
        let bytes = docx::tests::build_docx("<w:p><w:r><w:t>Bob Smith, Data Engineer</w:t></w:r></w:p>");
        let out = extract(&CandidateDocument::new("bob.docx", bytes));
        assert_eq!(out.status, ExtractionStatus::Full);
        assert_eq!(out.text, "Bob Smith, Data Engineer");
    }

    #[test]
    fn test_unsupported_extension_is_empty() {
        let doc = CandidateDocument::new("photo.png", b"\x89PNG".to_vec());
        let out = extract(&doc);
        assert_eq!(out.status, ExtractionStatus::Empty);
        assert_eq!(out.text, "");
    }

    #[test]
    fn test_garbage_docx_and_pdf_degrade_to_empty() {
        for name in ["cv.docx", "cv.pdf"] {
            let doc = CandidateDocument::new(name, b"definitely not a container".to_vec());
            let out = extract(&doc);
            assert_eq!(out.status, ExtractionStatus::Empty, "{name}");
            assert!(out.text.is_empty(), "{name}");
        }
    }

    #[test]
    fn test_summary_counts_chars_not_bytes() {
        let doc = CandidateDocument::new("zoe.txt", "Zoë".as_bytes().to_vec());
        let summary = extract(&doc).summary();
        assert_eq!(summary.chars, 3);
        assert_eq!(summary.status, ExtractionStatus::Full);
    }

    #[tokio::test]
    async fn test_extract_all_preserves_order_and_count() {
        let documents = vec![
            CandidateDocument::new("a.txt", b"first".to_vec()),
            CandidateDocument::new("b.png", b"ignored".to_vec()),
            CandidateDocument::new("c.txt", b"third".to_vec()),
        ];
        let results = extract_all(documents).await;
        let names: Vec<_> = results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.png", "c.txt"]);
        assert_eq!(results[0].text, "first");
        assert_eq!(results[1].status, ExtractionStatus::Empty);
        assert_eq!(results[2].text, "third");
    }
}
