//! PDF text extraction with page-level and document-level fallback.
//!
//! # Algorithm
//! 1. Open with the primary engine (`lopdf`) and walk pages in order.
//! 2. A page the primary engine cannot read is retried with the secondary
//!    engine (`pdf-extract`) for that page only. If both fail the page
//!    contributes "" and the document degrades to `Partial`.
//! 3. Page texts are joined with a single `\n`.
//! 4. If the primary engine cannot open the document at all, the secondary
//!    engine extracts the whole document. If that fails too the result is `Empty`.
//!
//! Both parsers are known to panic on malformed input; a panic counts as an
//! engine failure.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use super::{ExtractError, ExtractionStatus};

/// Result of extracting one PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOutcome {
    pub text: String,
    pub status: ExtractionStatus,
}

impl PdfOutcome {
    fn empty() -> Self {
        Self {
            text: String::new(),
            status: ExtractionStatus::Empty,
        }
    }
}

/// A PDF text engine that can open a whole document from memory.
pub trait PdfEngine {
    fn name(&self) -> &'static str;
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfPages>, ExtractError>;
}

/// An opened document, addressed by zero-based page index.
pub trait PdfPages {
    fn page_count(&self) -> usize;
    fn page_text(&self, index: usize) -> Result<String, ExtractError>;
}

/// Extracts a PDF with the default engines (`lopdf`, then `pdf-extract`).
pub fn extract_pdf(bytes: &[u8]) -> PdfOutcome {
    extract_pdf_with(&LopdfEngine, &PdfExtractEngine, bytes)
}

pub fn extract_pdf_with(
    primary: &dyn PdfEngine,
    secondary: &dyn PdfEngine,
    bytes: &[u8],
) -> PdfOutcome {
    match primary.open(bytes) {
        Ok(pages) => {
            let mut fallback = LazyPages::new(secondary, bytes);
            collect_pages(pages.as_ref(), |index| fallback.page_text(index))
        }
        Err(e) => {
            warn!("{e}; retrying whole document with {}", secondary.name());
            match secondary.open(bytes) {
                Ok(pages) => collect_pages(pages.as_ref(), |index| {
                    Err(ExtractError::PdfPage {
                        engine: "none",
                        page: index + 1,
                        message: "no further fallback".to_string(),
                    })
                }),
                Err(e) => {
                    warn!("{e}; giving up on document");
                    PdfOutcome::empty()
                }
            }
        }
    }
}

fn collect_pages(
    pages: &dyn PdfPages,
    mut fallback: impl FnMut(usize) -> Result<String, ExtractError>,
) -> PdfOutcome {
    let count = pages.page_count();
    let mut texts = Vec::with_capacity(count);
    let mut lost = 0usize;

    for index in 0..count {
        let text = match pages.page_text(index) {
            Ok(text) => text,
            Err(e) => {
                warn!("{e}");
                match fallback(index) {
                    Ok(text) => {
                        debug!("Fallback engine recovered page {}", index + 1);
                        text
                    }
                    Err(e) => {
                        warn!("{e}; page {} contributes no text", index + 1);
                        lost += 1;
                        String::new()
                    }
                }
            }
        };
        texts.push(text.trim_end().to_string());
    }

    if count == 0 || lost == count {
        return PdfOutcome::empty();
    }

    let text = texts.join("\n");
    if text.trim().is_empty() {
        // Image-only pages: nothing to rank on.
        return PdfOutcome::empty();
    }

    let status = if lost > 0 {
        ExtractionStatus::Partial
    } else {
        ExtractionStatus::Full
    };
    PdfOutcome { text, status }
}

/// Opens the fallback engine on first use and reuses it for later pages.
struct LazyPages<'a> {
    engine: &'a dyn PdfEngine,
    bytes: &'a [u8],
    opened: Option<Result<Box<dyn PdfPages>, String>>,
}

impl<'a> LazyPages<'a> {
    fn new(engine: &'a dyn PdfEngine, bytes: &'a [u8]) -> Self {
        Self {
            engine,
            bytes,
            opened: None,
        }
    }

    fn page_text(&mut self, index: usize) -> Result<String, ExtractError> {
        let engine = self.engine;
        let bytes = self.bytes;
        let opened = self
            .opened
            .get_or_insert_with(|| engine.open(bytes).map_err(|e| e.to_string()));

        match opened {
            Ok(pages) => pages.page_text(index),
            Err(message) => Err(ExtractError::PdfPage {
                engine: engine.name(),
                page: index + 1,
                message: message.clone(),
            }),
        }
    }
}

/// Runs `f`, turning a panic into an error message.
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "parser panicked".to_string())
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Engines
// ────────────────────────────────────────────────────────────────────────────

/// Primary engine: page-at-a-time extraction over the `lopdf` object model.
pub struct LopdfEngine;

struct LopdfPages {
    document: lopdf::Document,
    page_numbers: Vec<u32>,
}

impl PdfEngine for LopdfEngine {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfPages>, ExtractError> {
        let open_error = |message: String| ExtractError::PdfOpen {
            engine: "lopdf",
            message,
        };

        let document = guarded(|| lopdf::Document::load_mem(bytes))
            .map_err(open_error)?
            .map_err(|e| open_error(e.to_string()))?;
        let page_numbers = document.get_pages().keys().copied().collect();

        Ok(Box::new(LopdfPages {
            document,
            page_numbers,
        }))
    }
}

impl PdfPages for LopdfPages {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> Result<String, ExtractError> {
        let page_error = |message: String| ExtractError::PdfPage {
            engine: "lopdf",
            page: index + 1,
            message,
        };

        let page_number = *self
            .page_numbers
            .get(index)
            .ok_or_else(|| page_error("page out of range".to_string()))?;

        guarded(|| self.document.extract_text(&[page_number]))
            .map_err(page_error)?
            .map_err(|e| page_error(e.to_string()))
    }
}

/// Secondary engine: `pdf-extract` renders every page in one pass; pages are
/// then served from that output.
pub struct PdfExtractEngine;

struct PdfExtractPages {
    pages: Vec<String>,
}

impl PdfEngine for PdfExtractEngine {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfPages>, ExtractError> {
        let open_error = |message: String| ExtractError::PdfOpen {
            engine: "pdf-extract",
            message,
        };

        let pages = guarded(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
            .map_err(open_error)?
            .map_err(|e| open_error(e.to_string()))?;

        Ok(Box::new(PdfExtractPages { pages }))
    }
}

impl PdfPages for PdfExtractPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String, ExtractError> {
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| ExtractError::PdfPage {
                engine: "pdf-extract",
                page: index + 1,
                message: "page not produced".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    use super::*;

    /// Fake engine: `None` pages fail, `Some` pages succeed.
    struct FakeEngine {
        name: &'static str,
        opens: bool,
        pages: Vec<Option<&'static str>>,
        open_calls: Rc<Cell<usize>>,
    }

    impl FakeEngine {
        fn new(name: &'static str, pages: Vec<Option<&'static str>>) -> Self {
            Self {
                name,
                opens: true,
                pages,
                open_calls: Rc::new(Cell::new(0)),
            }
        }

        fn broken(name: &'static str) -> Self {
            Self {
                opens: false,
                ..Self::new(name, vec![])
            }
        }
    }

    struct FakePages {
        name: &'static str,
        pages: Vec<Option<&'static str>>,
    }

    impl PdfEngine for FakeEngine {
        fn name(&self) -> &'static str {
            self.name
        }

        fn open(&self, _bytes: &[u8]) -> Result<Box<dyn PdfPages>, ExtractError> {
            self.open_calls.set(self.open_calls.get() + 1);
            if !self.opens {
                return Err(ExtractError::PdfOpen {
                    engine: self.name,
                    message: "corrupt xref".to_string(),
                });
            }
            Ok(Box::new(FakePages {
                name: self.name,
                pages: self.pages.clone(),
            }))
        }
    }

    impl PdfPages for FakePages {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&self, index: usize) -> Result<String, ExtractError> {
            self.pages
                .get(index)
                .copied()
                .flatten()
                .map(str::to_string)
                .ok_or(ExtractError::PdfPage {
                    engine: self.name,
                    page: index + 1,
                    message: "bad cmap".to_string(),
                })
        }
    }

    #[test]
    fn test_all_pages_primary_is_full() {
        let primary = FakeEngine::new("primary", vec![Some("one\n"), Some("two\n")]);
        let secondary = FakeEngine::new("secondary", vec![]);
        let outcome = extract_pdf_with(&primary, &secondary, b"%PDF");
        assert_eq!(outcome.status, ExtractionStatus::Full);
        assert_eq!(outcome.text, "one\ntwo");
        assert_eq!(secondary.open_calls.get(), 0, "fallback must not open when unneeded");
    }

    #[test]
    fn test_one_corrupt_page_is_partial_and_keeps_order() {
        let primary = FakeEngine::new("primary", vec![Some("p1"), None, Some("p3"), Some("p4")]);
        let secondary = FakeEngine::new("secondary", vec![Some("s1"), None, Some("s3"), Some("s4")]);
        let outcome = extract_pdf_with(&primary, &secondary, b"%PDF");
        assert_eq!(outcome.status, ExtractionStatus::Partial);
        assert_eq!(outcome.text, "p1\n\np3\np4");
    }

    #[test]
    fn test_secondary_recovers_single_page() {
        let primary = FakeEngine::new("primary", vec![Some("p1"), None, Some("p3")]);
        let secondary = FakeEngine::new("secondary", vec![Some("s1"), Some("s2"), Some("s3")]);
        let outcome = extract_pdf_with(&primary, &secondary, b"%PDF");
        assert_eq!(outcome.status, ExtractionStatus::Full);
        assert_eq!(outcome.text, "p1\ns2\np3");
    }

    #[test]
    fn test_secondary_opened_once_for_many_bad_pages() {
        let primary = FakeEngine::new("primary", vec![None, None, Some("p3")]);
        let secondary = FakeEngine::new("secondary", vec![Some("s1"), Some("s2"), Some("s3")]);
        let outcome = extract_pdf_with(&primary, &secondary, b"%PDF");
        assert_eq!(outcome.text, "s1\ns2\np3");
        assert_eq!(secondary.open_calls.get(), 1);
    }

    #[test]
    fn test_primary_open_failure_uses_secondary_for_whole_document() {
        let primary = FakeEngine::broken("primary");
        let secondary = FakeEngine::new("secondary", vec![Some("s1"), Some("s2")]);
        let outcome = extract_pdf_with(&primary, &secondary, b"%PDF");
        assert_eq!(outcome.status, ExtractionStatus::Full);
        assert_eq!(outcome.text, "s1\ns2");
    }

    #[test]
    fn test_both_engines_fail_to_open_is_empty() {
        let outcome = extract_pdf_with(
            &FakeEngine::broken("primary"),
            &FakeEngine::broken("secondary"),
            b"junk",
        );
        assert_eq!(outcome, PdfOutcome::empty());
    }

    #[test]
    fn test_every_page_lost_is_empty() {
        let primary = FakeEngine::new("primary", vec![None, None]);
        let secondary = FakeEngine::broken("secondary");
        let outcome = extract_pdf_with(&primary, &secondary, b"%PDF");
        assert_eq!(outcome.status, ExtractionStatus::Empty);
        assert!(outcome.text.is_empty());
    }

    #[test]
    fn test_zero_pages_is_empty() {
        let primary = FakeEngine::new("primary", vec![]);
        let outcome = extract_pdf_with(&primary, &FakeEngine::broken("secondary"), b"%PDF");
        assert_eq!(outcome.status, ExtractionStatus::Empty);
    }

    #[test]
    fn test_guarded_converts_panic_to_error() {
        let result: Result<(), String> = guarded(|| panic!("broken cmap"));
        assert_eq!(result.unwrap_err(), "broken cmap");
    }

    fn build_pdf(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_real_pdf_extracts_pages_in_order() {
        let bytes = build_pdf(&["Experience Rust", "Education MIT"]);
        let outcome = extract_pdf(&bytes);
        assert_eq!(outcome.status, ExtractionStatus::Full);
        let first = outcome.text.find("Experience").expect("page 1 text");
        let second = outcome.text.find("Education").expect("page 2 text");
        assert!(first < second);
    }
}
