//! PDF text extraction: bytes in, per-page text out.
//!
//! Text comes out of `lopdf` one page at a time. A page whose content stream
//! cannot be decoded (broken encoding, image-only scan, damaged stream)
//! contributes an **empty string** rather than failing the document — a
//! report with one bad page still gets analysed on the strength of the
//! others. Only a document-level parse failure (corrupt header/xref) is an
//! error.
//!
//! lopdf parsing is synchronous CPU work; [`crate::analyze`] runs this under
//! `spawn_blocking` so it never stalls the async executor.

use crate::error::ReportError;
use crate::output::ReportText;
use lopdf::Document;
use tracing::{debug, warn};

/// Extract per-page text from PDF bytes.
///
/// Page order follows the PDF page tree. Failed pages degrade to empty
/// strings, so `ReportText::page_count()` always equals the document's page
/// count and the joined text length equals the sum of per-page lengths.
pub fn extract_report_text(bytes: &[u8]) -> Result<ReportText, ReportError> {
    let doc = Document::load_mem(bytes).map_err(|e| ReportError::CorruptPdf {
        detail: e.to_string(),
    })?;

    let mut pages = Vec::new();
    for (page_number, _object_id) in doc.get_pages() {
        match doc.extract_text(&[page_number]) {
            Ok(text) => {
                debug!("Page {}: {} chars", page_number, text.len());
                pages.push(text);
            }
            Err(e) => {
                warn!("Page {}: text extraction failed, treating as empty: {}", page_number, e);
                pages.push(String::new());
            }
        }
    }

    Ok(ReportText { pages })
}
