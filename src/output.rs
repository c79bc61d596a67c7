//! Output types: the extracted biomarker set, the explanation, and run stats.
//!
//! All fields the model supplies are **free-form strings**. The crate does no
//! numeric typing and no range validation of its own — "13.5 g/dL" passes
//! through exactly as the model wrote it, and a missing field becomes an
//! empty string rather than an error. The one structural guarantee is on the
//! set as a whole: extraction yields either a complete [`BiomarkerSet`] or a
//! [`crate::error::RequestError`], never a partial mix.

use serde::{Deserialize, Serialize};

/// One named medical measurement as reported by the model.
///
/// Fields default to the empty string when the model omits them
/// (`#[serde(default)]`), matching the pass-through contract: whatever the
/// model produced is what the caller sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Biomarker {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub test_name: String,
    #[serde(default)]
    pub reference_range: String,
}

/// The ordered biomarker list produced by one extraction request.
///
/// Order is whatever the model replied with; the crate never reorders it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiomarkerSet {
    #[serde(default)]
    pub biomarkers: Vec<Biomarker>,
}

impl BiomarkerSet {
    pub fn is_empty(&self) -> bool {
        self.biomarkers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.biomarkers.len()
    }
}

/// The per-page text pulled out of one PDF.
///
/// Pages that could not be read contribute an empty string instead of
/// failing the document, so `pages.len()` always equals the PDF's page count
/// and the joined text length equals the sum of the per-page lengths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportText {
    pub pages: Vec<String>,
}

impl ReportText {
    /// Concatenation of every page's text, in page order, no separators.
    pub fn joined(&self) -> String {
        self.pages.concat()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages whose extraction produced no text (unreadable or genuinely blank).
    pub fn empty_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_empty()).count()
    }

    /// True when no page yielded any text at all.
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.is_empty())
    }
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// The extracted biomarker set (possibly empty, never partial).
    pub biomarkers: BiomarkerSet,
    /// Plain-language explanation. `None` when explanation was skipped or
    /// failed (see `explanation_error`).
    pub explanation: Option<String>,
    /// The explanation request's failure, surfaced inline rather than
    /// aborting the run — the extracted set above is still valid.
    pub explanation_error: Option<crate::error::RequestError>,
    /// Run statistics.
    pub stats: AnalysisStats,
}

/// Timing and size statistics for one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Pages in the PDF.
    pub page_count: usize,
    /// Pages that yielded no text.
    pub empty_pages: usize,
    /// Characters of concatenated report text sent to the model.
    pub report_chars: usize,
    /// Model id used for both requests.
    pub model: String,
    /// Attempts the extraction request needed (1 = first try).
    pub extraction_attempts: u32,
    /// Attempts the explanation request needed; 0 when it never ran.
    pub explanation_attempts: u32,
    /// Wall-clock milliseconds spent reading the PDF text.
    pub text_duration_ms: u64,
    /// Wall-clock milliseconds spent in the extraction request (incl. retries).
    pub extraction_duration_ms: u64,
    /// Wall-clock milliseconds spent in the explanation request (incl. retries).
    pub explanation_duration_ms: u64,
    /// Total wall-clock milliseconds for the run.
    pub total_duration_ms: u64,
}
