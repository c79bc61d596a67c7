//! Error types for the medreport-biomarkers library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ReportError`] — **Fatal**: the analysis cannot proceed at all
//!   (missing input file, not a PDF, no API key configured). Returned as
//!   `Err(ReportError)` from the top-level `analyze*` functions.
//!
//! * [`RequestError`] — **Non-fatal**: one model request failed (retries
//!   exhausted, reply was not valid JSON) but the process itself is fine.
//!   Both the extraction and the explanation request surface failures through
//!   this one enum, so callers match on a single shape regardless of which
//!   stage failed.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! failed request, render the error inline next to partial results, or retry
//! the whole analysis with a different model.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the medreport-biomarkers library.
///
/// Per-request failures use [`RequestError`] instead.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { detail: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// No API key could be found for the Gemini model.
    #[error(
        "Gemini API key not found.\n\
         Set the GEMINI_API_KEY environment variable (or pass --api-key),\n\
         or put GEMINI_API_KEY=... in a .env file in the working directory."
    )]
    ApiKeyMissing,

    /// The biomarker extraction request failed; no analysis output exists.
    #[error("Biomarker extraction failed: {0}")]
    ExtractionFailed(#[source] RequestError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single model request.
///
/// The extraction request and the explanation request both report failures
/// through this enum. A failed request never aborts the process; the error is
/// shown inline to the user at the point of failure.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum RequestError {
    /// The model call failed on every attempt the retry policy allowed.
    #[error("model call failed after {attempts} attempts: {detail}")]
    RetriesExhausted { attempts: u32, detail: String },

    /// The model replied, but the reply is not valid JSON.
    #[error("model reply is not valid JSON: {detail}")]
    MalformedReply { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_missing_names_the_env_var() {
        let msg = ReportError::ApiKeyMissing.to_string();
        assert!(msg.contains("GEMINI_API_KEY"), "got: {msg}");
    }

    #[test]
    fn extraction_failed_includes_request_detail() {
        let e = ReportError::ExtractionFailed(RequestError::RetriesExhausted {
            attempts: 3,
            detail: "request timed out".into(),
        });
        let msg = e.to_string();
        assert!(msg.contains("3 attempts"), "got: {msg}");
        assert!(msg.contains("request timed out"), "got: {msg}");
    }

    #[test]
    fn malformed_reply_display() {
        let e = RequestError::MalformedReply {
            detail: "expected value at line 1 column 1".into(),
        };
        assert!(e.to_string().contains("not valid JSON"));
    }

    #[test]
    fn not_a_pdf_shows_magic_bytes() {
        let e = ReportError::NotAPdf {
            path: PathBuf::from("report.pdf"),
            magic: *b"<htm",
        };
        assert!(e.to_string().contains("report.pdf"));
    }

    #[test]
    fn request_error_round_trips_through_serde() {
        let e = RequestError::RetriesExhausted {
            attempts: 3,
            detail: "429".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: RequestError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), e.to_string());
    }
}
