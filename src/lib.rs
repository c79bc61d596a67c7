//! # medreport-biomarkers
//!
//! Extract structured biomarker data from medical-report PDFs and explain it
//! in plain language, using Google Gemini for both steps.
//!
//! ## Why this crate?
//!
//! Lab reports bury a handful of numbers (hemoglobin, WBC, cholesterol) in
//! pages of letterhead, disclaimers, and tables that no two labs format the
//! same way. Instead of hand-writing parsers per lab, this crate pulls the
//! plain text out of the PDF and lets a generative model do the recognition:
//! one request returns the biomarkers as JSON, a second turns them into an
//! explanation a non-medical reader can follow.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file or download from URL
//!  ├─ 2. Text     per-page extraction via lopdf (CPU-bound, spawn_blocking)
//!  ├─ 3. Extract  Gemini request → strict-JSON biomarker set
//!  ├─ 4. Explain  Gemini request → plain-language prose
//!  └─ 5. Output   BiomarkerSet + Explanation + run stats
//! ```
//!
//! Every model call goes through an explicit [`retry::RetryPolicy`]
//! (default: 3 attempts, flat 2 s delay) with an injectable sleeper so the
//! policy is testable without real waiting.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medreport_biomarkers::{analyze, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY
//!     let config = AnalysisConfig::default();
//!     let output = analyze("lab_report.pdf", &config).await?;
//!     for b in &output.biomarkers.biomarkers {
//!         println!("{}: {} (ref {})", b.name, b.value, b.reference_range);
//!     }
//!     if let Some(explanation) = &output.explanation {
//!         println!("\n{explanation}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `medreport` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! medreport-biomarkers = { version = "0.3", default-features = false }
//! ```
//!
//! ## What this crate does NOT do
//!
//! No local NLP, no numeric validation of the model's output, no range
//! checking: every biomarker field is a free-form string passed through
//! exactly as the model wrote it. The crate is an orchestration layer; the
//! recognition work is entirely the model's.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod retry;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_from_bytes, analyze_sync, inspect};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, API_KEY_ENV, DEFAULT_MODEL};
pub use error::{ReportError, RequestError};
pub use llm::{GeminiModel, GenerativeModel, ModelError};
pub use output::{AnalysisOutput, AnalysisStats, Biomarker, BiomarkerSet, ReportText};
pub use pipeline::explain::{explain_biomarkers, explain_extraction, CANNOT_EXPLAIN_MESSAGE};
pub use pipeline::extract::extract_biomarkers;
pub use prompts::{DEFAULT_EXPLANATION_PROMPT, DEFAULT_EXTRACTION_PROMPT};
pub use retry::{Retried, RetryExhausted, RetryPolicy, Sleeper, TokioSleeper};
