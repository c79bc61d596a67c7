//! Pipeline stages for report analysis.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap an
//! implementation (e.g. a different PDF text backend) without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ extract ──▶ explain
//! (URL/path) (lopdf)  (Gemini,    (Gemini,
//!                      JSON)       prose)
//! ```
//!
//! 1. [`input`]   — canonicalise the user-supplied path or URL to local bytes
//! 2. [`text`]    — pull per-page text out of the PDF; runs in
//!    `spawn_blocking` because lopdf parsing is CPU-bound
//! 3. [`extract`] — the biomarker extraction request: prompt, retry, strict
//!    JSON parse
//! 4. [`explain`] — the explanation request: prompt with the extracted JSON,
//!    retry, raw text reply
pub mod explain;
pub mod extract;
pub mod input;
pub mod text;
