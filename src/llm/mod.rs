//! Remote generative-model boundary.
//!
//! The whole crate talks to the model through one seam: [`GenerativeModel`],
//! a prompt-in/text-out trait. Keeping the boundary this narrow has two
//! payoffs: tests substitute a scripted mock (no network, no key), and the
//! extraction/explanation code never learns which vendor sits behind the
//! trait object.
//!
//! [`gemini::GeminiModel`] is the one production implementation.

pub mod gemini;

pub use gemini::GeminiModel;

use async_trait::async_trait;
use thiserror::Error;

/// A hosted text-completion model: one prompt in, one text reply out.
///
/// Implementations must be `Send + Sync`; the crate shares one instance
/// behind an `Arc` across both requests of an analysis.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Submit a prompt and return the model's text reply.
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;

    /// Model identifier used in logs and stats (e.g. "gemini-1.5-flash").
    fn id(&self) -> &str;
}

/// A single model call failed.
///
/// All variants are treated identically by the retry policy — see the
/// known-weakness note on [`crate::retry`].
#[derive(Debug, Error)]
pub enum ModelError {
    /// Could not reach the API at all (DNS, TLS, connection reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The call exceeded the configured per-call timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The API answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered 2xx but the reply carried no usable text
    /// (empty candidates, safety-blocked content).
    #[error("empty reply from model: {0}")]
    EmptyReply(String),
}
