//! Configuration for a report analysis.
//!
//! All behaviour is controlled through [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across calls, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: explicit config over process-global state
//! The model handle and API key are plain fields here, constructed once and
//! passed to the components that need them. Nothing in the crate reads a
//! hidden global after startup; the environment is consulted exactly once,
//! at provider-resolution time inside [`crate::analyze`].

use crate::error::ReportError;
use crate::llm::GenerativeModel;
use crate::retry::RetryPolicy;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default Gemini model used when the caller names none.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Environment variable consulted when no API key is supplied directly.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for one report analysis.
///
/// Built via [`AnalysisConfig::builder()`] or [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use medreport_biomarkers::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .model("gemini-1.5-pro")
///     .max_attempts(3)
///     .retry_delay_ms(2000)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Gemini model id. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// API key. If `None`, the `GEMINI_API_KEY` environment variable is
    /// consulted; a missing key is fatal before any work starts.
    pub api_key: Option<String>,

    /// Pre-constructed model. Takes precedence over `model` + `api_key`.
    /// Useful in tests or when the caller wraps the model in middleware.
    pub provider: Option<Arc<dyn GenerativeModel>>,

    /// Total attempts per model request, including the first. Default: 3.
    pub max_attempts: u32,

    /// Flat delay between failed attempts in milliseconds. Default: 2000.
    ///
    /// No jitter, no exponential growth, so worst-case latency stays
    /// predictable:
    /// `max_attempts × timeout + (max_attempts − 1) × delay`.
    pub retry_delay_ms: u64,

    /// Per-model-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Skip the explanation request entirely. Default: false.
    pub skip_explanation: bool,

    /// Custom extraction prompt prefix. If `None`, uses the built-in default.
    pub extraction_prompt: Option<String>,

    /// Custom explanation prompt prefix. If `None`, uses the built-in default.
    pub explanation_prompt: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            provider: None,
            max_attempts: 3,
            retry_delay_ms: 2000,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            skip_explanation: false,
            extraction_prompt: None,
            explanation_prompt: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("provider", &self.provider.as_ref().map(|_| "<dyn GenerativeModel>"))
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("skip_explanation", &self.skip_explanation)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// The retry policy implied by this config.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_delay_ms))
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn GenerativeModel>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_delay_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn skip_explanation(mut self, v: bool) -> Self {
        self.config.skip_explanation = v;
        self
    }

    pub fn extraction_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.extraction_prompt = Some(prompt.into());
        self
    }

    pub fn explanation_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.explanation_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, ReportError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ReportError::InvalidConfig("Model id must not be empty".into()));
        }
        if c.max_attempts == 0 {
            return Err(ReportError::InvalidConfig("max_attempts must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ReportError::InvalidConfig("api_timeout_secs must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = AnalysisConfig::default();
        assert_eq!(c.model, "gemini-1.5-flash");
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.retry_delay_ms, 2000);
        assert_eq!(c.api_timeout_secs, 60);
        assert!(!c.skip_explanation);
    }

    #[test]
    fn retry_policy_reflects_config() {
        let c = AnalysisConfig::builder()
            .max_attempts(5)
            .retry_delay_ms(250)
            .build()
            .unwrap();
        let policy = c.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(250));
    }

    #[test]
    fn empty_model_is_rejected() {
        let err = AnalysisConfig::builder().model("  ").build().unwrap_err();
        assert!(err.to_string().contains("Model id"));
    }

    #[test]
    fn zero_attempts_clamped_by_setter() {
        let c = AnalysisConfig::builder().max_attempts(0).build().unwrap();
        assert_eq!(c.max_attempts, 1);
    }

    #[test]
    fn debug_never_prints_the_key() {
        let c = AnalysisConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
