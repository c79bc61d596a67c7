//! Top-level analysis entry points.
//!
//! One call chain per invocation, strictly sequential: resolve input, read
//! the report text, run the extraction request, then (unless skipped) the
//! explanation request. There is no concurrency between stages and no
//! cancellation of an in-flight model call — the remote connection is
//! stateless per call and the chain simply runs to completion.
//!
//! Failure severity follows the two-tier error model: bad input and a
//! missing API key are fatal ([`ReportError`]); a failed extraction is
//! fatal too (there is nothing to show without it), while a failed
//! explanation is surfaced inline in the output next to the extracted set.

use crate::config::{AnalysisConfig, API_KEY_ENV};
use crate::error::{ReportError, RequestError};
use crate::llm::{GeminiModel, GenerativeModel};
use crate::output::{AnalysisOutput, AnalysisStats, ReportText};
use crate::pipeline::{explain, extract, input, text};
use crate::prompts::{DEFAULT_EXPLANATION_PROMPT, DEFAULT_EXTRACTION_PROMPT};
use crate::retry::TokioSleeper;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Analyse a medical-report PDF given as a file path or HTTP/HTTPS URL.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns `Err(ReportError)` for fatal conditions only:
/// - file not found / permission denied / not a PDF / corrupt PDF
/// - no API key configured
/// - the extraction request failed after all retries
///
/// A failed *explanation* request is not fatal — the output carries the
/// extracted set plus the error inline.
pub async fn analyze(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, ReportError> {
    let input_str = input_str.as_ref();
    info!("Starting analysis: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let bytes = resolved.read().await?;
    analyze_from_bytes(bytes, config).await
}

/// Analyse a medical-report PDF already held in memory.
///
/// The recommended API when report bytes come from an upload, a database,
/// or a network stream rather than a file on disk.
pub async fn analyze_from_bytes(
    bytes: Vec<u8>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, ReportError> {
    let total_start = Instant::now();

    // ── Step 1: Read per-page text ───────────────────────────────────────
    let text_start = Instant::now();
    let report = extract_text_blocking(bytes).await?;
    let text_duration_ms = text_start.elapsed().as_millis() as u64;
    let report_text = report.joined();
    info!(
        "Report text: {} pages, {} chars ({} empty pages)",
        report.page_count(),
        report_text.len(),
        report.empty_pages()
    );
    if report.is_empty() {
        // Scanned/image-only reports reach the model as an empty prompt
        // suffix; the model will simply find nothing. Worth a warning.
        warn!("No text could be extracted from any page");
    }

    // ── Step 2: Resolve the model ────────────────────────────────────────
    let model = resolve_model(config)?;
    let policy = config.retry_policy();
    let sleeper = TokioSleeper;

    // ── Step 3: Extraction request ───────────────────────────────────────
    let extraction_prompt = config
        .extraction_prompt
        .as_deref()
        .unwrap_or(DEFAULT_EXTRACTION_PROMPT);

    let extract_start = Instant::now();
    let extracted = extract::extract_biomarkers(
        model.as_ref(),
        &policy,
        &sleeper,
        extraction_prompt,
        &report_text,
    )
    .await
    .map_err(ReportError::ExtractionFailed)?;
    let extraction_duration_ms = extract_start.elapsed().as_millis() as u64;

    // ── Step 4: Explanation request (optional) ───────────────────────────
    let explanation_prompt = config
        .explanation_prompt
        .as_deref()
        .unwrap_or(DEFAULT_EXPLANATION_PROMPT);

    let mut explanation = None;
    let mut explanation_error = None;
    let mut explanation_attempts = 0;
    let mut explanation_duration_ms = 0;

    if !config.skip_explanation {
        let explain_start = Instant::now();
        match explain::explain_biomarkers(
            model.as_ref(),
            &policy,
            &sleeper,
            explanation_prompt,
            &extracted.value,
        )
        .await
        {
            Ok(retried) => {
                explanation_attempts = retried.attempts;
                explanation = Some(retried.value);
            }
            Err(e) => {
                warn!("Explanation request failed: {}", e);
                explanation_attempts = failed_attempts(&e, policy.max_attempts);
                explanation_error = Some(e);
            }
        }
        explanation_duration_ms = explain_start.elapsed().as_millis() as u64;
    }

    let stats = AnalysisStats {
        page_count: report.page_count(),
        empty_pages: report.empty_pages(),
        report_chars: report_text.len(),
        model: model.id().to_string(),
        extraction_attempts: extracted.attempts,
        explanation_attempts,
        text_duration_ms,
        extraction_duration_ms,
        explanation_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Analysis complete: {} biomarkers, {}ms total",
        extracted.value.len(),
        stats.total_duration_ms
    );

    Ok(AnalysisOutput {
        biomarkers: extracted.value,
        explanation,
        explanation_error,
        stats,
    })
}

/// Extract per-page text without calling any model.
///
/// Does not require an API key. Useful to check what the model would
/// actually see for a given report.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<ReportText, ReportError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    let bytes = resolved.read().await?;
    extract_text_blocking(bytes).await
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, ReportError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReportError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(analyze(input_str, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// lopdf parsing is CPU-bound; keep it off the async executor's hot path.
async fn extract_text_blocking(bytes: Vec<u8>) -> Result<ReportText, ReportError> {
    tokio::task::spawn_blocking(move || text::extract_report_text(&bytes))
        .await
        .map_err(|e| ReportError::Internal(format!("text extraction task panicked: {e}")))?
}

/// Attempts actually spent on a failed request, as carried in the error.
///
/// `RetriesExhausted` records its own count; other shapes fall back to the
/// configured maximum.
fn failed_attempts(e: &RequestError, fallback: u32) -> u32 {
    match e {
        RequestError::RetriesExhausted { attempts, .. } => *attempts,
        RequestError::MalformedReply { .. } => fallback,
    }
}

/// Resolve the generative model, from most-specific to least-specific.
///
/// 1. **Pre-built model** (`config.provider`) — the caller constructed the
///    model entirely; used as-is. This is the test seam and the middleware
///    hook.
/// 2. **Explicit key** (`config.api_key`) — key supplied programmatically
///    or via `--api-key`.
/// 3. **Environment** (`GEMINI_API_KEY`) — the conventional deployment
///    route; consulted exactly once, here.
///
/// No key anywhere is fatal before any work starts.
fn resolve_model(config: &AnalysisConfig) -> Result<Arc<dyn GenerativeModel>, ReportError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let api_key = config
        .api_key
        .clone()
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .filter(|k| !k.trim().is_empty())
        .ok_or(ReportError::ApiKeyMissing)?;

    let model = GeminiModel::new(&config.model, api_key, config.api_timeout_secs)
        .map_err(|e| ReportError::Internal(format!("failed to build HTTP client: {e}")))?;
    Ok(Arc::new(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelError;
    use async_trait::async_trait;

    struct NeverCalled;

    #[async_trait]
    impl GenerativeModel for NeverCalled {
        async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
            panic!("model must not be called");
        }
        fn id(&self) -> &str {
            "never-called"
        }
    }

    #[test]
    fn prebuilt_provider_wins_over_key() {
        let provider: Arc<dyn GenerativeModel> = Arc::new(NeverCalled);
        let config = AnalysisConfig::builder()
            .provider(Arc::clone(&provider))
            .api_key("unused-key")
            .build()
            .unwrap();
        let resolved = resolve_model(&config).unwrap();
        assert!(Arc::ptr_eq(&resolved, &provider));
    }

    #[test]
    fn explicit_key_builds_a_gemini_model() {
        let config = AnalysisConfig::builder()
            .model("gemini-1.5-pro")
            .api_key("test-key")
            .build()
            .unwrap();
        let resolved = resolve_model(&config).unwrap();
        assert_eq!(resolved.id(), "gemini-1.5-pro");
    }

    #[test]
    fn blank_explicit_key_is_treated_as_missing() {
        // A blank explicit key must not silently produce a client with an
        // unusable credential. It also does not fall back to the environment.
        let config = AnalysisConfig::builder().api_key("   ").build().unwrap();
        let err = resolve_model(&config)
            .err()
            .expect("blank key must not resolve a model");
        assert!(matches!(err, ReportError::ApiKeyMissing));
    }

    #[test]
    fn failed_attempts_come_from_the_error_itself() {
        let exhausted = RequestError::RetriesExhausted {
            attempts: 2,
            detail: "timeout".to_string(),
        };
        assert_eq!(failed_attempts(&exhausted, 3), 2);

        let malformed = RequestError::MalformedReply {
            detail: "not json".to_string(),
        };
        assert_eq!(failed_attempts(&malformed, 3), 3);
    }
}
