//! The explanation request: prompt with the extracted JSON, raw text reply.
//!
//! Unlike extraction there is no parse step — whatever prose the model
//! returns is the explanation. Failures surface as the same
//! [`RequestError`] the extraction request uses, so callers handle both
//! stages with one error shape.

use crate::error::RequestError;
use crate::llm::GenerativeModel;
use crate::output::BiomarkerSet;
use crate::prompts;
use crate::retry::{Retried, RetryPolicy, Sleeper};
use tracing::info;

/// Fixed message returned when explanation is requested for a failed
/// extraction. No model call is made in that case.
pub const CANNOT_EXPLAIN_MESSAGE: &str = "Cannot explain biomarkers: extraction failed.";

/// Run the explanation request for a successfully extracted set.
///
/// The prompt embeds the pretty-printed JSON serialization of `set`, so the
/// model explains exactly the structure it previously produced.
pub async fn explain_biomarkers(
    model: &dyn GenerativeModel,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    prompt_template: &str,
    set: &BiomarkerSet,
) -> Result<Retried<String>, RequestError> {
    let set_json = serde_json::to_string_pretty(set)
        .unwrap_or_else(|_| "{\"biomarkers\": []}".to_string());
    let prompt = prompts::explanation_prompt(prompt_template, &set_json);
    info!(
        "Explanation request: {} biomarkers, model {}",
        set.len(),
        model.id()
    );

    policy
        .run(sleeper, || async {
            model.generate(&prompt).await
        })
        .await
        .map_err(|exhausted| RequestError::RetriesExhausted {
            attempts: exhausted.attempts,
            detail: exhausted.last_error.to_string(),
        })
}

/// Explain an extraction *result*.
///
/// When the extraction already failed, this short-circuits to the fixed
/// [`CANNOT_EXPLAIN_MESSAGE`] without touching the model (`attempts` is 0 in
/// that case). Otherwise it behaves exactly like [`explain_biomarkers`].
pub async fn explain_extraction(
    model: &dyn GenerativeModel,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    prompt_template: &str,
    extraction: &Result<BiomarkerSet, RequestError>,
) -> Result<Retried<String>, RequestError> {
    match extraction {
        Ok(set) => explain_biomarkers(model, policy, sleeper, prompt_template, set).await,
        Err(_) => Ok(Retried {
            value: CANNOT_EXPLAIN_MESSAGE.to_string(),
            attempts: 0,
        }),
    }
}
