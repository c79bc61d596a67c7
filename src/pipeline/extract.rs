//! The biomarker extraction request: prompt, retry, strict JSON parse.
//!
//! The retried operation covers the model call **and** the JSON parse. A
//! syntactically broken reply is as transient as a 503 — the model may well
//! produce valid JSON on the next attempt — so both count as a failed
//! attempt under the retry policy.
//!
//! The parse is strict: the reply must be one JSON object matching the
//! `BiomarkerSet` shape. No partial parse is attempted — the result is a
//! complete set or an error, never a mix. The only concession to model
//! quirks is fence stripping: models wrap JSON in ``` fences despite the
//! prompt saying not to, and peeling those off before parsing is cheaper
//! than a retry round-trip.

use crate::error::RequestError;
use crate::llm::{GenerativeModel, ModelError};
use crate::output::BiomarkerSet;
use crate::prompts;
use crate::retry::{Retried, RetryPolicy, Sleeper};
use tracing::info;

/// One failed attempt: either the call itself or the parse of its reply.
enum AttemptError {
    Model(ModelError),
    Parse(serde_json::Error),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Model(e) => write!(f, "{e}"),
            AttemptError::Parse(e) => write!(f, "reply is not valid JSON: {e}"),
        }
    }
}

/// Run the extraction request for one report.
///
/// Builds the extraction prompt from `prompt_template` and `report_text`,
/// submits it via the retry policy, and parses the reply strictly as a
/// [`BiomarkerSet`]. Returns the set together with the attempt count, or a
/// [`RequestError`] when every attempt failed — never panics, never returns
/// a partial set.
pub async fn extract_biomarkers(
    model: &dyn GenerativeModel,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    prompt_template: &str,
    report_text: &str,
) -> Result<Retried<BiomarkerSet>, RequestError> {
    let prompt = prompts::extraction_prompt(prompt_template, report_text);
    info!(
        "Extraction request: {} chars of report text, model {}",
        report_text.len(),
        model.id()
    );

    let outcome = policy
        .run(sleeper, || async {
            let reply = model.generate(&prompt).await.map_err(AttemptError::Model)?;
            parse_reply(&reply).map_err(AttemptError::Parse)
        })
        .await;

    match outcome {
        Ok(retried) => {
            info!(
                "Extraction succeeded: {} biomarkers after {} attempt(s)",
                retried.value.len(),
                retried.attempts
            );
            Ok(retried)
        }
        Err(exhausted) => Err(match exhausted.last_error {
            AttemptError::Parse(e) => RequestError::MalformedReply {
                detail: e.to_string(),
            },
            AttemptError::Model(e) => RequestError::RetriesExhausted {
                attempts: exhausted.attempts,
                detail: e.to_string(),
            },
        }),
    }
}

/// Parse a model reply strictly as a `BiomarkerSet`, tolerating code fences.
fn parse_reply(reply: &str) -> Result<BiomarkerSet, serde_json::Error> {
    serde_json::from_str(strip_code_fences(reply))
}

/// Peel a single outer ``` fence pair off the reply, if present.
///
/// Handles both bare fences and language-tagged ones (```json). Anything
/// that is not a clean outer fence pair is returned untouched; the JSON
/// parser produces the error message in that case.
fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line (e.g. "json").
    match body.split_once('\n') {
        Some((first_line, remainder)) if !first_line.trim().starts_with(['{', '[']) => {
            remainder.trim()
        }
        _ => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_tagged_fences() {
        let reply = "```json\n{\"biomarkers\": []}\n```";
        assert_eq!(strip_code_fences(reply), "{\"biomarkers\": []}");
    }

    #[test]
    fn strips_bare_fences() {
        let reply = "```\n{\"biomarkers\": []}\n```";
        assert_eq!(strip_code_fences(reply), "{\"biomarkers\": []}");
    }

    #[test]
    fn unfenced_reply_is_untouched() {
        assert_eq!(
            strip_code_fences("  {\"biomarkers\": []}  "),
            "{\"biomarkers\": []}"
        );
    }

    #[test]
    fn fence_opening_directly_with_json_is_handled() {
        let reply = "```{\"biomarkers\": []}```";
        assert_eq!(strip_code_fences(reply), "{\"biomarkers\": []}");
    }

    #[test]
    fn parse_reply_rejects_prose() {
        assert!(parse_reply("Here are your biomarkers!").is_err());
    }

    #[test]
    fn parse_reply_accepts_fenced_set() {
        let set = parse_reply("```json\n{\"biomarkers\": [{\"name\": \"Hemoglobin\"}]}\n```")
            .unwrap();
        assert_eq!(set.biomarkers[0].name, "Hemoglobin");
    }
}
