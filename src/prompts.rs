//! Prompt templates for the two model requests.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tweaking the JSON shape or the tone of the
//!    explanation means editing exactly one place.
//!
//! 2. **Testability** — unit tests import and inspect the built prompts
//!    directly without calling a real model, so prompt regressions are cheap
//!    to catch.
//!
//! Callers can override both templates via
//! [`crate::config::AnalysisConfig`]; the constants here are used only when
//! no override is provided.

/// Extraction instruction prefix. The report text is appended after it.
///
/// The JSON shape named here is the contract the extraction parser expects:
/// a top-level `biomarkers` array of objects with `name`, `value`,
/// `test_name`, and `reference_range` string fields.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"Extract all medical biomarkers from the given text and format them as a JSON object.
The JSON format must be exactly:
{
    "biomarkers": [
        {
            "name": "<Biomarker Name>",
            "value": "<Observed Value>",
            "test_name": "<Test Name>",
            "reference_range": "<Reference Range>"
        }
    ]
}
Output ONLY the JSON object, with no commentary and no code fences.
Here is the extracted medical report text:"#;

/// Explanation instruction prefix. The biomarker JSON is appended after it.
pub const DEFAULT_EXPLANATION_PROMPT: &str = r#"Please explain the following biomarkers in simple terms for a non-medical person.
Provide what they indicate, whether their values are normal or abnormal, and possible health implications."#;

/// Build the full extraction prompt for one report.
pub fn extraction_prompt(template: &str, report_text: &str) -> String {
    format!("{template}\n{report_text}")
}

/// Build the full explanation prompt for one extracted biomarker set.
///
/// `biomarkers_json` is the pretty-printed serialization of the set, so the
/// model sees exactly the structure it previously produced.
pub fn explanation_prompt(template: &str, biomarkers_json: &str) -> String {
    format!("{template}\n\n{biomarkers_json}")
}
