//! Mock-model integration tests for the full extraction/explanation path.
//!
//! No network, no API key: a scripted [`GenerativeModel`] stands in for
//! Gemini, and the recording sleeper turns retry delays into assertions
//! instead of waiting. These run in CI on every push.

use async_trait::async_trait;
use medreport_biomarkers::{
    explain_biomarkers, explain_extraction, extract_biomarkers, AnalysisConfig, BiomarkerSet,
    GenerativeModel, ModelError, RequestError, RetryPolicy, Sleeper, CANNOT_EXPLAIN_MESSAGE,
    DEFAULT_EXPLANATION_PROMPT, DEFAULT_EXTRACTION_PROMPT,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ── Test doubles ─────────────────────────────────────────────────────────────

/// A model that replays a fixed script of replies and counts its calls.
struct ScriptedModel {
    replies: Mutex<Vec<Result<String, String>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn always(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string())])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let mut replies = self.replies.lock().unwrap();
        let next = if replies.len() > 1 {
            replies.remove(0)
        } else {
            replies[0].clone()
        };
        next.map_err(|msg| ModelError::Transport(msg))
    }

    fn id(&self) -> &str {
        "scripted"
    }
}

/// A model whose every call times out.
struct AlwaysTimeout {
    calls: AtomicUsize,
}

#[async_trait]
impl GenerativeModel for AlwaysTimeout {
    async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ModelError::Timeout { secs: 60 })
    }

    fn id(&self) -> &str {
        "always-timeout"
    }
}

/// Records requested sleeps without waiting.
#[derive(Default)]
struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

fn default_policy() -> RetryPolicy {
    AnalysisConfig::default().retry_policy()
}

const HEMOGLOBIN_REPLY: &str = r#"{"biomarkers":[{"name":"Hemoglobin","value":"13.5 g/dL","test_name":"CBC","reference_range":"12-16"}]}"#;

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn extraction_parses_hemoglobin_scenario() {
    let model = ScriptedModel::always(HEMOGLOBIN_REPLY);
    let sleeper = RecordingSleeper::default();

    let result = extract_biomarkers(
        &model,
        &default_policy(),
        &sleeper,
        DEFAULT_EXTRACTION_PROMPT,
        "Hemoglobin 13.5 g/dL (Normal 12-16)",
    )
    .await
    .unwrap();

    assert_eq!(result.attempts, 1);
    assert_eq!(result.value.len(), 1);
    let b = &result.value.biomarkers[0];
    assert_eq!(b.name, "Hemoglobin");
    assert_eq!(b.value, "13.5 g/dL");
    assert_eq!(b.test_name, "CBC");
    assert_eq!(b.reference_range, "12-16");

    // The report text must actually reach the model inside the prompt.
    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains("Hemoglobin 13.5 g/dL (Normal 12-16)"));
}

#[tokio::test]
async fn extraction_timeout_exhausts_exactly_three_attempts() {
    let model = AlwaysTimeout {
        calls: AtomicUsize::new(0),
    };
    let sleeper = RecordingSleeper::default();

    let err = extract_biomarkers(
        &model,
        &default_policy(),
        &sleeper,
        DEFAULT_EXTRACTION_PROMPT,
        "report text",
    )
    .await
    .unwrap_err();

    assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    match err {
        RequestError::RetriesExhausted { attempts, detail } => {
            assert_eq!(attempts, 3);
            assert!(detail.contains("timed out"), "got: {detail}");
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }

    // Two inter-attempt pauses of the flat 2 s default delay, a minimum
    // elapsed wait of 4 s had the sleeper been real.
    let slept = sleeper.slept.lock().unwrap().clone();
    assert_eq!(slept, vec![Duration::from_secs(2), Duration::from_secs(2)]);
}

#[tokio::test]
async fn extraction_of_invalid_json_yields_malformed_reply_error() {
    let model = ScriptedModel::always("Sure! The biomarkers are hemoglobin and WBC.");
    let sleeper = RecordingSleeper::default();

    let err = extract_biomarkers(
        &model,
        &default_policy(),
        &sleeper,
        DEFAULT_EXTRACTION_PROMPT,
        "report text",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RequestError::MalformedReply { .. }));
}

#[tokio::test]
async fn extraction_recovers_when_a_later_attempt_succeeds() {
    let model = ScriptedModel::new(vec![
        Err("connection reset by peer".to_string()),
        Ok(HEMOGLOBIN_REPLY.to_string()),
    ]);
    let sleeper = RecordingSleeper::default();

    let result = extract_biomarkers(
        &model,
        &default_policy(),
        &sleeper,
        DEFAULT_EXTRACTION_PROMPT,
        "report text",
    )
    .await
    .unwrap();

    assert_eq!(result.attempts, 2);
    assert_eq!(model.calls(), 2);
    assert_eq!(result.value.biomarkers[0].name, "Hemoglobin");
}

#[tokio::test]
async fn extraction_strips_code_fences_from_the_reply() {
    let fenced = format!("```json\n{HEMOGLOBIN_REPLY}\n```");
    let model = ScriptedModel::always(&fenced);
    let sleeper = RecordingSleeper::default();

    let result = extract_biomarkers(
        &model,
        &default_policy(),
        &sleeper,
        DEFAULT_EXTRACTION_PROMPT,
        "report text",
    )
    .await
    .unwrap();

    assert_eq!(result.value.biomarkers[0].value, "13.5 g/dL");
}

#[tokio::test]
async fn extraction_passes_missing_fields_through_unchanged() {
    let model = ScriptedModel::always(r#"{"biomarkers":[{"name":"LDL","value":"130 mg/dL"}]}"#);
    let sleeper = RecordingSleeper::default();

    let result = extract_biomarkers(
        &model,
        &default_policy(),
        &sleeper,
        DEFAULT_EXTRACTION_PROMPT,
        "LDL 130",
    )
    .await
    .unwrap();

    let b = &result.value.biomarkers[0];
    assert_eq!(b.name, "LDL");
    assert_eq!(b.test_name, "");
    assert_eq!(b.reference_range, "");
}

// ── Explanation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn explanation_embeds_the_set_and_returns_raw_text() {
    let model = ScriptedModel::always(
        "Your hemoglobin of 13.5 g/dL sits comfortably within the normal range.",
    );
    let sleeper = RecordingSleeper::default();
    let set: BiomarkerSet = serde_json::from_str(HEMOGLOBIN_REPLY).unwrap();

    let result = explain_biomarkers(
        &model,
        &default_policy(),
        &sleeper,
        DEFAULT_EXPLANATION_PROMPT,
        &set,
    )
    .await
    .unwrap();

    assert!(result.value.contains("normal range"));
    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains("\"Hemoglobin\""), "prompt must embed the set JSON");
    assert!(prompts[0].contains("non-medical person"));
}

#[tokio::test]
async fn failed_extraction_short_circuits_explanation_without_model_calls() {
    let model = ScriptedModel::always("must never be requested");
    let sleeper = RecordingSleeper::default();
    let extraction: Result<BiomarkerSet, RequestError> = Err(RequestError::RetriesExhausted {
        attempts: 3,
        detail: "timeout".into(),
    });

    let result = explain_extraction(
        &model,
        &default_policy(),
        &sleeper,
        DEFAULT_EXPLANATION_PROMPT,
        &extraction,
    )
    .await
    .unwrap();

    assert_eq!(result.value, CANNOT_EXPLAIN_MESSAGE);
    assert_eq!(result.attempts, 0);
    assert_eq!(model.calls(), 0, "remote model must not be invoked");
}

#[tokio::test]
async fn successful_extraction_flows_through_explain_extraction() {
    let model = ScriptedModel::always("All values look normal.");
    let sleeper = RecordingSleeper::default();
    let extraction: Result<BiomarkerSet, RequestError> =
        Ok(serde_json::from_str(HEMOGLOBIN_REPLY).unwrap());

    let result = explain_extraction(
        &model,
        &default_policy(),
        &sleeper,
        DEFAULT_EXPLANATION_PROMPT,
        &extraction,
    )
    .await
    .unwrap();

    assert_eq!(result.value, "All values look normal.");
    assert_eq!(model.calls(), 1);
}
