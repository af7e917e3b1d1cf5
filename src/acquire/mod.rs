//! Plan acquisition protocol.
//!
//! Drives the external text-generation provider through a structured-first,
//! free-text-fallback sequence and classifies outcomes:
//!
//! 1. **Structured attempt** — request constrained to the schema shape;
//!    parse, coerce missing keys to empty arrays, validate.
//! 2. **Schema-correction retry** — on validation failure, exactly one
//!    corrective follow-up restating the schema and the invalid response.
//! 3. **Unstructured fallback** — on parse or transport failure, a second
//!    request without structural constraints; extract the first well-formed
//!    JSON object from the text.
//! 4. **Failure classification** — remaining provider errors are matched
//!    against their message text into a diagnostic code.
//!
//! The protocol never propagates an error past its boundary: it returns
//! either a validated plan or a diagnostic code the caller surfaces to the
//! end user.

pub mod extract;

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::models::{ChangeRecord, SignalBundle, SuggestionPlan};
use crate::providers::{ChatMessage, CompletionProvider};
use crate::run::log::RunLog;
use crate::schema::{self, PlanLimits};

/// Maximum length of an invalid response echoed back in the corrective
/// follow-up or attached to a diagnostic.
const RESPONSE_PREVIEW_LEN: usize = 2000;

/// Terminal diagnostic codes for failed acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Response parsed but failed schema validation after the one retry.
    SchemaInvalid(String),
    /// No JSON object could be extracted from the fallback response.
    JsonMissing,
    AuthFailure,
    QuotaExceeded,
    DeploymentMisconfigured,
    /// Catch-all for provider errors not matched by a specific pattern.
    ProviderRejected(String),
}

impl Diagnostic {
    /// The stable diagnostic code surfaced to the end user.
    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::SchemaInvalid(_) => "SCHEMA_INVALID",
            Diagnostic::JsonMissing => "JSON_MISSING",
            Diagnostic::AuthFailure => "AUTH_FAILURE",
            Diagnostic::QuotaExceeded => "QUOTA_EXCEEDED",
            Diagnostic::DeploymentMisconfigured => "DEPLOYMENT_MISCONFIGURED",
            Diagnostic::ProviderRejected(_) => "PROVIDER_REJECTED",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SchemaInvalid(detail) => write!(f, "{}: {detail}", self.code()),
            Diagnostic::ProviderRejected(detail) => write!(f, "{}: {detail}", self.code()),
            _ => write!(f, "{}", self.code()),
        }
    }
}

/// How a completed acquisition terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The structured attempt (or its one corrective retry) succeeded.
    OkStructured,
    /// The unstructured fallback succeeded.
    OkFallback,
    Failed(Diagnostic),
}

/// Result of the acquisition protocol: a plan or a diagnostic, never both.
#[derive(Debug)]
pub struct Acquired {
    pub plan: Option<SuggestionPlan>,
    pub outcome: Outcome,
}

impl Acquired {
    fn ok(plan: SuggestionPlan, outcome: Outcome) -> Self {
        Self {
            plan: Some(plan),
            outcome,
        }
    }

    fn failed(diagnostic: Diagnostic) -> Self {
        Self {
            plan: None,
            outcome: Outcome::Failed(diagnostic),
        }
    }
}

/// Run the acquisition protocol against a provider.
///
/// Every provider call is bounded by `timeout`; a timeout is treated as a
/// transport failure and classified like any other provider error.
pub async fn acquire_plan(
    provider: &dyn CompletionProvider,
    changes: &[ChangeRecord],
    signals: &SignalBundle,
    limits: &PlanLimits,
    timeout: Duration,
    log: &mut RunLog,
) -> Acquired {
    let messages = build_messages(changes, signals, limits);

    // Step 1: structured attempt
    log.push("requesting structured suggestion plan");
    let structured = call(provider, &messages, true, timeout).await;

    let response = match structured {
        Ok(text) => text,
        Err(reason) => {
            // Transport failure: go straight to the unstructured fallback
            log.push(format!("structured attempt failed: {reason}"));
            return fallback(provider, &messages, limits, timeout, log).await;
        }
    };

    match serde_json::from_str::<Value>(&response) {
        Ok(value) => {
            let coerced = schema::coerce(value);
            let check = schema::validate(&coerced, limits);
            if check.valid {
                log.push("structured plan validated");
                return finish(coerced, Outcome::OkStructured);
            }

            // Step 2: exactly one corrective follow-up. Not retried further
            // to avoid unbounded loops against a non-cooperative provider.
            log.push(format!("structured plan invalid: {}", check.detail()));
            let corrective = correction_messages(&messages, &response, &check.detail(), limits);
            match call(provider, &corrective, true, timeout).await {
                Ok(retry_response) => match serde_json::from_str::<Value>(&retry_response) {
                    Ok(retry_value) => {
                        let coerced = schema::coerce(retry_value);
                        let retry_check = schema::validate(&coerced, limits);
                        if retry_check.valid {
                            log.push("corrected plan validated");
                            finish(coerced, Outcome::OkStructured)
                        } else {
                            log.push("corrected plan still invalid");
                            Acquired::failed(Diagnostic::SchemaInvalid(retry_check.detail()))
                        }
                    }
                    Err(_) => Acquired::failed(Diagnostic::SchemaInvalid(
                        "corrective response was not valid JSON".to_string(),
                    )),
                },
                Err(reason) => Acquired::failed(classify_provider_error(&reason)),
            }
        }
        Err(_) => {
            // Step 3: parse failure, fall back to free text
            log.push("structured response was not parseable JSON");
            fallback(provider, &messages, limits, timeout, log).await
        }
    }
}

/// Step 3: unstructured fallback request and extraction.
async fn fallback(
    provider: &dyn CompletionProvider,
    messages: &[ChatMessage],
    limits: &PlanLimits,
    timeout: Duration,
    log: &mut RunLog,
) -> Acquired {
    log.push("requesting unstructured fallback");
    let response = match call(provider, messages, false, timeout).await {
        Ok(text) => text,
        Err(reason) => {
            log.push(format!("fallback attempt failed: {reason}"));
            return Acquired::failed(classify_provider_error(&reason));
        }
    };

    let Some(value) = extract::extract_json_object(&response) else {
        log.push("no JSON object found in fallback response");
        return Acquired::failed(Diagnostic::JsonMissing);
    };

    let coerced = schema::coerce(value);
    let check = schema::validate(&coerced, limits);
    if check.valid {
        log.push("fallback plan validated");
        finish(coerced, Outcome::OkFallback)
    } else {
        log.push(format!("fallback plan invalid: {}", check.detail()));
        Acquired::failed(Diagnostic::SchemaInvalid(check.detail()))
    }
}

/// Deserialize a validated, coerced plan value.
fn finish(coerced: Value, outcome: Outcome) -> Acquired {
    match serde_json::from_value::<SuggestionPlan>(coerced) {
        Ok(plan) => Acquired::ok(plan, outcome),
        // Unreachable after validation, but the protocol never panics
        Err(e) => Acquired::failed(Diagnostic::SchemaInvalid(e.to_string())),
    }
}

/// Issue one provider call bounded by the timeout.
///
/// Errors are flattened to their message text so transport failures and
/// timeouts share the classification path.
async fn call(
    provider: &dyn CompletionProvider,
    messages: &[ChatMessage],
    json_mode: bool,
    timeout: Duration,
) -> Result<String, String> {
    match tokio::time::timeout(timeout, provider.complete(messages, json_mode)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!(
            "request timed out after {}s",
            timeout.as_secs()
        )),
    }
}

/// Classify an unhandled provider error by its message text.
pub fn classify_provider_error(message: &str) -> Diagnostic {
    let lower = message.to_lowercase();

    if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
        || lower.contains("invalid api key")
    {
        Diagnostic::AuthFailure
    } else if lower.contains("429")
        || lower.contains("quota")
        || lower.contains("rate limit")
        || lower.contains("too many requests")
        || lower.contains("billing")
    {
        Diagnostic::QuotaExceeded
    } else if lower.contains("404")
        || lower.contains("deployment")
        || lower.contains("model not found")
        || lower.contains("does not exist")
    {
        Diagnostic::DeploymentMisconfigured
    } else {
        let mut detail = message.to_string();
        detail.truncate(RESPONSE_PREVIEW_LEN);
        Diagnostic::ProviderRejected(detail)
    }
}

/// Build the role-tagged message list for the initial request.
fn build_messages(
    changes: &[ChangeRecord],
    signals: &SignalBundle,
    limits: &PlanLimits,
) -> Vec<ChatMessage> {
    let system = format!(
        "You are an automated pull-request reviewer. Inspect the change-set \
         and propose review comments plus regression tests for the riskiest \
         changes. Only flag issues you are confident about.\n\n{}",
        schema::instructions(limits)
    );

    let mut user = String::from("## Change-set\n\n");
    for change in changes {
        user.push_str(&format!(
            "### {} ({}, +{}/-{})\n\n```diff\n{}\n```\n\n",
            change.path, change.status, change.additions, change.deletions, change.diff
        ));
    }

    user.push_str("## Repository signals\n\n");
    if !signals.languages.is_empty() {
        user.push_str(&format!("Languages: {}\n", signals.languages.join(", ")));
    }
    if let Some(ref pm) = signals.package_manager {
        user.push_str(&format!("Package manager: {pm}\n"));
    }
    if !signals.test_frameworks.is_empty() {
        user.push_str(&format!(
            "Test frameworks: {}\n",
            signals.test_frameworks.join(", ")
        ));
    }
    if !signals.dependencies.is_empty() {
        user.push_str(&format!(
            "Dependencies: {}\n",
            signals.dependencies.join(", ")
        ));
    }
    if !signals.test_paths.is_empty() {
        user.push_str(&format!(
            "Existing test files: {}\n",
            signals.test_paths.join(", ")
        ));
    }
    if !signals.route_paths.is_empty() {
        user.push_str(&format!(
            "Route/handler files: {}\n",
            signals.route_paths.join(", ")
        ));
    }
    if !signals.schema_paths.is_empty() {
        user.push_str(&format!(
            "Schema/model files: {}\n",
            signals.schema_paths.join(", ")
        ));
    }

    for (name, excerpt) in &signals.doc_excerpts {
        user.push_str(&format!("\n### Excerpt: {name}\n\n{excerpt}\n"));
    }

    if !signals.analysis.is_empty() {
        user.push_str("\n## Static analysis findings\n\n");
        for finding in &signals.analysis {
            user.push_str(&format!(
                "- [{}] {}:{} {} — {}\n",
                finding.severity, finding.file, finding.line, finding.rule, finding.message
            ));
        }
    }

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Build the one corrective follow-up message list.
fn correction_messages(
    base: &[ChatMessage],
    invalid_response: &str,
    errors: &str,
    limits: &PlanLimits,
) -> Vec<ChatMessage> {
    let mut preview = invalid_response.to_string();
    preview.truncate(RESPONSE_PREVIEW_LEN);

    let mut messages = base.to_vec();
    messages.push(ChatMessage::user(format!(
        "Your previous response did not match the required schema.\n\n\
         Validation errors: {errors}\n\n\
         Previous response:\n```json\n{preview}\n```\n\n\
         Respond again, following the schema exactly:\n\n{}",
        schema::instructions(limits)
    )));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted provider: pops one response per call.
    struct ScriptedProvider {
        responses: Mutex<Vec<Result<String, ProviderError>>>,
        calls: Mutex<Vec<bool>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn json_modes(&self) -> Vec<bool> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            json_mode: bool,
        ) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push(json_mode);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(ProviderError::ApiError("script exhausted".into()));
            }
            responses.remove(0)
        }
    }

    fn timeout() -> Duration {
        Duration::from_secs(5)
    }

    async fn acquire(provider: &ScriptedProvider) -> Acquired {
        let mut log = RunLog::new();
        acquire_plan(
            provider,
            &[],
            &SignalBundle::default(),
            &PlanLimits::default(),
            timeout(),
            &mut log,
        )
        .await
    }

    const VALID_PLAN: &str = r#"{"comments": [{"path": "a.js", "line": 3, "severity": "HIGH", "title": "Bug", "body": "Details."}], "tests": []}"#;

    #[tokio::test]
    async fn structured_success() {
        let provider = ScriptedProvider::new(vec![Ok(VALID_PLAN.to_string())]);
        let acquired = acquire(&provider).await;
        assert_eq!(acquired.outcome, Outcome::OkStructured);
        assert_eq!(acquired.plan.unwrap().comments.len(), 1);
        assert_eq!(provider.json_modes(), vec![true]);
    }

    #[tokio::test]
    async fn empty_object_coerced_and_accepted() {
        let provider = ScriptedProvider::new(vec![Ok("{}".to_string())]);
        let acquired = acquire(&provider).await;
        assert_eq!(acquired.outcome, Outcome::OkStructured);
        let plan = acquired.plan.unwrap();
        assert!(plan.comments.is_empty());
        assert!(plan.tests.is_empty());
    }

    #[tokio::test]
    async fn corrective_retry_recovers() {
        let invalid = r#"{"comments": [{"path": "a.js", "line": 0, "severity": "URGENT", "title": "Bug", "body": "x"}], "tests": []}"#;
        let provider =
            ScriptedProvider::new(vec![Ok(invalid.to_string()), Ok(VALID_PLAN.to_string())]);
        let acquired = acquire(&provider).await;
        assert_eq!(acquired.outcome, Outcome::OkStructured);
        assert!(acquired.plan.is_some());
        // Both calls were structured
        assert_eq!(provider.json_modes(), vec![true, true]);
    }

    #[tokio::test]
    async fn corrective_retry_fails_terminally() {
        let invalid = r#"{"comments": [{"path": "", "line": 1, "severity": "HIGH", "title": "T", "body": "x"}], "tests": []}"#;
        let provider =
            ScriptedProvider::new(vec![Ok(invalid.to_string()), Ok(invalid.to_string())]);
        let acquired = acquire(&provider).await;
        assert!(acquired.plan.is_none());
        match acquired.outcome {
            Outcome::Failed(Diagnostic::SchemaInvalid(detail)) => {
                assert!(detail.contains("path"));
            }
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
        // Exactly one corrective follow-up, never more
        assert_eq!(provider.json_modes().len(), 2);
    }

    #[tokio::test]
    async fn parse_failure_falls_back_to_free_text() {
        let fallback_text = format!("Here is my review:\n```json\n{VALID_PLAN}\n```");
        let provider = ScriptedProvider::new(vec![
            Ok("I could not produce JSON".to_string()),
            Ok(fallback_text),
        ]);
        let acquired = acquire(&provider).await;
        assert_eq!(acquired.outcome, Outcome::OkFallback);
        assert!(acquired.plan.is_some());
        // First call structured, second unstructured
        assert_eq!(provider.json_modes(), vec![true, false]);
    }

    #[tokio::test]
    async fn transport_error_falls_back() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::ApiError("connection reset".into())),
            Ok(VALID_PLAN.to_string()),
        ]);
        let acquired = acquire(&provider).await;
        assert_eq!(acquired.outcome, Outcome::OkFallback);
    }

    #[tokio::test]
    async fn fallback_without_json_is_json_missing() {
        let provider = ScriptedProvider::new(vec![
            Ok("no json".to_string()),
            Ok("still no json".to_string()),
        ]);
        let acquired = acquire(&provider).await;
        assert_eq!(acquired.outcome, Outcome::Failed(Diagnostic::JsonMissing));
        assert!(acquired.plan.is_none());
    }

    #[tokio::test]
    async fn fallback_invalid_plan_is_schema_invalid() {
        let invalid = r#"{"comments": [{"path": "a.js"}], "tests": []}"#;
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::ApiError("boom".into())),
            Ok(invalid.to_string()),
        ]);
        let acquired = acquire(&provider).await;
        assert!(matches!(
            acquired.outcome,
            Outcome::Failed(Diagnostic::SchemaInvalid(_))
        ));
    }

    #[tokio::test]
    async fn auth_error_classified() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::ApiError("401 Unauthorized".into())),
            Err(ProviderError::ApiError("401 Unauthorized".into())),
        ]);
        let acquired = acquire(&provider).await;
        assert_eq!(acquired.outcome, Outcome::Failed(Diagnostic::AuthFailure));
    }

    #[test]
    fn classify_quota() {
        assert_eq!(
            classify_provider_error("HTTP 429 Too Many Requests"),
            Diagnostic::QuotaExceeded
        );
        assert_eq!(
            classify_provider_error("monthly quota exhausted"),
            Diagnostic::QuotaExceeded
        );
    }

    #[test]
    fn classify_deployment() {
        assert_eq!(
            classify_provider_error("deployment 'gpt-x' not found"),
            Diagnostic::DeploymentMisconfigured
        );
        assert_eq!(
            classify_provider_error("404 model not found"),
            Diagnostic::DeploymentMisconfigured
        );
    }

    #[test]
    fn classify_auth() {
        assert_eq!(
            classify_provider_error("invalid api key supplied"),
            Diagnostic::AuthFailure
        );
    }

    #[test]
    fn classify_catch_all() {
        match classify_provider_error("something odd happened") {
            Diagnostic::ProviderRejected(detail) => {
                assert!(detail.contains("something odd"));
            }
            other => panic!("expected ProviderRejected, got {other:?}"),
        }
    }

    #[test]
    fn classify_timeout_is_rejected_not_panicked() {
        // Timeouts share the message-text path and land in the catch-all
        assert!(matches!(
            classify_provider_error("request timed out after 120s"),
            Diagnostic::ProviderRejected(_)
        ));
    }

    #[test]
    fn diagnostic_codes() {
        assert_eq!(Diagnostic::JsonMissing.code(), "JSON_MISSING");
        assert_eq!(
            Diagnostic::SchemaInvalid("x".into()).code(),
            "SCHEMA_INVALID"
        );
        assert_eq!(Diagnostic::AuthFailure.to_string(), "AUTH_FAILURE");
        assert!(Diagnostic::SchemaInvalid("bad title".into())
            .to_string()
            .contains("bad title"));
    }

    #[test]
    fn messages_include_changes_and_signals() {
        let changes = vec![ChangeRecord {
            path: "src/api.js".into(),
            status: crate::models::ChangeStatus::Modified,
            diff: "+const x = 1;".into(),
            additions: 1,
            deletions: 0,
        }];
        let mut signals = SignalBundle::default();
        signals.languages.push("javascript".into());
        signals.package_manager = Some("npm".into());

        let messages = build_messages(&changes, &signals, &PlanLimits::default());
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("\"comments\""));
        assert!(messages[1].content.contains("src/api.js"));
        assert!(messages[1].content.contains("+const x = 1;"));
        assert!(messages[1].content.contains("npm"));
    }

    #[test]
    fn correction_restates_schema_and_response() {
        let base = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let corrected = correction_messages(&base, "{bad}", "line must be >= 1", &PlanLimits::default());
        assert_eq!(corrected.len(), 3);
        let last = &corrected[2].content;
        assert!(last.contains("{bad}"));
        assert!(last.contains("line must be >= 1"));
        assert!(last.contains("CRITICAL"));
    }
}
