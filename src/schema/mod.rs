//! Declarative structural validation of suggestion plans.
//!
//! The validator describes the acceptable shape of a [`SuggestionPlan`]:
//! required fields, types, enumerated severities and merge modes, and the
//! configurable list-length caps. It checks structure only — suggestion
//! quality is out of scope.

use serde_json::Value;

/// Maximum length of a comment title.
pub const MAX_TITLE_LEN: usize = 120;

/// Maximum length of a comment body.
pub const MAX_BODY_LEN: usize = 2000;

/// Accepted severity values (matched case-insensitively).
const SEVERITIES: &[&str] = &["LOW", "MEDIUM", "HIGH", "CRITICAL"];

/// Accepted merge-mode values.
const MERGE_MODES: &[&str] = &["create", "append_or_create", "replace"];

/// Configurable list-length caps for a plan.
#[derive(Debug, Clone, Copy)]
pub struct PlanLimits {
    pub max_comments: usize,
    pub max_tests: usize,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_comments: 4,
            max_tests: 2,
        }
    }
}

/// Result of a structural check.
#[derive(Debug, Clone)]
pub struct SchemaCheck {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl SchemaCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    fn failed(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }

    /// Join the errors into a single diagnostic string.
    pub fn detail(&self) -> String {
        self.errors.join("; ")
    }
}

/// Coerce a candidate value into a fully-shaped plan object.
///
/// A non-object becomes `{}`; missing or non-array `comments`/`tests` keys
/// become empty arrays. Every downstream component can then assume both
/// lists are present.
pub fn coerce(value: Value) -> Value {
    let mut object = match value {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };

    for key in ["comments", "tests"] {
        if !matches!(object.get(key), Some(Value::Array(_))) {
            object.insert(key.to_string(), Value::Array(Vec::new()));
        }
    }

    Value::Object(object)
}

/// Validate a coerced plan object against the contract.
///
/// Accepts an already-shaped object with empty arrays; rejects missing
/// required fields, out-of-enum severities or merge modes, over-long
/// titles/bodies, and lists exceeding the caps.
pub fn validate(value: &Value, limits: &PlanLimits) -> SchemaCheck {
    let mut errors = Vec::new();

    let Some(object) = value.as_object() else {
        return SchemaCheck::failed(vec!["plan must be a JSON object".to_string()]);
    };

    match object.get("comments").and_then(Value::as_array) {
        Some(comments) => {
            if comments.len() > limits.max_comments {
                errors.push(format!(
                    "comments list has {} entries, max is {}",
                    comments.len(),
                    limits.max_comments
                ));
            }
            for (i, comment) in comments.iter().enumerate() {
                validate_comment(comment, i, &mut errors);
            }
        }
        None => errors.push("missing required array field 'comments'".to_string()),
    }

    match object.get("tests").and_then(Value::as_array) {
        Some(tests) => {
            if tests.len() > limits.max_tests {
                errors.push(format!(
                    "tests list has {} entries, max is {}",
                    tests.len(),
                    limits.max_tests
                ));
            }
            for (i, test) in tests.iter().enumerate() {
                validate_test(test, i, &mut errors);
            }
        }
        None => errors.push("missing required array field 'tests'".to_string()),
    }

    if errors.is_empty() {
        SchemaCheck::ok()
    } else {
        SchemaCheck::failed(errors)
    }
}

fn validate_comment(value: &Value, index: usize, errors: &mut Vec<String>) {
    let Some(comment) = value.as_object() else {
        errors.push(format!("comments[{index}] must be an object"));
        return;
    };

    match comment.get("path").and_then(Value::as_str) {
        Some(path) if !path.is_empty() => {}
        _ => errors.push(format!("comments[{index}].path must be a non-empty string")),
    }

    match comment.get("line").and_then(Value::as_u64) {
        Some(line) if line >= 1 => {}
        _ => errors.push(format!("comments[{index}].line must be an integer >= 1")),
    }

    match comment.get("severity").and_then(Value::as_str) {
        Some(severity) if SEVERITIES.contains(&severity.to_uppercase().as_str()) => {}
        Some(other) => errors.push(format!(
            "comments[{index}].severity '{other}' is not one of {SEVERITIES:?}"
        )),
        None => errors.push(format!("comments[{index}].severity must be a string")),
    }

    match comment.get("title").and_then(Value::as_str) {
        Some(title) if title.is_empty() => {
            errors.push(format!("comments[{index}].title must be non-empty"));
        }
        Some(title) if title.chars().count() > MAX_TITLE_LEN => {
            errors.push(format!(
                "comments[{index}].title exceeds {MAX_TITLE_LEN} chars"
            ));
        }
        Some(_) => {}
        None => errors.push(format!("comments[{index}].title must be a string")),
    }

    match comment.get("body").and_then(Value::as_str) {
        Some(body) if body.chars().count() > MAX_BODY_LEN => {
            errors.push(format!("comments[{index}].body exceeds {MAX_BODY_LEN} chars"));
        }
        Some(_) => {}
        None => errors.push(format!("comments[{index}].body must be a string")),
    }
}

fn validate_test(value: &Value, index: usize, errors: &mut Vec<String>) {
    let Some(test) = value.as_object() else {
        errors.push(format!("tests[{index}] must be an object"));
        return;
    };

    for field in ["language", "framework", "path", "content"] {
        match test.get(field).and_then(Value::as_str) {
            Some(s) if !s.is_empty() => {}
            _ => errors.push(format!("tests[{index}].{field} must be a non-empty string")),
        }
    }

    match test.get("mode").and_then(Value::as_str) {
        Some(mode) if MERGE_MODES.contains(&mode) => {}
        Some(other) => errors.push(format!(
            "tests[{index}].mode '{other}' is not one of {MERGE_MODES:?}"
        )),
        None => errors.push(format!("tests[{index}].mode must be a string")),
    }
}

/// Render the contract as prompt instructions.
///
/// Restated verbatim in both the initial request and the one corrective
/// follow-up so the provider always sees the same schema description.
pub fn instructions(limits: &PlanLimits) -> String {
    format!(
        "Respond with a single JSON object with exactly two keys:\n\
         - \"comments\": array (max {} entries) of objects with:\n\
           - \"path\": file path relative to the repository root\n\
           - \"line\": line number in the new file (integer >= 1)\n\
           - \"severity\": exactly one of \"LOW\", \"MEDIUM\", \"HIGH\", \"CRITICAL\"\n\
           - \"title\": short summary (max {MAX_TITLE_LEN} chars)\n\
           - \"body\": detailed explanation (max {MAX_BODY_LEN} chars)\n\
         - \"tests\": array (max {} entries) of objects with:\n\
           - \"language\": programming language of the test\n\
           - \"framework\": test framework name\n\
           - \"path\": target file path relative to the repository root\n\
           - \"mode\": exactly one of \"create\", \"append_or_create\", \"replace\"\n\
           - \"content\": complete non-empty file content\n\
         If you have nothing to suggest, return {{\"comments\": [], \"tests\": []}}.",
        limits.max_comments, limits.max_tests,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_empty_object_adds_both_lists() {
        let coerced = coerce(json!({}));
        assert_eq!(coerced["comments"], json!([]));
        assert_eq!(coerced["tests"], json!([]));
    }

    #[test]
    fn coerce_non_object_becomes_empty_plan() {
        let coerced = coerce(json!("not a plan"));
        assert_eq!(coerced, json!({"comments": [], "tests": []}));
        let coerced = coerce(json!(null));
        assert_eq!(coerced, json!({"comments": [], "tests": []}));
    }

    #[test]
    fn coerce_replaces_non_array_keys() {
        let coerced = coerce(json!({"comments": "oops", "tests": 42}));
        assert_eq!(coerced["comments"], json!([]));
        assert_eq!(coerced["tests"], json!([]));
    }

    #[test]
    fn coerce_preserves_existing_arrays() {
        let coerced = coerce(json!({"comments": [{"path": "a.js"}], "tests": []}));
        assert_eq!(coerced["comments"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn empty_coerced_plan_validates() {
        let value = coerce(json!({}));
        let check = validate(&value, &PlanLimits::default());
        assert!(check.valid, "errors: {:?}", check.errors);
    }

    fn valid_comment() -> serde_json::Value {
        json!({
            "path": "src/a.js",
            "line": 10,
            "severity": "HIGH",
            "title": "Missing null check",
            "body": "The value may be null here."
        })
    }

    fn valid_test_artifact() -> serde_json::Value {
        json!({
            "language": "javascript",
            "framework": "jest",
            "path": "tests/a.test.js",
            "mode": "create",
            "content": "test('x', () => {});"
        })
    }

    #[test]
    fn well_formed_plan_validates() {
        let value = json!({"comments": [valid_comment()], "tests": [valid_test_artifact()]});
        let check = validate(&value, &PlanLimits::default());
        assert!(check.valid, "errors: {:?}", check.errors);
    }

    #[test]
    fn severity_is_case_insensitive() {
        let mut comment = valid_comment();
        comment["severity"] = json!("high");
        let value = json!({"comments": [comment], "tests": []});
        assert!(validate(&value, &PlanLimits::default()).valid);
    }

    #[test]
    fn out_of_enum_severity_rejected() {
        let mut comment = valid_comment();
        comment["severity"] = json!("URGENT");
        let value = json!({"comments": [comment], "tests": []});
        let check = validate(&value, &PlanLimits::default());
        assert!(!check.valid);
        assert!(check.detail().contains("severity"));
    }

    #[test]
    fn line_zero_rejected() {
        let mut comment = valid_comment();
        comment["line"] = json!(0);
        let value = json!({"comments": [comment], "tests": []});
        assert!(!validate(&value, &PlanLimits::default()).valid);
    }

    #[test]
    fn over_long_title_rejected() {
        let mut comment = valid_comment();
        comment["title"] = json!("x".repeat(MAX_TITLE_LEN + 1));
        let value = json!({"comments": [comment], "tests": []});
        let check = validate(&value, &PlanLimits::default());
        assert!(!check.valid);
        assert!(check.detail().contains("title"));
    }

    #[test]
    fn over_long_body_rejected() {
        let mut comment = valid_comment();
        comment["body"] = json!("x".repeat(MAX_BODY_LEN + 1));
        let value = json!({"comments": [comment], "tests": []});
        assert!(!validate(&value, &PlanLimits::default()).valid);
    }

    #[test]
    fn comment_cap_enforced() {
        let comments: Vec<_> = (0..5).map(|_| valid_comment()).collect();
        let value = json!({"comments": comments, "tests": []});
        let limits = PlanLimits {
            max_comments: 3,
            max_tests: 2,
        };
        let check = validate(&value, &limits);
        assert!(!check.valid);
        assert!(check.detail().contains("max is 3"));
    }

    #[test]
    fn test_cap_enforced() {
        let tests: Vec<_> = (0..3).map(|_| valid_test_artifact()).collect();
        let value = json!({"comments": [], "tests": tests});
        let check = validate(&value, &PlanLimits::default());
        assert!(!check.valid);
    }

    #[test]
    fn missing_lists_rejected() {
        // validate() sees only coerced input in the pipeline, but the
        // contract still rejects a raw object missing its keys
        let check = validate(&json!({}), &PlanLimits::default());
        assert!(!check.valid);
        assert_eq!(check.errors.len(), 2);
    }

    #[test]
    fn invalid_merge_mode_rejected() {
        let mut artifact = valid_test_artifact();
        artifact["mode"] = json!("overwrite");
        let value = json!({"comments": [], "tests": [artifact]});
        let check = validate(&value, &PlanLimits::default());
        assert!(!check.valid);
        assert!(check.detail().contains("mode"));
    }

    #[test]
    fn empty_test_content_rejected() {
        let mut artifact = valid_test_artifact();
        artifact["content"] = json!("");
        let value = json!({"comments": [], "tests": [artifact]});
        assert!(!validate(&value, &PlanLimits::default()).valid);
    }

    #[test]
    fn instructions_mention_caps_and_enums() {
        let text = instructions(&PlanLimits::default());
        assert!(text.contains("max 4 entries"));
        assert!(text.contains("max 2 entries"));
        assert!(text.contains("CRITICAL"));
        assert!(text.contains("append_or_create"));
    }
}
