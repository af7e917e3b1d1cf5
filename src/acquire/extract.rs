//! JSON object extraction from free-text provider responses.
//!
//! Fallback responses often wrap the payload in prose or markdown code
//! fences. Extraction prefers fenced content, then falls back to the
//! outermost `{...}` span.

use serde_json::Value;

/// Regex for extracting content inside markdown code fences.
///
/// The closing ``` must appear at the start of a line (`\n````) to avoid
/// matching triple-backticks embedded inside JSON string values (e.g.
/// test content containing ```js code examples).
static FENCE_RE: std::sync::LazyLock<regex::Regex> =
    std::sync::LazyLock::new(|| regex::Regex::new(r"(?s)```(?:json)?\s*\n(.*?)\n```").unwrap());

/// Extract the first well-formed JSON object from free text.
///
/// Candidates are tried in order: the raw text itself, content inside
/// markdown fences, then the outermost `{...}` span. The first candidate
/// that parses to a JSON object wins. Returns `None` when no candidate
/// parses.
pub fn extract_json_object(text: &str) -> Option<Value> {
    for candidate in candidates(text) {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&candidate) {
            return Some(value);
        }
    }
    None
}

/// Collect candidate JSON strings from a response.
fn candidates(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    let mut out = Vec::new();

    // First candidate: the raw text
    out.push(trimmed.to_string());

    // Second: content from markdown code fences
    for cap in FENCE_RE.captures_iter(trimmed) {
        if let Some(inner) = cap.get(1) {
            let inner_trimmed = inner.as_str().trim();
            if !inner_trimmed.is_empty() {
                out.push(inner_trimmed.to_string());
            }
        }
    }

    // Third: brace extraction — first '{' to last '}'. The most robust
    // strategy when the response contains nested fences inside JSON
    // string values.
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            out.push(trimmed[start..=end].to_string());
        }
    }

    out
}
