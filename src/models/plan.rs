//! Suggestion plan types: the contract produced by the text-generation provider.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a review comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Custom deserializer for Severity that accepts common LLM variations.
///
/// The schema validator enforces the four canonical values before typed
/// deserialization, but providers occasionally return "warning", "error"
/// or lowercase spellings in fallback responses. This normalizes them.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_uppercase().as_str() {
            "LOW" | "INFO" | "MINOR" | "NOTE" | "SUGGESTION" => Ok(Severity::Low),
            "MEDIUM" | "WARNING" | "MODERATE" => Ok(Severity::Medium),
            "HIGH" | "ERROR" | "MAJOR" | "SEVERE" => Ok(Severity::High),
            "CRITICAL" | "BLOCKER" | "FATAL" => Ok(Severity::Critical),
            _ => {
                // Fall back to medium for unrecognised severities rather than failing
                Ok(Severity::Medium)
            }
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// How a generated test artifact is merged into an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Write the proposed content as-is.
    Create,
    /// Append to an existing file (blank-line separated), else create.
    AppendOrCreate,
    /// Overwrite any existing content.
    Replace,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeMode::Create => write!(f, "create"),
            MergeMode::AppendOrCreate => write!(f, "append_or_create"),
            MergeMode::Replace => write!(f, "replace"),
        }
    }
}

/// A single review comment proposed by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReviewComment {
    /// File path relative to the repository root.
    pub path: String,
    /// Line number in the new file (1-based).
    pub line: u32,
    pub severity: Severity,
    /// Short title summarizing the issue (max 120 chars).
    pub title: String,
    /// Detailed explanation (max 2000 chars).
    pub body: String,
}

impl ReviewComment {
    /// The comment's deterministic identity key.
    ///
    /// Derived from path, line, and title only; severity and body are
    /// excluded so prose edits do not change the identity.
    pub fn fingerprint(&self) -> String {
        crate::fingerprint::fingerprint(&self.path, self.line, &self.title)
    }
}

/// A generated regression-test artifact proposed by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TestArtifact {
    pub language: String,
    /// Test framework name (e.g. "jest", "pytest").
    pub framework: String,
    /// Target path relative to the workspace root.
    pub path: String,
    pub mode: MergeMode,
    /// Non-empty file content.
    pub content: String,
}

/// The structured output of the acquisition protocol.
///
/// Both lists are always present; a malformed or empty provider response
/// is coerced to empty lists before validation, never treated as "no keys".
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SuggestionPlan {
    #[serde(default)]
    pub comments: Vec<ReviewComment>,
    #[serde(default)]
    pub tests: Vec<TestArtifact>,
}

impl SuggestionPlan {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty() && self.tests.is_empty()
    }
}
