//! Shared types used across all modules.
//!
//! This module defines the core data structures for change records,
//! repository signals, and suggestion plans. Other modules import from
//! here rather than reaching into each other's internals.

pub mod plan;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use plan::{MergeMode, ReviewComment, Severity, SuggestionPlan, TestArtifact};

/// Status of a file within the triggering change-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeStatus::Added => write!(f, "added"),
            ChangeStatus::Modified => write!(f, "modified"),
            ChangeStatus::Removed => write!(f, "removed"),
            ChangeStatus::Renamed => write!(f, "renamed"),
        }
    }
}

/// One modified file in the triggering change-set.
///
/// Supplied once per run by the change-set provider; the diff excerpt is
/// already bounded in size by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Path relative to the repository root.
    pub path: String,
    pub status: ChangeStatus,
    /// Bounded unified-diff excerpt for this file.
    #[serde(default)]
    pub diff: String,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
}

/// A normalized static-analysis finding folded into the prompt context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisFinding {
    pub rule: String,
    pub severity: String,
    pub file: String,
    pub line: u32,
    pub message: String,
}

/// Auxiliary repository facts collected fresh each run.
///
/// Read-only input to plan acquisition. Every field is best-effort:
/// absence of a signal is an empty/`None` value, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalBundle {
    /// Detected programming languages.
    pub languages: Vec<String>,
    /// Dependency names pulled from package manifests.
    pub dependencies: Vec<String>,
    /// Test framework hints (e.g. "jest", "pytest", "cargo-test").
    pub test_frameworks: Vec<String>,
    /// Detected package manager, if any.
    pub package_manager: Option<String>,
    /// Short excerpts of documentation/config files, keyed by filename.
    pub doc_excerpts: IndexMap<String, String>,
    /// Candidate route/handler file paths.
    pub route_paths: Vec<String>,
    /// Candidate schema/model/migration file paths.
    pub schema_paths: Vec<String>,
    /// Candidate existing test file paths.
    pub test_paths: Vec<String>,
    /// Optional normalized static-analysis findings.
    pub analysis: Vec<AnalysisFinding>,
}

/// Supported LLM provider backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
    /// Any OpenAI-compatible API (e.g. Ollama, Together, local servers).
    #[serde(rename = "openai-compatible")]
    OpenAICompatible,
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderName::Anthropic => write!(f, "anthropic"),
            ProviderName::OpenAI => write!(f, "openai"),
            ProviderName::OpenAICompatible => write!(f, "openai-compatible"),
        }
    }
}

impl std::str::FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(ProviderName::Anthropic),
            "openai" => Ok(ProviderName::OpenAI),
            "openai-compatible" => Ok(ProviderName::OpenAICompatible),
            other => Err(format!(
                "unsupported provider: '{other}'. Supported: anthropic, openai, openai-compatible"
            )),
        }
    }
}

impl ProviderName {
    /// Returns the provider-specific environment variable name for the API key.
    ///
    /// These match the env var names used by rig-core's `from_env()` implementations.
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            ProviderName::Anthropic => "ANTHROPIC_API_KEY",
            ProviderName::OpenAI | ProviderName::OpenAICompatible => "OPENAI_API_KEY",
        }
    }
}
