//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `.reviewd.toml` in the workspace root
//! 4. `~/.config/reviewd/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::env::Env;
use crate::models::ProviderName;
use crate::schema::PlanLimits;

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub review: ReviewConfig,
    pub provider: ProviderConfig,
    pub host: HostConfig,
}

/// Review-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Maximum review comments surfaced per run.
    pub max_comments: usize,
    /// Maximum test artifacts applied per run.
    pub max_tests: usize,
    /// Whether to post a summary comment when there is nothing to report.
    pub post_empty_summary: bool,
    /// Directory for test artifacts whose requested path is unusable.
    pub default_test_path: String,
    /// Commit message for generated files.
    pub commit_message: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_comments: 4,
            max_tests: 2,
            post_empty_summary: true,
            default_test_path: "tests/generated".to_string(),
            commit_message: "Add generated review tests".to_string(),
        }
    }
}

/// LLM provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: ProviderName,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: ProviderName::Anthropic,
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: None,
            api_key: None,
            timeout_secs: 120,
        }
    }
}

/// Code-host configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub base_url: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub token: Option<String>,
}

impl std::fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostConfig")
            .field("base_url", &self.base_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads from global config, workspace-local config, then applies
    /// environment variable overrides.
    pub fn load(workspace: Option<&Path>, env: &Env) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Layer 4: global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        // Layer 3: workspace-local config
        if let Some(root) = workspace {
            let local_path = root.join(crate::constants::CONFIG_FILENAME);
            if local_path.exists() {
                let local = Self::load_file(&local_path)?;
                config.merge(local);
            }
        }

        // Layer 2: environment variables
        config.apply_env_vars(env);

        Ok(config)
    }

    /// The plan limits derived from review settings.
    pub fn limits(&self) -> PlanLimits {
        PlanLimits {
            max_comments: self.review.max_comments,
            max_tests: self.review.max_tests,
        }
    }

    /// Load a config from a specific file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::constants::CONFIG_DIR).join("config.toml"))
    }

    /// Merge another config into this one (other takes precedence for non-default values).
    fn merge(&mut self, other: Config) {
        // Review settings
        let default_review = ReviewConfig::default();
        if other.review.max_comments != default_review.max_comments {
            self.review.max_comments = other.review.max_comments;
        }
        if other.review.max_tests != default_review.max_tests {
            self.review.max_tests = other.review.max_tests;
        }
        if other.review.post_empty_summary != default_review.post_empty_summary {
            self.review.post_empty_summary = other.review.post_empty_summary;
        }
        if other.review.default_test_path != default_review.default_test_path {
            self.review.default_test_path = other.review.default_test_path;
        }
        if other.review.commit_message != default_review.commit_message {
            self.review.commit_message = other.review.commit_message;
        }

        // Provider settings
        let default_provider = ProviderConfig::default();
        if other.provider.name != default_provider.name {
            self.provider.name = other.provider.name;
        }
        if other.provider.model != default_provider.model {
            self.provider.model = other.provider.model;
        }
        if other.provider.base_url.is_some() {
            self.provider.base_url = other.provider.base_url;
        }
        if other.provider.api_key.is_some() {
            self.provider.api_key = other.provider.api_key;
        }
        if other.provider.timeout_secs != default_provider.timeout_secs {
            self.provider.timeout_secs = other.provider.timeout_secs;
        }

        // Host settings
        if other.host.base_url.is_some() {
            self.host.base_url = other.host.base_url;
        }
        if other.host.owner.is_some() {
            self.host.owner = other.host.owner;
        }
        if other.host.repo.is_some() {
            self.host.repo = other.host.repo;
        }
        if other.host.token.is_some() {
            self.host.token = other.host.token;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        if let Ok(val) = env.var(crate::constants::ENV_PROVIDER) {
            if let Ok(name) = val.parse::<ProviderName>() {
                self.provider.name = name;
            } else {
                eprintln!(
                    "Warning: ignoring invalid {} value: {val}",
                    crate::constants::ENV_PROVIDER
                );
            }
        }
        if let Ok(val) = env.var(crate::constants::ENV_MODEL) {
            self.provider.model = val;
        }
        if let Ok(val) = env.var(crate::constants::ENV_BASE_URL) {
            self.provider.base_url = Some(val);
        }

        // Provider-specific API key resolution
        let api_key = env
            .var(crate::constants::ENV_API_KEY)
            .or_else(|_| env.var(self.provider.name.api_key_env_var()))
            .ok();
        if api_key.is_some() {
            self.provider.api_key = api_key;
        }

        if let Ok(val) = env.var(crate::constants::ENV_HOST_URL) {
            self.host.base_url = Some(val);
        }
        if let Ok(val) = env.var(crate::constants::ENV_HOST_TOKEN) {
            self.host.token = Some(val);
        }
        if let Ok(val) = env.var(crate::constants::ENV_HOST_OWNER) {
            self.host.owner = Some(val);
        }
        if let Ok(val) = env.var(crate::constants::ENV_HOST_REPO) {
            self.host.repo = Some(val);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.provider.name, ProviderName::Anthropic);
        assert_eq!(config.provider.model, "claude-sonnet-4-20250514");
        assert_eq!(config.review.max_comments, 4);
        assert_eq!(config.review.max_tests, 2);
        assert!(config.review.post_empty_summary);
        assert_eq!(config.review.default_test_path, "tests/generated");
    }

    #[test]
    fn limits_derive_from_review_settings() {
        let mut config = Config::default();
        config.review.max_comments = 7;
        config.review.max_tests = 1;
        let limits = config.limits();
        assert_eq!(limits.max_comments, 7);
        assert_eq!(limits.max_tests, 1);
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[review]
max_comments = 6
post_empty_summary = false

[provider]
name = "openai"
model = "gpt-4o"

[host]
base_url = "https://codeberg.org"
owner = "acme"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.name, ProviderName::OpenAI);
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.review.max_comments, 6);
        assert!(!config.review.post_empty_summary);
        assert_eq!(config.host.base_url.as_deref(), Some("https://codeberg.org"));
        assert_eq!(config.host.owner.as_deref(), Some("acme"));
    }

    #[test]
    fn merge_overrides_non_default_values() {
        let mut base = Config::default();
        let mut other = Config::default();

        other.provider.name = ProviderName::OpenAI;
        other.provider.model = "gpt-4o".to_string();
        other.provider.base_url = Some("https://custom.api".to_string());
        other.provider.api_key = Some("sk-test".to_string());
        other.provider.timeout_secs = 30;
        other.review.max_comments = 8;
        other.review.post_empty_summary = false;
        other.host.token = Some("tok".to_string());

        base.merge(other);

        assert_eq!(base.provider.name, ProviderName::OpenAI);
        assert_eq!(base.provider.model, "gpt-4o");
        assert_eq!(base.provider.base_url, Some("https://custom.api".to_string()));
        assert_eq!(base.provider.api_key, Some("sk-test".to_string()));
        assert_eq!(base.provider.timeout_secs, 30);
        assert_eq!(base.review.max_comments, 8);
        assert!(!base.review.post_empty_summary);
        assert_eq!(base.host.token, Some("tok".to_string()));
    }

    #[test]
    fn merge_keeps_base_when_other_is_default() {
        let mut base = Config::default();
        base.provider.name = ProviderName::OpenAI;
        base.provider.model = "gpt-4o".to_string();
        base.review.max_comments = 2;

        let other = Config::default();
        base.merge(other);

        assert_eq!(base.provider.name, ProviderName::OpenAI);
        assert_eq!(base.provider.model, "gpt-4o");
        assert_eq!(base.review.max_comments, 2);
    }

    #[test]
    fn load_file_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid {{ toml").unwrap();

        let result = Config::load_file(&path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("parse"));
    }

    #[test]
    fn load_file_not_found() {
        let result = Config::load_file(Path::new("/tmp/reviewd_not_exist_config.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read"));
    }

    #[test]
    fn load_from_workspace_root() {
        let env = Env::mock(Vec::<(&str, &str)>::new());

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".reviewd.toml"),
            r#"
[provider]
name = "openai"
model = "gpt-4o"
"#,
        )
        .unwrap();

        let config = Config::load(Some(dir.path()), &env).unwrap();
        assert_eq!(config.provider.name, ProviderName::OpenAI);
        assert_eq!(config.provider.model, "gpt-4o");
    }

    #[test]
    fn load_without_any_config_files() {
        let env = Env::mock(Vec::<(&str, &str)>::new());
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path()), &env).unwrap();
        assert_eq!(config.provider.name, ProviderName::Anthropic);
    }

    #[test]
    fn apply_env_vars_provider_and_api_key() {
        let env = Env::mock([
            ("REVIEWD_PROVIDER", "openai"),
            ("REVIEWD_API_KEY", "sk-env-test"),
        ]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.name, ProviderName::OpenAI);
        assert_eq!(config.provider.api_key, Some("sk-env-test".to_string()));
    }

    #[test]
    fn apply_env_vars_host_settings() {
        let env = Env::mock([
            ("REVIEWD_HOST_URL", "https://forge.example.com"),
            ("REVIEWD_HOST_TOKEN", "tok"),
            ("REVIEWD_HOST_OWNER", "acme"),
            ("REVIEWD_HOST_REPO", "webapp"),
        ]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(
            config.host.base_url,
            Some("https://forge.example.com".to_string())
        );
        assert_eq!(config.host.token, Some("tok".to_string()));
        assert_eq!(config.host.owner, Some("acme".to_string()));
        assert_eq!(config.host.repo, Some("webapp".to_string()));
    }

    #[test]
    fn apply_env_vars_invalid_provider_falls_back() {
        let env = Env::mock([("REVIEWD_PROVIDER", "not-a-provider")]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.name, ProviderName::Anthropic);
    }

    #[test]
    fn apply_env_vars_provider_specific_api_key_fallback() {
        let env = Env::mock([("ANTHROPIC_API_KEY", "sk-anthropic-test")]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(
            config.provider.api_key,
            Some("sk-anthropic-test".to_string())
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = Config::default();
        config.provider.api_key = Some("sk-secret".to_string());
        config.host.token = Some("host-secret".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("host-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
