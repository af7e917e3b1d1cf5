//! rig-core integration for plan acquisition.
//!
//! Uses rig-core's provider clients and Agent abstraction for multi-provider
//! support. Currently supports: Anthropic, OpenAI, and any OpenAI-compatible
//! API (via `base_url`).

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers;

use crate::config::ProviderConfig;
use crate::models::ProviderName;
use crate::models::plan::SuggestionPlan;

use super::{ChatMessage, CompletionProvider, ProviderError, Role};

/// Maximum tokens per completion response.
///
/// Set high enough to accommodate plans whose test artifacts carry whole
/// file bodies.
const MAX_TOKENS: u64 = 65536;

/// Build an agent from a rig-core client and prompt it.
///
/// Always sets `max_tokens` — all rig-core providers support it and without
/// it some default to a low limit that truncates responses. When
/// `$json_mode` is true the suggestion-plan schema is attached so the
/// provider constrains its output shape.
macro_rules! prompt_plan {
    ($client:expr, $model:expr, $system:expr, $user:expr, $json_mode:expr, $label:expr) => {{
        let builder = $client
            .agent($model)
            .preamble($system)
            .temperature(0.0)
            .max_tokens(MAX_TOKENS);
        let agent = if $json_mode {
            builder.output_schema::<SuggestionPlan>().build()
        } else {
            builder.build()
        };
        agent
            .prompt($user)
            .await
            .map_err(|e| ProviderError::ApiError(format!("{} API error: {e}", $label)))
    }};
}

/// rig-core based completion provider.
///
/// Wraps rig-core's multi-provider client system. The provider name in
/// config selects which rig-core provider to use.
pub struct RigProvider {
    config: ProviderConfig,
}

impl RigProvider {
    /// Create a new RigProvider with the given configuration.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_none() {
            return Err(ProviderError::NotConfigured(format!(
                "no API key found for provider '{}'. Set {} or the provider-specific env var.",
                config.name,
                crate::constants::ENV_API_KEY
            )));
        }
        Ok(Self { config })
    }

    /// Build an OpenAI-style client, optionally with a custom base URL.
    fn build_openai_client(
        &self,
        api_key: &str,
    ) -> Result<providers::openai::CompletionsClient, ProviderError> {
        let mut builder = providers::openai::CompletionsClient::builder().api_key(api_key);
        if let Some(ref base_url) = self.config.base_url {
            builder = builder.base_url(base_url);
        }
        let client: providers::openai::CompletionsClient = builder
            .build()
            .map_err(|e| ProviderError::ApiError(format!("failed to create OpenAI client: {e}")))?;
        Ok(client)
    }

    /// Require `base_url` for OpenAI-compatible providers.
    fn require_base_url(&self) -> Result<&str, ProviderError> {
        self.config.base_url.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured(
                "openai-compatible provider requires base_url to be set".to_string(),
            )
        })
    }

    /// Get the API key or return an error.
    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("missing API key".to_string()))
    }
}

/// Fold role-tagged messages into rig's preamble + prompt pair.
///
/// System messages become the preamble; user messages are concatenated into
/// the prompt in order. Corrective follow-ups therefore land at the end of
/// the prompt, after the original request they amend.
fn split_messages(messages: &[ChatMessage]) -> (String, String) {
    let mut preamble = String::new();
    let mut prompt = String::new();
    for message in messages {
        let target = match message.role {
            Role::System => &mut preamble,
            Role::User => &mut prompt,
        };
        if !target.is_empty() {
            target.push_str("\n\n");
        }
        target.push_str(&message.content);
    }
    (preamble, prompt)
}

#[async_trait]
impl CompletionProvider for RigProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;
        let model = self.config.model.as_str();
        let (system, user) = split_messages(messages);

        match self.config.name {
            ProviderName::Anthropic => {
                let client: providers::anthropic::Client = providers::anthropic::Client::builder()
                    .api_key(api_key)
                    .build()
                    .map_err(|e| {
                        ProviderError::ApiError(format!("failed to create Anthropic client: {e}"))
                    })?;
                prompt_plan!(client, model, &system, &user, json_mode, "Anthropic")
            }
            ProviderName::OpenAI => {
                let client = self.build_openai_client(api_key)?;
                prompt_plan!(client, model, &system, &user, json_mode, "OpenAI")
            }
            ProviderName::OpenAICompatible => {
                let base_url = self.require_base_url()?;
                let client: providers::openai::CompletionsClient =
                    providers::openai::CompletionsClient::builder()
                        .api_key(api_key)
                        .base_url(base_url)
                        .build()
                        .map_err(|e| {
                            ProviderError::ApiError(format!(
                                "failed to create OpenAI-compatible client: {e}"
                            ))
                        })?;
                prompt_plan!(
                    client,
                    model,
                    &system,
                    &user,
                    json_mode,
                    "OpenAI-compatible"
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: ProviderName, api_key: Option<&str>, base_url: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            name,
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: base_url.map(String::from),
            api_key: api_key.map(String::from),
            timeout_secs: 120,
        }
    }

    #[test]
    fn new_provider_missing_api_key() {
        let result = RigProvider::new(config(ProviderName::Anthropic, None, None));
        match result {
            Err(e) => assert!(e.to_string().contains("API key"), "got: {e}"),
            Ok(_) => panic!("expected error for missing API key"),
        }
    }

    #[test]
    fn new_provider_with_api_key() {
        assert!(RigProvider::new(config(ProviderName::Anthropic, Some("sk-test"), None)).is_ok());
    }

    #[test]
    fn require_base_url_missing() {
        let provider =
            RigProvider::new(config(ProviderName::OpenAICompatible, Some("key"), None)).unwrap();
        let result = provider.require_base_url();
        assert!(result.is_err());
        assert!(
            result.unwrap_err().to_string().contains("base_url"),
            "should mention base_url"
        );
    }

    #[test]
    fn require_base_url_present() {
        let provider = RigProvider::new(config(
            ProviderName::OpenAICompatible,
            Some("key"),
            Some("https://my-api.example.com"),
        ))
        .unwrap();
        assert_eq!(
            provider.require_base_url().unwrap(),
            "https://my-api.example.com"
        );
    }

    #[test]
    fn split_separates_roles() {
        let messages = vec![
            ChatMessage::system("persona"),
            ChatMessage::user("review this"),
            ChatMessage::user("and fix your answer"),
        ];
        let (system, user) = split_messages(&messages);
        assert_eq!(system, "persona");
        assert_eq!(user, "review this\n\nand fix your answer");
    }

    #[test]
    fn split_empty_messages() {
        let (system, user) = split_messages(&[]);
        assert!(system.is_empty());
        assert!(user.is_empty());
    }
}
