//! CompletionProvider trait and LLM integration.
//!
//! Provides an abstraction layer over rig-core to decouple the
//! acquisition protocol from the specific LLM library.

pub mod rig;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the completion provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("LLM API error: {0}")]
    ApiError(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

/// One role-tagged message sent to the text-generation provider.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Trait for LLM-backed completion.
///
/// When `json_mode` is true the provider constrains the response to the
/// suggestion-plan schema; otherwise free text is returned and the caller
/// extracts the payload itself.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send role-tagged messages and return the raw response text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
    ) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_constructors() {
        let system = ChatMessage::system("be terse");
        assert_eq!(system.role, Role::System);
        assert_eq!(system.content, "be terse");

        let user = ChatMessage::user("review this");
        assert_eq!(user.role, Role::User);
    }
}
