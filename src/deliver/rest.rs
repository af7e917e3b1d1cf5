//! Forgejo/Gitea REST implementation of [`HostApi`].
//!
//! Uses the contents API (`GET`/`PUT /repos/{owner}/{repo}/contents/{path}`)
//! for conditioned file writes and the issues API for the summary comment.
//! Pull requests share the issue comment endpoint on Forgejo and Gitea.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::{HostApi, HostError, RemoteFile};

/// Connection details for one pull request on a Forgejo/Gitea host.
#[derive(Debug, Clone)]
pub struct RestHost {
    base_url: String,
    owner: String,
    repo: String,
    token: String,
    pr_number: u64,
    client: reqwest::Client,
}

impl RestHost {
    pub fn new(
        base_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
        pr_number: u64,
    ) -> Result<Self, HostError> {
        let base_url: String = base_url.into();
        let token: String = token.into();
        if base_url.is_empty() {
            return Err(HostError::NotConfigured(
                "host base URL is not set".to_string(),
            ));
        }
        if token.is_empty() {
            return Err(HostError::NotConfigured("host token is not set".to_string()));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token,
            pr_number,
            client: reqwest::Client::new(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/api/v1/repos/{}/{}/contents/{}",
            self.base_url, self.owner, self.repo, path
        )
    }

    fn comments_url(&self) -> String {
        format!(
            "{}/api/v1/repos/{}/{}/issues/{}/comments",
            self.base_url, self.owner, self.repo, self.pr_number
        )
    }

    fn auth_header(&self) -> String {
        format!("token {}", self.token)
    }

    async fn error_from(response: reqwest::Response, action: &str) -> HostError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        HostError::ApiError(format!("{action} failed with HTTP {status}: {body}"))
    }
}

#[async_trait]
impl HostApi for RestHost {
    async fn get_file(&self, branch: &str, path: &str) -> Result<Option<RemoteFile>, HostError> {
        let response = self
            .client
            .get(self.contents_url(path))
            .query(&[("ref", branch)])
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| HostError::ApiError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response, "file fetch").await);
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| HostError::ApiError(format!("file fetch returned invalid JSON: {e}")))?;

        let encoded = payload["content"].as_str().unwrap_or_default();
        let sha = payload["sha"].as_str().unwrap_or_default();
        // The contents API wraps base64 across lines
        let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64
            .decode(cleaned)
            .map_err(|e| HostError::ApiError(format!("file content is not valid base64: {e}")))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| HostError::ApiError(format!("file content is not valid UTF-8: {e}")))?;

        Ok(Some(RemoteFile {
            content,
            version: sha.to_string(),
        }))
    }

    async fn put_file(
        &self,
        branch: &str,
        path: &str,
        content: &str,
        expected_version: Option<&str>,
        message: &str,
    ) -> Result<(), HostError> {
        let mut payload = serde_json::json!({
            "branch": branch,
            "content": BASE64.encode(content),
            "message": message,
        });
        if let Some(sha) = expected_version {
            payload["sha"] = serde_json::Value::String(sha.to_string());
        }

        // Create uses POST, update uses PUT on Forgejo/Gitea
        let request = if expected_version.is_some() {
            self.client.put(self.contents_url(path))
        } else {
            self.client.post(self.contents_url(path))
        };

        let response = request
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| HostError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, "file commit").await);
        }
        Ok(())
    }

    async fn post_comment(&self, body: &str) -> Result<(), HostError> {
        let response = self
            .client
            .post(self.comments_url())
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await
            .map_err(|e| HostError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, "comment creation").await);
        }
        Ok(())
    }
}
