//! Delivery of run results to the code host.
//!
//! Two outward effects per run: generated files (plus the baseline) are
//! committed to the pull-request branch through the host's contents API,
//! and exactly one summary comment is posted on the pull request. The
//! workspace checkout itself is discarded after the run, so anything
//! worth keeping must go through this module.

pub mod rest;

use async_trait::async_trait;
use thiserror::Error;

use crate::acquire::Diagnostic;
use crate::models::plan::{ReviewComment, Severity};
use crate::run::log::RunLog;

/// Errors from code-host API calls.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("host not configured: {0}")]
    NotConfigured(String),

    #[error("API request failed: {0}")]
    ApiError(String),
}

/// A file fetched from the host, with its version identifier.
///
/// The version (a blob SHA on Forgejo/Gitea) is passed back on update so
/// the host rejects writes against a file someone else changed meanwhile.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub content: String,
    pub version: String,
}

/// Abstraction over the code host's repository and comment APIs.
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Fetch a file from a branch. `None` when the file does not exist.
    async fn get_file(&self, branch: &str, path: &str) -> Result<Option<RemoteFile>, HostError>;

    /// Create or update a file on a branch.
    ///
    /// `expected_version` must be the current version for updates and
    /// `None` for creates.
    async fn put_file(
        &self,
        branch: &str,
        path: &str,
        content: &str,
        expected_version: Option<&str>,
        message: &str,
    ) -> Result<(), HostError>;

    /// Post a comment on the pull request.
    async fn post_comment(&self, body: &str) -> Result<(), HostError>;
}

/// Commit workspace files to the pull-request branch.
///
/// Each file is read from the workspace and pushed through the contents
/// API, fetching the remote version first so updates are conditioned on
/// the state we read. A file that disappeared from the workspace is
/// logged and skipped.
pub async fn commit_files(
    host: &dyn HostApi,
    branch: &str,
    workspace: &std::path::Path,
    paths: &[String],
    message: &str,
    log: &mut RunLog,
) -> Result<usize, HostError> {
    let mut committed = 0;

    for path in paths {
        let content = match std::fs::read_to_string(workspace.join(path)) {
            Ok(content) => content,
            Err(e) => {
                log.push(format!("cannot read '{path}' for commit: {e}"));
                continue;
            }
        };

        let remote = host.get_file(branch, path).await?;
        if let Some(ref existing) = remote {
            if existing.content == content {
                log.push(format!("'{path}' unchanged on remote, not committed"));
                continue;
            }
        }

        host.put_file(
            branch,
            path,
            &content,
            remote.as_ref().map(|r| r.version.as_str()),
            message,
        )
        .await?;
        committed += 1;
        log.push(format!("committed '{path}'"));
    }

    Ok(committed)
}

fn severity_emoji(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "🔵",
        Severity::Medium => "🟡",
        Severity::High => "🔴",
        Severity::Critical => "⛔",
    }
}

/// Compose the single summary comment posted per run.
pub fn compose_comment(
    comments: &[ReviewComment],
    written_tests: &[String],
    suppressed: usize,
    diagnostic: Option<&Diagnostic>,
    log: &RunLog,
) -> String {
    let mut body = String::new();

    if let Some(diagnostic) = diagnostic {
        body.push_str(&format!(
            "**{}** could not produce a review for this change-set.\n\n\
             Diagnostic: `{}`\n",
            crate::constants::APP_NAME,
            diagnostic.code()
        ));
        if let Diagnostic::SchemaInvalid(detail) | Diagnostic::ProviderRejected(detail) = diagnostic
        {
            body.push_str(&format!("\n{detail}\n"));
        }
    } else if comments.is_empty() && written_tests.is_empty() {
        body.push_str(&format!(
            "**{}** reviewed this change-set and has nothing to report.\n",
            crate::constants::APP_NAME
        ));
        if suppressed > 0 {
            body.push_str(&format!(
                "\n{suppressed} previously-surfaced suggestion{} still appl{}.\n",
                if suppressed == 1 { "" } else { "s" },
                if suppressed == 1 { "ies" } else { "y" },
            ));
        }
    } else {
        body.push_str(&format!(
            "**{}** found {} suggestion{}\n",
            crate::constants::APP_NAME,
            comments.len(),
            if comments.len() == 1 { "" } else { "s" },
        ));

        for comment in comments {
            body.push_str(&format!(
                "\n---\n\n{} **{}** ({})\n\n`{}:{}`\n\n{}\n",
                severity_emoji(comment.severity),
                comment.title,
                comment.severity,
                comment.path,
                comment.line,
                comment.body
            ));
        }

        if !written_tests.is_empty() {
            body.push_str("\n---\n\n**Generated tests** (committed to this branch):\n\n");
            for path in written_tests {
                body.push_str(&format!("- `{path}`\n"));
            }
        }

        if suppressed > 0 {
            body.push_str(&format!(
                "\n_{suppressed} suggestion{} suppressed as already surfaced._\n",
                if suppressed == 1 { "" } else { "s" },
            ));
        }
    }

    body.push_str(&format!(
        "\n<details>\n<summary>Run log ({})</summary>\n\n{}\n</details>\n",
        log.run_id(),
        log.render()
    ));

    body
}
