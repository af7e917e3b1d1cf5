//! The run pipeline.
//!
//! One run covers one change-set: collect signals, acquire a plan from
//! the provider, filter it against the baseline, apply test artifacts,
//! record and persist the baseline, commit generated files, and post the
//! single summary comment. Whatever happens, at most one comment is
//! posted per run.

pub mod log;

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::acquire::{self, Diagnostic, Outcome};
use crate::apply;
use crate::baseline::BaselineStore;
use crate::config::Config;
use crate::deliver::{self, HostApi, HostError};
use crate::filter;
use crate::models::{AnalysisFinding, ChangeRecord};
use crate::providers::CompletionProvider;
use crate::signals;
use self::log::RunLog;

/// Errors that abort a run.
///
/// Only delivery failures abort: a run that cannot reach the code host
/// has no way to surface anything.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Host(#[from] HostError),
}

/// What a completed run did.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub comments_posted: usize,
    pub tests_written: Vec<String>,
    pub suppressed: usize,
    pub diagnostic: Option<Diagnostic>,
    pub committed: usize,
    pub baseline_updated: bool,
}

/// Execute one review run against a prepared workspace checkout.
pub async fn execute(
    config: &Config,
    provider: &dyn CompletionProvider,
    host: &dyn HostApi,
    branch: &str,
    changes: &[ChangeRecord],
    analysis: Vec<AnalysisFinding>,
    workspace: &Path,
) -> Result<RunOutcome, RunError> {
    let mut log = RunLog::new();
    log.push(format!(
        "run started for {} changed file{}",
        changes.len(),
        if changes.len() == 1 { "" } else { "s" }
    ));

    let mut bundle = signals::collect(workspace);
    bundle.analysis = analysis;
    log.push(format!(
        "collected signals: {} dependencies, {} doc excerpts, {} analysis findings",
        bundle.dependencies.len(),
        bundle.doc_excerpts.len(),
        bundle.analysis.len()
    ));

    let limits = config.limits();
    let timeout = Duration::from_secs(config.provider.timeout_secs);
    let acquired = acquire::acquire_plan(provider, changes, &bundle, &limits, timeout, &mut log).await;

    let plan = match acquired.outcome {
        Outcome::Failed(diagnostic) => {
            // Acquisition failed terminally: the comment is the only output
            let body = deliver::compose_comment(&[], &[], 0, Some(&diagnostic), &log);
            host.post_comment(&body).await?;
            return Ok(RunOutcome {
                diagnostic: Some(diagnostic),
                ..Default::default()
            });
        }
        // acquire_plan always pairs a non-failed outcome with a plan
        _ => acquired.plan.unwrap_or_default(),
    };

    let mut baseline = BaselineStore::load(workspace);
    let filtered = filter::filter_plan(&baseline, plan, workspace, config.review.max_comments);
    if filtered.suppressed > 0 {
        log.push(format!(
            "{} comment(s) suppressed by the baseline",
            filtered.suppressed
        ));
    }

    let mut tests = filtered.plan.tests;
    tests.truncate(config.review.max_tests);
    let written = apply::apply_tests(
        workspace,
        &tests,
        &config.review.default_test_path,
        &mut log,
    );

    let comments =
        apply::eligible_comments(filtered.plan.comments, config.review.max_comments);

    let baseline_updated = baseline.record(&comments, workspace);
    if baseline_updated {
        if let Err(e) = baseline.flush(workspace) {
            eprintln!("Warning: failed to persist baseline: {e}");
            log.push(format!("failed to persist baseline: {e}"));
        }
    }

    let mut to_commit = written.clone();
    if baseline_updated {
        to_commit.push(BaselineStore::relative_path());
    }
    let committed = if to_commit.is_empty() {
        0
    } else {
        deliver::commit_files(
            host,
            branch,
            workspace,
            &to_commit,
            &config.review.commit_message,
            &mut log,
        )
        .await?
    };

    let nothing_to_report =
        comments.is_empty() && written.is_empty() && filtered.suppressed == 0;
    if !nothing_to_report || config.review.post_empty_summary {
        let body =
            deliver::compose_comment(&comments, &written, filtered.suppressed, None, &log);
        host.post_comment(&body).await?;
    }

    Ok(RunOutcome {
        comments_posted: comments.len(),
        tests_written: written,
        suppressed: filtered.suppressed,
        diagnostic: None,
        committed,
        baseline_updated,
    })
}
