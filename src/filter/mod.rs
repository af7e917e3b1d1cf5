//! Baseline-aware plan filtering.
//!
//! Drops comments the baseline says were already delivered against
//! unchanged file content, then enforces the per-run comment cap. Test
//! artifacts are never filtered here; the applier handles their
//! idempotence through content markers.

use std::path::Path;

use crate::baseline::BaselineStore;
use crate::models::plan::SuggestionPlan;

/// A plan after baseline filtering, with the number of comments suppressed.
#[derive(Debug)]
pub struct FilteredPlan {
    pub plan: SuggestionPlan,
    pub suppressed: usize,
}

/// Filter a plan against the baseline and cap the surviving comments.
///
/// Order is preserved: the provider ranks comments by importance, so the
/// cap keeps the head of the list. Suppression happens before the cap so
/// a suppressed comment never displaces a fresh one.
pub fn filter_plan(
    store: &BaselineStore,
    plan: SuggestionPlan,
    workspace: &Path,
    max_comments: usize,
) -> FilteredPlan {
    let total = plan.comments.len();
    let mut comments: Vec<_> = plan
        .comments
        .into_iter()
        .filter(|comment| !store.should_skip(comment, workspace))
        .collect();
    let suppressed = total - comments.len();
    comments.truncate(max_comments);

    FilteredPlan {
        plan: SuggestionPlan {
            comments,
            tests: plan.tests,
        },
        suppressed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::{ReviewComment, Severity, TestArtifact};
    use tempfile::TempDir;

    fn comment(path: &str, line: u32, title: &str) -> ReviewComment {
        ReviewComment {
            path: path.to_string(),
            line,
            severity: Severity::Medium,
            title: title.to_string(),
            body: "body".to_string(),
        }
    }

    fn plan(comments: Vec<ReviewComment>) -> SuggestionPlan {
        SuggestionPlan {
            comments,
            tests: Vec::new(),
        }
    }

    #[test]
    fn passes_fresh_comments_through() {
        let dir = TempDir::new().unwrap();
        let store = BaselineStore::load(dir.path());
        let filtered = filter_plan(
            &store,
            plan(vec![comment("a.js", 1, "One"), comment("b.js", 2, "Two")]),
            dir.path(),
            4,
        );
        assert_eq!(filtered.plan.comments.len(), 2);
        assert_eq!(filtered.suppressed, 0);
    }

    #[test]
    fn suppresses_recorded_comment_on_unchanged_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.js"), "const x = 1;\n").unwrap();

        let mut store = BaselineStore::load(dir.path());
        let seen = comment("a.js", 1, "One");
        store.record(&[seen.clone()], dir.path());

        let filtered = filter_plan(
            &store,
            plan(vec![seen, comment("b.js", 2, "Two")]),
            dir.path(),
            4,
        );
        assert_eq!(filtered.plan.comments.len(), 1);
        assert_eq!(filtered.plan.comments[0].title, "Two");
        assert_eq!(filtered.suppressed, 1);
    }

    #[test]
    fn cap_keeps_head_of_list() {
        let dir = TempDir::new().unwrap();
        let store = BaselineStore::load(dir.path());
        let filtered = filter_plan(
            &store,
            plan(vec![
                comment("a.js", 1, "First"),
                comment("b.js", 2, "Second"),
                comment("c.js", 3, "Third"),
            ]),
            dir.path(),
            2,
        );
        assert_eq!(filtered.plan.comments.len(), 2);
        assert_eq!(filtered.plan.comments[0].title, "First");
        assert_eq!(filtered.plan.comments[1].title, "Second");
        // Capped comments are not counted as suppressed
        assert_eq!(filtered.suppressed, 0);
    }

    #[test]
    fn suppression_applies_before_cap() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.js"), "const x = 1;\n").unwrap();

        let mut store = BaselineStore::load(dir.path());
        let seen = comment("a.js", 1, "Seen");
        store.record(&[seen.clone()], dir.path());

        let filtered = filter_plan(
            &store,
            plan(vec![seen, comment("b.js", 2, "Fresh")]),
            dir.path(),
            1,
        );
        // The suppressed comment does not consume the single cap slot
        assert_eq!(filtered.plan.comments.len(), 1);
        assert_eq!(filtered.plan.comments[0].title, "Fresh");
    }

    #[test]
    fn tests_survive_filtering() {
        let dir = TempDir::new().unwrap();
        let store = BaselineStore::load(dir.path());
        let filtered = filter_plan(
            &store,
            SuggestionPlan {
                comments: Vec::new(),
                tests: vec![TestArtifact {
                    language: "javascript".into(),
                    framework: "jest".into(),
                    path: "tests/a.test.js".into(),
                    mode: crate::models::plan::MergeMode::Create,
                    content: "test('x', () => {});".into(),
                }],
            },
            dir.path(),
            0,
        );
        assert_eq!(filtered.plan.tests.len(), 1);
    }
}
