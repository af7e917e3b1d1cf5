//! Idempotent application of test artifacts to the workspace.
//!
//! Every generated file starts with a marker line carrying a checksum of
//! the artifact content. Re-applying the same plan finds the marker and
//! the unchanged content and writes nothing, so repeated runs on the same
//! change-set produce zero new writes.

use std::path::{Component, Path, PathBuf};

use crate::fingerprint::checksum;
use crate::models::plan::{MergeMode, ReviewComment, TestArtifact};
use crate::run::log::RunLog;

/// Resolve an artifact path, containing it inside the workspace.
///
/// Absolute paths and any path with a `..` component are rewritten under
/// the default test directory, keeping only the final file name. A path
/// with no usable file name gets a fixed fallback name.
fn contained_path(requested: &str, default_dir: &str) -> PathBuf {
    let requested = Path::new(requested);
    let escaped = requested.is_absolute()
        || requested
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if !escaped {
        return requested.to_path_buf();
    }

    let file_name = requested
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| n != "..")
        .unwrap_or_else(|| "generated_test.txt".to_string());
    Path::new(default_dir).join(file_name)
}

/// The marker line prepended to every generated block.
fn marker_line(content: &str) -> String {
    format!("{}{}", crate::constants::MARKER_PREFIX, checksum(content))
}

/// Whether the existing file already carries this exact artifact.
///
/// True when a generated-content marker is present and the proposed
/// content appears verbatim. Checking the content (not just the marker)
/// lets an updated artifact replace a stale generated file.
fn already_applied(existing: &str, content: &str) -> bool {
    existing.contains(crate::constants::MARKER_PREFIX) && existing.contains(content.trim_end())
}

/// What happened to a single artifact.
enum Applied {
    Written,
    /// Marker and identical content already present.
    AlreadyPresent,
    /// `create` targeted an existing file that is not ours to touch.
    CreateSkipped,
}

/// Apply test artifacts to the workspace.
///
/// Returns the workspace-relative paths of files actually written.
/// Individual artifact failures are logged and skipped; one bad artifact
/// never aborts the rest of the plan.
pub fn apply_tests(
    workspace: &Path,
    tests: &[TestArtifact],
    default_test_dir: &str,
    log: &mut RunLog,
) -> Vec<String> {
    let mut written = Vec::new();

    for artifact in tests {
        let relative = contained_path(&artifact.path, default_test_dir);
        if relative != Path::new(&artifact.path) {
            log.push(format!(
                "test path '{}' escapes the workspace, redirected to '{}'",
                artifact.path,
                relative.display()
            ));
        }

        match apply_one(workspace, &relative, artifact) {
            Ok(Applied::Written) => {
                written.push(relative.to_string_lossy().replace('\\', "/"));
            }
            Ok(Applied::AlreadyPresent) => {
                log.push(format!(
                    "test '{}' already applied, skipping",
                    relative.display()
                ));
            }
            Ok(Applied::CreateSkipped) => {
                log.push(format!(
                    "test '{}' exists and is not generated, create skipped",
                    relative.display()
                ));
            }
            Err(e) => {
                eprintln!(
                    "Warning: failed to apply test '{}': {e}",
                    relative.display()
                );
                log.push(format!("failed to apply test '{}': {e}", relative.display()));
            }
        }
    }

    written
}

/// Apply a single artifact.
fn apply_one(
    workspace: &Path,
    relative: &Path,
    artifact: &TestArtifact,
) -> std::io::Result<Applied> {
    let target = workspace.join(relative);
    let existing = match std::fs::read_to_string(&target) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };

    if let Some(ref current) = existing {
        if already_applied(current, &artifact.content) {
            return Ok(Applied::AlreadyPresent);
        }
    }

    let block = format!("{}\n{}", marker_line(&artifact.content), artifact.content);

    let new_content = match (&artifact.mode, existing) {
        // Never clobber a file the plan only asked to create
        (MergeMode::Create, Some(_)) => return Ok(Applied::CreateSkipped),
        (MergeMode::Create, None) => block,
        (MergeMode::AppendOrCreate, Some(current)) => {
            let mut merged = current;
            if !merged.ends_with('\n') {
                merged.push('\n');
            }
            merged.push('\n');
            merged.push_str(&block);
            merged
        }
        (MergeMode::AppendOrCreate, None) => block,
        (MergeMode::Replace, _) => block,
    };

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, ensure_trailing_newline(new_content))?;
    Ok(Applied::Written)
}

fn ensure_trailing_newline(mut content: String) -> String {
    if !content.ends_with('\n') {
        content.push('\n');
    }
    content
}

/// Deduplicate comments by fingerprint, preserving order, then cap.
///
/// A provider occasionally emits the same finding twice; only the first
/// occurrence survives.
pub fn eligible_comments(comments: Vec<ReviewComment>, cap: usize) -> Vec<ReviewComment> {
    let mut seen = std::collections::HashSet::new();
    let mut out: Vec<ReviewComment> = comments
        .into_iter()
        .filter(|c| seen.insert(c.fingerprint()))
        .collect();
    out.truncate(cap);
    out
}
