//! Repository signal collection.
//!
//! Gathers lightweight context about the workspace for the acquisition
//! prompt: languages and dependencies from manifests, the package manager
//! from lockfiles, well-known documentation excerpts, and candidate
//! route/schema/test file paths. Everything here is best-effort; a
//! missing or unreadable file contributes nothing and never fails a run.

use std::path::Path;

use ignore::WalkBuilder;

use crate::models::SignalBundle;

/// Well-known project documentation filenames.
const PROJECT_DOC_FILES: &[&str] = &[
    "README.md",
    "ARCHITECTURE.md",
    "CONVENTIONS.md",
    "CONTRIBUTING.md",
    "CODING_GUIDELINES.md",
    "STYLE_GUIDE.md",
    "DEVELOPMENT.md",
];

/// Maximum characters of a documentation excerpt.
const MAX_DOC_EXCERPT: usize = 4000;

/// Maximum number of paths reported per category.
const MAX_PATHS: usize = 25;

/// Dependency names that identify a test framework.
const TEST_FRAMEWORK_DEPS: &[&str] = &[
    "jest", "mocha", "vitest", "ava", "jasmine", "cypress", "playwright", "pytest", "rspec",
    "minitest", "phpunit",
];

/// Collect repository signals from a workspace checkout.
pub fn collect(workspace: &Path) -> SignalBundle {
    let mut bundle = SignalBundle::default();

    read_node_manifest(workspace, &mut bundle);
    read_cargo_manifest(workspace, &mut bundle);
    read_python_manifest(workspace, &mut bundle);
    read_go_manifest(workspace, &mut bundle);

    bundle.package_manager = detect_package_manager(workspace);
    bundle.test_frameworks = detect_test_frameworks(&bundle.dependencies);

    collect_doc_excerpts(workspace, &mut bundle);
    classify_paths(workspace, &mut bundle);

    bundle
}

fn read_node_manifest(workspace: &Path, bundle: &mut SignalBundle) {
    let Ok(content) = std::fs::read_to_string(workspace.join("package.json")) else {
        return;
    };
    let Ok(manifest) = serde_json::from_str::<serde_json::Value>(&content) else {
        return;
    };

    bundle.languages.push("javascript".to_string());
    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = manifest[section].as_object() {
            bundle.dependencies.extend(deps.keys().cloned());
        }
    }
}

fn read_cargo_manifest(workspace: &Path, bundle: &mut SignalBundle) {
    let Ok(content) = std::fs::read_to_string(workspace.join("Cargo.toml")) else {
        return;
    };
    let Ok(manifest) = content.parse::<toml::Table>() else {
        return;
    };

    bundle.languages.push("rust".to_string());
    for section in ["dependencies", "dev-dependencies"] {
        if let Some(deps) = manifest.get(section).and_then(|v| v.as_table()) {
            bundle.dependencies.extend(deps.keys().cloned());
        }
    }
}

fn read_python_manifest(workspace: &Path, bundle: &mut SignalBundle) {
    let Ok(content) = std::fs::read_to_string(workspace.join("requirements.txt")) else {
        return;
    };

    bundle.languages.push("python".to_string());
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let name: String = line
            .chars()
            .take_while(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
            .collect();
        if !name.is_empty() {
            bundle.dependencies.push(name);
        }
    }
}

fn read_go_manifest(workspace: &Path, bundle: &mut SignalBundle) {
    let Ok(content) = std::fs::read_to_string(workspace.join("go.mod")) else {
        return;
    };

    bundle.languages.push("go".to_string());
    for line in content.lines() {
        let line = line.trim();
        if let Some(module) = line.strip_prefix("require ") {
            if let Some(name) = module.split_whitespace().next() {
                bundle.dependencies.push(name.to_string());
            }
        }
    }
}

fn detect_package_manager(workspace: &Path) -> Option<String> {
    const LOCKFILES: &[(&str, &str)] = &[
        ("pnpm-lock.yaml", "pnpm"),
        ("yarn.lock", "yarn"),
        ("package-lock.json", "npm"),
        ("Cargo.lock", "cargo"),
        ("poetry.lock", "poetry"),
        ("Pipfile.lock", "pipenv"),
        ("go.sum", "go"),
    ];

    LOCKFILES
        .iter()
        .find(|(file, _)| workspace.join(file).exists())
        .map(|(_, manager)| manager.to_string())
}

fn detect_test_frameworks(dependencies: &[String]) -> Vec<String> {
    TEST_FRAMEWORK_DEPS
        .iter()
        .filter(|framework| dependencies.iter().any(|dep| dep == *framework))
        .map(|framework| framework.to_string())
        .collect()
}

/// Load capped excerpts of well-known documentation files.
fn collect_doc_excerpts(workspace: &Path, bundle: &mut SignalBundle) {
    for &filename in PROJECT_DOC_FILES {
        let path = workspace.join(filename);
        if let Ok(content) = std::fs::read_to_string(&path) {
            let excerpt: String = content.chars().take(MAX_DOC_EXCERPT).collect();
            bundle.doc_excerpts.insert(filename.to_string(), excerpt);
        }
    }
}

/// Walk the workspace and bucket interesting files by filename shape.
///
/// Respects `.gitignore` via the `ignore` walker, so build output and
/// vendored dependencies never leak into the prompt.
fn classify_paths(workspace: &Path, bundle: &mut SignalBundle) {
    // Workspaces are detached checkouts without a .git directory, so
    // gitignore handling must not be gated on one.
    let walker = WalkBuilder::new(workspace)
        .hidden(true)
        .require_git(false)
        .build();

    for entry in walker.flatten() {
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(workspace) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        let lower = relative.to_lowercase();

        if is_test_path(&lower) {
            push_capped(&mut bundle.test_paths, relative);
        } else if is_route_path(&lower) {
            push_capped(&mut bundle.route_paths, relative);
        } else if is_schema_path(&lower) {
            push_capped(&mut bundle.schema_paths, relative);
        }
    }
}

fn push_capped(paths: &mut Vec<String>, path: String) {
    if paths.len() < MAX_PATHS {
        paths.push(path);
    }
}

fn is_test_path(lower: &str) -> bool {
    let name = lower.rsplit('/').next().unwrap_or(lower);
    lower.starts_with("tests/")
        || lower.contains("/tests/")
        || lower.contains("/__tests__/")
        || name.contains(".test.")
        || name.contains(".spec.")
        || name.starts_with("test_")
        || name.ends_with("_test.go")
        || name.ends_with("_test.rs")
}

fn is_route_path(lower: &str) -> bool {
    ["route", "controller", "handler", "endpoint", "views"]
        .iter()
        .any(|hint| lower.contains(hint))
        || lower.contains("/api/")
}

fn is_schema_path(lower: &str) -> bool {
    ["schema", "migration", "/models/", "/model/", "/entities/"]
        .iter()
        .any(|hint| lower.contains(hint))
}
