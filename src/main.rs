//! reviewd — automated pull-request review pipeline.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use serde::Deserialize;

use reviewd::config::Config;
use reviewd::constants;
use reviewd::deliver::rest::RestHost;
use reviewd::env::Env;
use reviewd::models::{AnalysisFinding, ChangeRecord};
use reviewd::providers::rig::RigProvider;
use reviewd::run;

/// Automated pull-request review pipeline.
#[derive(Parser, Debug)]
#[command(name = "reviewd", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Review one change-set and deliver the results.
    Run(RunArgs),

    /// Print version information.
    Version,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Checkout of the pull-request branch to review.
    #[arg(long)]
    workspace: PathBuf,

    /// JSON file describing the change-set (and optional analysis findings).
    #[arg(long)]
    changes: PathBuf,

    /// Name of the pull-request branch on the host.
    #[arg(long)]
    branch: String,

    /// Pull request number on the host.
    #[arg(long)]
    pr: u64,
}

/// Shape of the `--changes` input file.
#[derive(Debug, Deserialize)]
struct RunInput {
    changes: Vec<ChangeRecord>,
    #[serde(default)]
    analysis: Vec<AnalysisFinding>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_review(args).await,
        Command::Version => {
            println!(
                "{} {}",
                constants::APP_NAME.bold(),
                env!("CARGO_PKG_VERSION").green().bold()
            );
            Ok(())
        }
    }
}

async fn run_review(args: RunArgs) -> Result<()> {
    let env = Env::real();
    let config = Config::load(Some(&args.workspace), &env)?;

    let input_content = std::fs::read_to_string(&args.changes)
        .with_context(|| format!("failed to read change-set file {}", args.changes.display()))?;
    let input: RunInput = serde_json::from_str(&input_content)
        .with_context(|| format!("failed to parse change-set file {}", args.changes.display()))?;
    if input.changes.is_empty() {
        bail!("change-set file lists no changed files");
    }

    // The run mutates its workspace (generated tests, baseline). Work on
    // a throwaway copy so the user's checkout stays clean; delivery is
    // the only channel for persisting results.
    let scratch = tempfile::TempDir::new().context("failed to create scratch workspace")?;
    copy_workspace(&args.workspace, scratch.path())
        .context("failed to copy workspace into scratch directory")?;

    let provider = RigProvider::new(config.provider.clone())?;
    let host = RestHost::new(
        config.host.base_url.clone().unwrap_or_default(),
        config.host.owner.clone().unwrap_or_default(),
        config.host.repo.clone().unwrap_or_default(),
        config.host.token.clone().unwrap_or_default(),
        args.pr,
    )?;

    let outcome = run::execute(
        &config,
        &provider,
        &host,
        &args.branch,
        &input.changes,
        input.analysis,
        scratch.path(),
    )
    .await?;

    if let Some(diagnostic) = outcome.diagnostic {
        println!(
            "{} review failed: {}",
            "✗".red().bold(),
            diagnostic.code().red()
        );
        return Ok(());
    }

    println!(
        "{} posted {} comment{}, wrote {} test{}, committed {} file{}",
        "✓".green().bold(),
        outcome.comments_posted,
        if outcome.comments_posted == 1 { "" } else { "s" },
        outcome.tests_written.len(),
        if outcome.tests_written.len() == 1 { "" } else { "s" },
        outcome.committed,
        if outcome.committed == 1 { "" } else { "s" },
    );
    if outcome.suppressed > 0 {
        println!(
            "  {} suggestion{} suppressed as already surfaced",
            outcome.suppressed,
            if outcome.suppressed == 1 { "" } else { "s" }
        );
    }

    Ok(())
}

/// Copy a checkout into the scratch workspace, skipping `.git`.
///
/// Hidden files (`.gitignore`, `.reviewd/`) are copied; gitignored build
/// output is not.
fn copy_workspace(source: &Path, target: &Path) -> std::io::Result<()> {
    let walker = ignore::WalkBuilder::new(source)
        .hidden(false)
        .require_git(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();

    for entry in walker {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(std::io::Error::other)?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let destination = target.join(relative);
        if entry.file_type().is_some_and(|t| t.is_dir()) {
            std::fs::create_dir_all(&destination)?;
        } else {
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &destination)?;
        }
    }

    Ok(())
}
