use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::ReviewConfig;
use crate::context::ReviewContext;
use crate::controller::SessionController;
use crate::export::{self, ExportFormat};
use crate::record::LoadReport;
use crate::session::ReviewSession;
use crate::snapshot;

#[derive(Parser)]
#[command(name = "clipbook")]
#[command(about = "Triage post records into a topic-grouped clipbook")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List review tables in the current directory
    Files,
    /// Start an interactive review of a table
    Review {
        /// Table to review
        file: PathBuf,
        /// Where snapshots are written (default: the reviewed file itself)
        #[arg(short, long)]
        dest: Option<PathBuf>,
        /// Decisions between automatic saves
        #[arg(short, long)]
        interval: Option<usize>,
        /// Account handle used in citations
        #[arg(long)]
        handle: Option<String>,
        /// Clipbook document path (.md or .html)
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Show review progress recorded in a table
    Status {
        /// Table to inspect
        file: PathBuf,
    },
    /// Build the clipbook document from a table's bullet marks
    Export {
        /// Reviewed table
        file: PathBuf,
        /// Output path (.md or .html)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Account handle used in citations
        #[arg(long)]
        handle: Option<String>,
    },
    /// Write a normalized reviewed copy of a table
    Copy {
        /// Source table
        file: PathBuf,
        /// Destination name, .csv added when missing
        /// (default: reviewed_<name>_<timestamp>.csv)
        dest: Option<String>,
    },
}

/// CLI flags layered over the environment configuration.
#[derive(Default)]
pub struct ConfigOverrides {
    pub interval: Option<usize>,
    pub handle: Option<String>,
    pub export: Option<PathBuf>,
}

pub fn build_config(overrides: ConfigOverrides) -> Result<ReviewConfig> {
    let mut config = ReviewConfig::from_env()?;
    if let Some(interval) = overrides.interval {
        if interval == 0 {
            anyhow::bail!("--interval must be at least 1");
        }
        config.save_interval = interval;
    }
    if let Some(handle) = overrides.handle {
        config.handle = handle.trim_start_matches('@').to_string();
    }
    if let Some(export) = overrides.export {
        config.export_path = export;
    }
    Ok(config)
}

pub fn describe_load(report: &LoadReport) {
    if report.dropped_missing_url > 0 {
        println!(
            "Removed {} rows without a URL",
            report.dropped_missing_url
        );
    }
    if report.dropped_duplicates > 0 {
        println!("Removed {} duplicate rows", report.dropped_duplicates);
    }
    if report.demoted_marks > 0 {
        println!(
            "Reopened {} bullets that had no topic",
            report.demoted_marks
        );
    }
}

pub fn open_controller(
    ctx: &ReviewContext,
    file: &Path,
    dest: Option<&Path>,
    config: &ReviewConfig,
) -> Result<SessionController> {
    let (store, report) = ctx.open_store(file)?;
    describe_load(&report);

    // Progress is written back into the reviewed table unless redirected,
    // so reopening the same file resumes where the reviewer stopped.
    let input = ctx.resolve(file);
    let destination = match dest {
        Some(d) => ctx.resolve(d),
        None => input.clone(),
    };
    let mut config = config.clone();
    config.export_path = ctx.resolve(&config.export_path);

    Ok(
        SessionController::new(ReviewSession::new(store), destination, &config)
            .with_source(&input),
    )
}

pub fn list_files(ctx: &ReviewContext) -> Result<()> {
    let files = ctx.list_tables()?;
    if files.is_empty() {
        println!("No review tables found.");
        return Ok(());
    }
    for file in files {
        let name = file
            .strip_prefix(&ctx.root)
            .unwrap_or(&file)
            .display()
            .to_string();
        println!("{}", name);
    }
    Ok(())
}

pub fn show_status(ctx: &ReviewContext, file: &Path) -> Result<()> {
    let (store, report) = ctx.open_store(file)?;
    describe_load(&report);
    let session = ReviewSession::new(store);
    let counts = session.counts();

    println!("Records:  {}", counts.total);
    println!("Passed:   {}", counts.passed);
    println!("Bulleted: {}", counts.bulleted);
    println!("Reviewed: {}/{}", counts.reviewed(), counts.total);
    if !session.known_topics().is_empty() {
        let topics: Vec<&str> = session
            .known_topics()
            .iter()
            .map(|t| t.as_str())
            .collect();
        println!("Topics:   {}", topics.join(", "));
    }
    if session.has_existing_review_marks() {
        println!("Existing review marks detected.");
    }
    Ok(())
}

pub fn export_document(
    ctx: &ReviewContext,
    file: &Path,
    out: Option<&Path>,
    config: &ReviewConfig,
) -> Result<()> {
    let (store, report) = ctx.open_store(file)?;
    describe_load(&report);

    let out = ctx.resolve(out.unwrap_or(config.export_path.as_path()));
    let document = export::build(&store, &config.handle);
    document
        .write(&out)
        .with_context(|| format!("Failed to write {:?}", out))?;

    let format = match ExportFormat::for_path(&out) {
        ExportFormat::Markdown => "markdown",
        ExportFormat::Html => "html",
    };
    println!(
        "Wrote {} bullets in {} topics to {} ({})",
        document.entry_count(),
        document.sections.len(),
        out.display(),
        format
    );
    Ok(())
}

pub fn copy_table(ctx: &ReviewContext, file: &Path, dest: Option<&str>) -> Result<()> {
    let (store, report) = ctx.open_store(file)?;
    describe_load(&report);

    let dest = match dest {
        Some(name) => ctx.resolve(&snapshot::with_default_extension(name)),
        None => snapshot::default_destination(&ctx.resolve(file), Local::now().naive_local()),
    };
    let persisted = snapshot::write(&store, &dest)?;
    println!(
        "Saved reviewed copy to {} ({} records)",
        persisted.path.display(),
        persisted.rows
    );
    Ok(())
}
