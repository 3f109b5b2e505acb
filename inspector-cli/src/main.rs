//! Command-line front-end for `inspector-core`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inspector_core::{AnalysisResult, Analyzer, AnalyzerConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "inspector-cli", about = "Inspects shipped Android builds of a Unity game", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze one or more container archives and report engine/subsystem fingerprints.
    Analyze {
        /// Primary archive first, expansion archives after.
        archives: Vec<PathBuf>,
        /// Overrides the per-user default root the two raw artifacts are persisted under.
        #[arg(long)]
        download_root: Option<PathBuf>,
        /// Print the full result as JSON instead of a human-readable summary.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze { archives, download_root, json } => run_analyze(archives, download_root, json),
    }
}

fn run_analyze(archives: Vec<PathBuf>, download_root: Option<PathBuf>, json: bool) -> Result<()> {
    if archives.is_empty() {
        anyhow::bail!("at least one archive path is required");
    }

    let mut config = AnalyzerConfig::default();
    if let Some(root) = download_root {
        config.download_root = root;
    }

    let title = archives[0]
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "build".to_string());

    let mut analyzer = Analyzer::new(config);
    let result = analyzer.analyze(&archives, &title).context("analysis failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    println!("Build: {}", result.title);
    println!("Engine version: {}", result.engine_version);
    println!("Render pipeline: {}", result.render_pipeline);
    println!("Entities (DOTS): {}", result.entities_used);
    println!("Entity physics: {}", result.entity_physics_used);
    println!("Third-party physics: {}", result.third_party_physics_used);
    println!("Legacy UI (NGUI): {}", result.legacy_ui_used);
    println!(
        "Content pipeline (Addressables): {}",
        if result.content_pipeline_used { "yes" } else { "no" }
    );
    println!("UI Toolkit: {}", result.ui_toolkit_used);
    if !result.major_scripts.is_empty() {
        println!("Major scripts:");
        for (key, count) in &result.major_scripts {
            println!("  {key}: {count}");
        }
    }
}
