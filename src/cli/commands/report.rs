use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use std::path::PathBuf;

use super::{load_explorer, print_table};
use fault_explorer::config::Config;
use fault_explorer::explorer::{TreeKind, ViewContent};

#[derive(Args)]
pub struct ReportCommands {
    /// Model files to analyze
    pub files: Vec<PathBuf>,

    /// Compute probabilities
    #[arg(short, long)]
    pub probability: bool,

    /// Compute importance factors (implies --probability)
    #[arg(short, long)]
    pub importance: bool,

    /// Largest product order to keep
    #[arg(long)]
    pub limit_order: Option<usize>,

    /// Print the raw run as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

pub async fn report_command(args: ReportCommands, config: Config) -> Result<()> {
    let mut settings = config.settings.clone();
    if args.probability {
        settings = settings.with_probability(true);
    }
    if args.importance {
        settings = settings.with_importance(true);
    }
    if let Some(limit) = args.limit_order {
        settings.limit_order = limit;
    }

    let mut explorer = load_explorer(&config, settings, &args.files)?;
    if !args.json {
        println!("🌲 Model: {}", explorer.model().name().bright_green().bold());
        println!("🚀 {}", "Running analysis...".dimmed());
    }
    explorer.run_analysis().await.context("Analysis failed")?;

    let run = explorer
        .analysis()
        .cloned()
        .context("Analysis produced no report")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&*run).context("Failed to format JSON output")?);
        return Ok(());
    }
    println!(
        "⏱️  {} result(s) in {:.2}ms (run {})",
        run.results.len(),
        run.duration.as_secs_f64() * 1000.0,
        run.id.to_string().dimmed()
    );

    // Walk the report tree the way the explorer shows it.
    let tree = explorer.report_tree().clone();
    for &root in tree.roots() {
        println!();
        println!("{}", tree.label(root).unwrap_or_default().bright_white().bold());
        for &child in tree.children(root) {
            let label = tree.label(child).unwrap_or_default();
            println!("  {}", label.cyan());
            let Some(handle) = explorer.activate(TreeKind::Report, child)? else { continue };
            if let Some(view) = explorer.workspace().view(handle) {
                if let ViewContent::Table(table) = &view.content {
                    print_table(table);
                }
            }
            explorer.close_view(handle)?;
        }
    }
    Ok(())
}
