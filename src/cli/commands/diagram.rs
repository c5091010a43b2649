use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use std::path::PathBuf;

use super::load_explorer;
use fault_explorer::config::Config;
use fault_explorer::diagram::DiagramBuilder;

#[derive(Args)]
pub struct DiagramCommands {
    /// Model files to read
    pub files: Vec<PathBuf>,

    /// Fault tree to draw (all trees when omitted)
    #[arg(short, long)]
    pub tree: Option<String>,

    /// Columns per tree level
    #[arg(long, default_value_t = 4)]
    pub indent: usize,
}

pub async fn diagram_command(args: DiagramCommands, config: Config) -> Result<()> {
    let explorer = load_explorer(&config, config.settings.clone(), &args.files)?;
    let model = explorer.model();

    let trees: Vec<_> = match &args.tree {
        Some(name) => vec![
            model
                .fault_tree(name)
                .with_context(|| format!("No fault tree named '{}'", name))?,
        ],
        None => model.fault_trees().iter().collect(),
    };
    if trees.is_empty() {
        println!("  {}", "⚠️  Model has no fault trees".bright_yellow().bold());
        return Ok(());
    }

    for tree in trees {
        let (scene, _) = DiagramBuilder::build_fault_tree(model, tree)
            .with_context(|| format!("Failed to draw fault tree '{}'", tree.name))?;
        println!(
            "{} {} ({} gates)",
            "Fault tree".bright_white().bold(),
            tree.name.bright_green().bold(),
            scene.gate_count()
        );
        for line in scene.render_lines(args.indent) {
            println!("  {}", line);
        }
        println!();
    }
    Ok(())
}
