use super::commands::diagram::DiagramCommands;
use super::commands::report::ReportCommands;
use super::commands::tui::TuiCommands;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fault-explorer")]
#[command(about = "Browse fault-tree models and their analysis results")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Configuration file (defaults to <config dir>/fault-explorer/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Model files to open in the interactive explorer
    pub files: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive explorer (default)
    Tui(TuiCommands),
    /// Run the analysis and print the report
    Report(ReportCommands),
    /// Print the diagram of one or all fault trees
    Diagram(DiagramCommands),
}
