use anyhow::Result;
use clap::Parser;
use log::info;

mod cli;

use cli::{Cli, Commands};
use cli::commands::tui::TuiCommands;
use fault_explorer::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger to file (truncate on each run); the terminal belongs to the TUI
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("fault-explorer.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let cli = Cli::parse();
    info!("Starting fault-explorer");

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Some(Commands::Tui(args)) => cli::commands::tui_command(args, config).await?,
        Some(Commands::Report(args)) => cli::commands::report_command(args, config).await?,
        Some(Commands::Diagram(args)) => cli::commands::diagram_command(args, config).await?,
        None => cli::commands::tui_command(TuiCommands { files: cli.files }, config).await?,
    }

    Ok(())
}
