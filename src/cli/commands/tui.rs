use anyhow::Result;
use clap::Args;
use log::info;
use std::path::PathBuf;

use super::new_explorer;
use fault_explorer::config::Config;
use fault_explorer::tui::{self, App};

#[derive(Args)]
pub struct TuiCommands {
    /// Model files to open
    pub files: Vec<PathBuf>,
}

/// Load failures are shown inside the explorer rather than aborting it.
pub async fn tui_command(args: TuiCommands, config: Config) -> Result<()> {
    let mut explorer = new_explorer();
    let load = if config.input_files.is_empty() && args.files.is_empty() {
        explorer.set_settings(config.settings.clone());
        Ok(())
    } else {
        explorer.apply_config(&config.input_files, config.settings.clone(), &args.files)
    };

    let mut app = App::new(explorer, &config.ui);
    if let Err(e) = load {
        app.show_error("Cannot load model", e.to_string());
    }
    info!("Launching explorer");
    tui::launch(app).await
}
