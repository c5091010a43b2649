pub mod diagram;
pub mod report;
pub mod tui;

use anyhow::{Context, Result};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

use fault_explorer::analysis::{CutSetAnalyzer, Settings};
use fault_explorer::config::Config;
use fault_explorer::explorer::Explorer;
use fault_explorer::model::MefLoader;
use fault_explorer::table::DataTable;

pub use diagram::diagram_command;
pub use report::report_command;
pub use tui::tui_command;

pub fn new_explorer() -> Explorer {
    Explorer::new(Arc::new(MefLoader::new()), Arc::new(CutSetAnalyzer::new()))
}

/// Explorer with the config's model and `files` loaded, for headless commands.
pub fn load_explorer(config: &Config, settings: Settings, files: &[PathBuf]) -> Result<Explorer> {
    if config.input_files.is_empty() && files.is_empty() {
        anyhow::bail!("No model files given. Pass files or set input_files in the config");
    }
    let mut explorer = new_explorer();
    explorer
        .apply_config(&config.input_files, settings, files)
        .context("Failed to load model")?;
    Ok(explorer)
}

pub fn print_table(table: &DataTable) {
    let widths = table.column_widths();
    let header: Vec<String> = table
        .columns()
        .iter()
        .zip(&widths)
        .map(|(name, &w)| format!("{:<w$}", name, w = w))
        .collect();
    println!("  {}", header.join("  ").bright_white().bold());
    for row in table.rows() {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| {
                let text = format!("{:<w$}", cell.to_string(), w = w);
                if cell.is_undefined() { text.dimmed().to_string() } else { text }
            })
            .collect();
        println!("  {}", cells.join("  "));
    }
}
