pub mod analysis;
pub mod config;
pub mod diagram;
pub mod error;
pub mod explorer;
pub mod model;
pub mod table;
pub mod tui;

pub use error::{ExplorerError, ExplorerResult};
