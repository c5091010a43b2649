use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::diagram::DiagramError;
use crate::explorer::NavNodeId;
use crate::model::LoadError;

/// Result type for explorer operations
pub type ExplorerResult<T> = Result<T, ExplorerError>;

#[derive(Debug, Error)]
pub enum ExplorerError {
    // Contract violations: the caller handed the explorer data it must not see.
    #[error("unexpected analysis target: initiating event '{initiating_event}', sequence '{sequence}'")]
    UnexpectedTarget {
        initiating_event: String,
        sequence: String,
    },

    #[error("view data was released before the navigation tree was rebuilt")]
    StaleView,

    #[error("no current view")]
    NoCurrentView,

    #[error("unknown navigation node {0}")]
    UnknownNode(NavNodeId),

    // Requests the current state cannot satisfy
    #[error("current view does not support zoom")]
    NotZoomable,

    #[error("invalid zoom level '{0}'")]
    InvalidZoom(String),

    #[error(transparent)]
    Diagram(#[from] DiagramError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl ExplorerError {
    /// Whether this error signals a broken internal contract rather than bad input
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ExplorerError::UnexpectedTarget { .. }
                | ExplorerError::StaleView
                | ExplorerError::NoCurrentView
                | ExplorerError::UnknownNode(_)
                | ExplorerError::Diagram(DiagramError::Cycle { .. })
                | ExplorerError::Diagram(DiagramError::UnknownGate(_))
        )
    }
}
