//! Analysis boundary: settings, result shapes, and the [`Analyzer`] trait.
//!
//! The explorer never computes results itself; it hands a model snapshot and
//! [`Settings`] to an analyzer on a background thread and renders whatever
//! comes back.

pub mod cut_sets;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{GateId, Model};

pub use cut_sets::CutSetAnalyzer;

/// Analysis configuration passed through to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub probability: bool,

    /// Implies `probability`
    #[serde(default)]
    pub importance: bool,

    /// Largest product order kept in the results
    #[serde(default = "default_limit_order")]
    pub limit_order: usize,

    /// Hours; used by time-dependent probability expressions
    #[serde(default = "default_mission_time")]
    pub mission_time: f64,
}

fn default_limit_order() -> usize {
    20
}

fn default_mission_time() -> f64 {
    8760.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            probability: false,
            importance: false,
            limit_order: default_limit_order(),
            mission_time: default_mission_time(),
        }
    }
}

impl Settings {
    pub fn with_probability(mut self, probability: bool) -> Self {
        self.probability = probability;
        if !probability {
            self.importance = false;
        }
        self
    }

    pub fn with_importance(mut self, importance: bool) -> Self {
        self.importance = importance;
        if importance {
            self.probability = true;
        }
        self
    }

    /// Whether probability data will be produced
    pub fn probability_requested(&self) -> bool {
        self.probability || self.importance
    }
}

/// What an analysis result was computed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultTarget {
    /// A top gate of a fault tree
    Gate { gate: GateId, id: String },
    /// An event-tree sequence reached from an initiating event
    Sequence { initiating_event: String, sequence: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub event: String,
    pub complement: bool,
}

impl Literal {
    pub fn positive(event: impl Into<String>) -> Self {
        Self { event: event.into(), complement: false }
    }

    pub fn negative(event: impl Into<String>) -> Self {
        Self { event: event.into(), complement: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub literals: Vec<Literal>,
    /// Present only when probability analysis ran
    pub probability: Option<f64>,
}

impl Product {
    pub fn new(literals: Vec<Literal>) -> Self {
        Self { literals, probability: None }
    }

    pub fn order(&self) -> usize {
        self.literals.len()
    }

    pub fn p(&self) -> Option<f64> {
        self.probability
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaultTreeAnalysis {
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityAnalysis {
    pub p_total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportanceFactors {
    pub occurrence: usize,
    pub mif: f64,
    pub cif: f64,
    pub dif: f64,
    pub raw: f64,
    pub rrw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceRecord {
    pub event: String,
    /// Probability of the event itself
    pub probability: f64,
    pub factors: ImportanceFactors,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportanceAnalysis {
    pub records: Vec<ImportanceRecord>,
}

/// One analyzed target with its sub-results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub target: ResultTarget,
    pub fault_tree_analysis: FaultTreeAnalysis,
    pub probability_analysis: Option<ProbabilityAnalysis>,
    pub importance_analysis: Option<ImportanceAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("model has no fault trees to analyze")]
    NothingToAnalyze,

    #[error("gate '{gate}' uses unsupported connective {connective}")]
    UnsupportedConnective { gate: String, connective: String },

    #[error("gate '{gate}' is part of a cycle")]
    Cycle { gate: String },

    #[error("basic event '{0}' has no probability expression")]
    MissingProbability(String),

    #[error("analysis failed: {0}")]
    Failed(String),

    #[error("analysis thread panicked: {0}")]
    Panicked(String),
}

/// Boundary to the analysis engine
pub trait Analyzer: Send + Sync {
    fn analyze(&self, model: &Model, settings: &Settings) -> Result<Vec<AnalysisResult>, AnalysisError>;
}

impl<F> Analyzer for F
where
    F: Fn(&Model, &Settings) -> Result<Vec<AnalysisResult>, AnalysisError> + Send + Sync,
{
    fn analyze(&self, model: &Model, settings: &Settings) -> Result<Vec<AnalysisResult>, AnalysisError> {
        self(model, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_importance_implies_probability() {
        let settings = Settings::default().with_importance(true);
        assert!(settings.probability);
        assert!(settings.probability_requested());

        let settings = settings.with_probability(false);
        assert!(!settings.importance);
        assert!(!settings.probability_requested());
    }

    #[test]
    fn test_product_order_is_literal_count() {
        let product = Product::new(vec![Literal::positive("a"), Literal::negative("b")]);
        assert_eq!(product.order(), 2);
        assert_eq!(product.p(), None);
    }

    #[test]
    fn test_settings_defaults_from_empty_toml() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }
}
