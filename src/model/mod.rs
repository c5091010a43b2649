//! Fault-tree model: gates, events, parameters and the trees that root them.
//!
//! Gates live in an arena owned by [`Model`] and are referenced by [`GateId`],
//! so a gate shared by several parents is one value with several references.

pub mod mef;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

pub use mef::{LoadError, MefLoader, ModelLoader};

/// Stable identity of a gate inside one [`Model`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GateId(pub usize);

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Boolean connective of a gate formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connective {
    And,
    Or,
    AtLeast(u32),
    Xor,
    Not,
    Nand,
    Nor,
    Null,
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connective::And => write!(f, "AND"),
            Connective::Or => write!(f, "OR"),
            Connective::AtLeast(k) => write!(f, "ATLEAST {}", k),
            Connective::Xor => write!(f, "XOR"),
            Connective::Not => write!(f, "NOT"),
            Connective::Nand => write!(f, "NAND"),
            Connective::Nor => write!(f, "NOR"),
            Connective::Null => write!(f, "NULL"),
        }
    }
}

/// One argument of a gate formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Argument {
    Gate(GateId),
    BasicEvent(String),
    HouseEvent(String),
    /// Reference to an event the model never defines
    Undefined(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub id: String,
    pub label: Option<String>,
    pub connective: Connective,
    pub args: Vec<Argument>,
}

impl Gate {
    pub fn new(id: impl Into<String>, connective: Connective) -> Self {
        Self {
            id: id.into(),
            label: None,
            connective,
            args: Vec::new(),
        }
    }

    /// Ids of the gates referenced directly by this gate's formula
    pub fn gate_args(&self) -> impl Iterator<Item = GateId> + '_ {
        self.args.iter().filter_map(|arg| match arg {
            Argument::Gate(id) => Some(*id),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicEvent {
    pub id: String,
    /// `None` when the event is symbolic (no probability expression)
    pub probability: Option<f64>,
    pub label: String,
}

impl BasicEvent {
    pub fn new(id: impl Into<String>, probability: Option<f64>) -> Self {
        Self {
            id: id.into(),
            probability,
            label: String::new(),
        }
    }

    pub fn has_expression(&self) -> bool {
        self.probability.is_some()
    }

    pub fn p(&self) -> Option<f64> {
        self.probability
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseEvent {
    pub id: String,
    pub state: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: String,
    pub value: f64,
    pub unit: Option<String>,
    pub label: String,
}

/// Named entry point into the gate graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultTree {
    pub name: String,
    /// Every gate defined in this tree, in definition order
    pub gates: Vec<GateId>,
    /// Gates of this tree that no other gate of the tree references
    pub top_events: Vec<GateId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("unknown gate {0}")]
    UnknownGate(GateId),
}

/// Container of fault trees and event pools
#[derive(Debug, Clone, Default)]
pub struct Model {
    name: String,
    fault_trees: Vec<FaultTree>,
    gates: Vec<Gate>,
    gate_index: HashMap<String, GateId>,
    basic_events: Vec<BasicEvent>,
    basic_index: HashMap<String, usize>,
    house_events: Vec<HouseEvent>,
    house_index: HashMap<String, usize>,
    parameters: Vec<Parameter>,
}

pub const UNNAMED_MODEL: &str = "unnamed";

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: if name.is_empty() { UNNAMED_MODEL.to_string() } else { name },
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn fault_trees(&self) -> &[FaultTree] {
        &self.fault_trees
    }

    pub fn fault_tree(&self, name: &str) -> Option<&FaultTree> {
        self.fault_trees.iter().find(|tree| tree.name == name)
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn gate(&self, id: GateId) -> Option<&Gate> {
        self.gates.get(id.0)
    }

    pub fn gate_mut(&mut self, id: GateId) -> Option<&mut Gate> {
        self.gates.get_mut(id.0)
    }

    pub fn gate_id(&self, name: &str) -> Option<GateId> {
        self.gate_index.get(name).copied()
    }

    pub fn basic_events(&self) -> &[BasicEvent] {
        &self.basic_events
    }

    pub fn basic_event(&self, id: &str) -> Option<&BasicEvent> {
        self.basic_index.get(id).map(|&i| &self.basic_events[i])
    }

    pub fn house_events(&self) -> &[HouseEvent] {
        &self.house_events
    }

    pub fn house_event(&self, id: &str) -> Option<&HouseEvent> {
        self.house_index.get(id).map(|&i| &self.house_events[i])
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn add_gate(&mut self, gate: Gate) -> Result<GateId, ModelError> {
        if self.gate_index.contains_key(&gate.id) {
            return Err(ModelError::DuplicateId { kind: "gate", id: gate.id });
        }
        let id = GateId(self.gates.len());
        self.gate_index.insert(gate.id.clone(), id);
        self.gates.push(gate);
        Ok(id)
    }

    pub fn add_basic_event(&mut self, event: BasicEvent) -> Result<(), ModelError> {
        if self.basic_index.contains_key(&event.id) {
            return Err(ModelError::DuplicateId { kind: "basic event", id: event.id });
        }
        self.basic_index.insert(event.id.clone(), self.basic_events.len());
        self.basic_events.push(event);
        Ok(())
    }

    pub fn add_house_event(&mut self, event: HouseEvent) -> Result<(), ModelError> {
        if self.house_index.contains_key(&event.id) {
            return Err(ModelError::DuplicateId { kind: "house event", id: event.id });
        }
        self.house_index.insert(event.id.clone(), self.house_events.len());
        self.house_events.push(event);
        Ok(())
    }

    pub fn add_parameter(&mut self, parameter: Parameter) -> Result<(), ModelError> {
        if self.parameters.iter().any(|p| p.id == parameter.id) {
            return Err(ModelError::DuplicateId { kind: "parameter", id: parameter.id });
        }
        self.parameters.push(parameter);
        Ok(())
    }

    /// Register a fault tree over already-added gates and derive its top events.
    pub fn add_fault_tree(
        &mut self,
        name: impl Into<String>,
        gates: Vec<GateId>,
    ) -> Result<&FaultTree, ModelError> {
        let name = name.into();
        if self.fault_trees.iter().any(|tree| tree.name == name) {
            return Err(ModelError::DuplicateId { kind: "fault tree", id: name });
        }

        let mut referenced = HashSet::new();
        for &id in &gates {
            let gate = self.gate(id).ok_or(ModelError::UnknownGate(id))?;
            referenced.extend(gate.gate_args());
        }
        let top_events = gates
            .iter()
            .copied()
            .filter(|id| !referenced.contains(id))
            .collect();

        self.fault_trees.push(FaultTree { name, gates, top_events });
        Ok(&self.fault_trees[self.fault_trees.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_model_without_name_is_unnamed() {
        assert_eq!(Model::new("").name(), UNNAMED_MODEL);
        assert_eq!(Model::new("pumps").name(), "pumps");
    }

    #[test]
    fn test_duplicate_gate_is_rejected() {
        let mut model = Model::new("m");
        model.add_gate(Gate::new("top", Connective::Or)).unwrap();
        let err = model.add_gate(Gate::new("top", Connective::And)).unwrap_err();
        assert_eq!(err, ModelError::DuplicateId { kind: "gate", id: "top".to_string() });
    }

    #[test]
    fn test_fault_tree_top_events_exclude_referenced_gates() {
        let mut model = Model::new("m");
        let top = model.add_gate(Gate::new("top", Connective::Or)).unwrap();
        let mid = model.add_gate(Gate::new("mid", Connective::And)).unwrap();
        let other = model.add_gate(Gate::new("other", Connective::And)).unwrap();
        model.gate_mut(top).unwrap().args = vec![Argument::Gate(mid)];
        model.gate_mut(other).unwrap().args = vec![Argument::Gate(mid)];

        let tree = model.add_fault_tree("ft", vec![top, mid, other]).unwrap();
        assert_eq!(tree.top_events, vec![top, other]);
    }

    #[test]
    fn test_basic_event_expression_flag() {
        assert!(BasicEvent::new("a", Some(0.1)).has_expression());
        assert!(!BasicEvent::new("b", None).has_expression());
    }
}
