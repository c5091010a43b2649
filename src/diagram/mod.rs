//! Scene graphs for fault-tree diagrams.
//!
//! [`DiagramBuilder`] walks the gate graph depth-first and creates exactly one
//! scene node per gate. A gate reached again through another parent is linked,
//! not rebuilt, so diamond-shaped trees stay linear in size. A gate reached
//! again while it is still being expanded is a true cycle and is rejected.

use log::{debug, error};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::model::{Argument, Connective, FaultTree, GateId, Model};
use crate::table::format_real;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneNodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum SceneNodeKind {
    Gate { gate: GateId, connective: Connective },
    BasicEvent { probability: Option<f64> },
    HouseEvent { state: bool },
    /// Referenced by a gate but never defined
    Undefined,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: SceneNodeId,
    pub name: String,
    pub description: Option<String>,
    pub kind: SceneNodeKind,
    pub children: Vec<SceneNodeId>,
}

impl SceneNode {
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, SceneNodeKind::Gate { .. })
    }
}

/// Expansion state of a gate during one build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// Node created, children still being visited
    Expanding(SceneNodeId),
    Done(SceneNodeId),
}

impl Expansion {
    pub fn node(&self) -> SceneNodeId {
        match self {
            Expansion::Expanding(id) | Expansion::Done(id) => *id,
        }
    }
}

/// Gate identity to the scene node built for it
pub type VisitedMap = HashMap<GateId, Expansion>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagramError {
    #[error("gate cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("unknown gate {0}")]
    UnknownGate(GateId),

    #[error("fault tree '{0}' has no top events")]
    EmptyFaultTree(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    roots: Vec<SceneNodeId>,
}

impl Scene {
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn node(&self, id: SceneNodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn roots(&self) -> &[SceneNodeId] {
        &self.roots
    }

    pub fn gate_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_gate()).count()
    }

    /// Number of parent-child links, which may exceed the node count
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.children.len()).sum()
    }

    pub fn node_for_gate(&self, gate: GateId) -> Option<&SceneNode> {
        self.nodes
            .iter()
            .find(|n| matches!(n.kind, SceneNodeKind::Gate { gate: g, .. } if g == gate))
    }

    /// Nodes linking to `id`, once per link
    pub fn parents_of(&self, id: SceneNodeId) -> Vec<SceneNodeId> {
        self.nodes
            .iter()
            .flat_map(|n| n.children.iter().filter(|&&c| c == id).map(move |_| n.id))
            .collect()
    }

    fn push(&mut self, name: String, description: Option<String>, kind: SceneNodeKind) -> SceneNodeId {
        let id = SceneNodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            id,
            name,
            description,
            kind,
            children: Vec::new(),
        });
        id
    }

    /// Text rendering. Shared gates are drawn in full once and as `↪ name` transfers afterwards.
    pub fn render_lines(&self, indent: usize) -> Vec<String> {
        let indent = indent.max(1);
        let mut lines = Vec::new();
        let mut drawn = HashSet::new();
        for &root in &self.roots {
            self.render_node(root, String::new(), None, indent, &mut drawn, &mut lines);
        }
        lines
    }

    fn render_node(
        &self,
        id: SceneNodeId,
        prefix: String,
        last: Option<bool>,
        indent: usize,
        drawn: &mut HashSet<SceneNodeId>,
        lines: &mut Vec<String>,
    ) {
        let Some(node) = self.node(id) else { return };
        let branch = match last {
            None => String::new(),
            Some(true) => format!("└{} ", "─".repeat(indent - 1)),
            Some(false) => format!("├{} ", "─".repeat(indent - 1)),
        };

        if node.is_gate() && !drawn.insert(id) {
            lines.push(format!("{}{}↪ {}", prefix, branch, node.name));
            return;
        }
        lines.push(format!("{}{}{}", prefix, branch, describe(node)));

        let child_prefix = match last {
            None => prefix,
            Some(true) => format!("{}{}", prefix, " ".repeat(indent + 1)),
            Some(false) => format!("{}│{}", prefix, " ".repeat(indent)),
        };
        for (i, &child) in node.children.iter().enumerate() {
            let is_last = i + 1 == node.children.len();
            self.render_node(child, child_prefix.clone(), Some(is_last), indent, drawn, lines);
        }
    }
}

fn describe(node: &SceneNode) -> String {
    let mut text = match &node.kind {
        SceneNodeKind::Gate { connective, .. } => format!("{} ({})", node.name, connective),
        SceneNodeKind::BasicEvent { probability: Some(p) } => format!("{} p={}", node.name, format_real(*p)),
        SceneNodeKind::BasicEvent { probability: None } => format!("{} p=?", node.name),
        SceneNodeKind::HouseEvent { state } => format!("{} [{}]", node.name, state),
        SceneNodeKind::Undefined => format!("{} (undefined)", node.name),
    };
    if let Some(description) = node.description.as_deref().filter(|d| !d.is_empty()) {
        text.push_str(": ");
        text.push_str(description);
    }
    text
}

/// Builds scenes from a model's gate graph
pub struct DiagramBuilder<'m> {
    model: &'m Model,
    scene: Scene,
    visited: VisitedMap,
    path: Vec<GateId>,
}

impl<'m> DiagramBuilder<'m> {
    fn new(model: &'m Model) -> Self {
        Self {
            model,
            scene: Scene::default(),
            visited: VisitedMap::new(),
            path: Vec::new(),
        }
    }

    /// Scene rooted at one gate
    pub fn build(model: &'m Model, root: GateId) -> Result<(Scene, VisitedMap), DiagramError> {
        let mut builder = Self::new(model);
        let node = builder.visit(root)?;
        builder.scene.roots.push(node);
        Ok(builder.finish())
    }

    /// One scene for all top events of a tree, sharing gates between them
    pub fn build_fault_tree(model: &'m Model, tree: &FaultTree) -> Result<(Scene, VisitedMap), DiagramError> {
        let mut builder = Self::new(model);
        if tree.top_events.is_empty() {
            // No top event means every gate has a parent here, so some walk loops.
            for &gate in &tree.gates {
                builder.visit(gate)?;
            }
            return Err(DiagramError::EmptyFaultTree(tree.name.clone()));
        }
        for &top in &tree.top_events {
            let node = builder.visit(top)?;
            builder.scene.roots.push(node);
        }
        Ok(builder.finish())
    }

    fn finish(self) -> (Scene, VisitedMap) {
        debug!(
            "Built diagram scene: {} gates, {} nodes, {} edges",
            self.scene.gate_count(),
            self.scene.nodes.len(),
            self.scene.edge_count()
        );
        (self.scene, self.visited)
    }

    fn visit(&mut self, gate_id: GateId) -> Result<SceneNodeId, DiagramError> {
        match self.visited.get(&gate_id) {
            Some(Expansion::Done(node)) => return Ok(*node),
            Some(Expansion::Expanding(_)) => {
                let mut path: Vec<String> = self
                    .path
                    .iter()
                    .skip_while(|&&g| g != gate_id)
                    .filter_map(|&g| self.model.gate(g).map(|gate| gate.id.clone()))
                    .collect();
                if let Some(gate) = self.model.gate(gate_id) {
                    path.push(gate.id.clone());
                }
                error!("Refusing to draw cyclic gate graph: {}", path.join(" -> "));
                return Err(DiagramError::Cycle { path });
            }
            None => {}
        }

        let model = self.model;
        let gate = model.gate(gate_id).ok_or(DiagramError::UnknownGate(gate_id))?;
        let node = self.scene.push(
            gate.id.clone(),
            gate.label.clone(),
            SceneNodeKind::Gate {
                gate: gate_id,
                connective: gate.connective,
            },
        );
        // Registered before the children so any path back here is caught.
        self.visited.insert(gate_id, Expansion::Expanding(node));
        self.path.push(gate_id);

        for arg in &gate.args {
            let child = match arg {
                Argument::Gate(child) => self.visit(*child)?,
                Argument::BasicEvent(name) => {
                    let event = model.basic_event(name);
                    self.scene.push(
                        name.clone(),
                        event.map(|e| e.label.clone()),
                        SceneNodeKind::BasicEvent {
                            probability: event.and_then(|e| e.p()),
                        },
                    )
                }
                Argument::HouseEvent(name) => {
                    let event = model.house_event(name);
                    self.scene.push(
                        name.clone(),
                        event.map(|e| e.label.clone()),
                        SceneNodeKind::HouseEvent {
                            state: event.map(|e| e.state).unwrap_or(false),
                        },
                    )
                }
                Argument::Undefined(name) => self.scene.push(name.clone(), None, SceneNodeKind::Undefined),
            };
            self.scene.nodes[node.0].children.push(child);
        }

        self.path.pop();
        self.visited.insert(gate_id, Expansion::Done(node));
        Ok(node)
    }
}
