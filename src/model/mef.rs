//! Loader for the Open-PSA Model Exchange Format subset the explorer shows.
//!
//! Supported: fault trees with gate definitions (one formula level per gate),
//! basic events with `float`/`int`/`parameter`/`exponential` expressions,
//! house events with boolean constants, and parameters. Definitions may live
//! inside `define-fault-tree` or `model-data`, across any number of files.

use log::{debug, info, warn};
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{Argument, BasicEvent, Connective, Gate, HouseEvent, Model, ModelError, Parameter};
use crate::analysis::Settings;

/// Boundary for turning input files into a [`Model`]
pub trait ModelLoader: Send + Sync {
    fn load(&self, paths: &[PathBuf], settings: &Settings) -> Result<Model, LoadError>;
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: invalid XML: {message}", path.display())]
    Xml { path: PathBuf, message: String },

    #[error("{}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },

    #[error("undefined gate '{gate}' referenced by gate '{parent}'")]
    UndefinedGate { gate: String, parent: String },

    #[error("undefined parameter '{0}'")]
    UndefinedParameter(String),

    #[error("basic event '{event}' has probability {value} outside [0, 1]")]
    InvalidProbability { event: String, value: f64 },

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, Default)]
pub struct MefLoader;

impl MefLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModelLoader for MefLoader {
    fn load(&self, paths: &[PathBuf], settings: &Settings) -> Result<Model, LoadError> {
        let mut collected = Collected::default();
        for path in paths {
            debug!("Reading model file: {}", path.display());
            let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            collected.read_document(path, &text)?;
        }

        let model = collected.into_model(settings)?;
        info!(
            "Loaded model '{}' from {} file(s): {} fault trees, {} gates, {} basic events",
            model.name(),
            paths.len(),
            model.fault_trees().len(),
            model.gates().len(),
            model.basic_events().len()
        );
        Ok(model)
    }
}

#[derive(Debug)]
enum RawArg {
    Gate(String),
    BasicEvent(String),
    HouseEvent(String),
    Event(String),
}

#[derive(Debug)]
struct RawGate {
    name: String,
    label: Option<String>,
    connective: Connective,
    args: Vec<RawArg>,
}

#[derive(Debug)]
enum Expression {
    Constant(f64),
    Parameter(String),
    Exponential { lambda: Box<Expression>, time: Option<Box<Expression>> },
}

#[derive(Debug)]
struct RawBasicEvent {
    name: String,
    label: String,
    expression: Option<Expression>,
}

#[derive(Debug)]
struct RawParameter {
    name: String,
    unit: Option<String>,
    label: String,
    expression: Expression,
}

#[derive(Debug, Default)]
struct Collected {
    name: Option<String>,
    gates: Vec<RawGate>,
    trees: Vec<(String, Vec<String>)>,
    basic_events: Vec<RawBasicEvent>,
    house_events: Vec<HouseEvent>,
    parameters: Vec<RawParameter>,
}

fn invalid(path: &Path, message: impl Into<String>) -> LoadError {
    LoadError::Invalid {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn required_name<'a>(path: &Path, node: Node<'a, '_>) -> Result<&'a str, LoadError> {
    node.attribute("name")
        .ok_or_else(|| invalid(path, format!("<{}> is missing the 'name' attribute", node.tag_name().name())))
}

fn label_of(node: Node) -> Option<String> {
    node.children()
        .find(|n| n.has_tag_name("label"))
        .and_then(|n| n.text())
        .map(|text| text.trim().to_string())
}

impl Collected {
    fn read_document(&mut self, path: &Path, text: &str) -> Result<(), LoadError> {
        let doc = Document::parse(text).map_err(|e| LoadError::Xml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let root = doc.root_element();
        if !root.has_tag_name("opsa-mef") {
            return Err(invalid(path, format!("expected <opsa-mef> root, found <{}>", root.tag_name().name())));
        }
        if self.name.is_none() {
            self.name = root.attribute("name").map(str::to_string);
        }

        for child in root.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "define-fault-tree" => {
                    let tree_name = required_name(path, child)?.to_string();
                    let gate_names = self.read_container(path, child)?;
                    self.trees.push((tree_name, gate_names));
                }
                "model-data" => {
                    let gate_names = self.read_container(path, child)?;
                    if !gate_names.is_empty() {
                        return Err(invalid(path, "gates must be defined inside a fault tree"));
                    }
                }
                "label" | "attributes" => {}
                other => warn!("{}: skipping unsupported element <{}>", path.display(), other),
            }
        }
        Ok(())
    }

    /// Reads definitions inside a fault tree or model-data block, returning gate names.
    fn read_container(&mut self, path: &Path, container: Node) -> Result<Vec<String>, LoadError> {
        let mut gate_names = Vec::new();
        for def in container.children().filter(Node::is_element) {
            match def.tag_name().name() {
                "define-gate" => {
                    let gate = read_gate(path, def)?;
                    gate_names.push(gate.name.clone());
                    self.gates.push(gate);
                }
                "define-basic-event" => {
                    let name = required_name(path, def)?.to_string();
                    let expression = def
                        .children()
                        .filter(Node::is_element)
                        .find(|n| !n.has_tag_name("label") && !n.has_tag_name("attributes"))
                        .map(|n| read_expression(path, n))
                        .transpose()?;
                    self.basic_events.push(RawBasicEvent {
                        name,
                        label: label_of(def).unwrap_or_default(),
                        expression,
                    });
                }
                "define-house-event" => {
                    let id = required_name(path, def)?.to_string();
                    let state = match def.children().find(|n| n.has_tag_name("constant")) {
                        Some(constant) => match constant.attribute("value") {
                            Some("true") => true,
                            Some("false") | None => false,
                            Some(other) => {
                                return Err(invalid(path, format!("house event '{}' has invalid constant '{}'", id, other)));
                            }
                        },
                        None => false,
                    };
                    self.house_events.push(HouseEvent {
                        id,
                        state,
                        label: label_of(def).unwrap_or_default(),
                    });
                }
                "define-parameter" => {
                    let name = required_name(path, def)?.to_string();
                    let expression = def
                        .children()
                        .filter(Node::is_element)
                        .find(|n| !n.has_tag_name("label") && !n.has_tag_name("attributes"))
                        .ok_or_else(|| invalid(path, format!("parameter '{}' has no expression", name)))?;
                    self.parameters.push(RawParameter {
                        unit: def.attribute("unit").map(str::to_string),
                        label: label_of(def).unwrap_or_default(),
                        expression: read_expression(path, expression)?,
                        name,
                    });
                }
                "label" | "attributes" => {}
                other => warn!("{}: skipping unsupported definition <{}>", path.display(), other),
            }
        }
        Ok(gate_names)
    }

    fn into_model(self, settings: &Settings) -> Result<Model, LoadError> {
        let mut model = Model::new(self.name.unwrap_or_default());

        let mut parameter_values = HashMap::new();
        // Parameters may reference each other in any order; resolve until fixed point.
        let mut pending: Vec<&RawParameter> = self.parameters.iter().collect();
        while !pending.is_empty() {
            let before = pending.len();
            let mut unresolved = Vec::new();
            for param in pending {
                match evaluate(&param.expression, &parameter_values, settings) {
                    Ok(value) => {
                        parameter_values.insert(param.name.clone(), value);
                        model.add_parameter(Parameter {
                            id: param.name.clone(),
                            value,
                            unit: param.unit.clone(),
                            label: param.label.clone(),
                        })?;
                    }
                    Err(_) => unresolved.push(param),
                }
            }
            if unresolved.len() == before {
                return Err(evaluate(&unresolved[0].expression, &parameter_values, settings)
                    .err()
                    .unwrap_or_else(|| LoadError::UndefinedParameter(unresolved[0].name.clone())));
            }
            pending = unresolved;
        }

        for event in &self.basic_events {
            let probability = event
                .expression
                .as_ref()
                .map(|expr| evaluate(expr, &parameter_values, settings))
                .transpose()?;
            if let Some(p) = probability {
                if !(0.0..=1.0).contains(&p) {
                    return Err(LoadError::InvalidProbability {
                        event: event.name.clone(),
                        value: p,
                    });
                }
            }
            model.add_basic_event(BasicEvent {
                id: event.name.clone(),
                probability,
                label: event.label.clone(),
            })?;
        }

        for house in self.house_events {
            model.add_house_event(house)?;
        }

        let mut ids = Vec::with_capacity(self.gates.len());
        for raw in &self.gates {
            let mut gate = Gate::new(raw.name.clone(), raw.connective);
            gate.label = raw.label.clone();
            ids.push(model.add_gate(gate)?);
        }

        for (raw, id) in self.gates.iter().zip(ids) {
            let mut args = Vec::with_capacity(raw.args.len());
            for arg in &raw.args {
                args.push(resolve_arg(&model, arg, &raw.name)?);
            }
            if let Some(gate) = model.gate_mut(id) {
                gate.args = args;
            }
        }

        for (name, gate_names) in self.trees {
            let gates = gate_names
                .iter()
                .filter_map(|gate_name| model.gate_id(gate_name))
                .collect();
            model.add_fault_tree(name, gates)?;
        }

        Ok(model)
    }
}

fn resolve_arg(model: &Model, arg: &RawArg, parent: &str) -> Result<Argument, LoadError> {
    Ok(match arg {
        RawArg::Gate(name) => match model.gate_id(name) {
            Some(id) => Argument::Gate(id),
            None => {
                return Err(LoadError::UndefinedGate {
                    gate: name.clone(),
                    parent: parent.to_string(),
                });
            }
        },
        RawArg::BasicEvent(name) => {
            if model.basic_event(name).is_some() {
                Argument::BasicEvent(name.clone())
            } else {
                warn!("Gate '{}' references undefined basic event '{}'", parent, name);
                Argument::Undefined(name.clone())
            }
        }
        RawArg::HouseEvent(name) => {
            if model.house_event(name).is_some() {
                Argument::HouseEvent(name.clone())
            } else {
                warn!("Gate '{}' references undefined house event '{}'", parent, name);
                Argument::Undefined(name.clone())
            }
        }
        RawArg::Event(name) => {
            if let Some(id) = model.gate_id(name) {
                Argument::Gate(id)
            } else if model.basic_event(name).is_some() {
                Argument::BasicEvent(name.clone())
            } else if model.house_event(name).is_some() {
                Argument::HouseEvent(name.clone())
            } else {
                warn!("Gate '{}' references undefined event '{}'", parent, name);
                Argument::Undefined(name.clone())
            }
        }
    })
}

fn read_arg(path: &Path, node: Node) -> Result<Option<RawArg>, LoadError> {
    let name = match node.tag_name().name() {
        "gate" | "basic-event" | "house-event" | "event" => required_name(path, node)?.to_string(),
        _ => return Ok(None),
    };
    Ok(Some(match node.tag_name().name() {
        "gate" => RawArg::Gate(name),
        "basic-event" => RawArg::BasicEvent(name),
        "house-event" => RawArg::HouseEvent(name),
        _ => match node.attribute("type") {
            Some("gate") => RawArg::Gate(name),
            Some("basic-event") => RawArg::BasicEvent(name),
            Some("house-event") => RawArg::HouseEvent(name),
            _ => RawArg::Event(name),
        },
    }))
}

fn read_gate(path: &Path, def: Node) -> Result<RawGate, LoadError> {
    let name = required_name(path, def)?.to_string();
    let formula = def
        .children()
        .filter(Node::is_element)
        .find(|n| !n.has_tag_name("label") && !n.has_tag_name("attributes"))
        .ok_or_else(|| invalid(path, format!("gate '{}' has no formula", name)))?;

    // A bare argument in place of a formula is a pass-through gate.
    if let Some(arg) = read_arg(path, formula)? {
        return Ok(RawGate {
            label: label_of(def),
            connective: Connective::Null,
            args: vec![arg],
            name,
        });
    }

    let connective = match formula.tag_name().name() {
        "and" => Connective::And,
        "or" => Connective::Or,
        "xor" => Connective::Xor,
        "not" => Connective::Not,
        "nand" => Connective::Nand,
        "nor" => Connective::Nor,
        "null" => Connective::Null,
        "atleast" => {
            let min = formula
                .attribute("min")
                .and_then(|v| v.parse::<u32>().ok())
                .ok_or_else(|| invalid(path, format!("gate '{}': <atleast> needs a positive 'min'", name)))?;
            Connective::AtLeast(min)
        }
        other => return Err(invalid(path, format!("gate '{}': unsupported formula <{}>", name, other))),
    };

    let mut args = Vec::new();
    for child in formula.children().filter(Node::is_element) {
        match read_arg(path, child)? {
            Some(arg) => args.push(arg),
            None => {
                return Err(invalid(
                    path,
                    format!("gate '{}': nested formula <{}> is not supported", name, child.tag_name().name()),
                ));
            }
        }
    }

    Ok(RawGate {
        label: label_of(def),
        connective,
        args,
        name,
    })
}

fn read_expression(path: &Path, node: Node) -> Result<Expression, LoadError> {
    let number = |attr: &str| -> Result<f64, LoadError> {
        node.attribute(attr)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .ok_or_else(|| invalid(path, format!("<{}> needs a numeric '{}'", node.tag_name().name(), attr)))
    };

    match node.tag_name().name() {
        "float" | "int" => Ok(Expression::Constant(number("value")?)),
        "bool" => Ok(Expression::Constant(if node.attribute("value") == Some("true") { 1.0 } else { 0.0 })),
        "parameter" => Ok(Expression::Parameter(required_name(path, node)?.to_string())),
        "exponential" => {
            let mut operands = node.children().filter(Node::is_element);
            let lambda = operands
                .next()
                .ok_or_else(|| invalid(path, "<exponential> needs a rate argument"))?;
            let time = match operands.next() {
                Some(n) if n.has_tag_name("system-mission-time") => None,
                Some(n) => Some(Box::new(read_expression(path, n)?)),
                None => None,
            };
            Ok(Expression::Exponential {
                lambda: Box::new(read_expression(path, lambda)?),
                time,
            })
        }
        other => Err(invalid(path, format!("unsupported expression <{}>", other))),
    }
}

fn evaluate(
    expression: &Expression,
    parameters: &HashMap<String, f64>,
    settings: &Settings,
) -> Result<f64, LoadError> {
    match expression {
        Expression::Constant(value) => Ok(*value),
        Expression::Parameter(name) => parameters
            .get(name)
            .copied()
            .ok_or_else(|| LoadError::UndefinedParameter(name.clone())),
        Expression::Exponential { lambda, time } => {
            let lambda = evaluate(lambda, parameters, settings)?;
            let time = match time {
                Some(t) => evaluate(t, parameters, settings)?,
                None => settings.mission_time,
            };
            Ok(1.0 - (-lambda * time).exp())
        }
    }
}
