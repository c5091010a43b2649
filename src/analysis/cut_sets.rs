//! Small reference engine: minimal products by top-down boolean expansion,
//! rare-event probability, and importance factors derived from it.
//!
//! Good for models of teaching size. Expansion is exponential in the worst
//! case; `Settings::limit_order` prunes long products early.

use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::{
    AnalysisError, AnalysisResult, Analyzer, FaultTreeAnalysis, ImportanceAnalysis, ImportanceFactors,
    ImportanceRecord, Literal, ProbabilityAnalysis, Product, ResultTarget, Settings,
};
use crate::model::{Argument, Connective, GateId, Model};

type Set = BTreeSet<Literal>;
type Dnf = Vec<Set>;

#[derive(Debug, Clone, Default)]
pub struct CutSetAnalyzer;

impl CutSetAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for CutSetAnalyzer {
    fn analyze(&self, model: &Model, settings: &Settings) -> Result<Vec<AnalysisResult>, AnalysisError> {
        if model.fault_trees().is_empty() {
            return Err(AnalysisError::NothingToAnalyze);
        }

        let mut results = Vec::new();
        for tree in model.fault_trees() {
            if tree.top_events.is_empty() && !tree.gates.is_empty() {
                // No top event means every gate has a parent here, so some walk loops.
                let mut expander = Expander::new(model, settings.limit_order);
                for &gate in &tree.gates {
                    expander.gate(gate, true)?;
                }
                return Err(AnalysisError::Failed(format!("fault tree '{}' has no top event", tree.name)));
            }
            for &top in &tree.top_events {
                let gate = model
                    .gate(top)
                    .ok_or_else(|| AnalysisError::Failed(format!("unknown gate {}", top)))?;
                debug!("Expanding top event '{}' of fault tree '{}'", gate.id, tree.name);
                let mut expander = Expander::new(model, settings.limit_order);
                let dnf = expander.gate(top, true)?;
                results.push(build_result(model, settings, top, &gate.id, dnf)?);
            }
        }
        Ok(results)
    }
}

fn build_result(
    model: &Model,
    settings: &Settings,
    gate: GateId,
    id: &str,
    dnf: Dnf,
) -> Result<AnalysisResult, AnalysisError> {
    let mut products: Vec<Product> = dnf
        .into_iter()
        .map(|set| Product::new(set.into_iter().collect()))
        .collect();
    products.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.literals.cmp(&b.literals)));

    let mut probability_analysis = None;
    let mut importance_analysis = None;

    if settings.probability_requested() {
        let probabilities = event_probabilities(model, &products)?;
        for product in &mut products {
            product.probability = Some(product_probability(&product.literals, &probabilities, None));
        }
        let p_total = total_probability(&products, &probabilities, None);
        probability_analysis = Some(ProbabilityAnalysis { p_total });

        if settings.importance {
            importance_analysis = Some(importance(&products, &probabilities, p_total));
        }
    }

    Ok(AnalysisResult {
        target: ResultTarget::Gate { gate, id: id.to_string() },
        fault_tree_analysis: FaultTreeAnalysis { products },
        probability_analysis,
        importance_analysis,
    })
}

fn event_probabilities(model: &Model, products: &[Product]) -> Result<HashMap<String, f64>, AnalysisError> {
    let mut probabilities = HashMap::new();
    for literal in products.iter().flat_map(|p| p.literals.iter()) {
        if probabilities.contains_key(&literal.event) {
            continue;
        }
        let p = model
            .basic_event(&literal.event)
            .and_then(|event| event.p())
            .ok_or_else(|| AnalysisError::MissingProbability(literal.event.clone()))?;
        probabilities.insert(literal.event.clone(), p);
    }
    Ok(probabilities)
}

/// `(event, forced value)` replaces one event's probability during evaluation.
fn product_probability(literals: &[Literal], probabilities: &HashMap<String, f64>, forced: Option<(&str, f64)>) -> f64 {
    literals
        .iter()
        .map(|literal| {
            let p = match forced {
                Some((event, value)) if event == literal.event => value,
                _ => probabilities.get(&literal.event).copied().unwrap_or(0.0),
            };
            if literal.complement { 1.0 - p } else { p }
        })
        .product()
}

fn total_probability(products: &[Product], probabilities: &HashMap<String, f64>, forced: Option<(&str, f64)>) -> f64 {
    products
        .iter()
        .map(|product| product_probability(&product.literals, probabilities, forced))
        .sum::<f64>()
        .min(1.0)
}

fn importance(products: &[Product], probabilities: &HashMap<String, f64>, p_total: f64) -> ImportanceAnalysis {
    let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
    for product in products {
        let events: HashSet<&str> = product.literals.iter().map(|l| l.event.as_str()).collect();
        for event in events {
            *occurrences.entry(event).or_default() += 1;
        }
    }

    let records = occurrences
        .into_iter()
        .map(|(event, occurrence)| {
            let p = probabilities.get(event).copied().unwrap_or(0.0);
            let p_one = total_probability(products, probabilities, Some((event, 1.0)));
            let p_zero = total_probability(products, probabilities, Some((event, 0.0)));
            let mif = p_one - p_zero;
            let (cif, dif, raw) = if p_total > 0.0 {
                (p * mif / p_total, p * p_one / p_total, p_one / p_total)
            } else {
                (0.0, 0.0, 0.0)
            };
            let rrw = if p_zero > 0.0 { p_total / p_zero } else { f64::INFINITY };
            ImportanceRecord {
                event: event.to_string(),
                probability: p,
                factors: ImportanceFactors { occurrence, mif, cif, dif, raw, rrw },
            }
        })
        .collect();

    ImportanceAnalysis { records }
}

struct Expander<'a> {
    model: &'a Model,
    limit_order: usize,
    memo: HashMap<(GateId, bool), Dnf>,
    in_progress: HashSet<GateId>,
}

impl<'a> Expander<'a> {
    fn new(model: &'a Model, limit_order: usize) -> Self {
        Self {
            model,
            limit_order,
            memo: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    fn gate(&mut self, id: GateId, positive: bool) -> Result<Dnf, AnalysisError> {
        if let Some(dnf) = self.memo.get(&(id, positive)) {
            return Ok(dnf.clone());
        }
        let model = self.model;
        let gate = model
            .gate(id)
            .ok_or_else(|| AnalysisError::Failed(format!("unknown gate {}", id)))?;
        if !self.in_progress.insert(id) {
            return Err(AnalysisError::Cycle { gate: gate.id.clone() });
        }

        let args = &gate.args;
        let dnf = match (gate.connective, positive) {
            (Connective::And, true) | (Connective::Nand, false) => self.all(args, true)?,
            (Connective::And, false) | (Connective::Nand, true) => self.any(args, false)?,
            (Connective::Or, true) | (Connective::Nor, false) => self.any(args, true)?,
            (Connective::Or, false) | (Connective::Nor, true) => self.all(args, false)?,
            (Connective::Null, polarity) => self.all(args, polarity)?,
            (Connective::Not, polarity) => self.all(args, !polarity)?,
            (Connective::AtLeast(k), polarity) => {
                let k = k as usize;
                if k == 0 || k > args.len() {
                    return Err(AnalysisError::UnsupportedConnective {
                        gate: gate.id.clone(),
                        connective: gate.connective.to_string(),
                    });
                }
                if polarity {
                    self.at_least(args, k, true)?
                } else {
                    self.at_least(args, args.len() - k + 1, false)?
                }
            }
            (Connective::Xor, polarity) => self.xor(args, polarity)?,
        };

        self.in_progress.remove(&id);
        self.memo.insert((id, positive), dnf.clone());
        Ok(dnf)
    }

    fn argument(&mut self, arg: &Argument, positive: bool) -> Result<Dnf, AnalysisError> {
        Ok(match arg {
            Argument::Gate(id) => self.gate(*id, positive)?,
            Argument::BasicEvent(event) | Argument::Undefined(event) => {
                let literal = Literal { event: event.clone(), complement: !positive };
                vec![Set::from([literal])]
            }
            Argument::HouseEvent(event) => {
                let state = self.model.house_event(event).map(|h| h.state).unwrap_or(false);
                if state == positive { vec![Set::new()] } else { Vec::new() }
            }
        })
    }

    fn all(&mut self, args: &[Argument], positive: bool) -> Result<Dnf, AnalysisError> {
        let mut acc = vec![Set::new()];
        for arg in args {
            let dnf = self.argument(arg, positive)?;
            acc = self.cross(&acc, &dnf);
        }
        Ok(acc)
    }

    fn any(&mut self, args: &[Argument], positive: bool) -> Result<Dnf, AnalysisError> {
        let mut acc = Vec::new();
        for arg in args {
            acc.extend(self.argument(arg, positive)?);
        }
        Ok(minimize(acc))
    }

    fn at_least(&mut self, args: &[Argument], k: usize, positive: bool) -> Result<Dnf, AnalysisError> {
        let expanded = args
            .iter()
            .map(|arg| self.argument(arg, positive))
            .collect::<Result<Vec<_>, _>>()?;
        let mut acc = Vec::new();
        for combination in combinations(expanded.len(), k) {
            let mut term = vec![Set::new()];
            for i in combination {
                term = self.cross(&term, &expanded[i]);
            }
            acc.extend(term);
        }
        Ok(minimize(acc))
    }

    fn xor(&mut self, args: &[Argument], positive: bool) -> Result<Dnf, AnalysisError> {
        let mut acc: Option<(Dnf, Dnf)> = None;
        for arg in args {
            let pos = self.argument(arg, true)?;
            let neg = self.argument(arg, false)?;
            acc = Some(match acc {
                None => (pos, neg),
                Some((acc_pos, acc_neg)) => {
                    let mut odd = self.cross(&acc_pos, &neg);
                    odd.extend(self.cross(&acc_neg, &pos));
                    let mut even = self.cross(&acc_pos, &pos);
                    even.extend(self.cross(&acc_neg, &neg));
                    (minimize(odd), minimize(even))
                }
            });
        }
        let (pos, neg) = acc.unwrap_or_default();
        Ok(if positive { pos } else { neg })
    }

    fn cross(&self, left: &[Set], right: &[Set]) -> Dnf {
        let mut out = Vec::with_capacity(left.len() * right.len());
        for a in left {
            for b in right {
                let merged: Set = a.union(b).cloned().collect();
                if merged.len() > self.limit_order || is_contradictory(&merged) {
                    continue;
                }
                out.push(merged);
            }
        }
        minimize(out)
    }
}

fn is_contradictory(set: &Set) -> bool {
    set.iter()
        .any(|literal| set.contains(&Literal { event: literal.event.clone(), complement: !literal.complement }))
}

/// Drops duplicates and any set that is a superset of another.
fn minimize(mut sets: Dnf) -> Dnf {
    sets.sort_by_key(|set| set.len());
    sets.dedup();
    let mut kept: Dnf = Vec::with_capacity(sets.len());
    for set in sets {
        if !kept.iter().any(|k| k.is_subset(&set)) {
            kept.push(set);
        }
    }
    kept
}

fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn walk(start: usize, n: usize, k: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            walk(i + 1, n, k, current, out);
            current.pop();
        }
    }
    let mut out = Vec::new();
    walk(0, n, k, &mut Vec::with_capacity(k), &mut out);
    out
}
