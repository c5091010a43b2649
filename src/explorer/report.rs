//! Report navigation tree built from a completed analysis run.

use log::info;
use std::sync::{Arc, Weak};

use super::registry::NavigationRegistry;
use super::run::AnalysisRun;
use super::workspace::{ViewContent, ViewHandle, Workspace};
use super::NavigationTree;
use crate::analysis::{AnalysisResult, Literal, ResultTarget};
use crate::error::{ExplorerError, ExplorerResult};
use crate::table::{format_real, Cell, DataTable};

const PRODUCT_SEPARATOR: &str = " ⋅ ";

pub struct ResultTreeBuilder;

impl ResultTreeBuilder {
    /// Replaces the contents of `tree` and `registry` with the run's report.
    ///
    /// Every target is validated first; on error neither is touched.
    pub fn build(
        run: &Arc<AnalysisRun>,
        tree: &mut NavigationTree,
        registry: &mut NavigationRegistry<Workspace>,
    ) -> ExplorerResult<()> {
        let names = run
            .results
            .iter()
            .map(|result| display_name(&result.target))
            .collect::<ExplorerResult<Vec<String>>>()?;

        registry.clear();
        tree.clear();
        tree.set_header("Report");

        for (index, (result, name)) in run.results.iter().zip(names).enumerate() {
            let top = tree.add_root(name.as_str());

            let products = tree.add_child(
                top,
                format!("Products: {}", group_thousands(result.fault_tree_analysis.products.len())),
            )?;
            let weak = Arc::downgrade(run);
            let title = name.clone();
            registry.register(products, move |ws| {
                open_result_table(&weak, index, ws, |r| product_table(r, &title))
            });

            if let Some(probability) = &result.probability_analysis {
                tree.add_child(top, format!("Probability: {}", format_real(probability.p_total)))?;
            }

            if let Some(importance) = &result.importance_analysis {
                let node = tree.add_child(
                    top,
                    format!("Importance Factors: {}", group_thousands(importance.records.len())),
                )?;
                let weak = Arc::downgrade(run);
                let title = name.clone();
                registry.register(node, move |ws| {
                    open_result_table(&weak, index, ws, |r| importance_table(r, &title))
                });
            }
        }

        info!(
            "Report tree rebuilt for run {}: {} result(s), {} action(s)",
            run.id,
            run.results.len(),
            registry.len()
        );
        Ok(())
    }
}

fn open_result_table(
    run: &Weak<AnalysisRun>,
    index: usize,
    ws: &mut Workspace,
    make: impl FnOnce(&AnalysisResult) -> DataTable,
) -> ExplorerResult<ViewHandle> {
    let run = run.upgrade().ok_or(ExplorerError::StaleView)?;
    let result = run.results.get(index).ok_or(ExplorerError::StaleView)?;
    let table = make(result);
    Ok(ws.open(table.title().to_string(), ViewContent::Table(table)))
}

/// Navigation label of a result; only gate targets are expected here.
pub fn display_name(target: &ResultTarget) -> ExplorerResult<String> {
    match target {
        ResultTarget::Gate { id, .. } => Ok(id.clone()),
        ResultTarget::Sequence {
            initiating_event,
            sequence,
        } => Err(ExplorerError::UnexpectedTarget {
            initiating_event: initiating_event.clone(),
            sequence: sequence.clone(),
        }),
    }
}

pub fn format_product(literals: &[Literal]) -> String {
    literals
        .iter()
        .map(|literal| {
            if literal.complement {
                format!("¬{}", literal.event)
            } else {
                literal.event.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(PRODUCT_SEPARATOR)
}

/// Product table; probability columns appear only when probability was computed.
pub fn product_table(result: &AnalysisResult, name: &str) -> DataTable {
    let products = &result.fault_tree_analysis.products;
    let with_probability = result.probability_analysis.is_some();

    let mut columns = vec!["Product", "Order"];
    if with_probability {
        columns.extend(["Probability", "Contribution"]);
    }
    let mut table = DataTable::new(format!("Products: {}", name), columns);

    let sum: f64 = products.iter().filter_map(|p| p.p()).sum();
    let degenerate = sum == 0.0 || !sum.is_finite();

    for product in products {
        let mut row = vec![
            Cell::text(format_product(&product.literals)),
            Cell::Integer(product.order() as u64),
        ];
        if with_probability {
            match product.p() {
                Some(p) => {
                    row.push(Cell::real(p));
                    row.push(if degenerate { Cell::Undefined } else { Cell::real(p / sum) });
                }
                None => row.extend([Cell::Undefined, Cell::Undefined]),
            }
        }
        table.push_row(row);
    }
    table
}

pub fn importance_table(result: &AnalysisResult, name: &str) -> DataTable {
    let mut table = DataTable::new(
        format!("Importance: {}", name),
        vec!["Id", "Occurrence", "Probability", "MIF", "CIF", "DIF", "RAW", "RRW"],
    );
    let records = result
        .importance_analysis
        .as_ref()
        .map(|analysis| analysis.records.as_slice())
        .unwrap_or(&[]);
    for record in records {
        let f = &record.factors;
        table.push_row(vec![
            Cell::text(&record.event),
            Cell::Integer(f.occurrence as u64),
            Cell::real(record.probability),
            Cell::real(f.mif),
            Cell::real(f.cif),
            Cell::real(f.dif),
            Cell::real(f.raw),
            Cell::real(f.rrw),
        ]);
    }
    table
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FaultTreeAnalysis, ImportanceAnalysis, ProbabilityAnalysis, Product, Settings};
    use crate::model::GateId;
    use crate::explorer::run::RunId;
    use chrono::Utc;
    use std::time::Duration;

    fn gate_result(products: Vec<Product>, p_total: Option<f64>) -> AnalysisResult {
        AnalysisResult {
            target: ResultTarget::Gate {
                gate: GateId(0),
                id: "top".into(),
            },
            fault_tree_analysis: FaultTreeAnalysis { products },
            probability_analysis: p_total.map(|p_total| ProbabilityAnalysis { p_total }),
            importance_analysis: None,
        }
    }

    fn product(events: &[&str], p: Option<f64>) -> Product {
        Product {
            literals: events.iter().map(|e| Literal::positive(*e)).collect(),
            probability: p,
        }
    }

    fn run_of(results: Vec<AnalysisResult>) -> Arc<AnalysisRun> {
        Arc::new(AnalysisRun {
            id: RunId::new(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
            settings: Settings::default(),
            results,
        })
    }

    #[test]
    fn test_format_product_marks_complements() {
        let literals = vec![Literal::positive("a"), Literal::negative("b")];
        assert_eq!(format_product(&literals), "a ⋅ ¬b");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1234), "1,234");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_zero_sum_yields_placeholders() {
        let result = gate_result(vec![product(&["a"], Some(0.0)), product(&["b"], Some(0.0))], Some(0.0));
        let table = product_table(&result, "top");
        let contribution = table.column("Contribution").unwrap();
        assert!(contribution.iter().all(|c| c.is_undefined()));
    }

    #[test]
    fn test_contributions_sum_to_one() {
        let result = gate_result(
            vec![product(&["a"], Some(0.3)), product(&["b", "c"], Some(0.1))],
            Some(0.4),
        );
        let table = product_table(&result, "top");
        let sum: f64 = table
            .column("Contribution")
            .unwrap()
            .iter()
            .filter_map(|c| c.as_f64())
            .sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(table.cell(1, 0), Some(&Cell::text("b ⋅ c")));
        assert_eq!(table.cell(1, 1), Some(&Cell::Integer(2)));
    }

    #[test]
    fn test_sequence_target_is_rejected_without_touching_tree() {
        let mut tree = NavigationTree::new();
        let mut registry = NavigationRegistry::new();
        let good = run_of(vec![gate_result(vec![product(&["a"], None)], None)]);
        ResultTreeBuilder::build(&good, &mut tree, &mut registry).unwrap();

        let mut bad = gate_result(vec![], None);
        bad.target = ResultTarget::Sequence {
            initiating_event: "ie".into(),
            sequence: "s1".into(),
        };
        let bad = run_of(vec![bad]);
        let err = ResultTreeBuilder::build(&bad, &mut tree, &mut registry).unwrap_err();
        assert!(matches!(err, ExplorerError::UnexpectedTarget { .. }));
        assert!(tree.find(&["top", "Products: 1"]).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_importance_child_and_table() {
        let mut result = gate_result(vec![product(&["a"], Some(0.1))], Some(0.1));
        result.importance_analysis = Some(ImportanceAnalysis { records: vec![] });
        let run = run_of(vec![result]);
        let mut tree = NavigationTree::new();
        let mut registry = NavigationRegistry::new();
        ResultTreeBuilder::build(&run, &mut tree, &mut registry).unwrap();

        let top = tree.roots()[0];
        let labels: Vec<&str> = tree.children(top).iter().filter_map(|&c| tree.label(c)).collect();
        assert_eq!(labels, vec!["Products: 1", "Probability: 0.1", "Importance Factors: 0"]);

        let node = tree.find(&["top", "Importance Factors: 0"]).unwrap();
        let mut ws = Workspace::new();
        let handle = registry.activate(node, &mut ws).unwrap().unwrap();
        assert_eq!(ws.view(handle).unwrap().title, "Importance: top");
    }
}
