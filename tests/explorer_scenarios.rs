//! End-to-end behaviour of the explorer session: diagrams over shared gates,
//! report trees, detail tables, and report replacement across runs.

use fault_explorer::analysis::{
    AnalysisError, AnalysisResult, FaultTreeAnalysis, Literal, ProbabilityAnalysis, Product, ResultTarget, Settings,
};
use fault_explorer::diagram::DiagramBuilder;
use fault_explorer::explorer::{Explorer, TreeKind, ViewContent};
use fault_explorer::model::{Argument, BasicEvent, Connective, Gate, GateId, MefLoader, Model};
use fault_explorer::table::DataTable;
use fault_explorer::ExplorerError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const PROBABILITIES: [f64; 5] = [0.1, 0.2, 0.3, 0.2, 0.2];

/// Five single-event products for gate `top`, quantified when probability is requested.
fn five_products(_: &Model, settings: &Settings) -> Result<Vec<AnalysisResult>, AnalysisError> {
    let quantified = settings.probability_requested();
    let products = PROBABILITIES
        .iter()
        .enumerate()
        .map(|(i, &p)| Product {
            literals: vec![Literal::positive(format!("e{}", i + 1))],
            probability: quantified.then_some(p),
        })
        .collect();
    Ok(vec![AnalysisResult {
        target: ResultTarget::Gate {
            gate: GateId(0),
            id: "top".into(),
        },
        fault_tree_analysis: FaultTreeAnalysis { products },
        probability_analysis: quantified.then_some(ProbabilityAnalysis { p_total: 1.0 }),
        importance_analysis: None,
    }])
}

fn explorer_with(analyzer: impl fault_explorer::analysis::Analyzer + 'static) -> Explorer {
    Explorer::new(Arc::new(MefLoader::new()), Arc::new(analyzer))
}

fn child_labels(explorer: &Explorer, root: &str) -> Vec<String> {
    let tree = explorer.report_tree();
    let root = tree.find(&[root]).expect("result node");
    tree.children(root)
        .iter()
        .filter_map(|&c| tree.label(c))
        .map(str::to_string)
        .collect()
}

fn open_table(explorer: &mut Explorer, path: &[&str]) -> DataTable {
    let node = explorer.report_tree().find(path).expect("report node");
    let handle = explorer
        .activate(TreeKind::Report, node)
        .expect("activation")
        .expect("node has an action");
    match &explorer.workspace().view(handle).expect("open view").content {
        ViewContent::Table(table) => table.clone(),
        other => panic!("expected a table, got {:?}", other),
    }
}

#[test]
fn test_shared_gate_is_drawn_once() {
    let mut model = Model::new("diamond");
    for id in ["e1", "e2", "e3"] {
        model.add_basic_event(BasicEvent::new(id, Some(0.1))).unwrap();
    }
    let mut g2 = Gate::new("G2", Connective::Or);
    g2.args = vec![Argument::BasicEvent("e2".into()), Argument::BasicEvent("e3".into())];
    let g2 = model.add_gate(g2).unwrap();
    let mut g1 = Gate::new("G1", Connective::Or);
    g1.args = vec![Argument::Gate(g2), Argument::BasicEvent("e1".into())];
    let g1 = model.add_gate(g1).unwrap();
    let mut top = Gate::new("top", Connective::And);
    top.args = vec![Argument::Gate(g1), Argument::Gate(g2)];
    let top = model.add_gate(top).unwrap();

    let (scene, visited) = DiagramBuilder::build(&model, top).unwrap();

    assert_eq!(scene.gate_count(), 3);
    assert_eq!(visited.len(), 3);
    let shared = scene.node_for_gate(g2).unwrap();
    assert_eq!(scene.parents_of(shared.id).len(), 2);
    assert!(scene.render_lines(2).iter().any(|line| line.ends_with("↪ G2")));
}

#[tokio::test]
async fn test_quantified_report_tree_and_contributions() {
    let mut explorer = explorer_with(five_products);
    explorer.set_settings(Settings::default().with_probability(true));
    explorer.run_analysis().await.unwrap();

    assert_eq!(child_labels(&explorer, "top"), vec!["Products: 5", "Probability: 1"]);

    let table = open_table(&mut explorer, &["top", "Products: 5"]);
    assert_eq!(table.title(), "Products: top");
    assert_eq!(table.columns(), ["Product", "Order", "Probability", "Contribution"]);
    assert_eq!(table.row_count(), 5);
    let contributions: Vec<f64> = table
        .column("Contribution")
        .unwrap()
        .iter()
        .map(|c| c.as_f64().unwrap())
        .collect();
    for (contribution, expected) in contributions.iter().zip(PROBABILITIES) {
        assert!((contribution - expected).abs() < 1e-9);
    }
    assert!((contributions.iter().sum::<f64>() - 1.0).abs() < 1e-9);

    // Re-activation builds a second, independent view.
    let again = open_table(&mut explorer, &["top", "Products: 5"]);
    assert_eq!(again.row_count(), 5);
    assert_eq!(explorer.workspace().len(), 2);
}

#[tokio::test]
async fn test_unquantified_report_has_no_probability_columns() {
    let mut explorer = explorer_with(five_products);
    explorer.run_analysis().await.unwrap();

    assert_eq!(child_labels(&explorer, "top"), vec!["Products: 5"]);
    let table = open_table(&mut explorer, &["top", "Products: 5"]);
    assert_eq!(table.columns(), ["Product", "Order"]);
}

#[tokio::test]
async fn test_second_run_replaces_report() {
    let mut explorer = explorer_with(five_products);
    explorer.run_analysis().await.unwrap();
    let old_node = explorer.report_tree().find(&["top", "Products: 5"]).unwrap();
    explorer.activate(TreeKind::Report, old_node).unwrap();
    let first_run = explorer.analysis().unwrap().id;

    explorer.run_analysis().await.unwrap();

    assert_ne!(explorer.analysis().unwrap().id, first_run);
    assert!(explorer.workspace().is_empty());
    assert!(explorer.activate(TreeKind::Report, old_node).unwrap().is_none());
    assert_eq!(explorer.registry(TreeKind::Report).len(), 1);
    assert!(explorer.report_tree().find(&["top", "Products: 5"]).is_some());
}

#[tokio::test]
async fn test_failed_run_preserves_report_and_views() {
    let calls = AtomicUsize::new(0);
    let flaky = move |model: &Model, settings: &Settings| {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            five_products(model, settings)
        } else {
            Err(AnalysisError::Failed("solver diverged".into()))
        }
    };
    let mut explorer = explorer_with(flaky);
    explorer.run_analysis().await.unwrap();
    open_table(&mut explorer, &["top", "Products: 5"]);
    let first_run = explorer.analysis().unwrap().id;

    let err = explorer.run_analysis().await.unwrap_err();

    assert!(matches!(err, ExplorerError::Analysis(AnalysisError::Failed(_))));
    assert_eq!(explorer.analysis().unwrap().id, first_run);
    assert_eq!(explorer.workspace().len(), 1);
    assert_eq!(open_table(&mut explorer, &["top", "Products: 5"]).row_count(), 5);
}

#[tokio::test]
async fn test_sequence_target_is_rejected() {
    let sequences = |_: &Model, _: &Settings| -> Result<Vec<AnalysisResult>, AnalysisError> {
        Ok(vec![AnalysisResult {
            target: ResultTarget::Sequence {
                initiating_event: "loss-of-power".into(),
                sequence: "S3".into(),
            },
            fault_tree_analysis: FaultTreeAnalysis::default(),
            probability_analysis: None,
            importance_analysis: None,
        }])
    };
    let mut explorer = explorer_with(sequences);
    let err = explorer.run_analysis().await.unwrap_err();
    assert!(matches!(err, ExplorerError::UnexpectedTarget { .. }));
    assert!(err.is_contract_violation());
    assert!(explorer.report_tree().is_empty());
    assert!(explorer.analysis().is_none());
}
