//! Loading MEF files through the explorer and analyzing them with the cut-set engine.

use fault_explorer::analysis::{CutSetAnalyzer, Settings};
use fault_explorer::explorer::{Explorer, ExplorerEvent, TreeKind, ViewContent};
use fault_explorer::model::MefLoader;
use fault_explorer::table::Cell;
use fault_explorer::ExplorerError;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const COOLING: &str = r#"<?xml version="1.0"?>
<opsa-mef name="cooling">
  <define-fault-tree name="Cooling">
    <define-gate name="top">
      <label>No cooling</label>
      <or>
        <gate name="trains"/>
        <basic-event name="valve"/>
      </or>
    </define-gate>
    <define-gate name="trains">
      <and>
        <basic-event name="pump-a"/>
        <basic-event name="pump-b"/>
      </and>
    </define-gate>
  </define-fault-tree>
  <model-data>
    <define-basic-event name="pump-a"><float value="0.1"/></define-basic-event>
    <define-basic-event name="pump-b"><float value="0.2"/></define-basic-event>
    <define-basic-event name="valve"><float value="0.05"/></define-basic-event>
  </model-data>
</opsa-mef>
"#;

fn fixture(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn explorer() -> Explorer {
    Explorer::new(Arc::new(MefLoader::new()), Arc::new(CutSetAnalyzer::new()))
}

#[test]
fn test_load_builds_model_tree() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "cooling.xml", COOLING);
    let mut explorer = explorer();

    explorer.add_input_files(&[path]).unwrap();

    assert_eq!(explorer.model_tree().header(), "Model: cooling");
    assert!(explorer.can_save());
    assert_eq!(
        explorer.drain_events(),
        vec![ExplorerEvent::ModelChanged { name: "cooling".into() }]
    );

    let node = explorer.model_tree().find(&["Fault Trees", "Cooling"]).unwrap();
    let handle = explorer.activate(TreeKind::Model, node).unwrap().unwrap();
    let ViewContent::Diagram(diagram) = &explorer.workspace().view(handle).unwrap().content else {
        panic!("expected a diagram");
    };
    assert_eq!(diagram.scene.gate_count(), 2);
    assert!(diagram.lines()[0].starts_with("top (OR)"));
    assert_eq!(explorer.drain_events(), vec![ExplorerEvent::ZoomEnabled(100)]);
}

#[test]
fn test_load_error_keeps_previous_model() {
    let dir = TempDir::new().unwrap();
    let good = fixture(&dir, "cooling.xml", COOLING);
    let broken = fixture(&dir, "broken.xml", "<opsa-mef><define-fault-tree");
    let mut explorer = explorer();
    explorer.add_input_files(&[good.clone()]).unwrap();

    let err = explorer.add_input_files(&[broken]).unwrap_err();

    assert!(matches!(err, ExplorerError::Load(_)));
    assert_eq!(explorer.model().name(), "cooling");
    assert_eq!(explorer.input_files(), [good]);
}

#[tokio::test]
async fn test_quantified_run_over_loaded_model() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "cooling.xml", COOLING);
    let mut explorer = explorer();
    explorer
        .apply_config(&[path], Settings::default().with_importance(true), &[])
        .unwrap();

    explorer.run_analysis().await.unwrap();

    let tree = explorer.report_tree();
    let top = tree.find(&["top"]).unwrap();
    let labels: Vec<&str> = tree.children(top).iter().filter_map(|&c| tree.label(c)).collect();
    assert_eq!(labels, vec!["Products: 2", "Probability: 0.07", "Importance Factors: 3"]);

    let node = tree.find(&["top", "Products: 2"]).unwrap();
    let handle = explorer.activate(TreeKind::Report, node).unwrap().unwrap();
    let ViewContent::Table(table) = &explorer.workspace().view(handle).unwrap().content else {
        panic!("expected a table");
    };
    assert_eq!(table.cell(0, 0), Some(&Cell::text("valve")));
    assert_eq!(table.cell(1, 0), Some(&Cell::text("pump-a ⋅ pump-b")));
    assert_eq!(table.cell(1, 1), Some(&Cell::Integer(2)));
}

#[tokio::test]
async fn test_importance_table_lists_every_record() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "cooling.xml", COOLING);
    let mut explorer = explorer();
    explorer
        .apply_config(&[path], Settings::default().with_importance(true), &[])
        .unwrap();
    explorer.run_analysis().await.unwrap();

    let records = explorer.analysis().unwrap().results[0]
        .importance_analysis
        .clone()
        .unwrap()
        .records;
    assert_eq!(records.len(), 3);

    let node = explorer.report_tree().find(&["top", "Importance Factors: 3"]).unwrap();
    let handle = explorer.activate(TreeKind::Report, node).unwrap().unwrap();
    let ViewContent::Table(table) = &explorer.workspace().view(handle).unwrap().content else {
        panic!("expected a table");
    };
    assert_eq!(table.title(), "Importance: top");
    assert_eq!(
        table.columns(),
        ["Id", "Occurrence", "Probability", "MIF", "CIF", "DIF", "RAW", "RRW"]
    );
    assert_eq!(table.row_count(), records.len());

    let row = records.iter().position(|r| r.event == "valve").unwrap();
    let valve = &records[row];
    assert_eq!(valve.probability, 0.05);
    let expected = [
        Cell::text("valve"),
        Cell::Integer(valve.factors.occurrence as u64),
        Cell::real(valve.probability),
        Cell::real(valve.factors.mif),
        Cell::real(valve.factors.cif),
        Cell::real(valve.factors.dif),
        Cell::real(valve.factors.raw),
        Cell::real(valve.factors.rrw),
    ];
    for (column, cell) in expected.iter().enumerate() {
        assert_eq!(table.cell(row, column), Some(cell));
    }
}

#[tokio::test]
async fn test_gate_loop_without_top_event_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let path = fixture(
        &dir,
        "loop.xml",
        r#"<opsa-mef name="loop"><define-fault-tree name="FT">
             <define-gate name="A"><or><gate name="B"/><basic-event name="e"/></or></define-gate>
             <define-gate name="B"><or><gate name="A"/></or></define-gate>
           </define-fault-tree>
           <model-data><define-basic-event name="e"><float value="0.1"/></define-basic-event></model-data>
           </opsa-mef>"#,
    );
    let mut explorer = explorer();
    explorer.add_input_files(&[path]).unwrap();

    let node = explorer.model_tree().find(&["Fault Trees", "FT"]).unwrap();
    let err = explorer.activate(TreeKind::Model, node).unwrap_err();
    assert!(err.is_contract_violation());
    assert!(explorer.workspace().is_empty());

    let err = explorer.run_analysis().await.unwrap_err();
    assert!(matches!(err, ExplorerError::Analysis(fault_explorer::analysis::AnalysisError::Cycle { .. })));
    assert!(explorer.analysis().is_none());
    assert!(explorer.report_tree().is_empty());
}
