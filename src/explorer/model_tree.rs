use log::info;
use std::sync::{Arc, Weak};

use super::registry::NavigationRegistry;
use super::workspace::{DiagramView, ViewContent, ViewHandle, Workspace};
use super::NavigationTree;
use crate::diagram::DiagramBuilder;
use crate::error::{ExplorerError, ExplorerResult};
use crate::model::Model;
use crate::table::{Cell, DataTable};

/// Populates the model navigation tree: fault trees first, then model data tables.
///
/// The tree and registry are expected to be empty.
pub fn build(
    model: &Arc<Model>,
    tree: &mut NavigationTree,
    registry: &mut NavigationRegistry<Workspace>,
) -> ExplorerResult<()> {
    tree.set_header(format!("Model: {}", model.name()));

    let fault_trees = tree.add_root("Fault Trees");
    for fault_tree in model.fault_trees() {
        let node = tree.add_child(fault_trees, fault_tree.name.as_str())?;
        let weak = Arc::downgrade(model);
        let name = fault_tree.name.clone();
        registry.register(node, move |ws| open_diagram(&weak, &name, ws));
    }

    let data = tree.add_root("Model Data");
    let basic = tree.add_child(data, "Basic Events")?;
    let weak = Arc::downgrade(model);
    registry.register(basic, move |ws| open_table(&weak, basic_event_table, ws));

    let house = tree.add_child(data, "House Events")?;
    let weak = Arc::downgrade(model);
    registry.register(house, move |ws| open_table(&weak, house_event_table, ws));

    let parameters = tree.add_child(data, "Parameters")?;
    let weak = Arc::downgrade(model);
    registry.register(parameters, move |ws| open_table(&weak, parameter_table, ws));

    info!(
        "Model tree rebuilt for '{}': {} fault tree(s), {} action(s)",
        model.name(),
        model.fault_trees().len(),
        registry.len()
    );
    Ok(())
}

fn open_diagram(model: &Weak<Model>, name: &str, ws: &mut Workspace) -> ExplorerResult<ViewHandle> {
    let model = model.upgrade().ok_or(ExplorerError::StaleView)?;
    let fault_tree = model.fault_tree(name).ok_or(ExplorerError::StaleView)?;
    let (scene, _) = DiagramBuilder::build_fault_tree(&model, fault_tree)?;
    Ok(ws.open(
        format!("Fault Tree: {}", name),
        ViewContent::Diagram(DiagramView::new(name, scene)),
    ))
}

fn open_table(model: &Weak<Model>, make: fn(&Model) -> DataTable, ws: &mut Workspace) -> ExplorerResult<ViewHandle> {
    let model = model.upgrade().ok_or(ExplorerError::StaleView)?;
    let table = make(&model);
    Ok(ws.open(table.title().to_string(), ViewContent::Table(table)))
}

pub fn basic_event_table(model: &Model) -> DataTable {
    let mut table = DataTable::new("Basic Events", vec!["Id", "Probability", "Label"]);
    for event in model.basic_events() {
        let probability = match event.p() {
            Some(p) => Cell::real(p),
            None => Cell::text("NULL"),
        };
        table.push_row(vec![Cell::text(&event.id), probability, Cell::text(&event.label)]);
    }
    table
}

pub fn house_event_table(model: &Model) -> DataTable {
    let mut table = DataTable::new("House Events", vec!["Id", "State", "Label"]);
    for event in model.house_events() {
        table.push_row(vec![
            Cell::text(&event.id),
            Cell::text(event.state.to_string()),
            Cell::text(&event.label),
        ]);
    }
    table
}

pub fn parameter_table(model: &Model) -> DataTable {
    let mut table = DataTable::new("Parameters", vec!["Id", "Value", "Unit", "Label"]);
    for parameter in model.parameters() {
        table.push_row(vec![
            Cell::text(&parameter.id),
            Cell::real(parameter.value),
            Cell::text(parameter.unit.as_deref().unwrap_or("")),
            Cell::text(&parameter.label),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Argument, BasicEvent, Connective, Gate, HouseEvent};

    fn sample() -> Arc<Model> {
        let mut model = Model::new("pumps");
        model.add_basic_event(BasicEvent::new("pump", Some(0.1))).unwrap();
        model.add_basic_event(BasicEvent::new("valve", None)).unwrap();
        model
            .add_house_event(HouseEvent {
                id: "maintenance".into(),
                state: true,
                label: String::new(),
            })
            .unwrap();
        let mut top = Gate::new("top", Connective::Or);
        top.args.push(Argument::BasicEvent("pump".into()));
        top.args.push(Argument::BasicEvent("valve".into()));
        let top = model.add_gate(top).unwrap();
        model.add_fault_tree("FT", vec![top]).unwrap();
        Arc::new(model)
    }

    #[test]
    fn test_tree_layout() {
        let model = sample();
        let mut tree = NavigationTree::new();
        let mut registry = NavigationRegistry::new();
        build(&model, &mut tree, &mut registry).unwrap();

        assert_eq!(tree.header(), "Model: pumps");
        let labels: Vec<&str> = tree.roots().iter().filter_map(|&id| tree.label(id)).collect();
        assert_eq!(labels, vec!["Fault Trees", "Model Data"]);
        assert!(tree.find(&["Fault Trees", "FT"]).is_some());
        // one diagram + three data tables
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_symbolic_event_shows_null() {
        let table = basic_event_table(&sample());
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, 1), Some(&Cell::text("NULL")));
    }

    #[test]
    fn test_activation_after_model_drop_is_stale() {
        let model = sample();
        let mut tree = NavigationTree::new();
        let mut registry = NavigationRegistry::new();
        build(&model, &mut tree, &mut registry).unwrap();
        let node = tree.find(&["Model Data", "Basic Events"]).unwrap();
        drop(model);

        let mut ws = Workspace::new();
        assert!(matches!(registry.activate(node, &mut ws), Err(ExplorerError::StaleView)));
        assert!(ws.is_empty());
    }

    #[test]
    fn test_diagram_action_opens_tab() {
        let model = sample();
        let mut tree = NavigationTree::new();
        let mut registry = NavigationRegistry::new();
        build(&model, &mut tree, &mut registry).unwrap();
        let node = tree.find(&["Fault Trees", "FT"]).unwrap();

        let mut ws = Workspace::new();
        let handle = registry.activate(node, &mut ws).unwrap().unwrap();
        let view = ws.view(handle).unwrap();
        assert_eq!(view.title, "Fault Tree: FT");
        assert_eq!(view.zoom(), Some(100));
    }
}
