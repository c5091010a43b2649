use log::debug;
use std::collections::HashMap;

use super::NavNodeId;
use super::workspace::ViewHandle;
use crate::error::ExplorerResult;

/// Deferred, repeatable view materialization bound to a navigation node
pub type Action<C> = Box<dyn Fn(&mut C) -> ExplorerResult<ViewHandle> + Send>;

/// Maps navigation nodes to the actions run when they are activated.
///
/// Nodes without an action are grouping labels; activating them does nothing.
/// Call [`clear`](Self::clear) before rebuilding the tree the nodes belong to
/// so no action outlives the data it was built over.
pub struct NavigationRegistry<C> {
    actions: HashMap<NavNodeId, Action<C>>,
}

impl<C> Default for NavigationRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> NavigationRegistry<C> {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Associates `node` with `action`, replacing any previous action.
    pub fn register<F>(&mut self, node: NavNodeId, action: F)
    where
        F: Fn(&mut C) -> ExplorerResult<ViewHandle> + Send + 'static,
    {
        self.actions.insert(node, Box::new(action));
    }

    /// Runs the node's action. `Ok(None)` when the node has none.
    pub fn activate(&self, node: NavNodeId, context: &mut C) -> ExplorerResult<Option<ViewHandle>> {
        match self.actions.get(&node) {
            Some(action) => {
                debug!("Activating navigation node {}", node);
                action(context).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn contains(&self, node: NavNodeId) -> bool {
        self.actions.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::NavigationTree;
    use crate::explorer::workspace::{ViewContent, Workspace};
    use crate::table::DataTable;

    fn open_table(workspace: &mut Workspace) -> ExplorerResult<ViewHandle> {
        Ok(workspace.open("Table", ViewContent::Table(DataTable::new("t", vec!["a"]))))
    }

    #[test]
    fn test_activate_unregistered_node_is_noop() {
        let mut tree = NavigationTree::new();
        let node = tree.add_root("Fault Trees");
        let registry: NavigationRegistry<Workspace> = NavigationRegistry::new();
        let mut workspace = Workspace::new();

        assert!(registry.activate(node, &mut workspace).unwrap().is_none());
        assert!(workspace.is_empty());
    }

    #[test]
    fn test_reactivation_builds_fresh_view() {
        let mut tree = NavigationTree::new();
        let node = tree.add_root("Basic Events");
        let mut registry = NavigationRegistry::new();
        registry.register(node, open_table);
        let mut workspace = Workspace::new();

        let first = registry.activate(node, &mut workspace).unwrap().unwrap();
        let second = registry.activate(node, &mut workspace).unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(workspace.len(), 2);
        assert_eq!(workspace.current(), Some(second));
    }

    #[test]
    fn test_clear_twice_is_noop() {
        let mut tree = NavigationTree::new();
        let node = tree.add_root("Basic Events");
        let mut registry = NavigationRegistry::new();
        registry.register(node, open_table);

        registry.clear();
        assert!(registry.is_empty());
        registry.clear();
        assert!(registry.is_empty());

        let mut workspace = Workspace::new();
        assert!(registry.activate(node, &mut workspace).unwrap().is_none());
    }
}
