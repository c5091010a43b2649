use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ExplorerError, ExplorerResult};

/// Opaque identity of a navigation node.
///
/// Ids are never reused by the tree that issued them, even across
/// [`NavigationTree::clear`], so a stale id can never name a new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NavNodeId(u64);

impl fmt::Display for NavNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nav-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavNode {
    pub id: NavNodeId,
    pub label: String,
    pub parent: Option<NavNodeId>,
    pub children: Vec<NavNodeId>,
}

/// Ordered tree of navigation labels
#[derive(Debug, Clone, Default)]
pub struct NavigationTree {
    header: String,
    nodes: BTreeMap<NavNodeId, NavNode>,
    roots: Vec<NavNodeId>,
    next_id: u64,
}

impl NavigationTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn set_header(&mut self, header: impl Into<String>) {
        self.header = header.into();
    }

    fn issue(&mut self, label: String, parent: Option<NavNodeId>) -> NavNodeId {
        let id = NavNodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            NavNode {
                id,
                label,
                parent,
                children: Vec::new(),
            },
        );
        id
    }

    pub fn add_root(&mut self, label: impl Into<String>) -> NavNodeId {
        let id = self.issue(label.into(), None);
        self.roots.push(id);
        id
    }

    pub fn add_child(&mut self, parent: NavNodeId, label: impl Into<String>) -> ExplorerResult<NavNodeId> {
        if !self.nodes.contains_key(&parent) {
            return Err(ExplorerError::UnknownNode(parent));
        }
        let id = self.issue(label.into(), Some(parent));
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        Ok(id)
    }

    /// Removes every node; the header is kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    pub fn roots(&self) -> &[NavNodeId] {
        &self.roots
    }

    pub fn node(&self, id: NavNodeId) -> Option<&NavNode> {
        self.nodes.get(&id)
    }

    pub fn label(&self, id: NavNodeId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.label.as_str())
    }

    pub fn children(&self, id: NavNodeId) -> &[NavNodeId] {
        self.nodes.get(&id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, id: NavNodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Follows labels from a root down, e.g. `["Model Data", "Basic Events"]`.
    pub fn find(&self, path: &[&str]) -> Option<NavNodeId> {
        let (first, rest) = path.split_first()?;
        let mut current = *self.roots.iter().find(|&&id| self.label(id) == Some(first))?;
        for label in rest {
            current = *self
                .children(current)
                .iter()
                .find(|&&id| self.label(id) == Some(label))?;
        }
        Some(current)
    }

    /// Depth-first visible rows, descending only into nodes `is_expanded` accepts.
    pub fn flatten(&self, is_expanded: impl Fn(NavNodeId) -> bool) -> Vec<(NavNodeId, usize)> {
        let mut rows = Vec::new();
        let mut stack: Vec<(NavNodeId, usize)> = self.roots.iter().rev().map(|&id| (id, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            rows.push((id, depth));
            if is_expanded(id) {
                stack.extend(self.children(id).iter().rev().map(|&child| (child, depth + 1)));
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_not_reused_after_clear() {
        let mut tree = NavigationTree::new();
        let old = tree.add_root("Fault Trees");
        tree.clear();
        let new = tree.add_root("Fault Trees");
        assert_ne!(old, new);
        assert!(!tree.contains(old));
    }

    #[test]
    fn test_find_and_flatten() {
        let mut tree = NavigationTree::new();
        let data = tree.add_root("Model Data");
        let basic = tree.add_child(data, "Basic Events").unwrap();
        tree.add_child(data, "House Events").unwrap();
        let trees = tree.add_root("Fault Trees");

        assert_eq!(tree.find(&["Model Data", "Basic Events"]), Some(basic));
        assert_eq!(tree.find(&["Model Data", "Nope"]), None);

        let collapsed = tree.flatten(|_| false);
        assert_eq!(collapsed, vec![(data, 0), (trees, 0)]);
        let expanded = tree.flatten(|_| true);
        assert_eq!(expanded.len(), 4);
        assert_eq!(expanded[1], (basic, 1));
    }

    #[test]
    fn test_add_child_to_unknown_parent_fails() {
        let mut tree = NavigationTree::new();
        let root = tree.add_root("x");
        tree.clear();
        assert!(matches!(tree.add_child(root, "y"), Err(ExplorerError::UnknownNode(_))));
    }
}
