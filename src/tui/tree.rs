use crossterm::event::KeyCode;
use std::collections::{HashMap, HashSet};

use crate::explorer::{NavNodeId, NavigationTree};

/// Expansion, selection and scrolling state for one navigation tree
#[derive(Debug, Clone)]
pub struct TreeState {
    expanded: HashSet<NavNodeId>,
    selected: Option<NavNodeId>,
    scroll_offset: usize,
    scroll_off: usize, // rows kept visible around the selection

    // Rebuilt by sync()
    node_parents: HashMap<NavNodeId, NavNodeId>,
    visible_order: Vec<(NavNodeId, usize)>,
}

impl Default for TreeState {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeState {
    pub fn new() -> Self {
        Self {
            expanded: HashSet::new(),
            selected: None,
            scroll_offset: 0,
            scroll_off: 2,
            node_parents: HashMap::new(),
            visible_order: Vec::new(),
        }
    }

    pub fn selected(&self) -> Option<NavNodeId> {
        self.selected
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Visible rows with their depth, in display order
    pub fn visible(&self) -> &[(NavNodeId, usize)] {
        &self.visible_order
    }

    pub fn is_expanded(&self, id: NavNodeId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn expand(&mut self, id: NavNodeId) {
        self.expanded.insert(id);
    }

    pub fn collapse(&mut self, id: NavNodeId) {
        self.expanded.remove(&id);
    }

    /// Recomputes visible rows after the tree or the expansion set changed.
    ///
    /// Ids that no longer exist are forgotten; a lost selection falls back to the first row.
    pub fn sync(&mut self, tree: &NavigationTree) {
        self.expanded.retain(|&id| tree.contains(id));
        self.node_parents.clear();
        let expanded = &self.expanded;
        self.visible_order = tree.flatten(|id| expanded.contains(&id));
        for &(id, _) in &self.visible_order {
            if let Some(parent) = tree.node(id).and_then(|n| n.parent) {
                self.node_parents.insert(id, parent);
            }
        }

        let selection_visible = self
            .selected
            .map(|s| self.visible_order.iter().any(|&(id, _)| id == s))
            .unwrap_or(false);
        if !selection_visible {
            self.selected = self.visible_order.first().map(|&(id, _)| id);
            self.scroll_offset = 0;
        }
    }

    fn position(&self) -> Option<usize> {
        let selected = self.selected?;
        self.visible_order.iter().position(|&(id, _)| id == selected)
    }

    pub fn navigate_next(&mut self) {
        match self.position() {
            Some(pos) if pos + 1 < self.visible_order.len() => {
                self.selected = Some(self.visible_order[pos + 1].0);
            }
            Some(_) => {}
            None => self.selected = self.visible_order.first().map(|&(id, _)| id),
        }
    }

    pub fn navigate_prev(&mut self) {
        match self.position() {
            Some(pos) if pos > 0 => self.selected = Some(self.visible_order[pos - 1].0),
            Some(_) => {}
            None => self.selected = self.visible_order.first().map(|&(id, _)| id),
        }
    }

    pub fn navigate_to_parent(&mut self) {
        if let Some(parent) = self.selected.and_then(|id| self.node_parents.get(&id)) {
            self.selected = Some(*parent);
        }
    }

    /// Arrow-key navigation; returns true if handled. Call [`sync`](Self::sync) afterwards.
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Up => {
                self.navigate_prev();
                true
            }
            KeyCode::Down => {
                self.navigate_next();
                true
            }
            KeyCode::Right => {
                if let Some(id) = self.selected {
                    self.expand(id);
                }
                true
            }
            KeyCode::Left => {
                if let Some(id) = self.selected {
                    if self.is_expanded(id) {
                        self.collapse(id);
                    } else {
                        self.navigate_to_parent();
                    }
                }
                true
            }
            _ => false,
        }
    }

    /// Keeps the selection inside a viewport of `height` rows.
    pub fn update_scroll(&mut self, height: usize) {
        let Some(pos) = self.position() else { return };
        if height == 0 {
            return;
        }
        let margin = self.scroll_off.min(height.saturating_sub(1) / 2);
        if pos < self.scroll_offset + margin {
            self.scroll_offset = pos.saturating_sub(margin);
        } else if pos + margin >= self.scroll_offset + height {
            self.scroll_offset = pos + margin + 1 - height;
        }
        let max_offset = self.visible_order.len().saturating_sub(height);
        self.scroll_offset = self.scroll_offset.min(max_offset);
    }
}
