//! Open views (tabs), the current view, and zoom state.
//!
//! Views live in an arena and are addressed by generation-checked
//! [`ViewHandle`]s, so a handle to a closed tab never resolves to whatever
//! reuses its slot.

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use super::ExplorerEvent;
use crate::diagram::Scene;
use crate::error::{ExplorerError, ExplorerResult};
use crate::table::DataTable;

pub const DEFAULT_ZOOM: u32 = 100;
pub const MIN_ZOOM: u32 = 10;
pub const MAX_ZOOM: u32 = 1000;

/// Indent of one diagram level at 100%
const BASE_INDENT: u32 = 4;

static ZOOM_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-9]\d+%?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle {
    index: usize,
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct DiagramView {
    pub fault_tree: String,
    pub scene: Scene,
    zoom: u32,
}

impl DiagramView {
    pub fn new(fault_tree: impl Into<String>, scene: Scene) -> Self {
        Self {
            fault_tree: fault_tree.into(),
            scene,
            zoom: DEFAULT_ZOOM,
        }
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    /// Per-level indent at the current zoom, never below one column
    pub fn indent(&self) -> usize {
        ((BASE_INDENT * self.zoom + 50) / 100).max(1) as usize
    }

    pub fn lines(&self) -> Vec<String> {
        self.scene.render_lines(self.indent())
    }

    /// Rendered width and height at 100%
    fn natural_size(&self) -> (u32, u32) {
        let lines = self.scene.render_lines(BASE_INDENT as usize);
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        (width as u32, lines.len() as u32)
    }
}

#[derive(Debug, Clone)]
pub enum ViewContent {
    Diagram(DiagramView),
    Table(DataTable),
}

#[derive(Debug, Clone)]
pub struct View {
    pub title: String,
    pub content: ViewContent,
}

impl View {
    pub fn zoom(&self) -> Option<u32> {
        match &self.content {
            ViewContent::Diagram(diagram) => Some(diagram.zoom),
            ViewContent::Table(_) => None,
        }
    }
}

struct Slot {
    generation: u64,
    view: Option<View>,
}

#[derive(Default)]
pub struct Workspace {
    slots: Vec<Slot>,
    tabs: Vec<ViewHandle>,
    current: Option<ViewHandle>,
    events: Vec<ExplorerEvent>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tab and makes it current.
    pub fn open(&mut self, title: impl Into<String>, content: ViewContent) -> ViewHandle {
        let view = View {
            title: title.into(),
            content,
        };
        debug!("Opening view '{}'", view.title);

        let handle = match self.slots.iter().position(|slot| slot.view.is_none()) {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation += 1;
                slot.view = Some(view);
                ViewHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    view: Some(view),
                });
                ViewHandle {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        self.tabs.push(handle);
        self.set_current_unchecked(Some(handle));
        handle
    }

    /// Closes one tab; the tab after it (or before it, if last) becomes current.
    pub fn close(&mut self, handle: ViewHandle) -> ExplorerResult<View> {
        let position = self
            .tabs
            .iter()
            .position(|&h| h == handle)
            .ok_or(ExplorerError::StaleView)?;
        self.tabs.remove(position);
        let view = self.slots[handle.index].view.take().ok_or(ExplorerError::StaleView)?;
        debug!("Closed view '{}'", view.title);

        if self.current == Some(handle) {
            let next = self
                .tabs
                .get(position)
                .or_else(|| self.tabs.last())
                .copied();
            self.set_current_unchecked(next);
        }
        Ok(view)
    }

    pub fn close_current(&mut self) -> ExplorerResult<View> {
        let handle = self.current.ok_or(ExplorerError::NoCurrentView)?;
        self.close(handle)
    }

    pub fn close_all(&mut self) {
        if self.tabs.is_empty() {
            return;
        }
        info!("Closing {} open view(s)", self.tabs.len());
        for handle in self.tabs.drain(..) {
            self.slots[handle.index].view = None;
        }
        self.set_current_unchecked(None);
    }

    pub fn view(&self, handle: ViewHandle) -> Option<&View> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.view.as_ref())
    }

    pub fn view_mut(&mut self, handle: ViewHandle) -> Option<&mut View> {
        self.slots
            .get_mut(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.view.as_mut())
    }

    pub fn tabs(&self) -> &[ViewHandle] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn current(&self) -> Option<ViewHandle> {
        self.current
    }

    pub fn current_view(&self) -> Option<&View> {
        self.current.and_then(|h| self.view(h))
    }

    pub fn current_view_mut(&mut self) -> Option<&mut View> {
        self.current.and_then(|h| self.view_mut(h))
    }

    pub fn current_index(&self) -> Option<usize> {
        let current = self.current?;
        self.tabs.iter().position(|&h| h == current)
    }

    pub fn set_current(&mut self, handle: ViewHandle) -> ExplorerResult<()> {
        if !self.tabs.contains(&handle) {
            return Err(ExplorerError::StaleView);
        }
        self.set_current_unchecked(Some(handle));
        Ok(())
    }

    pub fn next_tab(&mut self) {
        self.step_tab(1);
    }

    pub fn prev_tab(&mut self) {
        self.step_tab(self.tabs.len().saturating_sub(1));
    }

    fn step_tab(&mut self, offset: usize) {
        if self.tabs.is_empty() {
            return;
        }
        let index = self.current_index().unwrap_or(0);
        let next = self.tabs[(index + offset) % self.tabs.len()];
        self.set_current_unchecked(Some(next));
    }

    fn set_current_unchecked(&mut self, handle: Option<ViewHandle>) {
        let changed = self.current != handle;
        self.current = handle;
        if !changed {
            return;
        }
        let event = match self.current_view().and_then(View::zoom) {
            Some(level) => ExplorerEvent::ZoomEnabled(level),
            None => ExplorerEvent::ZoomDisabled,
        };
        self.events.push(event);
    }

    fn current_diagram(&mut self) -> ExplorerResult<&mut DiagramView> {
        let view = self.current_view_mut().ok_or(ExplorerError::NoCurrentView)?;
        match &mut view.content {
            ViewContent::Diagram(diagram) => Ok(diagram),
            ViewContent::Table(_) => Err(ExplorerError::NotZoomable),
        }
    }

    /// Sets the zoom of the current view, clamped to the supported range.
    pub fn set_zoom(&mut self, level: u32) -> ExplorerResult<u32> {
        if level == 0 {
            return Err(ExplorerError::InvalidZoom(level.to_string()));
        }
        let level = level.clamp(MIN_ZOOM, MAX_ZOOM);
        let diagram = self.current_diagram()?;
        if diagram.zoom != level {
            diagram.zoom = level;
            self.events.push(ExplorerEvent::ZoomChanged(level));
        }
        Ok(level)
    }

    /// Parses input such as `150` or `150%`.
    pub fn set_zoom_text(&mut self, text: &str) -> ExplorerResult<u32> {
        let text = text.trim();
        if !ZOOM_PATTERN.is_match(text) {
            return Err(ExplorerError::InvalidZoom(text.to_string()));
        }
        let level = text
            .trim_end_matches('%')
            .parse::<u32>()
            .map_err(|_| ExplorerError::InvalidZoom(text.to_string()))?;
        self.set_zoom(level)
    }

    pub fn zoom_in(&mut self, step: u32) -> ExplorerResult<u32> {
        let level = self.current_diagram()?.zoom;
        self.set_zoom(level.saturating_add(step))
    }

    pub fn zoom_out(&mut self, step: u32) -> ExplorerResult<u32> {
        let level = self.current_diagram()?.zoom;
        self.set_zoom(level.saturating_sub(step).max(MIN_ZOOM))
    }

    /// Largest zoom at which the whole diagram fits the viewport.
    pub fn best_fit(&mut self, viewport_width: u32, viewport_height: u32) -> ExplorerResult<u32> {
        let (width, height) = self.current_diagram()?.natural_size();
        let ratio_w = viewport_width as f64 / width.max(1) as f64;
        let ratio_h = viewport_height as f64 / height.max(1) as f64;
        let level = (ratio_w.min(ratio_h) * 100.0).floor();
        self.set_zoom((level as u32).max(MIN_ZOOM))
    }

    pub fn drain_events(&mut self) -> Vec<ExplorerEvent> {
        std::mem::take(&mut self.events)
    }
}
