use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, error, info};
use std::time::Duration;

use super::resource::Resource;
use super::theme::Theme;
use super::tree::TreeState;
use crate::config::UiConfig;
use crate::error::ExplorerError;
use crate::explorer::{Explorer, ExplorerEvent, PendingRun, TreeKind, ViewContent, WaitDialog};

/// Outcome of the last analysis run, for the header
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub results: usize,
    pub duration: Duration,
}

/// Blocking message closed with Enter or Esc
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorModal {
    pub title: String,
    pub message: String,
}

pub struct App {
    pub explorer: Explorer,
    pub theme: Theme,
    pub wait: WaitDialog,
    pub error: Option<ErrorModal>,
    pub run_status: Resource<RunSummary, String>,
    /// Last shell notification
    pub status: String,
    zoom_step: u32,
    active_tree: TreeKind,
    model_state: TreeState,
    report_state: TreeState,
    pending: Option<PendingRun>,
    viewport: (u32, u32),
    should_quit: bool,
}

impl App {
    pub fn new(explorer: Explorer, ui: &UiConfig) -> Self {
        let mut app = Self {
            explorer,
            theme: Theme::new(ui.theme),
            wait: WaitDialog::new(),
            error: None,
            run_status: Resource::NotAsked,
            status: String::new(),
            zoom_step: ui.zoom_step.max(1),
            active_tree: TreeKind::Model,
            model_state: TreeState::new(),
            report_state: TreeState::new(),
            pending: None,
            viewport: (80, 24),
            should_quit: false,
        };
        app.process_events();
        app.sync_trees();
        app
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn active_tree(&self) -> TreeKind {
        self.active_tree
    }

    pub fn tree_state(&self, kind: TreeKind) -> &TreeState {
        match kind {
            TreeKind::Model => &self.model_state,
            TreeKind::Report => &self.report_state,
        }
    }

    fn tree_state_mut(&mut self, kind: TreeKind) -> &mut TreeState {
        match kind {
            TreeKind::Model => &mut self.model_state,
            TreeKind::Report => &mut self.report_state,
        }
    }

    /// Records the view area size for best-fit zoom and scrolling.
    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.viewport = (width as u32, height as u32);
    }

    pub fn update_tree_scroll(&mut self, kind: TreeKind, height: usize) {
        self.tree_state_mut(kind).update_scroll(height);
    }

    pub fn show_error(&mut self, title: impl Into<String>, message: impl Into<String>) {
        let modal = ErrorModal {
            title: title.into(),
            message: message.into(),
        };
        error!("{}: {}", modal.title, modal.message);
        self.error = Some(modal);
    }

    fn sync_trees(&mut self) {
        self.model_state.sync(self.explorer.model_tree());
        self.report_state.sync(self.explorer.report_tree());
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        // A run owns the input until it finishes.
        if self.wait.handle_key(key) {
            return;
        }

        if self.error.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.error = None;
            }
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('q') {
                info!("Quit requested");
                self.should_quit = true;
            }
            return;
        }

        let active = self.active_tree;
        if self.tree_state_mut(active).handle_key(key.code) {
            self.sync_trees();
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.active_tree = match self.active_tree {
                    TreeKind::Model => TreeKind::Report,
                    TreeKind::Report => TreeKind::Model,
                };
            }
            KeyCode::Enter => self.activate_selected(),
            KeyCode::Char('r') => self.start_run(),
            KeyCode::Char('n') => {
                if let Err(e) = self.explorer.new_model() {
                    self.show_error("New model failed", e.to_string());
                }
                self.run_status = Resource::NotAsked;
            }
            KeyCode::Char('x') => {
                if let Err(e) = self.explorer.workspace_mut().close_current() {
                    debug!("Nothing to close: {}", e);
                }
            }
            KeyCode::Char('[') => self.explorer.workspace_mut().prev_tab(),
            KeyCode::Char(']') => self.explorer.workspace_mut().next_tab(),
            KeyCode::Char('+') => {
                let step = self.zoom_step;
                self.zoom(|explorer| explorer.zoom_in(step));
            }
            KeyCode::Char('-') => {
                let step = self.zoom_step;
                self.zoom(|explorer| explorer.zoom_out(step));
            }
            KeyCode::Char('=') => {
                let (width, height) = self.viewport;
                self.zoom(|explorer| explorer.best_fit(width, height));
            }
            KeyCode::Char('s') => {
                if let Some(view) = self.explorer.workspace_mut().current_view_mut() {
                    if let ViewContent::Table(table) = &mut view.content {
                        table.cycle_sort();
                    }
                }
            }
            _ => {}
        }
        self.process_events();
    }

    fn zoom(&mut self, request: impl FnOnce(&mut Explorer) -> Result<u32, ExplorerError>) {
        match request(&mut self.explorer) {
            Ok(_) => {}
            Err(ExplorerError::NotZoomable | ExplorerError::NoCurrentView) => {
                self.status = "Current view does not zoom".to_string();
            }
            Err(e) => self.show_error("Zoom failed", e.to_string()),
        }
    }

    fn activate_selected(&mut self) {
        let kind = self.active_tree;
        let Some(node) = self.tree_state(kind).selected() else { return };
        match self.explorer.activate(kind, node) {
            Ok(Some(_)) => {}
            Ok(None) => {
                // Grouping nodes expand instead.
                let state = self.tree_state_mut(kind);
                if state.is_expanded(node) {
                    state.collapse(node);
                } else {
                    state.expand(node);
                }
                self.sync_trees();
            }
            Err(e) => self.show_error("Cannot open view", e.to_string()),
        }
    }

    fn start_run(&mut self) {
        if self.pending.is_some() {
            return;
        }
        match self.explorer.start_run() {
            Ok(pending) => {
                self.wait.open(format!("Analyzing '{}'", self.explorer.model().name()));
                self.run_status = Resource::Loading;
                self.pending = Some(pending);
            }
            Err(e) => self.show_error("Analysis failed", e.to_string()),
        }
    }

    /// Per-frame work: advance the spinner and collect a finished run.
    pub fn tick(&mut self) {
        let finished = match self.pending.as_mut() {
            Some(pending) => pending.poll_finished(),
            None => false,
        };
        if finished {
            if let Some(pending) = self.pending.take() {
                self.wait.reset();
                let elapsed = pending.elapsed();
                match self.explorer.finish_run(pending) {
                    Ok(()) => {
                        let results = self.explorer.analysis().map(|run| run.results.len()).unwrap_or(0);
                        self.run_status = Resource::Success(RunSummary {
                            results,
                            duration: elapsed,
                        });
                        self.active_tree = TreeKind::Report;
                    }
                    Err(e) => {
                        self.run_status = Resource::Failure(e.to_string());
                        self.show_error("Analysis failed", e.to_string());
                    }
                }
                self.process_events();
            }
        } else if self.wait.is_active() {
            self.wait.tick();
        }
    }

    fn process_events(&mut self) {
        for event in self.explorer.drain_events() {
            debug!("Explorer event: {:?}", event);
            self.status = match event {
                ExplorerEvent::ModelChanged { name } => format!("Model '{}' loaded", name),
                ExplorerEvent::ReportChanged { results } => format!("Report updated: {} result(s)", results),
                ExplorerEvent::ZoomEnabled(level) | ExplorerEvent::ZoomChanged(level) => format!("Zoom {}%", level),
                ExplorerEvent::ZoomDisabled => String::new(),
            };
        }
        self.sync_trees();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::CutSetAnalyzer;
    use crate::model::MefLoader;
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> App {
        let explorer = Explorer::new(Arc::new(MefLoader::new()), Arc::new(CutSetAnalyzer::new()));
        App::new(explorer, &UiConfig::default())
    }

    #[test]
    fn test_error_modal_blocks_until_dismissed() {
        let mut app = app();
        app.show_error("Oops", "bad");
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.active_tree(), TreeKind::Model);
        app.handle_key(key(KeyCode::Esc));
        assert!(app.error.is_none());
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.active_tree(), TreeKind::Report);
    }

    #[test]
    fn test_enter_on_data_table_opens_tab() {
        let mut app = app();
        // Model Data is the second root; expand it and open Basic Events.
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        let view = app.explorer.workspace().current_view().unwrap();
        assert_eq!(view.title, "Basic Events");
    }

    #[test]
    fn test_run_on_empty_model_reports_failure() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('r')));
        assert!(app.wait.is_active());
        // Esc is absorbed while running
        app.handle_key(key(KeyCode::Esc));
        while app.wait.is_active() {
            app.tick();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(app.run_status.is_failure());
        assert!(app.error.is_some());
    }

    #[test]
    fn test_ctrl_q_quits() {
        let mut app = app();
        app.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
    }
}
