//! The explorer session: the model, its navigation trees, open views and the
//! most recent analysis report.
//!
//! Both navigation trees follow the same discipline: the registry is cleared
//! and every open view closed before a tree is rebuilt, so no action or view
//! outlives the data it was built over.

pub mod model_tree;
pub mod navigation;
pub mod registry;
pub mod report;
pub mod run;
pub mod workspace;

use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

pub use navigation::{NavNode, NavNodeId, NavigationTree};
pub use registry::NavigationRegistry;
pub use report::ResultTreeBuilder;
pub use run::{AnalysisRun, AnalysisRunCoordinator, PendingRun, RunId, WaitDialog};
pub use workspace::{View, ViewContent, ViewHandle, Workspace};

use crate::analysis::{Analyzer, Settings};
use crate::error::{ExplorerError, ExplorerResult};
use crate::model::{Model, ModelLoader};

/// Notifications for the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerEvent {
    ModelChanged { name: String },
    ReportChanged { results: usize },
    ZoomEnabled(u32),
    ZoomDisabled,
    ZoomChanged(u32),
}

/// Which navigation tree a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
    Model,
    Report,
}

pub struct Explorer {
    model: Arc<Model>,
    settings: Settings,
    input_files: Vec<PathBuf>,
    loader: Arc<dyn ModelLoader>,
    coordinator: AnalysisRunCoordinator,
    model_tree: NavigationTree,
    model_actions: NavigationRegistry<Workspace>,
    report_tree: NavigationTree,
    report_actions: NavigationRegistry<Workspace>,
    workspace: Workspace,
    analysis: Option<Arc<AnalysisRun>>,
    can_save: bool,
    events: Vec<ExplorerEvent>,
}

impl Explorer {
    /// Starts with an empty model and no report.
    pub fn new(loader: Arc<dyn ModelLoader>, analyzer: Arc<dyn Analyzer>) -> Self {
        let mut explorer = Self {
            model: Arc::new(Model::new("")),
            settings: Settings::default(),
            input_files: Vec::new(),
            loader,
            coordinator: AnalysisRunCoordinator::new(analyzer),
            model_tree: NavigationTree::new(),
            model_actions: NavigationRegistry::new(),
            report_tree: NavigationTree::new(),
            report_actions: NavigationRegistry::new(),
            workspace: Workspace::new(),
            analysis: None,
            can_save: false,
            events: Vec::new(),
        };
        if let Err(e) = explorer.reset_model_tree() {
            error!("Failed to build model tree for empty model: {}", e);
        }
        explorer
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }

    pub fn can_save(&self) -> bool {
        self.can_save
    }

    pub fn analysis(&self) -> Option<&Arc<AnalysisRun>> {
        self.analysis.as_ref()
    }

    pub fn tree(&self, kind: TreeKind) -> &NavigationTree {
        match kind {
            TreeKind::Model => &self.model_tree,
            TreeKind::Report => &self.report_tree,
        }
    }

    pub fn model_tree(&self) -> &NavigationTree {
        &self.model_tree
    }

    pub fn report_tree(&self) -> &NavigationTree {
        &self.report_tree
    }

    pub fn registry(&self, kind: TreeKind) -> &NavigationRegistry<Workspace> {
        match kind {
            TreeKind::Model => &self.model_actions,
            TreeKind::Report => &self.report_actions,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    /// Replaces the model with an empty one and forgets the input files.
    pub fn new_model(&mut self) -> ExplorerResult<()> {
        self.input_files.clear();
        self.commit_model(Model::new(""))
    }

    /// Reloads the model from the current files plus `files`.
    ///
    /// On a load error the current model, files and report are kept.
    pub fn add_input_files(&mut self, files: &[PathBuf]) -> ExplorerResult<()> {
        if files.is_empty() {
            return Ok(());
        }
        let mut all = self.input_files.clone();
        all.extend(files.iter().cloned());
        let model = self.load(&all, &self.settings)?;
        self.input_files = all;
        self.commit_model(model)
    }

    /// Loads the configuration's input files (plus `extra`) under its settings.
    pub fn apply_config(&mut self, input_files: &[PathBuf], settings: Settings, extra: &[PathBuf]) -> ExplorerResult<()> {
        let mut all = input_files.to_vec();
        all.extend(extra.iter().cloned());
        let model = self.load(&all, &settings)?;
        self.settings = settings;
        self.input_files = all;
        self.commit_model(model)
    }

    fn load(&self, files: &[PathBuf], settings: &Settings) -> ExplorerResult<Model> {
        info!("Loading model from {} file(s)", files.len());
        self.loader.load(files, settings).map_err(|e| {
            error!("Model load failed: {}", e);
            ExplorerError::from(e)
        })
    }

    fn commit_model(&mut self, model: Model) -> ExplorerResult<()> {
        info!(
            "Model '{}': {} fault tree(s), {} gate(s), {} basic event(s)",
            model.name(),
            model.fault_trees().len(),
            model.gates().len(),
            model.basic_events().len()
        );
        self.model = Arc::new(model);
        self.can_save = true;
        self.reset_model_tree()?;
        let name = self.model.name().to_string();
        self.emit(ExplorerEvent::ModelChanged { name });
        Ok(())
    }

    fn reset_model_tree(&mut self) -> ExplorerResult<()> {
        self.workspace.close_all();
        self.report_actions.clear();
        self.report_tree.clear();
        self.analysis = None;
        self.model_actions.clear();
        self.model_tree.clear();
        model_tree::build(&self.model, &mut self.model_tree, &mut self.model_actions)
    }

    /// Runs the node's action; inert nodes yield `Ok(None)`.
    pub fn activate(&mut self, kind: TreeKind, node: NavNodeId) -> ExplorerResult<Option<ViewHandle>> {
        let registry = match kind {
            TreeKind::Model => &self.model_actions,
            TreeKind::Report => &self.report_actions,
        };
        let result = registry.activate(node, &mut self.workspace);
        if let Err(e) = &result {
            error!("Activating {} failed: {}", node, e);
        }
        result
    }

    /// Spawns a run over the current model snapshot.
    pub fn start_run(&self) -> ExplorerResult<PendingRun> {
        Ok(self.coordinator.start(Arc::clone(&self.model), self.settings.clone())?)
    }

    /// Joins a finished run and swaps the report in.
    ///
    /// A failed run leaves the previous report and its views untouched.
    pub fn finish_run(&mut self, pending: PendingRun) -> ExplorerResult<()> {
        let run = pending.join()?;
        self.apply_analysis(run)
    }

    pub async fn run_analysis(&mut self) -> ExplorerResult<()> {
        let mut pending = self.start_run()?;
        pending.finished().await;
        self.finish_run(pending)
    }

    /// Replaces the report with `run`. An invalid run leaves everything as it was.
    pub fn apply_analysis(&mut self, run: AnalysisRun) -> ExplorerResult<()> {
        let run = Arc::new(run);
        if let Err(e) = ResultTreeBuilder::build(&run, &mut self.report_tree, &mut self.report_actions) {
            error!("Discarding analysis run {}: {}", run.id, e);
            return Err(e);
        }
        self.workspace.close_all();
        let results = run.results.len();
        self.analysis = Some(run);
        self.emit(ExplorerEvent::ReportChanged { results });
        Ok(())
    }

    pub fn close_view(&mut self, handle: ViewHandle) -> ExplorerResult<()> {
        self.workspace.close(handle).map(|_| ())
    }

    pub fn zoom_in(&mut self, step: u32) -> ExplorerResult<u32> {
        self.workspace.zoom_in(step)
    }

    pub fn zoom_out(&mut self, step: u32) -> ExplorerResult<u32> {
        self.workspace.zoom_out(step)
    }

    pub fn set_zoom(&mut self, level: u32) -> ExplorerResult<u32> {
        self.workspace.set_zoom(level)
    }

    pub fn set_zoom_text(&mut self, text: &str) -> ExplorerResult<u32> {
        self.workspace.set_zoom_text(text).inspect_err(|e| warn!("{}", e))
    }

    pub fn best_fit(&mut self, viewport_width: u32, viewport_height: u32) -> ExplorerResult<u32> {
        self.workspace.best_fit(viewport_width, viewport_height)
    }

    fn emit(&mut self, event: ExplorerEvent) {
        self.events.extend(self.workspace.drain_events());
        self.events.push(event);
    }

    /// Pending notifications, oldest first
    pub fn drain_events(&mut self) -> Vec<ExplorerEvent> {
        self.events.extend(self.workspace.drain_events());
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisError, AnalysisResult, CutSetAnalyzer};
    use crate::model::{Argument, BasicEvent, Connective, Gate, LoadError};
    use std::path::Path;

    /// Builds a tiny model named after the number of files requested.
    struct StubLoader;

    impl ModelLoader for StubLoader {
        fn load(&self, paths: &[PathBuf], _: &Settings) -> Result<Model, LoadError> {
            if paths.iter().any(|p| p.ends_with("broken.xml")) {
                return Err(LoadError::Invalid {
                    path: paths[0].clone(),
                    message: "broken".into(),
                });
            }
            let mut model = Model::new(format!("files-{}", paths.len()));
            model.add_basic_event(BasicEvent::new("a", Some(0.1)))?;
            let mut top = Gate::new("top", Connective::Or);
            top.args.push(Argument::BasicEvent("a".into()));
            let top = model.add_gate(top)?;
            model.add_fault_tree("FT", vec![top])?;
            Ok(model)
        }
    }

    fn explorer() -> Explorer {
        Explorer::new(Arc::new(StubLoader), Arc::new(CutSetAnalyzer::new()))
    }

    #[test]
    fn test_load_error_preserves_model() {
        let mut explorer = explorer();
        explorer.add_input_files(&[PathBuf::from("one.xml")]).unwrap();
        explorer.drain_events();

        let err = explorer.add_input_files(&[Path::new("broken.xml").to_path_buf()]).unwrap_err();
        assert!(matches!(err, ExplorerError::Load(_)));
        assert_eq!(explorer.model().name(), "files-1");
        assert_eq!(explorer.input_files().len(), 1);
        assert!(explorer.drain_events().is_empty());
    }

    #[test]
    fn test_new_model_enables_save_and_notifies() {
        let mut explorer = explorer();
        assert!(!explorer.can_save());
        explorer.new_model().unwrap();
        assert!(explorer.can_save());
        assert_eq!(
            explorer.drain_events(),
            vec![ExplorerEvent::ModelChanged { name: "unnamed".into() }]
        );
        assert_eq!(explorer.model_tree().header(), "Model: unnamed");
    }

    #[tokio::test]
    async fn test_failed_run_keeps_previous_report() {
        let failing = |_: &Model, _: &Settings| -> Result<Vec<AnalysisResult>, AnalysisError> {
            Err(AnalysisError::Failed("solver error".into()))
        };
        let mut explorer = explorer();
        explorer.add_input_files(&[PathBuf::from("one.xml")]).unwrap();
        explorer.run_analysis().await.unwrap();
        let report_nodes = explorer.report_tree().len();
        let node = explorer.report_tree().find(&["top", "Products: 1"]).unwrap();
        explorer.activate(TreeKind::Report, node).unwrap();

        explorer.coordinator = AnalysisRunCoordinator::new(Arc::new(failing));
        let err = explorer.run_analysis().await.unwrap_err();
        assert!(matches!(err, ExplorerError::Analysis(AnalysisError::Failed(_))));
        assert_eq!(explorer.report_tree().len(), report_nodes);
        assert_eq!(explorer.workspace().len(), 1);
        assert!(explorer.activate(TreeKind::Report, node).unwrap().is_some());
    }

    #[test]
    fn test_model_change_closes_views_and_report() {
        let mut explorer = explorer();
        explorer.add_input_files(&[PathBuf::from("one.xml")]).unwrap();
        let node = explorer.model_tree().find(&["Fault Trees", "FT"]).unwrap();
        explorer.activate(TreeKind::Model, node).unwrap();
        assert_eq!(explorer.workspace().len(), 1);

        explorer.new_model().unwrap();
        assert!(explorer.workspace().is_empty());
        assert!(explorer.report_tree().is_empty());
        assert!(explorer.activate(TreeKind::Model, node).unwrap().is_none());
        assert_eq!(
            explorer.drain_events(),
            vec![
                ExplorerEvent::ModelChanged { name: "files-1".into() },
                ExplorerEvent::ZoomEnabled(100),
                ExplorerEvent::ZoomDisabled,
                ExplorerEvent::ModelChanged { name: "unnamed".into() },
            ]
        );
    }
}
