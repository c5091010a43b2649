//! Background analysis runs.
//!
//! Each run gets its own OS thread. The interactive side awaits a oneshot
//! completion signal (so the event loop keeps drawing the progress modal),
//! then joins the thread and takes the results. There is no cancellation.

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{error, info};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::analysis::{AnalysisError, AnalysisResult, Analyzer, Settings};
use crate::model::Model;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RunId(Uuid);

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Results of one completed run plus its metadata
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRun {
    pub id: RunId,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub settings: Settings,
    pub results: Vec<AnalysisResult>,
}

type RunOutcome = Result<Vec<AnalysisResult>, AnalysisError>;

pub struct AnalysisRunCoordinator {
    analyzer: Arc<dyn Analyzer>,
}

impl AnalysisRunCoordinator {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self { analyzer }
    }

    /// Spawns the computation on a fresh thread bound to this model snapshot.
    pub fn start(&self, model: Arc<Model>, settings: Settings) -> Result<PendingRun, AnalysisError> {
        let id = RunId::new();
        let started_at = Utc::now();
        let (done_tx, done_rx) = oneshot::channel();
        let analyzer = Arc::clone(&self.analyzer);
        let run_settings = settings.clone();

        info!("Starting analysis run {} on model '{}'", id, model.name());
        let handle = std::thread::Builder::new()
            .name("analysis-run".to_string())
            .spawn(move || {
                let outcome = analyzer.analyze(&model, &run_settings);
                // Receiver may already be gone; the join still delivers the outcome.
                let _ = done_tx.send(());
                outcome
            })
            .map_err(|e| AnalysisError::Failed(format!("cannot spawn analysis thread: {}", e)))?;

        Ok(PendingRun {
            id,
            started_at,
            clock: Instant::now(),
            settings,
            done: Some(done_rx),
            handle,
        })
    }

    pub async fn run(&self, model: Arc<Model>, settings: Settings) -> Result<AnalysisRun, AnalysisError> {
        let mut pending = self.start(model, settings)?;
        pending.finished().await;
        pending.join()
    }
}

/// A run in flight
pub struct PendingRun {
    id: RunId,
    started_at: DateTime<Utc>,
    clock: Instant,
    settings: Settings,
    done: Option<oneshot::Receiver<()>>,
    handle: JoinHandle<RunOutcome>,
}

impl PendingRun {
    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Resolves once the computation has signalled completion (or died).
    pub async fn finished(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.await;
        }
    }

    /// Non-blocking check of the completion signal, for polling event loops.
    pub fn poll_finished(&mut self) -> bool {
        let Some(done) = self.done.as_mut() else {
            return true;
        };
        match done.try_recv() {
            Err(oneshot::error::TryRecvError::Empty) => false,
            _ => {
                self.done = None;
                true
            }
        }
    }

    /// Blocks until the thread has joined.
    pub fn join(self) -> Result<AnalysisRun, AnalysisError> {
        let outcome = self
            .handle
            .join()
            .map_err(|payload| AnalysisError::Panicked(panic_message(payload.as_ref())))
            .and_then(|outcome| outcome);
        let duration = self.clock.elapsed();

        match outcome {
            Ok(results) => {
                info!(
                    "Analysis run {} finished in {:?} with {} result(s)",
                    self.id,
                    duration,
                    results.len()
                );
                Ok(AnalysisRun {
                    id: self.id,
                    started_at: self.started_at,
                    duration,
                    settings: self.settings,
                    results,
                })
            }
            Err(e) => {
                error!("Analysis run {} failed after {:?}: {}", self.id, duration, e);
                Err(e)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Indeterminate, non-dismissible progress indicator shown during a run
#[derive(Debug, Clone, Default)]
pub struct WaitDialog {
    label: String,
    active: bool,
    suppressed: bool,
    frame: usize,
}

impl WaitDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, label: impl Into<String>) {
        self.label = label.into();
        self.active = true;
        self.suppressed = false;
        self.frame = 0;
    }

    /// Swallows every key while active. Ctrl+W hides the modal but keeps it active.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if !self.active {
            return false;
        }
        if key.code == KeyCode::Char('w') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.suppressed = true;
        }
        true
    }

    pub fn tick(&mut self) {
        self.frame = (self.frame + 1) % SPINNER.len();
    }

    pub fn spinner(&self) -> char {
        SPINNER[self.frame]
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether a run is in progress (input is owned by the dialog)
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_visible(&self) -> bool {
        self.active && !self.suppressed
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.suppressed = false;
        self.frame = 0;
    }
}
