use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

const DONE_EPSILON: f64 = 1e-9;

/// One item on a clone progress stream.
#[derive(Debug, Clone, PartialEq)]
pub enum CloneEvent {
    /// Fractional increment of overall completion
    Advanced(f64),
    Finished,
    Failed(String),
}

/// Producer half, owned by the clone task.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<CloneEvent>,
}

impl ProgressSink {
    /// Returns false once the consumer is gone.
    pub fn advance(&self, delta: f64) -> bool {
        self.tx.send(CloneEvent::Advanced(delta)).is_ok()
    }

    pub fn finish(&self) {
        self.tx.send(CloneEvent::Finished).ok();
    }

    pub fn fail(&self, reason: impl Into<String>) {
        self.tx.send(CloneEvent::Failed(reason.into())).ok();
    }
}

/// Consumer half. Cloneable so it can ride inside messages; only one task
/// awaits it at a time because the page re-subscribes after each item.
#[derive(Clone)]
pub struct ProgressStream {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<CloneEvent>>>,
}

impl fmt::Debug for ProgressStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressStream").finish_non_exhaustive()
    }
}

impl ProgressStream {
    pub fn channel() -> (ProgressSink, ProgressStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ProgressSink { tx },
            ProgressStream {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Next event, or `None` once the producer has dropped its sink.
    pub async fn next(&self) -> Option<CloneEvent> {
        self.rx.lock().await.recv().await
    }
}

/// What the owning page should do after applying a stream item.
#[derive(Debug, Clone, PartialEq)]
pub enum CloneStep {
    /// Subscribe for the next item
    Continue,
    Completed(PathBuf),
    Failed(String),
    /// Item arrived while no clone was active
    Ignored,
}

/// Progress-bar model for the single clone a page may run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloneState {
    pub progress: f64,
    pub active: bool,
    pub destination: Option<PathBuf>,
}

impl CloneState {
    /// Start tracking a clone. Returns false, leaving state untouched, when
    /// one is already running.
    pub fn begin(&mut self, destination: PathBuf) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.progress = 0.0;
        self.destination = Some(destination);
        true
    }

    /// Apply one stream item; `None` means the stream closed.
    pub fn apply(&mut self, event: Option<CloneEvent>) -> CloneStep {
        if !self.active {
            return CloneStep::Ignored;
        }

        match event {
            Some(CloneEvent::Advanced(delta)) => {
                self.progress = (self.progress + delta.max(0.0)).min(1.0);
                if self.progress >= 1.0 - DONE_EPSILON {
                    self.complete()
                } else {
                    CloneStep::Continue
                }
            }
            Some(CloneEvent::Finished) => {
                self.progress = 1.0;
                self.complete()
            }
            Some(CloneEvent::Failed(reason)) => {
                self.reset();
                CloneStep::Failed(reason)
            }
            None => {
                self.reset();
                CloneStep::Failed("clone stream closed before completion".to_string())
            }
        }
    }

    fn complete(&mut self) -> CloneStep {
        let destination = self.destination.clone().unwrap_or_default();
        self.reset();
        CloneStep::Completed(destination)
    }

    fn reset(&mut self) {
        self.progress = 0.0;
        self.active = false;
        self.destination = None;
    }
}
