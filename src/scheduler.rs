//! Inference scheduling: at most one classifier call in flight, at most one
//! window waiting.
//!
//! [`SchedulerCore`] is the Idle/Busy state machine with its single pending
//! slot; it is plain data so its transitions can be tested without threads.
//! [`InferenceScheduler`] wraps it with a worker thread that owns the
//! classifier. `submit` never blocks on inference.

use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::classifier::{ActionClassifier, ActionModel, Prediction};
use crate::error::Error;
use crate::window::Window;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Busy { started_at: Instant },
}

/// Core's answer to a submitted window
#[derive(Debug, PartialEq)]
pub enum Dispatch {
    /// Scheduler was idle; the caller must start classifying this window
    Start(Window),
    /// Parked in the empty pending slot
    Queued,
    /// Took the pending slot from an older window
    Replaced,
    /// Scheduler is shut down; window dropped
    Closed,
}

/// What happened to a window handed to [`InferenceScheduler::submit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Started,
    Queued,
    Replaced,
    Closed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerStats {
    /// Windows handed to `submit` while open
    pub submitted: u64,
    /// Classifier calls begun
    pub started: u64,
    /// Pending windows overwritten by a newer one
    pub replaced: u64,
    /// Calls that produced a prediction
    pub completed: u64,
    /// Calls that ended in an error
    pub failed: u64,
    /// Results or pending windows thrown away at shutdown
    pub discarded: u64,
    /// Duration of the most recent call
    pub last_latency: Option<Duration>,
}

#[derive(Debug)]
pub struct SchedulerCore {
    state: SchedulerState,
    pending: Option<Window>,
    closed: bool,
    stats: SchedulerStats,
}

impl SchedulerCore {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            pending: None,
            closed: false,
            stats: SchedulerStats::default(),
        }
    }

    pub fn submit(&mut self, window: Window, now: Instant) -> Dispatch {
        if self.closed {
            return Dispatch::Closed;
        }
        self.stats.submitted += 1;

        match self.state {
            SchedulerState::Idle => {
                self.state = SchedulerState::Busy { started_at: now };
                self.stats.started += 1;
                Dispatch::Start(window)
            }
            SchedulerState::Busy { .. } => {
                if self.pending.replace(window).is_some() {
                    self.stats.replaced += 1;
                    Dispatch::Replaced
                } else {
                    Dispatch::Queued
                }
            }
        }
    }

    /// In-flight call finished. Returns the pending window to run next
    /// (state stays Busy), or None (state goes Idle).
    pub fn complete(&mut self, succeeded: bool, now: Instant) -> Option<Window> {
        if let SchedulerState::Busy { started_at } = self.state {
            self.stats.last_latency = Some(now.saturating_duration_since(started_at));
        }

        if self.closed {
            self.stats.discarded += 1;
            self.state = SchedulerState::Idle;
            return None;
        }
        if succeeded {
            self.stats.completed += 1;
        } else {
            self.stats.failed += 1;
        }

        match self.pending.take() {
            Some(next) => {
                self.state = SchedulerState::Busy { started_at: now };
                self.stats.started += 1;
                Some(next)
            }
            None => {
                self.state = SchedulerState::Idle;
                None
            }
        }
    }

    /// The started window never reached the classifier
    pub fn abort(&mut self) {
        self.state = SchedulerState::Idle;
        if self.pending.take().is_some() {
            self.stats.discarded += 1;
        }
    }

    /// Refuse new windows and drop the pending one. An in-flight call still
    /// completes, but its result is reported as discarded.
    pub fn close(&mut self) {
        self.closed = true;
        if self.pending.take().is_some() {
            self.stats.discarded += 1;
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }
}

impl Default for SchedulerCore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    Classified {
        prediction: Prediction,
        latency: Duration,
    },
    ClassificationFailed {
        error: Error,
        latency: Duration,
    },
}

/// Owns the classifier on a dedicated worker thread
pub struct InferenceScheduler {
    core: Arc<Mutex<SchedulerCore>>,
    jobs: Option<mpsc::SyncSender<Window>>,
    worker: Option<JoinHandle<()>>,
}

impl InferenceScheduler {
    pub fn spawn<M>(classifier: ActionClassifier<M>) -> (Self, UnboundedReceiver<SchedulerEvent>)
    where
        M: ActionModel + 'static,
    {
        let core = Arc::new(Mutex::new(SchedulerCore::new()));
        // Core hands out one Start at a time, so one slot is enough
        let (job_tx, job_rx) = mpsc::sync_channel::<Window>(1);
        let (event_tx, event_rx) = unbounded_channel();

        let worker_core = Arc::clone(&core);
        let worker = std::thread::spawn(move || {
            run_worker(classifier, job_rx, worker_core, event_tx);
        });

        let scheduler = Self {
            core,
            jobs: Some(job_tx),
            worker: Some(worker),
        };
        (scheduler, event_rx)
    }

    pub fn submit(&self, window: Window) -> Submission {
        let dispatch = self.core.lock().submit(window, Instant::now());
        match dispatch {
            Dispatch::Start(window) => {
                let sent = match &self.jobs {
                    Some(jobs) => jobs.send(window).is_ok(),
                    None => false,
                };
                if sent {
                    Submission::Started
                } else {
                    tracing::error!("inference worker is gone, dropping window");
                    self.core.lock().abort();
                    Submission::Closed
                }
            }
            Dispatch::Queued => Submission::Queued,
            Dispatch::Replaced => Submission::Replaced,
            Dispatch::Closed => Submission::Closed,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.core.lock().state()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.core.lock().stats().clone()
    }

    /// Stop accepting windows. A call in flight runs to completion; its
    /// result is not delivered.
    pub fn close(&self) {
        self.core.lock().close();
    }

    /// Close and wait for the worker to exit
    pub fn shutdown(mut self) {
        self.close();
        self.jobs = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("inference worker panicked");
            }
        }
    }
}

impl Drop for InferenceScheduler {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker<M: ActionModel>(
    mut classifier: ActionClassifier<M>,
    jobs: mpsc::Receiver<Window>,
    core: Arc<Mutex<SchedulerCore>>,
    events: UnboundedSender<SchedulerEvent>,
) {
    while let Ok(first) = jobs.recv() {
        let mut next = Some(first);
        while let Some(window) = next.take() {
            let started = Instant::now();
            let result = panic::catch_unwind(AssertUnwindSafe(|| classifier.classify(&window)))
                .unwrap_or_else(|_| {
                    Err(Error::ClassificationFailed("classifier panicked".to_string()))
                });
            let finished = Instant::now();
            let latency = finished.saturating_duration_since(started);

            let deliver = {
                let mut core = core.lock();
                let deliver = !core.is_closed();
                next = core.complete(result.is_ok(), finished);
                deliver
            };
            if !deliver {
                tracing::debug!("discarding result after shutdown");
                continue;
            }

            let event = match result {
                Ok(prediction) => {
                    tracing::debug!(
                        "classified {} ({:.2}) in {:?}",
                        prediction.label,
                        prediction.confidence,
                        latency
                    );
                    SchedulerEvent::Classified { prediction, latency }
                }
                Err(error) => {
                    tracing::warn!("{}", error);
                    SchedulerEvent::ClassificationFailed { error, latency }
                }
            };
            if events.send(event).is_err() {
                tracing::debug!("event receiver dropped");
            }
        }
    }
    tracing::debug!("inference worker stopped");
}
