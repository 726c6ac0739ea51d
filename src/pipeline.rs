//! Glue between the frame loop, the scheduler and the avatar tick.

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;

use crate::avatar::{self, AvatarParams, AvatarState};
use crate::classifier::{ActionClassifier, ActionLabel, ActionModel, LabelSet, Prediction};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pose::{LandmarkSet, Normalizer};
use crate::scheduler::{InferenceScheduler, SchedulerEvent, SchedulerStats, Submission};
use crate::window::WindowBuffer;

/// What one frame did to the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Frame rejected; buffer untouched
    Skipped(Error),
    /// Accepted, window not full yet
    Buffering { len: usize },
    Submitted(Submission),
}

/// Frame → normalize → buffer → submit. Never blocks on inference.
pub struct FramePipeline {
    normalizer: Normalizer,
    buffer: WindowBuffer,
    scheduler: InferenceScheduler,
}

impl FramePipeline {
    pub fn new(normalizer: Normalizer, window_size: usize, scheduler: InferenceScheduler) -> Self {
        let buffer = WindowBuffer::new(window_size, normalizer.feature_len());
        Self {
            normalizer,
            buffer,
            scheduler,
        }
    }

    /// Build the whole frame side from config: normalizer, buffer, and a
    /// scheduler whose worker owns `model`.
    pub fn spawn<M>(config: &Config, model: M) -> (Self, UnboundedReceiver<SchedulerEvent>)
    where
        M: ActionModel + 'static,
    {
        let normalizer = Normalizer::from_config(&config.landmarks);
        let classifier = ActionClassifier::new(model, LabelSet::new(config.model.labels.clone()))
            .with_input_shape(config.window.size, normalizer.feature_len());
        let (scheduler, events) = InferenceScheduler::spawn(classifier);
        (Self::new(normalizer, config.window.size, scheduler), events)
    }

    pub fn push_frame(&mut self, set: &LandmarkSet) -> FrameOutcome {
        match self.try_push(set) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!("frame skipped: {}", e);
                FrameOutcome::Skipped(e)
            }
        }
    }

    fn try_push(&mut self, set: &LandmarkSet) -> Result<FrameOutcome> {
        let features = self.normalizer.normalize(set)?;
        self.buffer.push(features)?;

        match self.buffer.snapshot() {
            Some(window) => Ok(FrameOutcome::Submitted(self.scheduler.submit(window))),
            None => Ok(FrameOutcome::Buffering {
                len: self.buffer.len(),
            }),
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn scheduler(&self) -> &InferenceScheduler {
        &self.scheduler
    }

    pub fn shutdown(self) {
        self.scheduler.shutdown();
    }
}

/// Single-slot, last-write-wins holder of the current action label
pub struct ActionSlot {
    sender: watch::Sender<ActionLabel>,
    min_confidence: f32,
}

impl ActionSlot {
    pub fn new(min_confidence: f32) -> Self {
        let (sender, _) = watch::channel(ActionLabel::default());
        Self {
            sender,
            min_confidence,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ActionLabel> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> ActionLabel {
        *self.sender.borrow()
    }

    /// Returns true when the prediction became the current label
    pub fn offer(&self, prediction: &Prediction) -> bool {
        if prediction.confidence < self.min_confidence {
            tracing::debug!(
                "ignoring {} at {:.2} (< {:.2})",
                prediction.label,
                prediction.confidence,
                self.min_confidence
            );
            return false;
        }
        self.sender.send_replace(prediction.label);
        true
    }

    /// Failures leave the current label in place
    pub fn apply(&self, event: &SchedulerEvent) -> bool {
        match event {
            SchedulerEvent::Classified { prediction, .. } => self.offer(prediction),
            SchedulerEvent::ClassificationFailed { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub index: u64,
    pub label: ActionLabel,
    pub state: AvatarState,
}

/// Steps the avatar with whatever label is current at each tick
pub struct AvatarTicker {
    params: AvatarParams,
    state: AvatarState,
    labels: watch::Receiver<ActionLabel>,
    ticks: u64,
}

impl AvatarTicker {
    pub fn new(params: AvatarParams, labels: watch::Receiver<ActionLabel>) -> Self {
        Self {
            state: params.initial_state(),
            params,
            labels,
            ticks: 0,
        }
    }

    pub fn tick(&mut self) -> Tick {
        let label = *self.labels.borrow_and_update();
        self.state = avatar::step(&self.params, &self.state, label);
        self.ticks += 1;
        Tick {
            index: self.ticks,
            label,
            state: self.state,
        }
    }

    pub fn state(&self) -> &AvatarState {
        &self.state
    }

    pub fn params(&self) -> &AvatarParams {
        &self.params
    }
}
