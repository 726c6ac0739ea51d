use ndarray::Array3;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::window::Window;

use super::label::{ActionLabel, LabelSet};

/// Inference engine boundary.
///
/// Takes a `1 × N × F` batch, returns one score per label (a leading batch
/// dimension of 1 is flattened away by the implementation). Not reentrant:
/// callers must serialize access.
pub trait ActionModel: Send {
    fn run(&mut self, input: Array3<f32>) -> Result<Vec<f32>>;
}

impl<M: ActionModel + ?Sized> ActionModel for Box<M> {
    fn run(&mut self, input: Array3<f32>) -> Result<Vec<f32>> {
        (**self).run(input)
    }
}

/// Adapts a closure into an [`ActionModel`]
pub struct FnModel<F>(pub F);

impl<F> ActionModel for FnModel<F>
where
    F: FnMut(Array3<f32>) -> Result<Vec<f32>> + Send,
{
    fn run(&mut self, input: Array3<f32>) -> Result<Vec<f32>> {
        (self.0)(input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub label: ActionLabel,
    /// Model output index of `label`
    pub index: usize,
    pub confidence: f32,
}

/// Highest score, lowest index on ties. NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    best
}

/// Window → label, via an external model
pub struct ActionClassifier<M> {
    model: M,
    labels: LabelSet,
    input_shape: Option<(usize, usize)>,
}

impl<M: ActionModel> ActionClassifier<M> {
    pub fn new(model: M, labels: LabelSet) -> Self {
        Self {
            model,
            labels,
            input_shape: None,
        }
    }

    /// Reject windows that are not `frames × features`
    pub fn with_input_shape(mut self, frames: usize, features: usize) -> Self {
        self.input_shape = Some((frames, features));
        self
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn classify(&mut self, window: &Window) -> Result<Prediction> {
        if let Some((frames, features)) = self.input_shape {
            if window.frames() != frames || window.features() != features {
                return Err(Error::DimensionMismatch {
                    expected: frames * features,
                    actual: window.frames() * window.features(),
                });
            }
        }

        let scores = self.model.run(window.to_batch())?;
        if scores.len() != self.labels.len() {
            return Err(Error::ClassificationFailed(format!(
                "model returned {} scores for {} labels",
                scores.len(),
                self.labels.len()
            )));
        }

        let (index, confidence) = argmax(&scores).ok_or_else(|| {
            Error::ClassificationFailed("model returned no finite scores".to_string())
        })?;
        let label = self.labels.get(index).ok_or_else(|| {
            Error::ClassificationFailed(format!("no label for output index {}", index))
        })?;

        Ok(Prediction {
            label,
            index,
            confidence,
        })
    }
}
