pub mod label;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use label::{ActionLabel, LabelSet};
pub use model::{argmax, ActionClassifier, ActionModel, FnModel, Prediction};
#[cfg(feature = "onnx")]
pub use onnx::OnnxActionModel;
