use ndarray::{Array3, ArrayViewD};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::config::ModelConfig;
use crate::error::{Error, Result};

use super::model::ActionModel;

struct LoadedModel {
    session: Session,
    input_name: String,
    output_name: String,
}

/// Action model backed by ONNX Runtime.
///
/// Opens the model file on first use. Until that succeeds every call fails
/// with `ModelUnavailable` and the next call tries again, so a model that
/// shows up after startup is picked up without a restart.
pub struct OnnxActionModel {
    path: PathBuf,
    input_name: Option<String>,
    output_name: Option<String>,
    loaded: Option<LoadedModel>,
    last_load_error: Option<String>,
}

impl OnnxActionModel {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            input_name: None,
            output_name: None,
            loaded: None,
            last_load_error: None,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            input_name: config.input_name.clone(),
            output_name: config.output_name.clone(),
            ..Self::new(&config.path)
        }
    }

    /// Load now instead of on first use
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut model = Self::new(path);
        model.ensure_loaded()?;
        Ok(model)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_loaded(&mut self) -> Result<&mut LoadedModel> {
        if self.loaded.is_none() {
            match load(&self.path, self.input_name.as_deref(), self.output_name.as_deref()) {
                Ok(model) => {
                    tracing::info!(
                        "model loaded: {} (input {}, output {})",
                        self.path.display(),
                        model.input_name,
                        model.output_name
                    );
                    self.loaded = Some(model);
                    self.last_load_error = None;
                }
                Err(e) => {
                    let message = e.to_string();
                    if self.last_load_error.as_deref() != Some(message.as_str()) {
                        tracing::warn!("{}", message);
                        self.last_load_error = Some(message);
                    }
                    return Err(e);
                }
            }
        }
        self.loaded
            .as_mut()
            .ok_or_else(|| Error::ModelUnavailable(self.path.display().to_string()))
    }
}

fn unavailable(path: &Path, e: impl Display) -> Error {
    Error::ModelUnavailable(format!("{}: {}", path.display(), e))
}

fn failed(e: impl Display) -> Error {
    Error::ClassificationFailed(e.to_string())
}

fn load(path: &Path, input_name: Option<&str>, output_name: Option<&str>) -> Result<LoadedModel> {
    if !path.exists() {
        return Err(unavailable(path, "file not found"));
    }

    let session = Session::builder()
        .map_err(|e| unavailable(path, e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| unavailable(path, e))?
        .commit_from_file(path)
        .map_err(|e| unavailable(path, e))?;

    let input_name = match input_name {
        Some(name) => name.to_string(),
        None => session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| unavailable(path, "model has no inputs"))?,
    };

    // First f32 tensor output carries the label distribution
    let output_name = match output_name {
        Some(name) => name.to_string(),
        None => session
            .outputs
            .iter()
            .find(|output| {
                matches!(
                    output.output_type,
                    ValueType::Tensor {
                        ty: TensorElementType::Float32,
                        ..
                    }
                )
            })
            .or_else(|| session.outputs.first())
            .map(|output| output.name.clone())
            .ok_or_else(|| unavailable(path, "model has no outputs"))?,
    };

    Ok(LoadedModel {
        session,
        input_name,
        output_name,
    })
}

impl ActionModel for OnnxActionModel {
    fn run(&mut self, input: Array3<f32>) -> Result<Vec<f32>> {
        let model = self.ensure_loaded()?;

        let tensor = Tensor::from_array(input).map_err(failed)?;
        let outputs = model
            .session
            .run(ort::inputs![model.input_name.as_str() => tensor])
            .map_err(failed)?;

        // [1, labels] or [labels]
        let scores: ArrayViewD<f32> = outputs[model.output_name.as_str()]
            .try_extract_array()
            .map_err(failed)?;
        Ok(scores.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_unavailable() {
        let mut model = OnnxActionModel::new("/nonexistent/action_model.onnx");
        assert!(!model.is_loaded());

        let err = model.run(Array3::zeros((1, 5, 66))).unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));

        // still retrying, still unavailable
        let err = model.run(Array3::zeros((1, 5, 66))).unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));
        assert!(!model.is_loaded());
    }

    #[test]
    fn test_open_missing_model_fails() {
        assert!(matches!(
            OnnxActionModel::open("/nonexistent/action_model.onnx"),
            Err(Error::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_from_config_keeps_names() {
        let config = ModelConfig {
            path: "models/x.onnx".to_string(),
            input_name: Some("input_1".to_string()),
            output_name: None,
            labels: Vec::new(),
        };
        let model = OnnxActionModel::from_config(&config);
        assert_eq!(model.path(), Path::new("models/x.onnx"));
        assert_eq!(model.input_name.as_deref(), Some("input_1"));
        assert!(model.output_name.is_none());
    }
}
