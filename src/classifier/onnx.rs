//! ONNX Runtime backend for the digit classifier.

use anyhow::{anyhow, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::{Classifier, ClassifierError, ScoreVector};
use crate::config::ModelConfig;
use crate::preprocess::NormalizedTensor;

/// Classifier backed by an ONNX Runtime session.
pub struct OnnxClassifier {
    session: Session,
    input_name: String,
    output_name: String,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish()
    }
}

impl OnnxClassifier {
    /// Builds a session from the model file at `model_path`.
    pub fn load(model_path: &Path, config: &ModelConfig) -> Result<Self> {
        let mut builder = Session::builder()
            .map_err(|e| anyhow!("ort session builder failed: {}", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| anyhow!("ort optimization level failed: {}", e))?;

        if let Some(threads) = config.intra_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| anyhow!("ort intra-op threads failed: {}", e))?;
        }

        let session = builder.commit_from_file(model_path).map_err(|e| {
            anyhow!(
                "failed to load ONNX model from {}: {}",
                model_path.display(),
                e
            )
        })?;

        Ok(Self {
            session,
            input_name: config.input_name.clone(),
            output_name: config.output_name.clone(),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&mut self, tensor: &NormalizedTensor) -> Result<ScoreVector, ClassifierError> {
        let input = Tensor::<f32>::from_array((tensor.shape(), tensor.as_slice().to_vec()))
            .map_err(|e| ClassifierError::Inference(format!("input tensor construction failed: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| ClassifierError::Inference(format!("ONNX inference failed: {}", e)))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            ClassifierError::Inference(format!("model has no output named {}", self.output_name))
        })?;

        let (_shape, scores) = output.try_extract_tensor::<f32>().map_err(|e| {
            ClassifierError::Inference(format!("failed to extract {} tensor: {}", self.output_name, e))
        })?;

        ScoreVector::try_from(scores)
    }
}

/// Resolves the configured model and opens it. Used as the adapter's loader.
pub fn load_configured(config: &ModelConfig) -> Result<Box<dyn Classifier>> {
    let path = super::source::resolve_model(config)?;
    let classifier = OnnxClassifier::load(&path, config)?;
    crate::log(&format!("ONNX session ready: {:?}", classifier));
    Ok(Box::new(classifier))
}
