// ONNX model - exported genre network run through ONNX Runtime
//
// The whole request batch goes through the graph in one call as a
// `[segments, frames, coefficients, channels]` f32 tensor; the first graph
// output is read back as `[segments, classes]` scores.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;

use super::{GenreClassifier, PredictionVector};
use crate::analysis::FeatureBatch;
use crate::error::ClassifierError;

/// Pre-trained network loaded from an `.onnx` file
///
/// `Session::run` needs `&mut`, so requests take turns on the session.
pub struct OnnxGenreModel {
    session: Mutex<Session>,
    input_name: String,
    input_shape: (usize, usize, usize),
    output_dim: usize,
}

fn inference_failed(reason: impl ToString) -> ClassifierError {
    ClassifierError::InferenceFailed {
        reason: reason.to_string(),
    }
}

impl OnnxGenreModel {
    /// Load the graph at `path` for tensors of `input_shape`
    ///
    /// One silent segment is pushed through the graph before returning. A
    /// graph that rejects the extractor's tensor shape fails here rather than
    /// on the first request, and its class count becomes `output_dim`.
    pub fn load<P: AsRef<Path>>(
        path: P,
        input_name: &str,
        input_shape: (usize, usize, usize),
        intra_threads: usize,
    ) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let load_failed = |reason: String| ClassifierError::LoadFailed {
            path: path.display().to_string(),
            reason,
        };

        if !path.exists() {
            return Err(load_failed("model file not found".to_string()));
        }

        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(intra_threads.max(1)))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| load_failed(e.to_string()))?;

        let mut model = Self {
            session: Mutex::new(session),
            input_name: input_name.to_string(),
            input_shape,
            output_dim: 0,
        };

        let (frames, coefficients, channels) = input_shape;
        let silent = Array4::<f32>::zeros((1, frames, coefficients, channels));
        let scores = model.run(silent).map_err(|e| load_failed(e.to_string()))?;
        if scores.is_empty() {
            return Err(ClassifierError::MalformedModel {
                reason: "graph produced no class scores".to_string(),
            });
        }
        model.output_dim = scores.len();

        log::info!(
            "[Model] Loaded ONNX model from {:?}: input {:?} -> {} classes",
            path,
            input_shape,
            model.output_dim
        );
        Ok(model)
    }

    /// Run one batch and return the flattened first output
    fn run(&self, input: Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| inference_failed("ONNX session lock poisoned"))?;

        let tensor = Tensor::from_array(input).map_err(inference_failed)?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(inference_failed)?;

        let (_, scores) = outputs
            .iter()
            .next()
            .ok_or_else(|| inference_failed("graph produced no output"))?;
        let (_shape, data) = scores.try_extract_tensor::<f32>().map_err(inference_failed)?;
        Ok(data.to_vec())
    }
}

impl GenreClassifier for OnnxGenreModel {
    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<PredictionVector>, ClassifierError> {
        let Some(shape) = batch.tensor_shape() else {
            return Ok(Vec::new());
        };
        if shape != self.input_shape {
            let (frames, coefficients, channels) = self.input_shape;
            return Err(ClassifierError::InputShape {
                expected: vec![frames, coefficients, channels],
                actual: vec![shape.0, shape.1, shape.2],
            });
        }

        let input = batch.to_array().map_err(inference_failed)?;
        let scores = self.run(input)?;

        let segments = batch.len();
        if scores.len() != segments * self.output_dim {
            return Err(inference_failed(format!(
                "graph returned {} scores for {} segments x {} classes",
                scores.len(),
                segments,
                self.output_dim
            )));
        }

        Ok(scores
            .chunks_exact(self.output_dim)
            .map(|row| PredictionVector::new(row.to_vec()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let err = OnnxGenreModel::load("/no/such/genre.onnx", "input", (216, 13, 3), 1)
            .err()
            .unwrap();
        match err {
            ClassifierError::LoadFailed { path, reason } => {
                assert!(path.ends_with("genre.onnx"));
                assert!(reason.contains("not found"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_garbage_model_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"definitely not a protobuf graph").unwrap();

        let err = OnnxGenreModel::load(&path, "input", (216, 13, 3), 1)
            .err()
            .unwrap();
        assert!(matches!(err, ClassifierError::LoadFailed { .. }));
    }
}
