// Classifier - pre-trained model seam
//
// The pipeline treats the classifier as an opaque function from a feature
// batch to one score vector per segment. The model is loaded once at
// startup and shared read-only across requests, hence `Send + Sync`.

mod dense;
mod labels;
mod onnx;

pub use dense::{DenseGenreModel, DenseModelFile};
pub use labels::LabelTable;
pub use onnx::OnnxGenreModel;

use std::sync::Arc;

use crate::analysis::FeatureBatch;
use crate::config::{ModelBackend, ModelConfig};
use crate::error::ClassifierError;

/// Per-segment class scores, index = class index
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PredictionVector(pub Vec<f32>);

impl PredictionVector {
    pub fn new(scores: Vec<f32>) -> Self {
        Self(scores)
    }

    pub fn scores(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the highest score
    ///
    /// Ties go to the lowest index and NaN never wins. `None` when the
    /// vector is empty or holds only NaN.
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (index, &score) in self.0.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((index, score)),
            }
        }
        best.map(|(index, _)| index)
    }
}

impl From<Vec<f32>> for PredictionVector {
    fn from(scores: Vec<f32>) -> Self {
        Self(scores)
    }
}

/// A loaded genre model
pub trait GenreClassifier: Send + Sync {
    /// Number of classes in every prediction vector
    fn output_dim(&self) -> usize;

    /// Score every tensor of `batch`, returning vectors in batch order
    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<PredictionVector>, ClassifierError>;
}

/// Load the configured model backend for tensors of `input_shape`
pub fn load_classifier(
    config: &ModelConfig,
    input_shape: (usize, usize, usize),
) -> Result<Arc<dyn GenreClassifier>, ClassifierError> {
    match config.backend {
        ModelBackend::Onnx => Ok(Arc::new(OnnxGenreModel::load(
            &config.path,
            &config.input_name,
            input_shape,
            config.intra_threads,
        )?)),
        ModelBackend::Dense => Ok(Arc::new(DenseGenreModel::load(&config.path)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_picks_largest() {
        let v = PredictionVector::new(vec![0.1, 0.7, 0.2]);
        assert_eq!(v.argmax(), Some(1));
    }

    #[test]
    fn test_argmax_tie_goes_to_lowest_index() {
        let v = PredictionVector::new(vec![0.2, 0.4, 0.4, 0.0]);
        assert_eq!(v.argmax(), Some(1));
    }

    #[test]
    fn test_argmax_ignores_nan() {
        let v = PredictionVector::new(vec![f32::NAN, 0.3, 0.1]);
        assert_eq!(v.argmax(), Some(1));
        assert_eq!(PredictionVector::new(vec![f32::NAN]).argmax(), None);
    }

    #[test]
    fn test_argmax_empty() {
        assert_eq!(PredictionVector::new(Vec::new()).argmax(), None);
    }

    #[test]
    fn test_load_classifier_follows_backend() {
        let dir = tempfile::tempdir().unwrap();
        let weights = dir.path().join("weights.json");
        let file = DenseModelFile {
            coefficients: 13,
            channels: 3,
            weights: vec![vec![0.0; 39]; 4],
            bias: vec![0.0; 4],
        };
        std::fs::write(&weights, serde_json::to_string(&file).unwrap()).unwrap();

        let mut config = ModelConfig {
            backend: ModelBackend::Dense,
            path: weights.clone(),
            ..ModelConfig::default()
        };
        let dense = load_classifier(&config, (216, 13, 3)).unwrap();
        assert_eq!(dense.output_dim(), 4);

        // The same JSON is not an ONNX graph
        config.backend = ModelBackend::Onnx;
        assert!(matches!(
            load_classifier(&config, (216, 13, 3)),
            Err(ClassifierError::LoadFailed { .. })
        ));
    }

    #[test]
    fn test_argmax_negative_scores() {
        let v = PredictionVector::new(vec![-3.0, -1.0, -2.0]);
        assert_eq!(v.argmax(), Some(1));
    }
}
