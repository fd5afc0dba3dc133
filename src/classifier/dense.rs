// Dense model - lightweight classifier backend loaded from JSON weights
//
// Used for tests and as a fallback when no exported network is available.
// Each feature tensor is averaged over time into a `coefficients x channels`
// vector (index = coefficient * channels + channel), passed through a single
// dense layer and normalised with softmax.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{GenreClassifier, PredictionVector};
use crate::analysis::{FeatureBatch, FeatureTensor, CHANNELS};
use crate::error::ClassifierError;

/// On-disk weight file layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseModelFile {
    /// Coefficients per frame the model was trained on
    pub coefficients: usize,
    /// Channels per coefficient (base + derivatives)
    #[serde(default = "default_channels")]
    pub channels: usize,
    /// `classes` rows of `coefficients * channels` weights
    pub weights: Vec<Vec<f32>>,
    /// One bias per class
    pub bias: Vec<f32>,
}

fn default_channels() -> usize {
    CHANNELS
}

/// Time-pooled dense softmax classifier
#[derive(Debug, Clone)]
pub struct DenseGenreModel {
    coefficients: usize,
    channels: usize,
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl DenseGenreModel {
    /// Validate a parsed weight file
    pub fn from_file_data(data: DenseModelFile) -> Result<Self, ClassifierError> {
        let malformed = |reason: String| ClassifierError::MalformedModel { reason };

        if data.coefficients == 0 || data.channels == 0 {
            return Err(malformed("coefficients and channels must be > 0".to_string()));
        }
        if data.weights.is_empty() {
            return Err(malformed("model has no output classes".to_string()));
        }
        if data.bias.len() != data.weights.len() {
            return Err(malformed(format!(
                "{} weight rows but {} biases",
                data.weights.len(),
                data.bias.len()
            )));
        }

        let inputs = data.coefficients * data.channels;
        if let Some((class, row)) = data
            .weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != inputs)
        {
            return Err(malformed(format!(
                "weight row {} has {} entries, expected {}",
                class,
                row.len(),
                inputs
            )));
        }

        if data
            .weights
            .iter()
            .flatten()
            .chain(&data.bias)
            .any(|w| !w.is_finite())
        {
            return Err(malformed("weights must be finite".to_string()));
        }

        Ok(Self {
            coefficients: data.coefficients,
            channels: data.channels,
            weights: data.weights,
            bias: data.bias,
        })
    }

    /// Load and validate a JSON weight file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let load_failed = |reason: String| ClassifierError::LoadFailed {
            path: path.display().to_string(),
            reason,
        };

        let contents = fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        let data: DenseModelFile =
            serde_json::from_str(&contents).map_err(|e| load_failed(e.to_string()))?;

        let model = Self::from_file_data(data)?;
        log::info!(
            "[Model] Loaded dense model from {:?}: {} inputs -> {} classes",
            path,
            model.coefficients * model.channels,
            model.weights.len()
        );
        Ok(model)
    }

    /// Mean over time of every (coefficient, channel) pair
    fn pool(&self, tensor: &FeatureTensor) -> Result<Vec<f32>, ClassifierError> {
        let (frames, coefficients, channels) = tensor.shape();
        if coefficients != self.coefficients || channels != self.channels {
            return Err(ClassifierError::InputShape {
                expected: vec![self.coefficients, self.channels],
                actual: vec![coefficients, channels],
            });
        }

        let view = tensor.view();
        let mut pooled = vec![0.0f32; coefficients * channels];
        for t in 0..frames {
            for c in 0..coefficients {
                for ch in 0..channels {
                    pooled[c * channels + ch] += view[[t, c, ch]];
                }
            }
        }
        if frames > 0 {
            let scale = 1.0 / frames as f32;
            pooled.iter_mut().for_each(|v| *v *= scale);
        }
        Ok(pooled)
    }

    fn score(&self, features: &[f32]) -> Vec<f32> {
        let logits: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();
        softmax(&logits)
    }
}

impl GenreClassifier for DenseGenreModel {
    fn output_dim(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<PredictionVector>, ClassifierError> {
        batch
            .tensors()
            .iter()
            .map(|tensor| {
                let pooled = self.pool(tensor)?;
                Ok(PredictionVector::new(self.score(&pooled)))
            })
            .collect()
    }
}

/// Numerically stable softmax
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.iter().map(|e| e / sum).collect()
    } else {
        vec![1.0 / logits.len() as f32; logits.len()]
    }
}
