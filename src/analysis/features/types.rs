// Types module - feature tensors handed to the classifier

use ndarray::{Array3, Array4, ArrayView3, Axis};

use crate::error::ExtractionError;

/// Channel index of the base coefficients
pub const CHANNEL_BASE: usize = 0;
/// Channel index of the first time derivative
pub const CHANNEL_DELTA: usize = 1;
/// Channel index of the second time derivative
pub const CHANNEL_DELTA2: usize = 2;
/// Channels per tensor
pub const CHANNELS: usize = 3;

/// Per-segment features, axes `(time_frames, coefficient, channel)`
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    data: Array3<f32>,
}

impl FeatureTensor {
    pub fn new(data: Array3<f32>) -> Result<Self, ExtractionError> {
        if data.shape()[2] != CHANNELS {
            return Err(ExtractionError::TensorShape {
                reason: format!("expected {} channels, got {}", CHANNELS, data.shape()[2]),
            });
        }
        Ok(Self { data })
    }

    /// `(time_frames, coefficients, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn frames(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn coefficients(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    pub fn into_inner(self) -> Array3<f32> {
        self.data
    }
}

/// Ordered feature tensors of one invocation; batch index = segment order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureBatch {
    tensors: Vec<FeatureTensor>,
}

impl FeatureBatch {
    /// Wrap tensors, requiring every tensor to share one shape
    pub fn new(tensors: Vec<FeatureTensor>) -> Result<Self, ExtractionError> {
        if let Some(first) = tensors.first() {
            let shape = first.shape();
            if let Some((position, odd)) = tensors
                .iter()
                .enumerate()
                .find(|(_, t)| t.shape() != shape)
            {
                return Err(ExtractionError::TensorShape {
                    reason: format!(
                        "tensor {} has shape {:?}, batch shape is {:?}",
                        position,
                        odd.shape(),
                        shape
                    ),
                });
            }
        }
        Ok(Self { tensors })
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn tensors(&self) -> &[FeatureTensor] {
        &self.tensors
    }

    /// Per-tensor shape, `None` for an empty batch
    pub fn tensor_shape(&self) -> Option<(usize, usize, usize)> {
        self.tensors.first().map(FeatureTensor::shape)
    }

    /// `[segments, time_frames, coefficients, channels]`
    pub fn shape(&self) -> [usize; 4] {
        let (frames, coefficients, channels) = self.tensor_shape().unwrap_or((0, 0, CHANNELS));
        [self.tensors.len(), frames, coefficients, channels]
    }

    /// Stack into one 4-D array for backends that want a single tensor
    pub fn to_array(&self) -> Result<Array4<f32>, ExtractionError> {
        if self.tensors.is_empty() {
            return Ok(Array4::zeros((0, 0, 0, CHANNELS)));
        }
        let views: Vec<ArrayView3<'_, f32>> = self.tensors.iter().map(|t| t.view()).collect();
        ndarray::stack(Axis(0), &views).map_err(|e| ExtractionError::TensorShape {
            reason: e.to_string(),
        })
    }
}
