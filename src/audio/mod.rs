// Audio input: decoded signals, requested time ranges and the decoder seam

mod decoder;
mod resample;

pub use decoder::{AudioDecoder, SymphoniaDecoder};
pub use resample::resample_mono;

use crate::error::InferenceError;

/// Mono PCM signal at a fixed sample rate
///
/// Immutable once decoded; the pipeline only ever borrows the samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Sub-range of the source audio to analyse, in seconds
///
/// An `end` past the actual audio length is allowed; the decoder clamps it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    start_secs: f64,
    end_secs: f64,
}

impl TimeRange {
    pub fn new(start_secs: f64, end_secs: f64) -> Result<Self, InferenceError> {
        if !start_secs.is_finite() || !end_secs.is_finite() {
            return Err(InferenceError::InvalidRange {
                reason: "start and end must be finite numbers".to_string(),
            });
        }
        if start_secs < 0.0 {
            return Err(InferenceError::InvalidRange {
                reason: format!("start must be >= 0 (got {})", start_secs),
            });
        }
        if end_secs <= start_secs {
            return Err(InferenceError::InvalidRange {
                reason: format!(
                    "end ({}) must be greater than start ({})",
                    end_secs, start_secs
                ),
            });
        }
        Ok(Self {
            start_secs,
            end_secs,
        })
    }

    pub fn start_secs(&self) -> f64 {
        self.start_secs
    }

    pub fn end_secs(&self) -> f64 {
        self.end_secs
    }

    /// Start bound in whole milliseconds
    pub fn start_ms(&self) -> u64 {
        (self.start_secs * 1000.0).floor() as u64
    }

    /// End bound in whole milliseconds
    pub fn end_ms(&self) -> u64 {
        (self.end_secs * 1000.0).floor() as u64
    }

    /// Frame bounds `[start, end)` at `sample_rate`, clamped to `total_frames`
    pub fn frame_bounds(&self, sample_rate: u32, total_frames: usize) -> (usize, usize) {
        let to_frame = |ms: u64| (ms.saturating_mul(sample_rate as u64) / 1000) as usize;
        let start = to_frame(self.start_ms()).min(total_frames);
        let end = to_frame(self.end_ms()).min(total_frames);
        (start, end.max(start))
    }
}
