// Segmentation - fixed-length, non-overlapping analysis windows
//
// Windows start at sample 0 and advance by exactly one window length. A
// trailing remainder shorter than a full window is dropped, never padded.

use crate::error::ExtractionError;

/// Number of samples per segment: floor(duration * sample_rate)
pub fn segment_length(duration_secs: f32, sample_rate: u32) -> Result<usize, ExtractionError> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(ExtractionError::InvalidParameter {
            name: "segment_duration_secs",
            reason: format!("must be a positive number (got {})", duration_secs),
        });
    }

    let length = (duration_secs as f64 * sample_rate as f64).floor() as usize;
    if length == 0 {
        return Err(ExtractionError::InvalidParameter {
            name: "segment_duration_secs",
            reason: "shorter than one sample at the analysis rate".to_string(),
        });
    }
    Ok(length)
}

/// Split `samples` into consecutive windows of exactly `length` samples
///
/// Yields `floor(samples.len() / length)` windows in time order.
pub fn split_segments(samples: &[f32], length: usize) -> Vec<&[f32]> {
    if length == 0 {
        return Vec::new();
    }
    samples.chunks_exact(length).collect()
}
