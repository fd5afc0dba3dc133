// Sample rate conversion for decoded mono audio
//
// Uses rubato's FFT-based fixed-ratio resampler. The resampler introduces a
// fixed output delay, which is trimmed so sample 0 of the output lines up
// with sample 0 of the input.

use rubato::{FftFixedIn, Resampler};

use crate::error::DecodeError;

/// Input chunk size fed to the resampler
const CHUNK_FRAMES: usize = 4096;

/// Resample a mono signal from `from` Hz to `to` Hz
///
/// Returns the input unchanged when the rates already match.
pub fn resample_mono(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>, DecodeError> {
    if from == to || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let fail = |reason: String| DecodeError::ResampleFailed { from, to, reason };

    let mut resampler = FftFixedIn::<f32>::new(from as usize, to as usize, CHUNK_FRAMES, 2, 1)
        .map_err(|e| fail(e.to_string()))?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as u64 * to as u64).div_ceil(from as u64) as usize;
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay);

    let mut position = 0;
    while samples.len() - position >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let chunk = resampler
            .process(&[&samples[position..position + needed]], None)
            .map_err(|e| fail(e.to_string()))?;
        output.extend_from_slice(&chunk[0]);
        position += needed;
    }

    if position < samples.len() {
        let chunk = resampler
            .process_partial(Some(&[&samples[position..]][..]), None)
            .map_err(|e| fail(e.to_string()))?;
        output.extend_from_slice(&chunk[0]);
    }

    // Flush the delay line with silence until the tail is out.
    while output.len() < expected + delay {
        let chunk = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| fail(e.to_string()))?;
        if chunk[0].is_empty() {
            break;
        }
        output.extend_from_slice(&chunk[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);
    Ok(output)
}
