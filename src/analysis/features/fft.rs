// FFT module - short-time power spectra
//
// This module frames a segment with centre padding, applies a periodic Hann
// window and computes the power spectrum of every frame. The resulting
// spectrogram feeds the mel filterbank.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// STFT processor producing power spectrograms
///
/// The FFT plan is computed once and shared; `Arc<dyn Fft>` is `Send + Sync`,
/// so one processor serves every segment on the rayon pool.
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    hop_length: usize,
    /// Periodic Hann window (pre-computed)
    window: Vec<f32>,
}

impl FftProcessor {
    /// Create a new STFT processor
    ///
    /// # Arguments
    /// * `fft_size` - FFT window size (2048 for the reference features)
    /// * `hop_length` - samples between frame starts (512)
    pub fn new(fft_size: usize, hop_length: usize) -> Self {
        let window = (0..fft_size)
            .map(|i| {
                0.5 - 0.5 * ((2.0 * std::f32::consts::PI * i as f32) / fft_size as f32).cos()
            })
            .collect();

        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(fft_size),
            fft_size,
            hop_length,
            window,
        }
    }

    /// Number of frequency bins per frame (positive frequencies only)
    pub fn bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// Compute the power spectrogram of `signal`
    ///
    /// The signal is padded with `fft_size / 2` zeros on both sides so frame
    /// `t` is centred on sample `t * hop_length`.
    ///
    /// # Returns
    /// One power spectrum (`|X|^2`, `bins()` values) per frame
    pub fn power_spectrogram(&self, signal: &[f32]) -> Vec<Vec<f32>> {
        let pad = self.fft_size / 2;
        let frames = self.frame_count(signal.len());
        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); self.fft_size];
        let mut scratch = vec![Complex::new(0.0, 0.0); self.fft.get_inplace_scratch_len()];
        let mut spectrogram = Vec::with_capacity(frames);

        for frame in 0..frames {
            // Index into the virtual padded signal
            let start = frame * self.hop_length;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let sample = (start + i)
                    .checked_sub(pad)
                    .and_then(|idx| signal.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            spectrogram.push(buffer[..self.bins()].iter().map(|c| c.norm_sqr()).collect());
        }

        spectrogram
    }
}
