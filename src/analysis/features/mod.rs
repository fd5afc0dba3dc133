// Segment feature extraction - cepstral coefficients plus time derivatives
//
// This module turns a decoded analysis signal into one fixed-shape tensor
// per non-overlapping segment. Each segment is transformed independently:
//
// Module organization:
// - types: FeatureTensor / FeatureBatch
// - fft: centred STFT power spectrogram
// - mel: Slaney mel filterbank
// - cepstrum: power-to-dB and orthonormal DCT-II
// - delta: first and second time derivatives
// - mod.rs: Coordinator (SegmentFeatureExtractor)
//
// Per segment:
// 1. Power spectrogram (periodic Hann, centre padded)
// 2. Mel projection, log compression (80 dB range)
// 3. DCT-II, first `mfcc_count` coefficients
// 4. First and second derivatives across frames
// 5. Stack as channels -> (frames, coefficients, 3)
//
// References:
// - Davis, S. & Mermelstein, P. (1980). Comparison of parametric
//   representations for monosyllabic word recognition

mod cepstrum;
mod delta;
mod fft;
mod mel;
mod types;

pub use delta::{DeltaOrder, DELTA_WIDTH};
pub use types::{
    FeatureBatch, FeatureTensor, CHANNELS, CHANNEL_BASE, CHANNEL_DELTA, CHANNEL_DELTA2,
};

use ndarray::Array3;
use rayon::prelude::*;

use crate::analysis::segment::split_segments;
use crate::audio::AudioSignal;
use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use cepstrum::{power_to_db, Dct};
use fft::FftProcessor;
use mel::MelFilterbank;

/// SegmentFeatureExtractor coordinates the per-segment transform
///
/// Built once from an `ExtractionConfig`; all lookup tables (window, FFT
/// plan, filterbank, DCT basis) are shared read-only across segments.
pub struct SegmentFeatureExtractor {
    config: ExtractionConfig,
    segment_samples: usize,
    fft_processor: FftProcessor,
    filterbank: MelFilterbank,
    dct: Dct,
}

impl SegmentFeatureExtractor {
    /// Create an extractor, validating the configuration first
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractionError> {
        config.validate()?;

        let segment_samples = config.segment_samples();
        let fft_processor = FftProcessor::new(config.fft_size, config.hop_length);
        let frames = fft_processor.frame_count(segment_samples);
        if frames < DELTA_WIDTH {
            return Err(ExtractionError::TooFewFrames {
                frames,
                required: DELTA_WIDTH,
            });
        }

        Ok(Self {
            filterbank: MelFilterbank::new(config.sample_rate, config.fft_size, config.mel_bands),
            dct: Dct::new(config.mel_bands, config.mfcc_count),
            fft_processor,
            segment_samples,
            config,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Samples per analysis segment
    pub fn segment_samples(&self) -> usize {
        self.segment_samples
    }

    /// Frames per segment tensor
    pub fn expected_frames(&self) -> usize {
        self.fft_processor.frame_count(self.segment_samples)
    }

    /// Shape every tensor from this extractor has
    pub fn tensor_shape(&self) -> (usize, usize, usize) {
        (self.expected_frames(), self.config.mfcc_count, CHANNELS)
    }

    /// Extract one tensor per complete segment of `signal`, in time order
    ///
    /// A trailing partial segment is dropped; a signal shorter than one
    /// segment yields an empty vector.
    pub fn extract(&self, signal: &AudioSignal) -> Result<Vec<FeatureTensor>, ExtractionError> {
        if signal.sample_rate() != self.config.sample_rate {
            return Err(ExtractionError::SampleRateMismatch {
                expected: self.config.sample_rate,
                actual: signal.sample_rate(),
            });
        }

        let segments = split_segments(signal.samples(), self.segment_samples);
        log::debug!(
            "[Extractor] {} samples -> {} segments of {} (dropping {})",
            signal.len(),
            segments.len(),
            self.segment_samples,
            signal.len() - segments.len() * self.segment_samples
        );

        // Indexed parallel collect keeps segment order.
        if self.config.parallel {
            segments
                .par_iter()
                .map(|segment| self.extract_segment(segment))
                .collect()
        } else {
            segments
                .iter()
                .map(|segment| self.extract_segment(segment))
                .collect()
        }
    }

    /// Extract and wrap as a classifier-ready batch
    pub fn extract_batch(&self, signal: &AudioSignal) -> Result<FeatureBatch, ExtractionError> {
        FeatureBatch::new(self.extract(signal)?)
    }

    /// Transform a single segment into a `(frames, coefficients, 3)` tensor
    pub fn extract_segment(&self, segment: &[f32]) -> Result<FeatureTensor, ExtractionError> {
        let mut mel_frames: Vec<Vec<f32>> = self
            .fft_processor
            .power_spectrogram(segment)
            .iter()
            .map(|power| self.filterbank.apply(power))
            .collect();
        power_to_db(&mut mel_frames);

        let coefficients: Vec<Vec<f32>> =
            mel_frames.iter().map(|frame| self.dct.apply(frame)).collect();

        let frames = coefficients.len();
        let too_few = || ExtractionError::TooFewFrames {
            frames,
            required: DELTA_WIDTH,
        };
        let first = delta::delta(&coefficients, DeltaOrder::First).ok_or_else(too_few)?;
        let second = delta::delta(&coefficients, DeltaOrder::Second).ok_or_else(too_few)?;

        let count = self.dct.coefficients();
        let data = Array3::from_shape_fn((frames, count, CHANNELS), |(t, c, ch)| match ch {
            CHANNEL_BASE => coefficients[t][c],
            CHANNEL_DELTA => first[t][c],
            _ => second[t][c],
        });

        FeatureTensor::new(data)
    }
}
