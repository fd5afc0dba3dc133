// Decoder collaborator: uploaded file -> mono signal at the analysis rate
//
// Decoding happens upstream of feature extraction. The decoder trims the
// requested range at millisecond resolution in the source's own sample
// rate, downmixes to mono, then resamples to the analysis rate.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{resample_mono, AudioSignal, TimeRange};
use crate::error::DecodeError;

/// Turns an audio file plus a time range into a mono analysis signal
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, path: &Path, range: TimeRange) -> Result<AudioSignal, DecodeError>;
}

/// Symphonia-backed decoder for WAV and MP3 containers
#[derive(Debug, Clone)]
pub struct SymphoniaDecoder {
    target_sample_rate: u32,
}

impl SymphoniaDecoder {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, path: &Path, range: TimeRange) -> Result<AudioSignal, DecodeError> {
        let (mono, source_rate) = decode_mono(path)?;
        let (start, end) = range.frame_bounds(source_rate, mono.len());

        log::debug!(
            "[Decoder] {:?}: {} frames @ {} Hz, keeping [{}, {})",
            path,
            mono.len(),
            source_rate,
            start,
            end
        );

        let samples = resample_mono(&mono[start..end], source_rate, self.target_sample_rate)?;
        Ok(AudioSignal::new(samples, self.target_sample_rate))
    }
}

/// Decode the first audio track of `path` to mono f32 samples
fn decode_mono(path: &Path) -> Result<(Vec<f32>, u32), DecodeError> {
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::UnsupportedFormat {
            reason: e.to_string(),
        })?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat {
            reason: e.to_string(),
        })?;

    let mut mono: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(DecodeError::DecodeFailed {
                    reason: e.to_string(),
                })
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("[Decoder] Skipping corrupt packet: {}", e);
                continue;
            }
            Err(e) => {
                return Err(DecodeError::DecodeFailed {
                    reason: e.to_string(),
                })
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);

        let needed = decoded.capacity() * channels;
        if sample_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < needed)
        {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            downmix_into(buf.samples(), channels, &mut mono);
        }
    }

    if mono.is_empty() {
        log::warn!("[Decoder] {:?} decoded to zero samples", path);
    }

    Ok((mono, sample_rate))
}

/// Average interleaved channels into `out`
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}
