//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;

use genre_classifier::analysis::FeatureBatch;
use genre_classifier::classifier::{GenreClassifier, PredictionVector};
use genre_classifier::error::ClassifierError;

pub const GENRES: [&str; 10] = [
    "hiphop",
    "country",
    "classical",
    "rock",
    "pop",
    "jazz",
    "reggae",
    "disco",
    "blues",
    "metal",
];

/// Interleaved 16-bit PCM tone as WAV bytes
pub fn tone_wav_bytes(sample_rate: u32, channels: u16, seconds: f32, frequency: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        let frames = (seconds * sample_rate as f32) as usize;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let value = (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.5;
            let sample = (value * i16::MAX as f32) as i16;
            for _ in 0..channels {
                writer.write_sample(sample).expect("write sample");
            }
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}

pub fn write_tone_wav(path: &Path, sample_rate: u32, channels: u16, seconds: f32) {
    std::fs::write(path, tone_wav_bytes(sample_rate, channels, seconds, 440.0))
        .expect("write wav fixture");
}

/// Votes for one fixed class on every segment
pub struct FixedVote {
    pub classes: usize,
    pub class: usize,
}

impl GenreClassifier for FixedVote {
    fn output_dim(&self) -> usize {
        self.classes
    }

    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<PredictionVector>, ClassifierError> {
        Ok(batch
            .tensors()
            .iter()
            .map(|_| {
                let mut scores = vec![0.0; self.classes];
                scores[self.class] = 1.0;
                PredictionVector::new(scores)
            })
            .collect())
    }
}

/// Dense model JSON that always favours `class`
pub fn biased_model_json(class: usize) -> String {
    let weights = vec![vec![0.0f32; 13 * 3]; GENRES.len()];
    let mut bias = vec![0.0f32; GENRES.len()];
    bias[class] = 5.0;
    serde_json::json!({
        "coefficients": 13,
        "channels": 3,
        "weights": weights,
        "bias": bias,
    })
    .to_string()
}
