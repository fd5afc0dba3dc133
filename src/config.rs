//! Configuration management for the classification service
//!
//! This module provides runtime configuration loading from JSON files.
//! Server limits, feature extraction parameters and the model/label
//! table can be adjusted without recompilation. Every field has a
//! default, so a partial file only needs the values it overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::segment_length;
use crate::error::ExtractionError;

/// Environment variable overriding `server.bind_addr`
pub const BIND_ADDR_ENV: &str = "GENRE_HTTP_ADDR";

/// Default config location relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/genre_service.json";

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub extraction: ExtractionConfig,
    pub model: ModelConfig,
}

/// HTTP surface and upload handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to
    pub bind_addr: String,
    /// Scratch directory for transient uploads
    pub upload_dir: PathBuf,
    /// Lower-case file extensions accepted by /predict
    pub allowed_extensions: Vec<String>,
    /// Maximum accepted request body in bytes
    pub max_upload_bytes: usize,
    /// Range start used when the request omits `start`
    pub default_start_secs: f64,
    /// Range end used when the request omits `end`
    pub default_end_secs: f64,
    /// Browser origins allowed to call the API cross-origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            allowed_extensions: vec!["wav".to_string(), "mp3".to_string()],
            max_upload_bytes: 50 * 1024 * 1024,
            default_start_secs: 0.0,
            default_end_secs: 30.0,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Segment feature extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Analysis sample rate in Hz; decoded audio is resampled to this
    pub sample_rate: u32,
    /// Length of each analysis window in seconds
    pub segment_duration_secs: f32,
    /// Number of cepstral coefficients kept per frame
    pub mfcc_count: usize,
    /// FFT window size in samples
    pub fft_size: usize,
    /// Hop between successive frames in samples
    pub hop_length: usize,
    /// Number of mel filterbank bands
    pub mel_bands: usize,
    /// Extract segments on the rayon pool
    pub parallel: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            segment_duration_secs: 5.0,
            mfcc_count: 13,
            fft_size: 2048,
            hop_length: 512,
            mel_bands: 128,
            parallel: true,
        }
    }
}

impl ExtractionConfig {
    /// Check parameters before any audio is processed
    pub fn validate(&self) -> Result<(), ExtractionError> {
        fn invalid(name: &'static str, reason: &str) -> ExtractionError {
            ExtractionError::InvalidParameter {
                name,
                reason: reason.to_string(),
            }
        }

        if self.sample_rate == 0 {
            return Err(invalid("sample_rate", "must be > 0"));
        }
        segment_length(self.segment_duration_secs, self.sample_rate)?;
        if self.mfcc_count == 0 {
            return Err(invalid("mfcc_count", "must be > 0"));
        }
        if self.fft_size < 2 {
            return Err(invalid("fft_size", "must be >= 2"));
        }
        if self.hop_length == 0 {
            return Err(invalid("hop_length", "must be > 0"));
        }
        if self.mel_bands == 0 {
            return Err(invalid("mel_bands", "must be > 0"));
        }
        if self.mfcc_count > self.mel_bands {
            return Err(invalid("mfcc_count", "cannot exceed mel_bands"));
        }
        Ok(())
    }

    /// Samples per segment: floor(duration * sample_rate)
    pub fn segment_samples(&self) -> usize {
        (self.segment_duration_secs as f64 * self.sample_rate as f64).floor() as usize
    }
}

/// Inference runtime used for the genre model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Exported network run through ONNX Runtime
    Onnx,
    /// Built-in time-pooled dense layer read from JSON weights
    Dense,
}

/// Classifier and class-index to genre mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    /// Model file: `.onnx` graph or dense JSON weights, per `backend`
    pub path: PathBuf,
    /// Name of the ONNX graph input fed the `[segments, frames, coefficients, channels]` batch
    pub input_name: String,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
    /// Genre labels; position equals class index
    pub labels: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::Onnx,
            path: PathBuf::from("model/genre_model.onnx"),
            input_name: "input".to_string(),
            intra_threads: 1,
            labels: [
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
            ]
            .iter()
            .map(|label| label.to_string())
            .collect(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from JSON file
    ///
    /// # Returns
    /// Loaded configuration, or defaults when the file is missing or
    /// invalid (a warning is logged in both cases)
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_strict(&path) {
            Ok(config) => {
                log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                config
            }
            Err(err) => {
                log::warn!(
                    "[Config] Failed to load {:?}: {:#}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
        .with_env_overrides()
    }

    /// Load configuration from JSON file, failing on any read or parse error
    pub fn load_strict<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.as_ref().display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.as_ref().display()))?;
        Ok(config.with_env_overrides())
    }

    /// Load the default config file for this working directory
    pub fn load() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(addr) = std::env::var(BIND_ADDR_ENV) {
            if !addr.trim().is_empty() {
                self.server.bind_addr = addr;
            }
        }
        self
    }
}
