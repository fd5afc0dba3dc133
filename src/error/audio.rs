// Audio decoding error types and constants

use crate::error::ErrorCode;
use log::error;
use std::path::PathBuf;

/// Decoder error code constants
///
/// Error code range: 1001-1099
pub struct DecodeErrorCodes;

impl DecodeErrorCodes {
    /// Source file could not be opened
    pub const OPEN_FAILED: i32 = 1001;

    /// Container or codec not recognised
    pub const UNSUPPORTED_FORMAT: i32 = 1002;

    /// Container holds no decodable audio track
    pub const NO_AUDIO_TRACK: i32 = 1003;

    /// Track does not declare a sample rate
    pub const UNKNOWN_SAMPLE_RATE: i32 = 1004;

    /// Packet decoding failed
    pub const DECODE_FAILED: i32 = 1005;

    /// Sample rate conversion failed
    pub const RESAMPLE_FAILED: i32 = 1006;
}

/// Render a decode error as one log line
pub fn describe_decode_error(err: &DecodeError, context: &str) -> String {
    format!(
        "[Decoder] Decode error in {}: code={}, message={}",
        context,
        err.code(),
        err.message()
    )
}

/// Log a decode error with structured context
pub fn log_decode_error(err: &DecodeError, context: &str) {
    error!("{}", describe_decode_error(err, context));
}

/// Audio decoding errors
///
/// These errors cover everything between an uploaded file on disk and a
/// mono signal at the analysis sample rate.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported audio format: {reason}")]
    UnsupportedFormat { reason: String },

    #[error("no audio track found")]
    NoAudioTrack,

    #[error("audio track has no sample rate")]
    UnknownSampleRate,

    #[error("failed to decode audio: {reason}")]
    DecodeFailed { reason: String },

    #[error("failed to resample from {from} Hz to {to} Hz: {reason}")]
    ResampleFailed { from: u32, to: u32, reason: String },
}

impl ErrorCode for DecodeError {
    fn code(&self) -> i32 {
        match self {
            DecodeError::Open { .. } => DecodeErrorCodes::OPEN_FAILED,
            DecodeError::UnsupportedFormat { .. } => DecodeErrorCodes::UNSUPPORTED_FORMAT,
            DecodeError::NoAudioTrack => DecodeErrorCodes::NO_AUDIO_TRACK,
            DecodeError::UnknownSampleRate => DecodeErrorCodes::UNKNOWN_SAMPLE_RATE,
            DecodeError::DecodeFailed { .. } => DecodeErrorCodes::DECODE_FAILED,
            DecodeError::ResampleFailed { .. } => DecodeErrorCodes::RESAMPLE_FAILED,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }
}
