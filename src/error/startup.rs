// Startup-time configuration errors
//
// These are fatal: the process refuses to serve requests when the
// classifier, label table and extraction parameters do not agree.

use crate::error::{ClassifierError, ErrorCode, ExtractionError};

/// Startup error code constants
///
/// Error code range: 5001-5099
pub struct StartupErrorCodes;

impl StartupErrorCodes {
    /// Extraction parameters rejected
    pub const INVALID_EXTRACTION: i32 = 5001;

    /// No genre labels configured
    pub const EMPTY_LABEL_TABLE: i32 = 5002;

    /// Label count differs from classifier outputs
    pub const LABEL_MISMATCH: i32 = 5003;

    /// Same genre listed twice
    pub const DUPLICATE_LABEL: i32 = 5004;

    /// Model could not be loaded
    pub const MODEL: i32 = 5005;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StartupError {
    #[error("invalid extraction config: {0}")]
    InvalidExtraction(#[from] ExtractionError),

    #[error("label table is empty")]
    EmptyLabelTable,

    #[error("label table has {labels} entries but classifier outputs {outputs} classes")]
    LabelMismatch { labels: usize, outputs: usize },

    #[error("duplicate label {label:?} in label table")]
    DuplicateLabel { label: String },

    #[error(transparent)]
    Model(#[from] ClassifierError),
}

impl ErrorCode for StartupError {
    fn code(&self) -> i32 {
        match self {
            StartupError::InvalidExtraction(_) => StartupErrorCodes::INVALID_EXTRACTION,
            StartupError::EmptyLabelTable => StartupErrorCodes::EMPTY_LABEL_TABLE,
            StartupError::LabelMismatch { .. } => StartupErrorCodes::LABEL_MISMATCH,
            StartupError::DuplicateLabel { .. } => StartupErrorCodes::DUPLICATE_LABEL,
            StartupError::Model(_) => StartupErrorCodes::MODEL,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }
}
