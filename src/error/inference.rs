// Feature extraction, classifier and aggregation error types

use crate::error::{DecodeError, ErrorCode};
use log::error;

/// Render a request-level inference error as one log line
pub fn describe_inference_error(err: &InferenceError, context: &str) -> String {
    format!(
        "[Service] Inference error in {}: code={}, message={}",
        context,
        err.code(),
        err.message()
    )
}

/// Log a request-level inference error with structured context
pub fn log_inference_error(err: &InferenceError, context: &str) {
    error!("{}", describe_inference_error(err, context));
}

/// Extraction error code constants
///
/// Error code range: 2001-2099
pub struct ExtractionErrorCodes;

impl ExtractionErrorCodes {
    /// Extraction parameter out of range
    pub const INVALID_PARAMETER: i32 = 2001;

    /// Signal not at the analysis sample rate
    pub const SAMPLE_RATE_MISMATCH: i32 = 2002;

    /// Segment too short for the derivative window
    pub const TOO_FEW_FRAMES: i32 = 2003;

    /// Tensors could not be assembled or stacked
    pub const TENSOR_SHAPE: i32 = 2004;
}

/// Segment feature extraction errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("invalid extraction parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("signal sample rate {actual} Hz does not match analysis rate {expected} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    #[error("segment yields {frames} frames, derivative window needs at least {required}")]
    TooFewFrames { frames: usize, required: usize },

    #[error("failed to assemble feature tensor: {reason}")]
    TensorShape { reason: String },
}

impl ErrorCode for ExtractionError {
    fn code(&self) -> i32 {
        match self {
            ExtractionError::InvalidParameter { .. } => ExtractionErrorCodes::INVALID_PARAMETER,
            ExtractionError::SampleRateMismatch { .. } => {
                ExtractionErrorCodes::SAMPLE_RATE_MISMATCH
            }
            ExtractionError::TooFewFrames { .. } => ExtractionErrorCodes::TOO_FEW_FRAMES,
            ExtractionError::TensorShape { .. } => ExtractionErrorCodes::TENSOR_SHAPE,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }
}

/// Classifier error code constants
///
/// Error code range: 3001-3099
pub struct ClassifierErrorCodes;

impl ClassifierErrorCodes {
    /// Model file missing or unreadable by its backend
    pub const LOAD_FAILED: i32 = 3001;

    /// Model parsed but its contents are inconsistent
    pub const MALFORMED_MODEL: i32 = 3002;

    /// Batch tensors do not match the model input
    pub const INPUT_SHAPE: i32 = 3003;

    /// Classifier returned the wrong number of vectors
    pub const PREDICTION_COUNT: i32 = 3004;

    /// Inference runtime failed while scoring a batch
    pub const INFERENCE_FAILED: i32 = 3005;
}

/// Classifier errors (model load and inference)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("failed to load model from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("malformed model: {reason}")]
    MalformedModel { reason: String },

    #[error("input shape {actual:?} does not match model input {expected:?}")]
    InputShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("classifier returned {actual} predictions for {expected} segments")]
    PredictionCount { expected: usize, actual: usize },

    #[error("inference failed: {reason}")]
    InferenceFailed { reason: String },
}

impl ErrorCode for ClassifierError {
    fn code(&self) -> i32 {
        match self {
            ClassifierError::LoadFailed { .. } => ClassifierErrorCodes::LOAD_FAILED,
            ClassifierError::MalformedModel { .. } => ClassifierErrorCodes::MALFORMED_MODEL,
            ClassifierError::InputShape { .. } => ClassifierErrorCodes::INPUT_SHAPE,
            ClassifierError::PredictionCount { .. } => ClassifierErrorCodes::PREDICTION_COUNT,
            ClassifierError::InferenceFailed { .. } => ClassifierErrorCodes::INFERENCE_FAILED,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }
}

/// Aggregation error code constants
///
/// Error code range: 4001-4099
pub struct AggregationErrorCodes;

impl AggregationErrorCodes {
    /// Prediction vector without scores
    pub const EMPTY_PREDICTION: i32 = 4001;

    /// Arg-max index outside the label table
    pub const UNMAPPED_CLASS: i32 = 4002;
}

/// Vote aggregation errors
///
/// An unmapped class index means the label table and classifier disagree,
/// which startup validation is meant to rule out.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregationError {
    #[error("prediction vector {position} is empty")]
    EmptyPrediction { position: usize },

    #[error("class index {index} has no label (table covers {table_len} classes)")]
    UnmappedClass { index: usize, table_len: usize },
}

impl ErrorCode for AggregationError {
    fn code(&self) -> i32 {
        match self {
            AggregationError::EmptyPrediction { .. } => AggregationErrorCodes::EMPTY_PREDICTION,
            AggregationError::UnmappedClass { .. } => AggregationErrorCodes::UNMAPPED_CLASS,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }
}

/// Request-level error code constants
///
/// Error code range: 6001-6099. Wrapped component errors keep their own
/// codes.
pub struct RequestErrorCodes;

impl RequestErrorCodes {
    /// Requested time range is negative or empty
    pub const INVALID_RANGE: i32 = 6001;

    /// Decoded range shorter than one segment
    pub const NO_SEGMENTS: i32 = 6002;
}

/// Request-level failure of the classification pipeline
///
/// Each variant is terminal for its request; none is retried.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("invalid time range: {reason}")]
    InvalidRange { reason: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("audio too short: no complete {segment_secs}s segment")]
    NoSegments { segment_secs: f32 },

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

impl ErrorCode for InferenceError {
    fn code(&self) -> i32 {
        match self {
            InferenceError::InvalidRange { .. } => RequestErrorCodes::INVALID_RANGE,
            InferenceError::Decode(err) => err.code(),
            InferenceError::Extraction(err) => err.code(),
            InferenceError::NoSegments { .. } => RequestErrorCodes::NO_SEGMENTS,
            InferenceError::Classifier(err) => err.code(),
            InferenceError::Aggregation(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }
}
