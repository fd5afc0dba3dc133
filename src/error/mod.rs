// Error types for the genre classification service
//
// This module defines typed error families for decoding, feature extraction,
// classification, aggregation and startup, each carrying a stable numeric
// code so the HTTP layer and logs can report failures consistently.

mod audio;
mod inference;
mod startup;

pub use audio::{describe_decode_error, log_decode_error, DecodeError, DecodeErrorCodes};
pub use inference::{
    describe_inference_error, log_inference_error, AggregationError, AggregationErrorCodes,
    ClassifierError, ClassifierErrorCodes, ExtractionError, ExtractionErrorCodes,
    InferenceError, RequestErrorCodes,
};
pub use startup::{StartupError, StartupErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the request boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
