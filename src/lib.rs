// Genre Classifier - segment-level music genre inference service
// Decodes uploads, extracts cepstral features per 5 s segment, scores each
// segment with a pre-trained model and aggregates the votes.

// Module declarations
pub mod analysis;
pub mod audio;
pub mod classifier;
pub mod config;
pub mod error;
pub mod http;
pub mod service;
pub mod uploads;

// Re-exports for convenience
pub use analysis::{RankedResult, SegmentFeatureExtractor};
pub use audio::{AudioDecoder, AudioSignal, SymphoniaDecoder, TimeRange};
pub use classifier::{GenreClassifier, LabelTable, PredictionVector};
pub use config::ServiceConfig;
pub use service::GenreService;
