// Analysis pipeline - segmentation, feature extraction and vote aggregation
//
// Module organization:
// - segment: fixed-length, non-overlapping windowing
// - features: per-segment cepstral tensors
// - aggregate: plurality vote over per-segment predictions

pub mod aggregate;
pub mod features;
pub mod segment;

pub use aggregate::{
    aggregate, GenreShare, RankedResult, TopPrediction, VoteTally, UNKNOWN_GENRE,
};
pub use features::{FeatureBatch, FeatureTensor, SegmentFeatureExtractor, CHANNELS};
pub use segment::{segment_length, split_segments};
