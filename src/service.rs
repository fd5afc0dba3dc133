// Genre service - end-to-end classification pipeline
//
// decode -> segment -> extract -> predict -> aggregate
//
// One `GenreService` is built at startup and shared by every request. It
// owns no mutable state, so concurrent calls never contend on anything but
// the rayon pool used for extraction.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::analysis::{aggregate, RankedResult, SegmentFeatureExtractor};
use crate::audio::{AudioDecoder, AudioSignal, SymphoniaDecoder, TimeRange};
use crate::classifier::{load_classifier, GenreClassifier, LabelTable};
use crate::config::{ExtractionConfig, ServiceConfig};
use crate::error::{ClassifierError, InferenceError, StartupError};

/// Shared classification pipeline
pub struct GenreService {
    extractor: SegmentFeatureExtractor,
    classifier: Arc<dyn GenreClassifier>,
    decoder: Arc<dyn AudioDecoder>,
    labels: LabelTable,
}

impl GenreService {
    /// Assemble a service, refusing mismatched collaborators
    ///
    /// Fails when the extraction parameters are invalid or the label table
    /// does not cover exactly the classifier's outputs.
    pub fn new(
        extraction: ExtractionConfig,
        labels: LabelTable,
        classifier: Arc<dyn GenreClassifier>,
        decoder: Arc<dyn AudioDecoder>,
    ) -> Result<Self, StartupError> {
        let extractor = SegmentFeatureExtractor::new(extraction)?;
        labels.validate_against(classifier.output_dim())?;

        let (frames, coefficients, channels) = extractor.tensor_shape();
        tracing::info!(
            "[Service] Ready: {} genres, segment tensor {}x{}x{}",
            labels.len(),
            frames,
            coefficients,
            channels
        );

        Ok(Self {
            extractor,
            classifier,
            decoder,
            labels,
        })
    }

    /// Build the production service: configured model backend, symphonia decoder
    pub fn from_config(config: &ServiceConfig) -> Result<Self, StartupError> {
        let labels = LabelTable::new(config.model.labels.iter().cloned())?;
        let input_shape = SegmentFeatureExtractor::new(config.extraction.clone())?.tensor_shape();
        let model = load_classifier(&config.model, input_shape)?;
        let decoder = SymphoniaDecoder::new(config.extraction.sample_rate);

        Self::new(config.extraction.clone(), labels, model, Arc::new(decoder))
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn extractor(&self) -> &SegmentFeatureExtractor {
        &self.extractor
    }

    /// Classify an already-decoded analysis signal
    pub fn classify_signal(&self, signal: &AudioSignal) -> Result<RankedResult, InferenceError> {
        let started = Instant::now();

        let batch = self.extractor.extract_batch(signal)?;
        if batch.is_empty() {
            return Err(InferenceError::NoSegments {
                segment_secs: self.extractor.config().segment_duration_secs,
            });
        }

        let predictions = self.classifier.predict(&batch)?;
        if predictions.len() != batch.len() {
            return Err(ClassifierError::PredictionCount {
                expected: batch.len(),
                actual: predictions.len(),
            }
            .into());
        }

        let result = aggregate(&predictions, &self.labels)?;
        tracing::info!(
            "[Service] Classified {} segments in {:?}: {} ({:.2}%)",
            result.segment_count,
            started.elapsed(),
            result.top_prediction.genre,
            result.top_prediction.confidence
        );
        Ok(result)
    }

    /// Decode `range` of the file at `path` and classify it
    pub fn classify_file(
        &self,
        path: &Path,
        range: TimeRange,
    ) -> Result<RankedResult, InferenceError> {
        let started = Instant::now();
        let signal = self.decoder.decode(path, range)?;
        tracing::debug!(
            "[Service] Decoded {:?} [{}s, {}s) -> {:.2}s in {:?}",
            path,
            range.start_secs(),
            range.end_secs(),
            signal.duration_secs(),
            started.elapsed()
        );

        self.classify_signal(&signal)
    }
}
