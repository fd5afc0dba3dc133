//! End-to-end pipeline tests: WAV on disk -> decoder -> extractor ->
//! classifier -> vote aggregation.

mod common;

use std::sync::Arc;

use common::{biased_model_json, write_tone_wav, FixedVote, GENRES};
use genre_classifier::audio::{AudioDecoder, SymphoniaDecoder, TimeRange};
use genre_classifier::classifier::LabelTable;
use genre_classifier::config::{ExtractionConfig, ModelBackend, ServiceConfig};
use genre_classifier::error::{ClassifierError, DecodeError, InferenceError, StartupError};
use genre_classifier::service::GenreService;

fn service_voting_for(class: usize) -> GenreService {
    GenreService::new(
        ExtractionConfig::default(),
        LabelTable::new(GENRES).unwrap(),
        Arc::new(FixedVote { classes: 10, class }),
        Arc::new(SymphoniaDecoder::new(22_050)),
    )
    .unwrap()
}

#[test]
fn test_twelve_second_file_yields_two_segments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    write_tone_wav(&path, 22_050, 1, 12.0);

    let range = TimeRange::new(0.0, 30.0).unwrap();
    let result = service_voting_for(3).classify_file(&path, range).unwrap();

    assert_eq!(result.segment_count, 2);
    assert_eq!(result.results.len(), 1);
    assert_eq!(result.results[0].genre, "rock");
    assert_eq!(result.results[0].percentage, 100.0);
    assert_eq!(result.top_prediction.genre, "rock");
    assert_eq!(result.top_prediction.confidence, 100.0);
}

#[test]
fn test_stereo_source_is_downmixed_and_resampled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    write_tone_wav(&path, 44_100, 2, 11.0);

    let decoder = SymphoniaDecoder::new(22_050);
    let signal = decoder
        .decode(&path, TimeRange::new(0.0, 30.0).unwrap())
        .unwrap();
    assert_eq!(signal.sample_rate(), 22_050);
    let expected = 11 * 22_050;
    assert!(
        (signal.len() as i64 - expected as i64).abs() <= 2,
        "got {} samples",
        signal.len()
    );

    let result = service_voting_for(9).classify_signal(&signal).unwrap();
    assert_eq!(result.segment_count, 2);
    assert_eq!(result.top_prediction.genre, "metal");
}

#[test]
fn test_time_range_trims_before_segmenting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.wav");
    write_tone_wav(&path, 22_050, 1, 16.0);
    let service = service_voting_for(0);

    let result = service
        .classify_file(&path, TimeRange::new(2.0, 13.0).unwrap())
        .unwrap();
    assert_eq!(result.segment_count, 2);

    let result = service
        .classify_file(&path, TimeRange::new(10.0, 16.0).unwrap())
        .unwrap();
    assert_eq!(result.segment_count, 1);
}

#[test]
fn test_range_shorter_than_a_segment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.wav");
    write_tone_wav(&path, 22_050, 1, 12.0);

    let err = service_voting_for(0)
        .classify_file(&path, TimeRange::new(0.0, 4.0).unwrap())
        .unwrap_err();
    assert!(matches!(err, InferenceError::NoSegments { .. }));
}

#[test]
fn test_range_past_end_of_audio() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    write_tone_wav(&path, 22_050, 1, 6.0);

    let err = service_voting_for(0)
        .classify_file(&path, TimeRange::new(20.0, 30.0).unwrap())
        .unwrap_err();
    assert!(matches!(err, InferenceError::NoSegments { .. }));
}

#[test]
fn test_undecodable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake.mp3");
    std::fs::write(&path, b"definitely not audio").unwrap();

    let err = service_voting_for(0)
        .classify_file(&path, TimeRange::new(0.0, 30.0).unwrap())
        .unwrap_err();
    assert!(matches!(err, InferenceError::Decode(_)));
}

#[test]
fn test_missing_file() {
    let err = service_voting_for(0)
        .classify_file(
            std::path::Path::new("/no/such/upload.wav"),
            TimeRange::new(0.0, 30.0).unwrap(),
        )
        .unwrap_err();
    assert!(matches!(err, InferenceError::Decode(DecodeError::Open { .. })));
}

#[test]
fn test_service_from_config_with_dense_model() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");
    std::fs::write(&model_path, biased_model_json(5)).unwrap();
    let audio_path = dir.path().join("clip.wav");
    write_tone_wav(&audio_path, 22_050, 1, 10.5);

    let mut config = ServiceConfig::default();
    config.model.backend = ModelBackend::Dense;
    config.model.path = model_path;
    let service = GenreService::from_config(&config).unwrap();

    let result = service
        .classify_file(&audio_path, TimeRange::new(0.0, 30.0).unwrap())
        .unwrap();
    assert_eq!(result.segment_count, 2);
    assert_eq!(result.top_prediction.genre, "jazz");
}

#[test]
fn test_service_from_config_refuses_missing_onnx_model() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServiceConfig::default();
    config.model.path = dir.path().join("genre_model.onnx");

    let err = GenreService::from_config(&config).err().unwrap();
    assert!(matches!(
        err,
        StartupError::Model(ClassifierError::LoadFailed { .. })
    ));
}
