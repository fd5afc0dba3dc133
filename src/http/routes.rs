use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::analysis::RankedResult;
use crate::audio::TimeRange;
use crate::config::ServerConfig;
use crate::error::{log_decode_error, log_inference_error, InferenceError};
use crate::service::GenreService;
use crate::uploads::{is_allowed_extension, storage_name, UploadStore};

/// Request counters reported by /health
#[derive(Debug, Default)]
pub struct RequestStats {
    served: AtomicU64,
    failed: AtomicU64,
}

impl RequestStats {
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn record<T, E>(&self, outcome: &Result<T, E>) {
        let counter = if outcome.is_ok() {
            &self.served
        } else {
            &self.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GenreService>,
    pub store: UploadStore,
    pub server: Arc<ServerConfig>,
    pub stats: Arc<RequestStats>,
}

impl AppState {
    pub fn new(service: Arc<GenreService>, store: UploadStore, server: ServerConfig) -> Self {
        Self {
            service,
            store,
            server: Arc::new(server),
            stats: Arc::new(RequestStats::default()),
        }
    }
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum RequestError {
    MissingFile,
    EmptyFilename,
    InvalidRange(String),
    InvalidFileType,
    Multipart { status: StatusCode, message: String },
    Storage(String),
    Inference(InferenceError),
    Internal(String),
}

impl RequestError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::MissingFile => (StatusCode::BAD_REQUEST, "No file uploaded".into()),
            Self::EmptyFilename => (StatusCode::BAD_REQUEST, "Empty filename".into()),
            Self::InvalidRange(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            Self::InvalidFileType => (
                StatusCode::BAD_REQUEST,
                "Invalid file type. Only MP3 and WAV allowed".into(),
            ),
            Self::Multipart { status, message } => (*status, message.clone()),
            Self::Storage(reason) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to store upload: {}", reason),
            ),
            Self::Inference(err) => inference_status(err),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        }
    }
}

fn inference_status(err: &InferenceError) -> (StatusCode, String) {
    match err {
        InferenceError::InvalidRange { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        InferenceError::Decode(inner) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Audio processing failed: {}", inner),
        ),
        InferenceError::Extraction(_) | InferenceError::NoSegments { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Feature extraction failed or audio too short".into(),
        ),
        InferenceError::Classifier(inner) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Model prediction failed: {}", inner),
        ),
        InferenceError::Aggregation(inner) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Model prediction failed: {}", inner),
        ),
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (
            status,
            Json(serde_json::json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}

impl From<MultipartError> for RequestError {
    fn from(err: MultipartError) -> Self {
        Self::Multipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

/// Successful /predict payload.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub data: RankedResult,
}

impl PredictResponse {
    pub fn ok(data: RankedResult) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub genres: usize,
    pub requests_served: u64,
    pub requests_failed: u64,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.server.max_upload_bytes;
    let cors = cors_layer(&state.server.cors_origins);
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Cross-origin policy for the configured browser origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("[HTTP] Ignoring CORS origin {:?}: {}", origin, err);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Run the HTTP server loop until Ctrl-C.
pub async fn run_http_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding HTTP listener on {}", addr))?;
    tracing::info!("[HTTP] Listening on {}", addr);

    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP router")?;

    tracing::info!("[HTTP] Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("[HTTP] Shutdown requested, draining connections"),
        Err(err) => tracing::error!("[HTTP] Failed to listen for Ctrl-C: {}", err),
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        genres: state.service.labels().len(),
        requests_served: state.stats.served(),
        requests_failed: state.stats.failed(),
    })
}

pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, RequestError> {
    let outcome = handle_predict(&state, multipart).await;
    state.stats.record(&outcome);

    match &outcome {
        Ok(result) => tracing::debug!(
            "[HTTP] /predict ok: {} segments, top {}",
            result.segment_count,
            result.top_prediction.genre
        ),
        Err(RequestError::Inference(InferenceError::Decode(err))) => {
            log_decode_error(err, "/predict")
        }
        Err(RequestError::Inference(err)) => log_inference_error(err, "/predict"),
        Err(err) => tracing::warn!("[HTTP] /predict rejected: {:?}", err),
    }

    outcome.map(|data| Json(PredictResponse::ok(data)))
}

/// Fields of a /predict form
#[derive(Default)]
struct PredictForm {
    file: Option<(String, Vec<u8>)>,
    start: Option<String>,
    end: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<PredictForm, RequestError> {
    let mut form = PredictForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.file = Some((filename, bytes.to_vec()));
            }
            Some("start") => form.start = Some(field.text().await?),
            Some("end") => form.end = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(form)
}

fn parse_seconds(raw: Option<&str>, default: f64) -> Result<f64, RequestError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<f64>()
            .map_err(|_| RequestError::InvalidRange("Invalid start/end region".into())),
    }
}

async fn handle_predict(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<RankedResult, RequestError> {
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!("[HTTP] /predict without multipart body: {}", rejection);
        RequestError::MissingFile
    })?;
    let form = read_form(multipart).await?;

    let (filename, bytes) = form.file.ok_or(RequestError::MissingFile)?;
    if filename.is_empty() {
        return Err(RequestError::EmptyFilename);
    }

    let start = parse_seconds(form.start.as_deref(), state.server.default_start_secs)?;
    let end = parse_seconds(form.end.as_deref(), state.server.default_end_secs)?;
    let range =
        TimeRange::new(start, end).map_err(|err| RequestError::InvalidRange(err.to_string()))?;

    if !is_allowed_extension(&filename, &state.server.allowed_extensions) {
        return Err(RequestError::InvalidFileType);
    }
    let (base, ext) = storage_name(&filename).ok_or(RequestError::InvalidFileType)?;

    let service = Arc::clone(&state.service);
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || {
        let scratch = store
            .persist(&base, &ext, &bytes)
            .map_err(|err| RequestError::Storage(err.to_string()))?;
        service
            .classify_file(scratch.path(), range)
            .map_err(RequestError::Inference)
    })
    .await
    .map_err(|err| RequestError::Internal(format!("classification task failed: {}", err)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FeatureBatch;
    use crate::audio::{AudioDecoder, AudioSignal};
    use crate::classifier::{GenreClassifier, LabelTable, PredictionVector};
    use crate::config::ExtractionConfig;
    use crate::error::{ClassifierError, DecodeError};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use std::path::Path;
    use tower::ServiceExt;

    const BOUNDARY: &str = "genre-test-boundary";

    struct AlwaysFirst;

    impl GenreClassifier for AlwaysFirst {
        fn output_dim(&self) -> usize {
            2
        }

        fn predict(&self, batch: &FeatureBatch) -> Result<Vec<PredictionVector>, ClassifierError> {
            Ok(vec![PredictionVector::new(vec![0.9, 0.1]); batch.len()])
        }
    }

    /// Returns `seconds` of a 440 Hz tone at 8 kHz, ignoring the file
    struct ToneDecoder {
        seconds: f32,
    }

    impl AudioDecoder for ToneDecoder {
        fn decode(&self, path: &Path, _range: TimeRange) -> Result<AudioSignal, DecodeError> {
            assert!(path.exists(), "upload should exist while decoding");
            let samples = (0..(self.seconds * 8_000.0) as usize)
                .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8_000.0).sin())
                .collect();
            Ok(AudioSignal::new(samples, 8_000))
        }
    }

    fn make_state(seconds: f32, upload_dir: &Path) -> AppState {
        let extraction = ExtractionConfig {
            sample_rate: 8_000,
            segment_duration_secs: 0.5,
            fft_size: 512,
            hop_length: 128,
            mel_bands: 40,
            ..ExtractionConfig::default()
        };
        let service = GenreService::new(
            extraction,
            LabelTable::new(["rock", "pop"]).unwrap(),
            Arc::new(AlwaysFirst),
            Arc::new(ToneDecoder { seconds }),
        )
        .unwrap();
        let store = UploadStore::new(upload_dir).unwrap();
        AppState::new(Arc::new(service), store, ServerConfig::default())
    }

    enum Part<'a> {
        File(&'a str, &'a [u8]),
        Text(&'a str, &'a str),
    }

    fn multipart_request(parts: &[Part]) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::File(filename, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n",
                            filename
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                            name, value
                        )
                        .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .expect("predict request")
    }

    async fn response_json(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body bytes");
        let json = serde_json::from_slice::<Value>(&bytes).expect("JSON body");
        (status, json)
    }

    async fn call(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        response_json(
            build_router(state)
                .oneshot(request)
                .await
                .expect("router call"),
        )
        .await
    }

    #[tokio::test]
    async fn predict_success_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_state(1.2, dir.path());
        let (status, json) = call(
            state.clone(),
            multipart_request(&[
                Part::File("my song.wav", b"RIFF"),
                Part::Text("start", "0"),
                Part::Text("end", "30"),
            ]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["segment_count"], 2);
        assert_eq!(json["data"]["top_prediction"]["genre"], "rock");
        assert_eq!(json["data"]["top_prediction"]["confidence"], 100.0);
        assert_eq!(state.stats.served(), 1);

        // Scratch upload was removed
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn predict_accepts_non_ascii_filename() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_state(1.2, dir.path());
        let (status, json) = call(
            state.clone(),
            multipart_request(&[Part::File("Ω.wav", b"RIFF")]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["segment_count"], 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_state(1.0, dir.path());
        let preflight = |origin: &str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/predict")
                .header("origin", origin)
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .expect("preflight request")
        };

        let response = build_router(state.clone())
            .oneshot(preflight("http://localhost:5173"))
            .await
            .expect("router call");
        assert!(response.status().is_success());
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );

        let response = build_router(state)
            .oneshot(preflight("http://evil.example"))
            .await
            .expect("router call");
        assert!(response
            .headers()
            .get("access-control-allow-origin")
            .is_none());
    }

    #[test]
    fn predict_response_envelope() {
        let data = RankedResult {
            segment_count: 1,
            results: vec![crate::analysis::GenreShare {
                genre: "rock".to_string(),
                percentage: 100.0,
            }],
            top_prediction: crate::analysis::TopPrediction {
                genre: "rock".to_string(),
                confidence: 100.0,
            },
        };
        let json = serde_json::to_value(PredictResponse::ok(data)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["segment_count"], 1);
        assert_eq!(json["data"]["top_prediction"]["genre"], "rock");
    }

    #[tokio::test]
    async fn predict_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_state(1.0, dir.path());
        let (status, json) = call(state.clone(), multipart_request(&[Part::Text("start", "0")])).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No file uploaded");
        assert_eq!(state.stats.failed(), 1);
    }

    #[tokio::test]
    async fn predict_without_multipart_body() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .body(Body::empty())
            .unwrap();
        let (status, json) = call(make_state(1.0, dir.path()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn predict_with_empty_filename() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = call(
            make_state(1.0, dir.path()),
            multipart_request(&[Part::File("", b"data")]),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Empty filename");
    }

    #[tokio::test]
    async fn predict_with_non_numeric_range() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = call(
            make_state(1.0, dir.path()),
            multipart_request(&[Part::File("a.wav", b"data"), Part::Text("start", "soon")]),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn predict_with_inverted_range() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = call(
            make_state(1.0, dir.path()),
            multipart_request(&[
                Part::File("a.wav", b"data"),
                Part::Text("start", "20"),
                Part::Text("end", "10"),
            ]),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("time range"));
    }

    #[tokio::test]
    async fn predict_with_disallowed_extension() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = call(
            make_state(1.0, dir.path()),
            multipart_request(&[Part::File("notes.txt", b"hello")]),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid file type. Only MP3 and WAV allowed");
    }

    #[tokio::test]
    async fn predict_too_short_audio() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = call(
            make_state(0.3, dir.path()),
            multipart_request(&[Part::File("short.mp3", b"data")]),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Feature extraction failed or audio too short");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let dir = tempfile::tempdir().unwrap();
        let state = make_state(1.0, dir.path());
        state.stats.served.fetch_add(3, Ordering::Relaxed);

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("health request");
        let (status, json) = call(state, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["genres"], 2);
        assert_eq!(json["requests_served"], 3);
        assert_eq!(json["requests_failed"], 0);
    }

    #[test]
    fn decode_failures_map_to_audio_processing_message() {
        let err = RequestError::Inference(InferenceError::Decode(DecodeError::NoAudioTrack));
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(message.starts_with("Audio processing failed: "));
    }

    #[test]
    fn classifier_failures_map_to_model_message() {
        let err = RequestError::Inference(InferenceError::Classifier(
            ClassifierError::PredictionCount {
                expected: 2,
                actual: 1,
            },
        ));
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(message.starts_with("Model prediction failed: "));
    }
}
