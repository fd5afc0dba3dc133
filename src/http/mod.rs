//! HTTP surface of the classification service.
//!
//! `POST /predict` accepts a multipart upload (`file`, optional `start` and
//! `end` in seconds) and answers with the ranked genre breakdown.
//! `GET /health` reports liveness and request counters.

mod routes;

pub use routes::{
    build_router, health, predict, run_http_server, AppState, HealthResponse, PredictResponse,
    RequestError, RequestStats,
};
