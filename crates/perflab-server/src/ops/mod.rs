//! Operational HTTP endpoints.
//!
//! - `/metrics` : Prometheus text format

use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}};

use crate::app_state::AppState;
use crate::obs::exposition;

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = exposition::render(&state.metrics_snapshot());

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, exposition::CONTENT_TYPE)],
        body,
    )
        .into_response()
}
