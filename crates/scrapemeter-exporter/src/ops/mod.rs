//! Operational HTTP endpoints.
//!
//! - `/healthz`      : liveness
//! - scrape path     : Prometheus text format (default `/metrics`)

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use scrapemeter_core::encoding::CONTENT_TYPE;

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Runs one collection cycle. Encoder failure yields 500 with no body.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.collector().collect().await {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "scrape failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
