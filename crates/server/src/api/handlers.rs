use axum::{extract::State, http::header, response::IntoResponse, Json};
use helpdesk_core::{SanitizedConfig, TicketCategory};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub code: &'static str,
    pub label: &'static str,
}

/// Categories offered by the web form, in display order.
pub async fn list_categories() -> Json<Vec<CategoryResponse>> {
    Json(
        TicketCategory::ALL
            .iter()
            .map(|c| CategoryResponse {
                code: c.as_str(),
                label: c.label(),
            })
            .collect(),
    )
}
