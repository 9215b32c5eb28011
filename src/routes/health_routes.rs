use axum::{Json, Router, routing::get};

use crate::models::AppState;

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub data: HealthData,
}

#[derive(serde::Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        data: HealthData {
            status: "UP".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })
}
