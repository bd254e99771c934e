//! HTTP request handlers for the asset server.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::resources::PluginRegistry;

/// Application state shared across all handlers
pub struct AppState {
    pub registry: Arc<dyn PluginRegistry>,
}

/// Health check response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Serve one plugin asset.
///
/// - `200 OK` with the asset's mime type as `Content-Type`
/// - `404 Not Found` for an unknown plugin or path
/// - `500 Internal Server Error` for any other failure
pub async fn plugin_asset(
    State(state): State<Arc<AppState>>,
    Path((plugin, path)): Path<(String, String)>,
) -> Response {
    tracing::info!(plugin = %plugin, path = %path, "getting asset");

    match state.registry.web_resource(&plugin, &path).await {
        Ok(asset) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, asset.mime_type)],
            asset.content,
        )
            .into_response(),
        Err(err) if err.is_not_found() => {
            (StatusCode::NOT_FOUND, Json(ErrorResponse::new(err.to_string()))).into_response()
        }
        Err(err) => {
            tracing::error!(plugin = %plugin, path = %path, error = %err, "load plugin asset");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(err.to_string())),
            )
                .into_response()
        }
    }
}
