// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Handles POST /webhook, GET /health, and the `/v1/queue` control routes.

use std::path::PathBuf;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use mediahook_core::{HealthStatus, MediaHookError, MediaItem, PluginAdapter};
use mediahook_storage::StatusSnapshot;

use crate::auth::webhook_secret_matches;
use crate::server::GatewayState;

/// Response body for POST /webhook.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub ok: bool,
    pub enqueued: usize,
    pub duplicates: usize,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the queue store has quarantined a document.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A completed item together with where its file lives.
#[derive(Debug, Serialize)]
pub struct CompletedItem {
    #[serde(flatten)]
    pub item: MediaItem,
    pub path: Option<PathBuf>,
}

/// Response body for GET /v1/queue/completed.
#[derive(Debug, Serialize)]
pub struct CompletedResponse {
    pub count: usize,
    pub items: Vec<CompletedItem>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps a [`MediaHookError`] onto an HTTP status and JSON body.
#[derive(Debug)]
pub struct ApiError(pub MediaHookError);

impl From<MediaHookError> for ApiError {
    fn from(err: MediaHookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MediaHookError::NotFound { .. } => StatusCode::NOT_FOUND,
            MediaHookError::InvalidState { .. } => StatusCode::CONFLICT,
            MediaHookError::MalformedUpdate { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// POST /webhook
///
/// Records the update's media and returns immediately; the background
/// worker does the download. Redeliveries are answered with `duplicates`.
pub async fn post_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !webhook_secret_matches(state.webhook_secret.as_deref(), &headers) {
        warn!("webhook call rejected: secret token mismatch");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "invalid webhook secret".to_string(),
            }),
        )
            .into_response();
    }

    let update: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            return ApiError(MediaHookError::MalformedUpdate {
                reason: format!("body is not JSON: {e}"),
            })
            .into_response();
        }
    };

    match state.dispatcher.ingest(&update).await {
        Ok(report) => Json(WebhookResponse {
            ok: true,
            enqueued: report.enqueued.len(),
            duplicates: report.duplicates.len(),
        })
        .into_response(),
        Err(e) => {
            if matches!(e, MediaHookError::MalformedUpdate { .. }) {
                warn!(error = %e, "webhook update rejected");
            }
            ApiError(e).into_response()
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let (status, detail) = match state.control.store().health_check().await {
        Ok(HealthStatus::Healthy) => ("ok", None),
        Ok(HealthStatus::Degraded(d)) => ("degraded", Some(d)),
        Ok(HealthStatus::Unhealthy(d)) => ("unhealthy", Some(d)),
        Err(e) => ("unhealthy", Some(e.to_string())),
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        detail,
    })
}

/// GET /v1/queue
pub async fn get_queue(
    State(state): State<GatewayState>,
) -> Result<Json<StatusSnapshot>, ApiError> {
    Ok(Json(state.control.status().await?))
}

/// GET /v1/queue/completed
pub async fn get_completed(
    State(state): State<GatewayState>,
) -> Result<Json<CompletedResponse>, ApiError> {
    let items: Vec<CompletedItem> = state
        .control
        .list_pending_for_consumption()
        .await?
        .into_iter()
        .map(|item| CompletedItem {
            path: item.absolute_path(&state.workspace_root),
            item,
        })
        .collect();
    Ok(Json(CompletedResponse {
        count: items.len(),
        items,
    }))
}

/// POST /v1/queue/{id}/retry
pub async fn post_retry(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<MediaItem>, ApiError> {
    let item = state.control.retry(&id).await?;
    state.dispatcher.wake_handle().notify_one();
    Ok(Json(item))
}

/// POST /v1/queue/{id}/consume
pub async fn post_consume(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<MediaItem>, ApiError> {
    Ok(Json(state.control.consume(&id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_response_serializes() {
        let json = serde_json::to_value(WebhookResponse {
            ok: true,
            enqueued: 1,
            duplicates: 0,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"ok": true, "enqueued": 1, "duplicates": 0}));
    }

    #[test]
    fn health_response_omits_empty_detail() {
        let json = serde_json::to_string(&HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
            detail: None,
        })
        .unwrap();
        assert!(json.contains("\"uptime_secs\":42"));
        assert!(!json.contains("detail"));
    }

    #[test]
    fn error_status_mapping() {
        let cases = [
            (
                MediaHookError::NotFound { id: "x".into() },
                StatusCode::NOT_FOUND,
            ),
            (
                MediaHookError::MalformedUpdate {
                    reason: "no chat".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                MediaHookError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).into_response().status(), expected);
        }
    }
}
