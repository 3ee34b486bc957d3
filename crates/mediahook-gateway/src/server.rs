// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::path::PathBuf;
use std::time::Instant;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use mediahook_config::model::ServerConfig;
use mediahook_core::MediaHookError;
use mediahook_ingest::Dispatcher;
use mediahook_storage::QueueControl;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Telegram updates are small; anything bigger is not an update.
const MAX_WEBHOOK_BODY: usize = 1024 * 1024;

#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: Dispatcher,
    pub control: QueueControl,
    /// Resolves item `local_path` values to absolute paths.
    pub workspace_root: PathBuf,
    /// Expected Telegram secret-token header on webhook calls.
    pub webhook_secret: Option<String>,
    pub health: HealthState,
}

impl GatewayState {
    pub fn new(dispatcher: Dispatcher, control: QueueControl, workspace_root: PathBuf) -> Self {
        Self {
            dispatcher,
            control,
            workspace_root,
            webhook_secret: None,
            health: HealthState {
                start_time: Instant::now(),
            },
        }
    }

    pub fn with_webhook_secret(mut self, secret: Option<String>) -> Self {
        self.webhook_secret = secret;
        self
    }
}

/// Builds the router:
/// - POST /webhook (Telegram secret token)
/// - GET /health (public)
/// - GET /v1/queue, GET /v1/queue/completed (bearer auth)
/// - POST /v1/queue/{id}/retry, POST /v1/queue/{id}/consume (bearer auth)
pub fn router(state: GatewayState, auth: AuthConfig) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/webhook",
            post(handlers::post_webhook).layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY)),
        )
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/queue", get(handlers::get_queue))
        .route("/v1/queue/completed", get(handlers::get_completed))
        .route("/v1/queue/{id}/retry", post(handlers::post_retry))
        .route("/v1/queue/{id}/consume", post(handlers::post_consume))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}

/// Binds `host:port` and serves until `shutdown` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), MediaHookError> {
    let auth = AuthConfig {
        bearer_token: config.bearer_token.clone(),
    };
    if auth.bearer_token.is_none() {
        tracing::warn!("server.bearer_token is not set; the /v1 control api will reject all requests");
    }
    let app = router(state, auth);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MediaHookError::Platform {
            message: format!("failed to bind server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| MediaHookError::Platform {
            message: format!("server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("server stopped");
    Ok(())
}
