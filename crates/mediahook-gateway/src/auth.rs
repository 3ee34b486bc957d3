// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request authentication.
//!
//! The control API takes `Authorization: Bearer <token>` and rejects every
//! request when no token is configured. The webhook is authenticated
//! separately by Telegram's secret-token header.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

/// Header Telegram echoes back when the webhook was registered with a secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` rejects every request.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Bearer-token middleware for the control API. Fail-closed.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.bearer_token.as_deref() else {
        tracing::error!("control api has no bearer token configured, rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let presented = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Whether a webhook call carries the configured secret. Always true when
/// no secret is configured.
pub fn webhook_secret_matches(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|presented| presented == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn auth_config_debug_redacts_token() {
        let config = AuthConfig {
            bearer_token: Some("secret-token".to_string()),
        };
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("secret-token"));
        assert!(debug_output.contains("[redacted]"));
    }

    #[test]
    fn webhook_secret_optional() {
        assert!(webhook_secret_matches(None, &HeaderMap::new()));
    }

    #[test]
    fn webhook_secret_must_match_exactly() {
        let mut headers = HeaderMap::new();
        assert!(!webhook_secret_matches(Some("s3cret"), &headers));

        headers.insert(WEBHOOK_SECRET_HEADER, HeaderValue::from_static("wrong"));
        assert!(!webhook_secret_matches(Some("s3cret"), &headers));

        headers.insert(WEBHOOK_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(webhook_secret_matches(Some("s3cret"), &headers));
    }
}
