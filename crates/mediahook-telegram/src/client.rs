// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Telegram Bot API.
//!
//! Provides [`BotApiClient`], which handles method URLs, the response
//! envelope, and file downloads. The bot token is part of every URL, so
//! transport errors are stripped of their URL before they are surfaced.

use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use mediahook_config::model::TelegramConfig;
use mediahook_core::{ByteStream, MediaHookError};

use crate::types::{ApiResponse, BotUser, TgFile};

/// Update kinds requested from `getUpdates`.
const ALLOWED_UPDATES: &[&str] = &["message", "edited_message", "channel_post", "edited_channel_post"];

#[derive(Clone)]
pub struct BotApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    request_timeout: Duration,
}

impl std::fmt::Debug for BotApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotApiClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl BotApiClient {
    /// Creates a client from the `[telegram]` section. Fails without a bot token.
    pub fn new(config: &TelegramConfig) -> Result<Self, MediaHookError> {
        let token = config.require_bot_token()?.to_string();
        // No client-wide timeout: file transfers run under the download deadline.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MediaHookError::Platform {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token,
            request_timeout: config.request_timeout(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token, file_path)
    }

    /// Calls a Bot API method and unwraps the response envelope.
    pub async fn call<P, T>(&self, method: &str, params: &P) -> Result<T, MediaHookError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.method_url(method))
            .timeout(self.request_timeout)
            .json(params)
            .send()
            .await
            .map_err(|e| MediaHookError::Platform {
                message: format!("{method} request failed: {}", redact(&e)),
                source: Some(Box::new(e.without_url())),
            })?;

        let status = response.status();
        debug!(method, status = %status, "bot api response received");

        let body = response.text().await.map_err(|e| MediaHookError::Platform {
            message: format!("failed to read {method} response: {}", redact(&e)),
            source: Some(Box::new(e.without_url())),
        })?;
        let envelope: ApiResponse<T> =
            serde_json::from_str(&body).map_err(|e| MediaHookError::Platform {
                message: format!("{method} returned {status} with an unreadable body"),
                source: Some(Box::new(e)),
            })?;

        if !envelope.ok {
            return Err(MediaHookError::Platform {
                message: format!(
                    "{method} failed ({}): {}",
                    envelope.error_code.unwrap_or(i64::from(status.as_u16())),
                    envelope.description.as_deref().unwrap_or("no description"),
                ),
                source: None,
            });
        }
        envelope.result.ok_or_else(|| MediaHookError::Platform {
            message: format!("{method} returned ok without a result"),
            source: None,
        })
    }

    pub async fn get_me(&self) -> Result<BotUser, MediaHookError> {
        self.call("getMe", &json!({})).await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<TgFile, MediaHookError> {
        self.call("getFile", &json!({ "file_id": file_id })).await
    }

    /// Non-blocking `getUpdates` (`timeout = 0`).
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Value>, MediaHookError> {
        let mut params = json!({
            "timeout": 0,
            "allowed_updates": ALLOWED_UPDATES,
        });
        if let (Some(offset), Some(map)) = (offset, params.as_object_mut()) {
            map.insert("offset".to_string(), json!(offset));
        }
        self.call("getUpdates", &params).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), MediaHookError> {
        let _sent: Value = self
            .call(
                "sendMessage",
                &json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "Markdown",
                }),
            )
            .await?;
        Ok(())
    }

    /// Streams a file previously resolved with `getFile`.
    pub async fn download(&self, file_path: &str) -> Result<ByteStream, MediaHookError> {
        let response = self
            .http
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(|e| MediaHookError::TransferFailed {
                message: format!("file request failed: {}", redact(&e)),
                source: Some(Box::new(e.without_url())),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaHookError::TransferFailed {
                message: format!("file download returned {status}"),
                source: None,
            });
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| MediaHookError::TransferFailed {
                message: format!("file stream interrupted: {}", redact(&e)),
                source: Some(Box::new(e.without_url())),
            })
        });
        Ok(Box::pin(stream))
    }
}

/// Display form of a reqwest error without the URL, which carries the token.
fn redact(e: &reqwest::Error) -> String {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else if e.is_decode() || e.is_body() {
        "body error"
    } else {
        "request error"
    };
    match e.status() {
        Some(status) => format!("{kind} ({status})"),
        None => kind.to_string(),
    }
}
