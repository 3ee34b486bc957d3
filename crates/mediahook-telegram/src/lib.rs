// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram adapter for mediahook.
//!
//! [`TelegramAdapter`] implements every platform-facing collaborator on top
//! of the plain Bot API: [`FileSource`] via `getFile` and the file endpoint,
//! [`UpdateSource`] via non-blocking `getUpdates`, and [`Notifier`] via
//! `sendMessage`.

pub mod client;
pub mod types;

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use mediahook_config::model::TelegramConfig;
use mediahook_core::{
    ByteStream, FileSource, HealthStatus, MediaHookError, MediaItem, Notifier, PluginAdapter,
    RemoteFile, UpdateSource,
};

pub use client::BotApiClient;

pub struct TelegramAdapter {
    client: BotApiClient,
}

impl TelegramAdapter {
    /// Requires `telegram.bot_token`.
    pub fn new(config: &TelegramConfig) -> Result<Self, MediaHookError> {
        Ok(Self {
            client: BotApiClient::new(config)?,
        })
    }

    pub fn client(&self) -> &BotApiClient {
        &self.client
    }
}

/// Chat message sent after a download completes.
pub fn saved_notification(item: &MediaItem, path: &Path) -> String {
    format!(
        "✅ {} saved\n\nPath: `{}`",
        item.media_type,
        path.display()
    )
}

#[async_trait]
impl PluginAdapter for TelegramAdapter {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn health_check(&self) -> Result<HealthStatus, MediaHookError> {
        match self.client.get_me().await {
            Ok(me) => {
                debug!(bot_id = me.id, username = ?me.username, "bot api reachable");
                Ok(HealthStatus::Healthy)
            }
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl FileSource for TelegramAdapter {
    async fn resolve(&self, file_ref: &str) -> Result<RemoteFile, MediaHookError> {
        let file = self.client.get_file(file_ref).await?;
        let download_path = file.file_path.ok_or_else(|| MediaHookError::Platform {
            message: format!("file {file_ref} has no download path"),
            source: None,
        })?;
        Ok(RemoteFile {
            file_ref: file.file_id,
            download_path,
            size: file.file_size,
        })
    }

    async fn open(&self, file: &RemoteFile) -> Result<ByteStream, MediaHookError> {
        self.client.download(&file.download_path).await
    }
}

#[async_trait]
impl UpdateSource for TelegramAdapter {
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<Vec<serde_json::Value>, MediaHookError> {
        self.client.get_updates(offset).await
    }
}

#[async_trait]
impl Notifier for TelegramAdapter {
    async fn media_saved(&self, item: &MediaItem, path: &Path) -> Result<(), MediaHookError> {
        self.client
            .send_message(item.chat_id, &saved_notification(item, path))
            .await
    }
}
