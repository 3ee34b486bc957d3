// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for mediahook.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;
use std::time::Duration;

use mediahook_core::MediaHookError;
use serde::{Deserialize, Serialize};

/// Top-level mediahook configuration.
///
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaHookConfig {
    /// Telegram Bot API settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Where downloads and the queue document live.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Download ceilings and retry policy.
    #[serde(default)]
    pub download: DownloadConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Background download worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Housekeeping of consumed items.
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token. Required by every command that talks to Telegram.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Base URL of the Bot API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Expected `X-Telegram-Bot-Api-Secret-Token` on webhook calls.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Timeout for Bot API requests other than file transfers.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base_url: default_api_base_url(),
            webhook_secret: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl TelegramConfig {
    /// The bot token, or a configuration error naming both ways to set it.
    pub fn require_bot_token(&self) -> Result<&str, MediaHookError> {
        self.bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                MediaHookError::Config(
                    "telegram.bot_token is not set (or set MEDIAHOOK_TELEGRAM_BOT_TOKEN)"
                        .to_string(),
                )
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_request_timeout_secs() -> u64 {
    35
}

/// Workspace layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Workspace root. `local_path` values in the queue are relative to it.
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,

    /// Download directory, relative to `root`.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Queue document, relative to `root`.
    #[serde(default = "default_queue_file")]
    pub queue_file: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
            upload_dir: default_upload_dir(),
            queue_file: default_queue_file(),
        }
    }
}

impl WorkspaceConfig {
    /// Absolute (or root-relative) download directory.
    pub fn upload_path(&self) -> PathBuf {
        self.root.join(&self.upload_dir)
    }

    /// Absolute (or root-relative) queue document path.
    pub fn queue_path(&self) -> PathBuf {
        self.root.join(&self.queue_file)
    }
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_queue_file() -> String {
    "uploads/media_queue.json".to_string()
}

/// Download policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadConfig {
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Deadline for one download attempt, resolve through final rename.
    #[serde(default = "default_download_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts after which the worker stops picking an item up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Whether an operator retry zeroes the attempt counter.
    #[serde(default)]
    pub reset_attempts_on_retry: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
            timeout_secs: default_download_timeout_secs(),
            max_attempts: default_max_attempts(),
            reset_attempts_on_retry: false,
        }
    }
}

impl DownloadConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_max_file_size_mb() -> u64 {
    20
}

fn default_download_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for the `/v1` control routes. `None` locks them.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Send a chat reply when a download completes.
    #[serde(default = "default_notify_on_complete")]
    pub notify_on_complete: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            notify_on_complete: default_notify_on_complete(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_notify_on_complete() -> bool {
    true
}

/// Background worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// How long the worker sleeps when the queue is idle and nothing wakes it.
    #[serde(default = "default_idle_poll_secs")]
    pub idle_poll_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_poll_secs: default_idle_poll_secs(),
        }
    }
}

impl WorkerConfig {
    pub fn idle_poll(&self) -> Duration {
        Duration::from_secs(self.idle_poll_secs)
    }
}

fn default_idle_poll_secs() -> u64 {
    5
}

/// Cleanup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupConfig {
    /// Consumed items older than this many days are removed with their files.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
        }
    }
}

fn default_max_age_days() -> u32 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
