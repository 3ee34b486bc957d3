// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot API response envelopes.

use serde::Deserialize;

/// Every Bot API method answers with this envelope, success or not.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

/// `getFile` result.
#[derive(Debug, Clone, Deserialize)]
pub struct TgFile {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Absent when the file cannot be downloaded through the Bot API.
    #[serde(default)]
    pub file_path: Option<String>,
}

/// `getMe` result.
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}
