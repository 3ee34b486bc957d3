// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tracked media item and its lifecycle transitions.
//!
//! Every status change goes through one of the transition methods below, each
//! of which checks the edge against [`MediaStatus::can_transition_to`] and
//! keeps `local_path`, `attempts`, and `last_error` consistent with the new
//! state.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MediaHookError;
use crate::types::{FailureKind, MediaRef, MediaStatus, MediaType};

/// Telegram's caption limit, in characters.
pub const MAX_CAPTION_CHARS: usize = 1024;

/// One tracked unit of ingested media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub chat_id: i64,
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_id: Option<i64>,
    pub file_ref: String,
    pub file_unique_ref: String,
    pub media_type: MediaType,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_size: Option<u64>,
    pub status: MediaStatus,
    /// Workspace-relative path of the downloaded file.
    #[serde(default)]
    pub local_path: Option<String>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaItem {
    /// Creates a new `pending` item for a media reference.
    pub fn new(id: String, media: MediaRef, now: DateTime<Utc>) -> Self {
        let caption = media.caption.map(|c| truncate_chars(c, MAX_CAPTION_CHARS));
        Self {
            id,
            chat_id: media.chat_id,
            message_id: media.message_id,
            update_id: media.update_id,
            file_ref: media.file_ref,
            file_unique_ref: media.file_unique_ref,
            media_type: media.media_type,
            caption,
            file_name: media.file_name,
            mime_type: media.mime_type,
            reported_size: media.reported_size,
            status: MediaStatus::Pending,
            local_path: None,
            attempts: 0,
            last_error: None,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(
        &mut self,
        next: MediaStatus,
        expected: &'static str,
        now: DateTime<Utc>,
    ) -> Result<(), MediaHookError> {
        if !self.status.can_transition_to(next) {
            return Err(MediaHookError::InvalidState {
                id: self.id.clone(),
                actual: self.status,
                expected,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// `pending -> downloading`; counts the attempt.
    pub fn begin_attempt(&mut self, now: DateTime<Utc>) -> Result<(), MediaHookError> {
        self.transition(MediaStatus::Downloading, "pending", now)?;
        self.attempts = self.attempts.saturating_add(1);
        Ok(())
    }

    /// `downloading -> completed` with the workspace-relative path of the file.
    pub fn complete(
        &mut self,
        local_path: String,
        now: DateTime<Utc>,
    ) -> Result<(), MediaHookError> {
        self.transition(MediaStatus::Completed, "downloading", now)?;
        self.local_path = Some(local_path);
        self.last_error = None;
        self.failure = None;
        Ok(())
    }

    /// `pending | downloading -> failed`.
    pub fn fail(
        &mut self,
        kind: FailureKind,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), MediaHookError> {
        self.transition(MediaStatus::Failed, "pending or downloading", now)?;
        self.local_path = None;
        self.last_error = Some(message.into());
        self.failure = Some(kind);
        Ok(())
    }

    /// `failed -> pending`. Attempts accumulate unless `reset_attempts` is set.
    pub fn retry(&mut self, reset_attempts: bool, now: DateTime<Utc>) -> Result<(), MediaHookError> {
        self.transition(MediaStatus::Pending, "failed", now)?;
        self.last_error = None;
        self.failure = None;
        if reset_attempts {
            self.attempts = 0;
        }
        Ok(())
    }

    /// `completed -> consumed`.
    pub fn consume(&mut self, now: DateTime<Utc>) -> Result<(), MediaHookError> {
        self.transition(MediaStatus::Consumed, "completed", now)
    }

    /// A failed item that has used up its attempt budget.
    pub fn is_exhausted(&self, max_attempts: u32) -> bool {
        self.status == MediaStatus::Failed && self.attempts >= max_attempts
    }

    /// Absolute path of the downloaded file under `workspace_root`.
    pub fn absolute_path(&self, workspace_root: &Path) -> Option<PathBuf> {
        self.local_path.as_ref().map(|p| workspace_root.join(p))
    }
}

fn truncate_chars(s: String, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s,
    }
}
