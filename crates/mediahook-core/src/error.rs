// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for mediahook.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::{FailureKind, MediaStatus};

/// The error type shared by the queue store, the download pipeline, and
/// every collaborator trait.
#[derive(Debug, Error)]
pub enum MediaHookError {
    /// Configuration errors (missing bot token, unusable workspace paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// The inbound update payload is missing required fields or has the wrong shape.
    #[error("malformed update: {reason}")]
    MalformedUpdate { reason: String },

    /// The remote file is larger than the configured download ceiling.
    #[error("size exceeded: file is {size} bytes, limit is {limit} bytes")]
    SizeExceeded { size: u64, limit: u64 },

    /// Network failure, non-success HTTP status, or a short/partial write.
    #[error("transfer failed: {message}")]
    TransferFailed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// A control-surface operation named an id the queue does not know.
    #[error("media item not found: {id}")]
    NotFound { id: String },

    /// A control-surface operation was attempted from a state that does not permit it.
    #[error("media item {id} is {actual}, expected {expected}")]
    InvalidState {
        id: String,
        actual: MediaStatus,
        expected: &'static str,
    },

    /// The persisted queue document could not be parsed.
    #[error("queue document {} is corrupt: {detail}", path.display())]
    StoreCorrupt { path: PathBuf, detail: String },

    /// Filesystem or serialization errors in the queue store.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The bot platform rejected a request or returned an unusable response.
    #[error("platform error: {message}")]
    Platform {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MediaHookError {
    /// Classifies a download error into the kind recorded on a failed item.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            MediaHookError::SizeExceeded { .. } => FailureKind::SizeExceeded,
            MediaHookError::Timeout { .. } => FailureKind::Timeout,
            _ => FailureKind::TransferFailed,
        }
    }

    /// Wraps any error as a storage error.
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        MediaHookError::Storage { source: err.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_classification() {
        let size = MediaHookError::SizeExceeded {
            size: 30,
            limit: 20,
        };
        assert_eq!(size.failure_kind(), FailureKind::SizeExceeded);

        let timeout = MediaHookError::Timeout {
            duration: Duration::from_secs(5),
        };
        assert_eq!(timeout.failure_kind(), FailureKind::Timeout);

        let transfer = MediaHookError::TransferFailed {
            message: "connection reset".into(),
            source: None,
        };
        assert_eq!(transfer.failure_kind(), FailureKind::TransferFailed);

        let platform = MediaHookError::Platform {
            message: "file is too big".into(),
            source: None,
        };
        assert_eq!(platform.failure_kind(), FailureKind::TransferFailed);
    }

    #[test]
    fn size_exceeded_message_names_both_sizes() {
        let err = MediaHookError::SizeExceeded {
            size: 25_000_000,
            limit: 20_971_520,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("size exceeded"));
        assert!(msg.contains("25000000"));
        assert!(msg.contains("20971520"));
    }

    #[test]
    fn invalid_state_message() {
        let err = MediaHookError::InvalidState {
            id: "42_7_abcd1234".into(),
            actual: MediaStatus::Pending,
            expected: "failed",
        };
        assert_eq!(
            err.to_string(),
            "media item 42_7_abcd1234 is pending, expected failed"
        );
    }
}
