// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the queue store, the download pipeline, and the
//! platform adapters.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Lifecycle state of a tracked media item.
///
/// ```text
/// pending -> downloading -> completed -> consumed
///    |            |
///    +----------> failed -> pending (explicit retry)
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MediaStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
    Consumed,
}

impl MediaStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [MediaStatus; 5] = [
        MediaStatus::Pending,
        MediaStatus::Downloading,
        MediaStatus::Completed,
        MediaStatus::Failed,
        MediaStatus::Consumed,
    ];

    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, next: MediaStatus) -> bool {
        use MediaStatus::*;
        matches!(
            (self, next),
            (Pending, Downloading)
                | (Pending, Failed)
                | (Downloading, Completed)
                | (Downloading, Failed)
                | (Failed, Pending)
                | (Completed, Consumed)
        )
    }

    /// Whether a file backs an item in this state.
    pub fn has_local_file(self) -> bool {
        matches!(self, MediaStatus::Completed | MediaStatus::Consumed)
    }
}

/// Kind of media attachment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MediaType {
    Photo,
    Video,
    Document,
}

impl MediaType {
    /// Extension used when neither the file name nor the MIME type gives one.
    pub fn default_extension(self) -> &'static str {
        match self {
            MediaType::Photo => "jpg",
            MediaType::Video => "mp4",
            MediaType::Document => "bin",
        }
    }
}

/// Why the most recent download attempt failed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// The file is larger than the download ceiling.
    SizeExceeded,
    /// Network error, platform error, or byte-count mismatch.
    TransferFailed,
    /// The attempt ran past its deadline.
    Timeout,
    /// The process stopped while the item was downloading.
    Interrupted,
}

/// A media reference extracted from an inbound update, before it is enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub chat_id: i64,
    pub message_id: i64,
    pub update_id: Option<i64>,
    pub file_ref: String,
    pub file_unique_ref: String,
    pub media_type: MediaType,
    pub caption: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub reported_size: Option<u64>,
}

/// A platform file resolved for download.
///
/// The download path is transient (platform file URLs expire) and is never
/// written to the queue document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub file_ref: String,
    pub download_path: String,
    /// Size reported by the platform. `None` means unknown until transferred.
    pub size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_display_matches_serde() {
        for status in MediaStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
            assert_eq!(MediaStatus::from_str(&status.to_string()).unwrap(), status);
        }
    }

    #[test]
    fn only_documented_edges_are_legal() {
        use MediaStatus::*;
        let legal: Vec<(MediaStatus, MediaStatus)> = MediaStatus::ALL
            .iter()
            .flat_map(|&a| MediaStatus::ALL.iter().map(move |&b| (a, b)))
            .filter(|&(a, b)| a.can_transition_to(b))
            .collect();
        assert_eq!(
            legal,
            vec![
                (Pending, Downloading),
                (Pending, Failed),
                (Downloading, Completed),
                (Downloading, Failed),
                (Failed, Pending),
                (Completed, Consumed),
            ]
        );
    }

    #[test]
    fn downloading_never_returns_to_pending() {
        assert!(!MediaStatus::Downloading.can_transition_to(MediaStatus::Pending));
        assert!(!MediaStatus::Consumed.can_transition_to(MediaStatus::Completed));
    }

    #[test]
    fn default_extensions() {
        assert_eq!(MediaType::Photo.default_extension(), "jpg");
        assert_eq!(MediaType::Video.default_extension(), "mp4");
        assert_eq!(MediaType::Document.default_extension(), "bin");
    }
}
