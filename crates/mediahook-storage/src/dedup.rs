// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media identity and idempotent enqueue.

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::debug;

use mediahook_core::{MediaItem, MediaRef, QueueDocument};

/// Result of offering a media reference to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new `pending` item was appended.
    Enqueued(MediaItem),
    /// The identity was already known; carries the existing item, unchanged.
    DuplicateIgnored(MediaItem),
}

impl EnqueueOutcome {
    pub fn item(&self) -> &MediaItem {
        match self {
            EnqueueOutcome::Enqueued(item) | EnqueueOutcome::DuplicateIgnored(item) => item,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, EnqueueOutcome::Enqueued(_))
    }
}

/// First 8 hex characters of the SHA-256 of `input`.
pub fn hash8(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..4])
}

/// Deterministic item id: `{chat_id}_{message_id}_{hash8(file_unique_ref)}`.
///
/// The platform's stable per-file id keeps the identity independent of the
/// transient download reference.
pub fn media_identity(chat_id: i64, message_id: i64, file_unique_ref: &str) -> String {
    format!("{chat_id}_{message_id}_{}", hash8(file_unique_ref))
}

/// Appends `candidate` as a new `pending` item unless its identity is known.
///
/// Meant to run inside [`QueueStore::mutate`](crate::QueueStore::mutate).
pub fn enqueue_if_new(doc: &mut QueueDocument, candidate: MediaRef) -> EnqueueOutcome {
    let id = media_identity(
        candidate.chat_id,
        candidate.message_id,
        &candidate.file_unique_ref,
    );
    if let Some(existing) = doc.get(&id) {
        debug!(item_id = %id, "duplicate media ignored");
        return EnqueueOutcome::DuplicateIgnored(existing.clone());
    }
    let item = MediaItem::new(id, candidate, Utc::now());
    doc.insert(item.clone());
    EnqueueOutcome::Enqueued(item)
}
