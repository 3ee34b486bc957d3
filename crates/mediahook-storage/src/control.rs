// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator-facing queries and explicit state changes.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use mediahook_config::model::DownloadConfig;
use mediahook_core::{MediaHookError, MediaItem, MediaStatus};

use crate::store::QueueStore;

/// Read-only view of the queue.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub counts: BTreeMap<MediaStatus, usize>,
    /// Failed items at or over the attempt ceiling.
    pub exhausted: usize,
    pub cursor: Option<i64>,
    pub corrupt_events: u64,
    pub items: Vec<MediaItem>,
}

/// Status, retry, and consume operations over a [`QueueStore`].
#[derive(Clone)]
pub struct QueueControl {
    store: QueueStore,
    max_attempts: u32,
    reset_attempts_on_retry: bool,
}

impl QueueControl {
    pub fn new(store: QueueStore, download: &DownloadConfig) -> Self {
        Self {
            store,
            max_attempts: download.max_attempts,
            reset_attempts_on_retry: download.reset_attempts_on_retry,
        }
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    /// Counts, cursor, and every item. Never writes.
    pub async fn status(&self) -> Result<StatusSnapshot, MediaHookError> {
        let doc = self.store.load().await?;
        let exhausted = doc
            .items()
            .iter()
            .filter(|item| item.is_exhausted(self.max_attempts))
            .count();
        Ok(StatusSnapshot {
            counts: doc.counts(),
            exhausted,
            cursor: doc.last_update_offset,
            corrupt_events: self.store.corrupt_events(),
            items: doc.items().to_vec(),
        })
    }

    /// `failed -> pending` for one item, regardless of its attempt count.
    pub async fn retry(&self, id: &str) -> Result<MediaItem, MediaHookError> {
        let id = id.to_string();
        let reset = self.reset_attempts_on_retry;
        let item = self
            .store
            .mutate(move |doc| {
                let item = doc.item_mut(&id)?;
                item.retry(reset, Utc::now())?;
                Ok(item.clone())
            })
            .await?;
        info!(item_id = %item.id, attempts = item.attempts, "item queued for retry");
        Ok(item)
    }

    /// Retries every failed item still under the attempt ceiling.
    pub async fn retry_failed(&self) -> Result<Vec<String>, MediaHookError> {
        let max = self.max_attempts;
        let reset = self.reset_attempts_on_retry;
        let ids = self
            .store
            .mutate(move |doc| {
                let now = Utc::now();
                let mut ids = Vec::new();
                for item in doc.with_status_mut(MediaStatus::Failed) {
                    if item.attempts < max {
                        item.retry(reset, now)?;
                        ids.push(item.id.clone());
                    }
                }
                Ok(ids)
            })
            .await?;
        if !ids.is_empty() {
            info!(count = ids.len(), "failed items queued for retry");
        }
        Ok(ids)
    }

    /// `completed -> consumed`.
    pub async fn consume(&self, id: &str) -> Result<MediaItem, MediaHookError> {
        let id = id.to_string();
        let item = self
            .store
            .mutate(move |doc| {
                let item = doc.item_mut(&id)?;
                item.consume(Utc::now())?;
                Ok(item.clone())
            })
            .await?;
        info!(item_id = %item.id, "item marked consumed");
        Ok(item)
    }

    /// Completed items awaiting the downstream consumer, oldest first.
    pub async fn list_pending_for_consumption(&self) -> Result<Vec<MediaItem>, MediaHookError> {
        let doc = self.store.load().await?;
        Ok(doc.with_status(MediaStatus::Completed).cloned().collect())
    }
}
