// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One dispatcher for both entry points.
//!
//! Push mode (`ingest`) records the update's media and returns at once,
//! leaving the transfer to the background worker. Pull mode (`poll_once`)
//! fetches updates past the cursor, records items and the new cursor in one
//! mutation, then downloads the new items inline, followed by any `pending`
//! items left over from earlier runs.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use mediahook_core::{
    FailureKind, MediaHookError, MediaItem, MediaRef, MediaStatus, MediaType, UpdateSource,
};
use mediahook_storage::{EnqueueOutcome, QueueStore, enqueue_if_new};

use crate::downloader::Downloader;
use crate::update::parse_update;

/// Push-path result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub update_id: i64,
    pub enqueued: Vec<String>,
    pub duplicates: Vec<String>,
}

/// A media item saved during a poll.
#[derive(Debug, Clone, Serialize)]
pub struct FetchedItem {
    pub id: String,
    /// Absolute path of the saved file.
    pub path: PathBuf,
    /// Path relative to the workspace root, as stored on the item.
    pub workspace_path: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub caption: Option<String>,
}

/// A media item whose download attempt failed during a poll.
#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub id: String,
    pub error: String,
    pub failure: Option<FailureKind>,
}

/// An update that could not be parsed. Its id, if readable, still moves the cursor.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedUpdate {
    pub update_id: Option<i64>,
    pub reason: String,
}

/// Pull-path result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PollReport {
    pub fetched: Vec<FetchedItem>,
    pub failed: Vec<FailedItem>,
    pub duplicates: Vec<String>,
    /// New items a concurrently running worker claimed first.
    pub claimed_elsewhere: Vec<String>,
    pub rejected: Vec<RejectedUpdate>,
    pub cursor: Option<i64>,
}

/// Routes parsed updates into the queue.
#[derive(Clone)]
pub struct Dispatcher {
    store: QueueStore,
    downloader: Downloader,
    updates: Option<Arc<dyn UpdateSource>>,
    workspace_root: PathBuf,
    wake: Arc<Notify>,
}

impl Dispatcher {
    pub fn new(store: QueueStore, downloader: Downloader, workspace_root: PathBuf) -> Self {
        Self {
            store,
            downloader,
            updates: None,
            workspace_root,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Enables pull mode.
    pub fn with_update_source(mut self, updates: Arc<dyn UpdateSource>) -> Self {
        self.updates = Some(updates);
        self
    }

    /// Signal shared with the background worker; notified after every push
    /// that enqueued something.
    pub fn wake_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    /// Push path: parse, enqueue every media reference in one mutation, wake the worker.
    pub async fn ingest(&self, raw: &serde_json::Value) -> Result<IngestReport, MediaHookError> {
        let parsed = parse_update(raw)?;
        let update_id = parsed.update_id;
        if parsed.media.is_empty() {
            debug!(update_id, "update carries no media");
            return Ok(IngestReport {
                update_id,
                ..Default::default()
            });
        }

        let outcomes = self.enqueue_all(parsed.media, None).await?;
        let mut report = IngestReport {
            update_id,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                EnqueueOutcome::Enqueued(item) => report.enqueued.push(item.id),
                EnqueueOutcome::DuplicateIgnored(item) => report.duplicates.push(item.id),
            }
        }

        if !report.enqueued.is_empty() {
            self.wake.notify_one();
        }
        info!(
            update_id,
            enqueued = report.enqueued.len(),
            duplicates = report.duplicates.len(),
            "update ingested"
        );
        Ok(report)
    }

    /// Pull path: one poll-and-download cycle.
    pub async fn poll_once(&self) -> Result<PollReport, MediaHookError> {
        let updates = self.updates.as_ref().ok_or_else(|| {
            MediaHookError::Config("pull mode needs an update source".to_string())
        })?;

        let cursor = self.store.load().await?.last_update_offset;
        let raw_updates = updates.fetch_updates(cursor.map(|c| c + 1)).await?;
        debug!(?cursor, received = raw_updates.len(), "updates fetched");

        let mut report = PollReport::default();
        let mut media = Vec::new();
        let mut highest: Option<i64> = None;

        for raw in &raw_updates {
            let raw_id = raw.get("update_id").and_then(serde_json::Value::as_i64);
            match parse_update(raw) {
                Ok(parsed) => {
                    highest = highest.max(Some(parsed.update_id));
                    media.extend(parsed.media);
                }
                Err(err) => {
                    highest = highest.max(raw_id);
                    metrics::counter!("mediahook_updates_rejected_total").increment(1);
                    warn!(update_id = ?raw_id, error = %err, "skipping malformed update");
                    report.rejected.push(RejectedUpdate {
                        update_id: raw_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let outcomes = self.enqueue_all(media, highest).await?;

        let mut new_ids = Vec::new();
        for outcome in outcomes {
            match outcome {
                EnqueueOutcome::Enqueued(item) => new_ids.push(item.id),
                EnqueueOutcome::DuplicateIgnored(item) => report.duplicates.push(item.id),
            }
        }

        for id in new_ids {
            match self.downloader.download(&id).await {
                Ok(item) => self.record(&mut report, item),
                // A concurrent worker claimed it between enqueue and download.
                Err(MediaHookError::InvalidState { .. }) => {
                    debug!(item_id = %id, "item claimed by another worker");
                    report.claimed_elsewhere.push(id);
                }
                // The store failed for this item; siblings still run.
                Err(err) => report.failed.push(FailedItem {
                    id,
                    error: err.to_string(),
                    failure: None,
                }),
            }
        }

        // Items an earlier run recorded but never downloaded, e.g. a fetch
        // that died after committing the cursor.
        loop {
            let claimed = match self.downloader.claim_next().await {
                Ok(Some(claimed)) => claimed,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "could not claim leftover pending items");
                    break;
                }
            };
            let id = claimed.id.clone();
            debug!(item_id = %id, "downloading leftover pending item");
            match self.downloader.download_claimed(claimed).await {
                Ok(item) => self.record(&mut report, item),
                Err(err) => report.failed.push(FailedItem {
                    id,
                    error: err.to_string(),
                    failure: None,
                }),
            }
        }

        report.cursor = self.store.load().await?.last_update_offset;
        info!(
            fetched = report.fetched.len(),
            failed = report.failed.len(),
            claimed_elsewhere = report.claimed_elsewhere.len(),
            duplicates = report.duplicates.len(),
            rejected = report.rejected.len(),
            cursor = ?report.cursor,
            "poll finished"
        );
        Ok(report)
    }

    fn record(&self, report: &mut PollReport, item: MediaItem) {
        if item.status == MediaStatus::Completed {
            let workspace_path = item.local_path.clone().unwrap_or_default();
            report.fetched.push(FetchedItem {
                path: self.workspace_root.join(&workspace_path),
                workspace_path,
                id: item.id,
                media_type: item.media_type,
                caption: item.caption,
            });
        } else {
            report.failed.push(FailedItem {
                id: item.id,
                error: item.last_error.unwrap_or_default(),
                failure: item.failure,
            });
        }
    }

    /// Enqueues all references and, when given, advances the cursor, in one mutation.
    async fn enqueue_all(
        &self,
        media: Vec<MediaRef>,
        cursor: Option<i64>,
    ) -> Result<Vec<EnqueueOutcome>, MediaHookError> {
        self.store
            .mutate(move |doc| {
                let outcomes: Vec<EnqueueOutcome> = media
                    .into_iter()
                    .map(|candidate| enqueue_if_new(doc, candidate))
                    .collect();
                if let Some(update_id) = cursor {
                    doc.advance_cursor(update_id);
                }
                Ok(outcomes)
            })
            .await
    }
}
