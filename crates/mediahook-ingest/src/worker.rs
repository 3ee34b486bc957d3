// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background download worker for push mode.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use mediahook_core::{MediaHookError, MediaItem, MediaStatus, Notifier};

use crate::downloader::Downloader;

/// Drains `pending` items one at a time until cancelled.
///
/// Sleeps when the queue is empty until either the dispatcher's wake signal
/// fires or the idle interval passes.
pub struct DownloadWorker {
    downloader: Downloader,
    notifier: Option<Arc<dyn Notifier>>,
    wake: Arc<Notify>,
    idle: Duration,
    workspace_root: PathBuf,
}

impl DownloadWorker {
    pub fn new(
        downloader: Downloader,
        wake: Arc<Notify>,
        idle: Duration,
        workspace_root: PathBuf,
    ) -> Self {
        Self {
            downloader,
            notifier: None,
            wake,
            idle,
            workspace_root,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Runs until `cancel` fires. An in-flight download is abandoned on
    /// cancellation; startup recovery fails it on the next run.
    pub async fn run(self, cancel: CancellationToken) {
        info!(idle_secs = self.idle.as_secs(), "download worker started");
        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                step = self.run_once() => step,
            };

            match step {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => error!(error = %e, "download worker step failed"),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.wake.notified() => debug!("download worker woken"),
                _ = tokio::time::sleep(self.idle) => {}
            }
        }
        info!("download worker stopped");
    }

    /// Claims and downloads the next pending item. `None` when the queue is idle.
    pub async fn run_once(&self) -> Result<Option<MediaItem>, MediaHookError> {
        let Some(claimed) = self.downloader.claim_next().await? else {
            return Ok(None);
        };
        let item = self.downloader.download_claimed(claimed).await?;

        if item.status == MediaStatus::Completed
            && let Some(notifier) = &self.notifier
            && let Some(path) = item.absolute_path(&self.workspace_root)
            && let Err(e) = notifier.media_saved(&item, &path).await
        {
            warn!(item_id = %item.id, error = %e, "completion notification failed");
        }

        Ok(Some(item))
    }
}
