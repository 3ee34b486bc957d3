// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Component wiring shared by every subcommand.

use std::sync::Arc;

use tracing::{debug, warn};

use mediahook_config::MediaHookConfig;
use mediahook_core::{FileSource, MediaHookError, UpdateSource};
use mediahook_ingest::{Dispatcher, Downloader};
use mediahook_storage::{QueueControl, QueueStore, RecoveryReport, WorkerLock};
use mediahook_telegram::TelegramAdapter;

pub struct App {
    pub config: MediaHookConfig,
    pub store: QueueStore,
    pub control: QueueControl,
}

impl App {
    /// Opens the queue store. Does not touch the network.
    pub fn open(config: MediaHookConfig) -> Result<Self, MediaHookError> {
        let store = QueueStore::open(config.workspace.queue_path())?;
        let control = QueueControl::new(store.clone(), &config.download);
        Ok(Self {
            config,
            store,
            control,
        })
    }

    /// Fails items a dead process left in `downloading` and removes its
    /// partial files. Only safe while holding the worker lock.
    pub async fn recover(&self) -> Result<RecoveryReport, MediaHookError> {
        let report = self
            .store
            .recover_interrupted(&self.config.workspace.upload_path())
            .await?;
        if !report.interrupted.is_empty() || report.partials_removed > 0 {
            warn!(
                interrupted = report.interrupted.len(),
                partials_removed = report.partials_removed,
                "recovered from an unclean shutdown"
            );
        }
        Ok(report)
    }

    /// Takes the worker lock and recovers, or does nothing when another
    /// process owns downloads. Keep the returned lock while downloading.
    pub async fn recover_if_unowned(&self) -> Result<Option<WorkerLock>, MediaHookError> {
        let Some(lock) = self.store.try_worker_lock()? else {
            debug!("another process owns downloads; skipping recovery");
            return Ok(None);
        };
        self.recover().await?;
        Ok(Some(lock))
    }

    /// The Bot API adapter. Fails when no bot token is configured.
    pub fn telegram(&self) -> Result<Arc<TelegramAdapter>, MediaHookError> {
        Ok(Arc::new(TelegramAdapter::new(&self.config.telegram)?))
    }

    /// Downloader and dispatcher backed by Telegram in both directions.
    pub fn dispatcher(&self, telegram: Arc<TelegramAdapter>) -> Dispatcher {
        let downloader = Downloader::new(
            self.store.clone(),
            Arc::clone(&telegram) as Arc<dyn FileSource>,
            &self.config.workspace,
            &self.config.download,
        );
        Dispatcher::new(
            self.store.clone(),
            downloader,
            self.config.workspace.root.clone(),
        )
        .with_update_source(telegram as Arc<dyn UpdateSource>)
    }
}
