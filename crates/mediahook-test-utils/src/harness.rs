// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline testing.
//!
//! `TestHarness` builds a temp workspace with a real queue store, downloader,
//! and dispatcher, wired to the mock file and update sources.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mediahook_config::model::{DownloadConfig, MediaHookConfig, WorkspaceConfig};
use mediahook_core::{FileSource, MediaHookError, MediaItem, Notifier, UpdateSource};
use mediahook_ingest::{Dispatcher, DownloadWorker, Downloader};
use mediahook_storage::{QueueControl, QueueStore};

use crate::mock_notifier::MockNotifier;
use crate::mock_source::{MockFileSource, MockUpdateSource};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    max_file_size_mb: u64,
    timeout_secs: u64,
    max_attempts: u32,
    reset_attempts_on_retry: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            max_file_size_mb: 20,
            timeout_secs: 30,
            max_attempts: 3,
            reset_attempts_on_retry: false,
        }
    }

    /// Size ceiling in MiB.
    pub fn with_max_file_size_mb(mut self, mb: u64) -> Self {
        self.max_file_size_mb = mb;
        self
    }

    /// Per-attempt download deadline.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_reset_attempts_on_retry(mut self, reset: bool) -> Self {
        self.reset_attempts_on_retry = reset;
        self
    }

    /// Build the harness. The queue document lives outside the upload
    /// directory so tests can assert on exactly what was downloaded.
    pub fn build(self) -> Result<TestHarness, MediaHookError> {
        let temp_dir = tempfile::TempDir::new().map_err(MediaHookError::storage)?;

        let config = MediaHookConfig {
            workspace: WorkspaceConfig {
                root: temp_dir.path().to_path_buf(),
                upload_dir: "uploads".to_string(),
                queue_file: "state/media_queue.json".to_string(),
            },
            download: DownloadConfig {
                max_file_size_mb: self.max_file_size_mb,
                timeout_secs: self.timeout_secs,
                max_attempts: self.max_attempts,
                reset_attempts_on_retry: self.reset_attempts_on_retry,
            },
            ..MediaHookConfig::default()
        };

        let store = QueueStore::open(config.workspace.queue_path())?;
        let files = Arc::new(MockFileSource::new());
        let updates = Arc::new(MockUpdateSource::new());
        let notifier = Arc::new(MockNotifier::new());

        let downloader = Downloader::new(
            store.clone(),
            Arc::clone(&files) as Arc<dyn FileSource>,
            &config.workspace,
            &config.download,
        );
        let dispatcher = Dispatcher::new(
            store.clone(),
            downloader.clone(),
            config.workspace.root.clone(),
        )
        .with_update_source(Arc::clone(&updates) as Arc<dyn UpdateSource>);
        let control = QueueControl::new(store.clone(), &config.download);

        Ok(TestHarness {
            files,
            updates,
            notifier,
            store,
            control,
            downloader,
            dispatcher,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete pipeline over a temp workspace.
pub struct TestHarness {
    /// Mock platform file endpoint.
    pub files: Arc<MockFileSource>,
    /// Mock platform update endpoint.
    pub updates: Arc<MockUpdateSource>,
    /// Captures completion notifications from workers built by `worker()`.
    pub notifier: Arc<MockNotifier>,
    pub store: QueueStore,
    pub control: QueueControl,
    pub downloader: Downloader,
    pub dispatcher: Dispatcher,
    pub config: MediaHookConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub fn new() -> Result<Self, MediaHookError> {
        Self::builder().build()
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.config.workspace.root.clone()
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.config.workspace.upload_path()
    }

    /// Names of every entry in the upload directory, sorted. Empty if the
    /// directory does not exist yet.
    pub fn upload_entries(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.upload_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// A background worker sharing the dispatcher's wake signal and
    /// reporting to the mock notifier.
    pub fn worker(&self, idle: Duration) -> DownloadWorker {
        DownloadWorker::new(
            self.downloader.clone(),
            self.dispatcher.wake_handle(),
            idle,
            self.workspace_root(),
        )
        .with_notifier(Arc::clone(&self.notifier) as Arc<dyn Notifier>)
    }

    /// Current state of one item.
    pub async fn item(&self, id: &str) -> Result<Option<MediaItem>, MediaHookError> {
        Ok(self.store.load().await?.get(id).cloned())
    }
}
