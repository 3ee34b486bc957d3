// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion notifier.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use mediahook_core::{MediaHookError, MediaItem, Notifier};

/// Records every `media_saved` call. Can be switched to fail.
pub struct MockNotifier {
    saved: Arc<Mutex<Vec<(String, PathBuf)>>>,
    fail: AtomicBool,
    notify: Arc<Notify>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            saved: Arc::new(Mutex::new(Vec::new())),
            fail: AtomicBool::new(false),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Make every subsequent call return a platform error.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// `(item id, absolute path)` for every call, in order.
    pub async fn saved(&self) -> Vec<(String, PathBuf)> {
        self.saved.lock().await.clone()
    }

    /// Waits until at least `n` calls have been recorded.
    pub async fn wait_for(&self, n: usize) {
        loop {
            let notified = self.notify.notified();
            if self.saved.lock().await.len() >= n {
                return;
            }
            notified.await;
        }
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn media_saved(&self, item: &MediaItem, path: &Path) -> Result<(), MediaHookError> {
        self.saved
            .lock()
            .await
            .push((item.id.clone(), path.to_path_buf()));
        self.notify.notify_waiters();
        if self.fail.load(Ordering::SeqCst) {
            return Err(MediaHookError::Platform {
                message: "mock notifier failure".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}
