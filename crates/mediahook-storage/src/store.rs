// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue document on disk.
//!
//! All reads and writes are serialized: first through a `tokio` mutex for
//! callers in this process, then through an exclusive lock on
//! `{queue_file}.lock` for other processes (a CLI `fetch` next to a running
//! `serve`). The blocking file work runs on the blocking pool.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use mediahook_core::{
    FailureKind, HealthStatus, MediaHookError, MediaStatus, PluginAdapter, QueueDocument,
};

/// File-name prefix of in-flight downloads inside the upload directory.
pub const PARTIAL_PREFIX: &str = ".partial-";

/// Handle to the persisted queue document. Cheap to clone.
#[derive(Clone)]
pub struct QueueStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    lock_path: PathBuf,
    gate: Mutex<()>,
    corrupt_events: AtomicU64,
}

/// What startup recovery changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Items moved from `downloading` to `failed`.
    pub interrupted: Vec<String>,
    /// Partial download files deleted from the upload directory.
    pub partials_removed: usize,
}

/// Ownership of the download pipeline for one workspace, across processes.
///
/// `serve` holds it for its lifetime; `fetch` holds it for one cycle. The OS
/// lock is released when this is dropped or the process dies.
#[derive(Debug)]
pub struct WorkerLock {
    _file: fs::File,
}

impl QueueStore {
    /// Opens the store at `path`, creating the parent directory if needed.
    ///
    /// Nothing is read until the first [`load`](Self::load) or
    /// [`mutate`](Self::mutate); a missing file is an empty queue.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, MediaHookError> {
        let path = path.into();
        if let Some(parent) = non_empty_parent(&path) {
            fs::create_dir_all(parent).map_err(MediaHookError::storage)?;
        }
        let lock_path = with_suffix(&path, ".lock");
        debug!(path = %path.display(), "queue store opened");
        Ok(Self {
            inner: Arc::new(Inner {
                path,
                lock_path,
                gate: Mutex::new(()),
                corrupt_events: AtomicU64::new(0),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Corrupt documents quarantined since this store was opened.
    pub fn corrupt_events(&self) -> u64 {
        self.inner.corrupt_events.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of the current document.
    pub async fn load(&self) -> Result<QueueDocument, MediaHookError> {
        self.run(false, |doc| Ok(std::mem::take(doc))).await
    }

    /// Runs one exclusive read-modify-write cycle.
    ///
    /// The document is written back only when `f` returns `Ok` and actually
    /// changed it. An `Err` from `f` leaves the file untouched.
    pub async fn mutate<T, F>(&self, f: F) -> Result<T, MediaHookError>
    where
        F: FnOnce(&mut QueueDocument) -> Result<T, MediaHookError> + Send + 'static,
        T: Send + 'static,
    {
        self.run(true, f).await
    }

    async fn run<T, F>(&self, persist: bool, f: F) -> Result<T, MediaHookError>
    where
        F: FnOnce(&mut QueueDocument) -> Result<T, MediaHookError> + Send + 'static,
        T: Send + 'static,
    {
        let _gate = self.inner.gate.lock().await;
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.locked_cycle(persist, f))
            .await
            .map_err(|e| MediaHookError::Internal(format!("queue store task failed: {e}")))?
    }

    /// Sibling file whose exclusive lock marks the process that owns downloads
    /// for this workspace.
    pub fn worker_lock_path(&self) -> PathBuf {
        with_suffix(&self.inner.path, ".worker.lock")
    }

    /// Takes the worker lock without waiting. `None` while another holder has it.
    pub fn try_worker_lock(&self) -> Result<Option<WorkerLock>, MediaHookError> {
        let file = open_lock_file(&self.worker_lock_path())?;
        match file.try_lock() {
            Ok(()) => Ok(Some(WorkerLock { _file: file })),
            Err(fs::TryLockError::WouldBlock) => Ok(None),
            Err(fs::TryLockError::Error(e)) => Err(MediaHookError::storage(e)),
        }
    }

    /// Waits until the worker lock is free and takes it.
    pub async fn worker_lock(&self) -> Result<WorkerLock, MediaHookError> {
        let path = self.worker_lock_path();
        tokio::task::spawn_blocking(move || {
            let file = open_lock_file(&path)?;
            file.lock().map_err(MediaHookError::storage)?;
            Ok(WorkerLock { _file: file })
        })
        .await
        .map_err(|e| MediaHookError::Internal(format!("worker lock task failed: {e}")))?
    }

    /// Startup recovery.
    ///
    /// Items left in `downloading` by a previous process are failed with kind
    /// `interrupted`, and leftover partial files in `upload_dir` are deleted.
    /// Callers must hold the [`WorkerLock`], or a live process's in-flight
    /// downloads would be failed too.
    pub async fn recover_interrupted(
        &self,
        upload_dir: &Path,
    ) -> Result<RecoveryReport, MediaHookError> {
        let now = Utc::now();
        let interrupted = self
            .mutate(move |doc| {
                let mut ids = Vec::new();
                for item in doc.with_status_mut(MediaStatus::Downloading) {
                    item.fail(
                        FailureKind::Interrupted,
                        "download was interrupted before it finished",
                        now,
                    )?;
                    ids.push(item.id.clone());
                }
                Ok(ids)
            })
            .await?;

        let dir = upload_dir.to_path_buf();
        let partials_removed = tokio::task::spawn_blocking(move || remove_partial_files(&dir))
            .await
            .map_err(|e| MediaHookError::Internal(format!("recovery task failed: {e}")))?
            .map_err(MediaHookError::storage)?;

        for id in &interrupted {
            warn!(item_id = %id, "marked interrupted download as failed");
        }
        if !interrupted.is_empty() || partials_removed > 0 {
            info!(
                interrupted = interrupted.len(),
                partials_removed, "startup recovery finished"
            );
        }

        Ok(RecoveryReport {
            interrupted,
            partials_removed,
        })
    }
}

impl Inner {
    fn locked_cycle<T>(
        &self,
        persist: bool,
        f: impl FnOnce(&mut QueueDocument) -> Result<T, MediaHookError>,
    ) -> Result<T, MediaHookError> {
        let lock = open_lock_file(&self.lock_path)?;
        lock.lock().map_err(MediaHookError::storage)?;

        let mut doc = self.read()?;
        let before = persist.then(|| doc.clone());
        let out = f(&mut doc)?;
        if let Some(before) = before
            && before != doc
        {
            self.write(&doc)?;
        }
        Ok(out)
        // `lock` drops here and releases the OS lock.
    }

    fn read(&self) -> Result<QueueDocument, MediaHookError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(QueueDocument::new()),
            Err(e) => return Err(MediaHookError::storage(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(QueueDocument::new());
        }
        match serde_json::from_slice::<QueueDocument>(&bytes) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                self.quarantine(MediaHookError::StoreCorrupt {
                    path: self.path.clone(),
                    detail: e.to_string(),
                })?;
                Ok(QueueDocument::new())
            }
        }
    }

    fn quarantine(&self, cause: MediaHookError) -> Result<(), MediaHookError> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        let target = with_suffix(&self.path, &format!(".corrupt-{stamp}"));
        fs::rename(&self.path, &target).map_err(MediaHookError::storage)?;
        self.corrupt_events.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("mediahook_store_corrupt_total").increment(1);
        error!(
            error = %cause,
            quarantined = %target.display(),
            "queue document quarantined, continuing with an empty queue"
        );
        Ok(())
    }

    fn write(&self, doc: &QueueDocument) -> Result<(), MediaHookError> {
        let dir = non_empty_parent(&self.path).unwrap_or(Path::new("."));
        let json = serde_json::to_vec_pretty(doc).map_err(MediaHookError::storage)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".queue-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(MediaHookError::storage)?;
        tmp.write_all(&json).map_err(MediaHookError::storage)?;
        tmp.write_all(b"\n").map_err(MediaHookError::storage)?;
        tmp.as_file().sync_all().map_err(MediaHookError::storage)?;
        tmp.persist(&self.path)
            .map_err(|e| MediaHookError::storage(e.error))?;

        sync_dir(dir);
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for QueueStore {
    fn name(&self) -> &str {
        "json-queue"
    }

    async fn health_check(&self) -> Result<HealthStatus, MediaHookError> {
        match self.load().await {
            Ok(_) if self.corrupt_events() > 0 => Ok(HealthStatus::Degraded(format!(
                "{} corrupt queue document(s) quarantined",
                self.corrupt_events()
            ))),
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

/// Deletes partial download files left in `dir`. A missing directory is empty.
pub fn remove_partial_files(dir: &Path) -> io::Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let is_partial = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(PARTIAL_PREFIX));
        if is_partial && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn open_lock_file(path: &Path) -> Result<fs::File, MediaHookError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(MediaHookError::storage)
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        debug!(dir = %dir.display(), error = %e, "directory fsync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use mediahook_core::{MediaItem, MediaRef, MediaType};
    use tempfile::tempdir;

    fn item(id: &str) -> MediaItem {
        MediaItem::new(
            id.to_string(),
            MediaRef {
                chat_id: 42,
                message_id: 7,
                update_id: None,
                file_ref: format!("ref-{id}"),
                file_unique_ref: format!("uniq-{id}"),
                media_type: MediaType::Photo,
                caption: None,
                file_name: None,
                mime_type: None,
                reported_size: None,
            },
            Utc::now(),
        )
    }

    fn setup() -> (QueueStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = QueueStore::open(dir.path().join("uploads/media_queue.json")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn missing_document_loads_empty() {
        let (store, _dir) = setup();
        let doc = store.load().await.unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.last_update_offset, None);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn mutation_is_visible_to_a_fresh_handle() {
        let (store, _dir) = setup();
        store
            .mutate(|doc| {
                doc.insert(item("a"));
                doc.advance_cursor(10);
                Ok(())
            })
            .await
            .unwrap();

        let reopened = QueueStore::open(store.path()).unwrap();
        let doc = reopened.load().await.unwrap();
        assert!(doc.contains("a"));
        assert_eq!(doc.last_update_offset, Some(10));
    }

    #[tokio::test]
    async fn failing_transformation_persists_nothing() {
        let (store, _dir) = setup();
        store
            .mutate(|doc| {
                doc.insert(item("kept"));
                Ok(())
            })
            .await
            .unwrap();

        let err = store
            .mutate(|doc| -> Result<(), MediaHookError> {
                doc.insert(item("lost"));
                doc.advance_cursor(103);
                Err(MediaHookError::Internal("boom".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MediaHookError::Internal(_)));

        let doc = store.load().await.unwrap();
        assert!(doc.contains("kept"));
        assert!(!doc.contains("lost"));
        assert_eq!(doc.last_update_offset, None);
    }

    #[tokio::test]
    async fn unchanged_document_is_not_written() {
        let (store, _dir) = setup();
        let n = store.mutate(|doc| Ok(doc.len())).await.unwrap();
        assert_eq!(n, 0);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn corrupt_document_is_quarantined() {
        let (store, dir) = setup();
        fs::write(store.path(), b"{\"version\": 1, \"items\": [").unwrap();

        let doc = store.load().await.unwrap();
        assert!(doc.is_empty());
        assert_eq!(store.corrupt_events(), 1);
        assert!(!store.path().exists());

        let quarantined: Vec<_> = fs::read_dir(dir.path().join("uploads"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("media_queue.json.corrupt-")
            })
            .collect();
        assert_eq!(quarantined.len(), 1);
        assert!(logs_contain("queue document quarantined"));

        let health = store.health_check().await.unwrap();
        assert!(matches!(health, HealthStatus::Degraded(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mutations_do_not_lose_updates() {
        let (store, _dir) = setup();
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .mutate(move |doc| {
                        doc.insert(item(&format!("item-{i}")));
                        Ok(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let doc = store.load().await.unwrap();
        assert_eq!(doc.len(), 16);
        assert_eq!(doc.known_ids().len(), 16);
    }

    #[tokio::test]
    async fn two_handles_on_one_file_serialize_through_the_lock_file() {
        let (a, _dir) = setup();
        let b = QueueStore::open(a.path()).unwrap();

        let (ra, rb) = tokio::join!(
            a.mutate(|doc| {
                doc.insert(item("from-a"));
                Ok(())
            }),
            b.mutate(|doc| {
                doc.insert(item("from-b"));
                Ok(())
            }),
        );
        ra.unwrap();
        rb.unwrap();

        let doc = a.load().await.unwrap();
        assert!(doc.contains("from-a"));
        assert!(doc.contains("from-b"));
    }

    #[tokio::test]
    async fn recovery_fails_downloading_items_and_removes_partials() {
        let (store, dir) = setup();
        store
            .mutate(|doc| {
                let mut stuck = item("stuck");
                stuck.begin_attempt(Utc::now())?;
                doc.insert(stuck);
                doc.insert(item("waiting"));
                Ok(())
            })
            .await
            .unwrap();

        let uploads = dir.path().join("uploads");
        fs::write(uploads.join(format!("{PARTIAL_PREFIX}abc.part")), b"half").unwrap();
        fs::write(uploads.join("20260101_000000_deadbeef.jpg"), b"done").unwrap();

        let report = store.recover_interrupted(&uploads).await.unwrap();
        assert_eq!(report.interrupted, vec!["stuck".to_string()]);
        assert_eq!(report.partials_removed, 1);
        assert!(uploads.join("20260101_000000_deadbeef.jpg").exists());

        let doc = store.load().await.unwrap();
        let stuck = doc.get("stuck").unwrap();
        assert_eq!(stuck.status, MediaStatus::Failed);
        assert_eq!(stuck.failure, Some(FailureKind::Interrupted));
        assert_eq!(stuck.attempts, 1);
        assert_eq!(doc.get("waiting").unwrap().status, MediaStatus::Pending);
    }

    #[test]
    fn worker_lock_is_exclusive_until_dropped() {
        let (store, _dir) = setup();
        let other = QueueStore::open(store.path()).unwrap();

        let held = store.try_worker_lock().unwrap().expect("lock should be free");
        assert!(other.try_worker_lock().unwrap().is_none());

        drop(held);
        assert!(other.try_worker_lock().unwrap().is_some());
    }

    #[test]
    fn partial_cleanup_tolerates_missing_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(remove_partial_files(&dir.path().join("nope")).unwrap(), 0);
    }
}
