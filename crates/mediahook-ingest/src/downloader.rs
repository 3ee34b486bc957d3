// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-item download: claim, resolve, stream, rename, record.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use mediahook_config::model::{DownloadConfig, WorkspaceConfig};
use mediahook_core::{FileSource, MediaHookError, MediaItem, MediaStatus, RemoteFile};
use mediahook_storage::{PARTIAL_PREFIX, QueueStore};

use crate::naming::{extension_for, media_file_name, with_collision_suffix};

/// Collision suffixes tried before giving up on a file name.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Downloads queued items into the upload directory.
///
/// The downloader never retries on its own: every call makes exactly one
/// attempt and records its outcome on the item.
#[derive(Clone)]
pub struct Downloader {
    store: QueueStore,
    source: Arc<dyn FileSource>,
    workspace_root: PathBuf,
    upload_dir: PathBuf,
    upload_rel: PathBuf,
    max_bytes: u64,
    timeout: Duration,
}

impl Downloader {
    pub fn new(
        store: QueueStore,
        source: Arc<dyn FileSource>,
        workspace: &WorkspaceConfig,
        download: &DownloadConfig,
    ) -> Self {
        Self {
            store,
            source,
            workspace_root: workspace.root.clone(),
            upload_dir: workspace.upload_path(),
            upload_rel: PathBuf::from(&workspace.upload_dir),
            max_bytes: download.max_file_size_bytes(),
            timeout: download.timeout(),
        }
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    /// Claims and downloads one specific item.
    ///
    /// Returns the item as recorded after the attempt, `completed` or
    /// `failed`. `NotFound` and `InvalidState` come from the claim.
    pub async fn download(&self, id: &str) -> Result<MediaItem, MediaHookError> {
        let id = id.to_string();
        let claimed = self
            .store
            .mutate(move |doc| {
                let item = doc.item_mut(&id)?;
                item.begin_attempt(Utc::now())?;
                Ok(item.clone())
            })
            .await?;
        self.download_claimed(claimed).await
    }

    /// Atomically claims the oldest `pending` item, if any.
    pub async fn claim_next(&self) -> Result<Option<MediaItem>, MediaHookError> {
        self.store
            .mutate(|doc| {
                let Some(item) = doc.with_status_mut(MediaStatus::Pending).next() else {
                    return Ok(None);
                };
                item.begin_attempt(Utc::now())?;
                Ok(Some(item.clone()))
            })
            .await
    }

    /// Runs one attempt for an item already in `downloading`.
    pub async fn download_claimed(&self, item: MediaItem) -> Result<MediaItem, MediaHookError> {
        debug!(item_id = %item.id, attempt = item.attempts, "download attempt started");

        let outcome = match tokio::time::timeout(self.timeout, self.transfer(&item)).await {
            Ok(result) => result,
            Err(_) => Err(MediaHookError::Timeout {
                duration: self.timeout,
            }),
        };

        match outcome {
            Ok(local_path) => self.record_success(item, local_path).await,
            Err(err) => self.record_failure(item, err).await,
        }
    }

    async fn record_success(
        &self,
        item: MediaItem,
        local_path: String,
    ) -> Result<MediaItem, MediaHookError> {
        let id = item.id.clone();
        let rel = local_path.clone();
        let recorded = self
            .store
            .mutate(move |doc| {
                let item = doc.item_mut(&id)?;
                item.complete(rel, Utc::now())?;
                Ok(item.clone())
            })
            .await;

        match recorded {
            Ok(item) => {
                metrics::counter!("mediahook_downloads_total", "outcome" => "completed")
                    .increment(1);
                info!(item_id = %item.id, path = %local_path, "media saved");
                Ok(item)
            }
            Err(err) => {
                // The file is unreferenced if the item could not be updated.
                let orphan = self.workspace_root.join(&local_path);
                if let Err(e) = tokio::fs::remove_file(&orphan).await {
                    warn!(path = %orphan.display(), error = %e, "could not remove unrecorded download");
                }
                Err(err)
            }
        }
    }

    async fn record_failure(
        &self,
        item: MediaItem,
        err: MediaHookError,
    ) -> Result<MediaItem, MediaHookError> {
        let kind = err.failure_kind();
        let message = err.to_string();
        let id = item.id.clone();
        let recorded = self
            .store
            .mutate(move |doc| {
                let item = doc.item_mut(&id)?;
                item.fail(kind, message, Utc::now())?;
                Ok(item.clone())
            })
            .await?;

        metrics::counter!("mediahook_downloads_total", "outcome" => kind.to_string())
            .increment(1);
        warn!(
            item_id = %recorded.id,
            attempts = recorded.attempts,
            failure = %kind,
            error = %err,
            "download failed"
        );
        Ok(recorded)
    }

    /// Resolve, size-check, stream to a partial file, verify, and rename.
    /// Returns the workspace-relative path of the saved file.
    async fn transfer(&self, item: &MediaItem) -> Result<String, MediaHookError> {
        let remote = self.source.resolve(&item.file_ref).await?;
        self.check_size(remote.size.or(item.reported_size))?;

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(MediaHookError::storage)?;
        let partial = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .suffix(".part")
            .tempfile_in(&self.upload_dir)
            .map_err(MediaHookError::storage)?;
        let (file, partial_path) = partial.into_parts();

        let written = self
            .stream_into(&remote, tokio::fs::File::from_std(file))
            .await?;
        if let Some(expected) = remote.size
            && expected != written
        {
            return Err(MediaHookError::TransferFailed {
                message: format!("expected {expected} bytes, received {written}"),
                source: None,
            });
        }

        let ext = extension_for(
            item.file_name.as_deref(),
            item.mime_type.as_deref(),
            item.media_type,
        );
        let name = media_file_name(Utc::now(), &item.file_unique_ref, &ext);
        // No await between here and the return: a timeout cannot strand the rename.
        let saved = persist_noclobber(partial_path, &self.upload_dir, &name)?;

        Ok(self.upload_rel.join(saved).to_string_lossy().into_owned())
    }

    fn check_size(&self, size: Option<u64>) -> Result<(), MediaHookError> {
        match size {
            Some(size) if size > self.max_bytes => Err(MediaHookError::SizeExceeded {
                size,
                limit: self.max_bytes,
            }),
            _ => Ok(()),
        }
    }

    async fn stream_into(
        &self,
        remote: &RemoteFile,
        mut file: tokio::fs::File,
    ) -> Result<u64, MediaHookError> {
        let mut stream = self.source.open(remote).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            self.check_size(Some(written))?;
            file.write_all(&chunk).await.map_err(transfer_io)?;
        }
        file.flush().await.map_err(transfer_io)?;
        file.sync_all().await.map_err(transfer_io)?;
        Ok(written)
    }
}

fn transfer_io(e: io::Error) -> MediaHookError {
    MediaHookError::TransferFailed {
        message: format!("writing download failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Renames the partial file to `name` in `dir`, adding `_{n}` on collision.
/// Returns the final file name.
fn persist_noclobber(
    mut partial: TempPath,
    dir: &Path,
    name: &str,
) -> Result<String, MediaHookError> {
    for n in 0..MAX_NAME_ATTEMPTS {
        let candidate = if n == 0 {
            name.to_string()
        } else {
            with_collision_suffix(name, n)
        };
        match partial.persist_noclobber(dir.join(&candidate)) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => partial = e.path,
            Err(e) => return Err(MediaHookError::storage(e.error)),
        }
    }
    Err(MediaHookError::Internal(format!(
        "no free file name for {name} after {MAX_NAME_ATTEMPTS} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noclobber_appends_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"old").unwrap();
        std::fs::write(dir.path().join("a_1.jpg"), b"old").unwrap();

        let partial = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
        std::fs::write(partial.path(), b"new").unwrap();
        let name = persist_noclobber(partial.into_temp_path(), dir.path(), "a.jpg").unwrap();

        assert_eq!(name, "a_2.jpg");
        assert_eq!(std::fs::read(dir.path().join("a.jpg")).unwrap(), b"old");
        assert_eq!(std::fs::read(dir.path().join("a_2.jpg")).unwrap(), b"new");
    }
}
