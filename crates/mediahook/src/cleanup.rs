// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mediahook cleanup`: housekeeping of consumed items.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use mediahook_core::{MediaHookError, MediaStatus};
use mediahook_storage::{QueueStore, remove_partial_files};

use crate::app::App;

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct CleanupReport {
    pub items_removed: usize,
    pub files_removed: usize,
    pub partials_removed: usize,
}

pub async fn run_cleanup(app: &App, max_age_days: u32) -> Result<(), MediaHookError> {
    let report = cleanup(
        &app.store,
        &app.config.workspace.root,
        &app.config.workspace.upload_path(),
        max_age_days,
        Utc::now(),
    )
    .await?;
    println!(
        "removed {} consumed item(s), {} file(s), {} partial download(s)",
        report.items_removed, report.files_removed, report.partials_removed
    );
    Ok(())
}

/// Drops consumed items last touched more than `max_age_days` before `now`,
/// deletes their files, and removes leftover partial downloads.
///
/// Items leave the queue before their files are deleted, so a crash in
/// between leaves stray files rather than entries pointing at nothing.
pub async fn cleanup(
    store: &QueueStore,
    workspace_root: &Path,
    upload_dir: &Path,
    max_age_days: u32,
    now: DateTime<Utc>,
) -> Result<CleanupReport, MediaHookError> {
    let cutoff = now - Duration::days(i64::from(max_age_days));
    let removed = store
        .mutate(move |doc| {
            Ok(doc.remove_where(|item| {
                item.status == MediaStatus::Consumed && item.updated_at < cutoff
            }))
        })
        .await?;

    let mut report = CleanupReport {
        items_removed: removed.len(),
        ..Default::default()
    };

    let files: Vec<PathBuf> = removed
        .iter()
        .filter_map(|item| item.absolute_path(workspace_root))
        .collect();
    for file in files {
        match tokio::fs::remove_file(&file).await {
            Ok(()) => report.files_removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %file.display(), error = %e, "could not remove consumed file"),
        }
    }

    // Partial files belong to a live download while another process owns the
    // worker lock.
    report.partials_removed = match store.try_worker_lock()? {
        Some(_lock) => {
            let dir = upload_dir.to_path_buf();
            tokio::task::spawn_blocking(move || remove_partial_files(&dir))
                .await
                .map_err(|e| MediaHookError::Internal(format!("cleanup task failed: {e}")))?
                .map_err(MediaHookError::storage)?
        }
        None => {
            debug!("another process owns downloads; leaving partial files");
            0
        }
    };

    info!(
        items = report.items_removed,
        files = report.files_removed,
        partials = report.partials_removed,
        max_age_days,
        "cleanup finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediahook_core::{MediaItem, MediaRef, MediaType};

    fn media(unique: &str) -> MediaRef {
        MediaRef {
            chat_id: 1,
            message_id: 1,
            update_id: None,
            file_ref: format!("file-{unique}"),
            file_unique_ref: unique.to_string(),
            media_type: MediaType::Photo,
            caption: None,
            file_name: None,
            mime_type: None,
            reported_size: None,
        }
    }

    /// Inserts an item driven to `status`, last updated at `at`.
    async fn seed(
        store: &QueueStore,
        root: &Path,
        id: &str,
        status: MediaStatus,
        at: DateTime<Utc>,
    ) -> Option<PathBuf> {
        let rel = format!("uploads/{id}.jpg");
        let with_file = matches!(status, MediaStatus::Completed | MediaStatus::Consumed);
        if with_file {
            std::fs::create_dir_all(root.join("uploads")).unwrap();
            std::fs::write(root.join(&rel), b"jpeg").unwrap();
        }
        let id = id.to_string();
        let rel_for_item = rel.clone();
        store
            .mutate(move |doc| {
                let mut item = MediaItem::new(id.clone(), media(&id), at);
                if status != MediaStatus::Pending {
                    item.begin_attempt(at)?;
                }
                if with_file {
                    item.complete(rel_for_item, at)?;
                }
                if status == MediaStatus::Consumed {
                    item.consume(at)?;
                }
                doc.insert(item);
                Ok(())
            })
            .await
            .unwrap();
        with_file.then(|| root.join(rel))
    }

    #[tokio::test]
    async fn removes_only_old_consumed_items() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let store = QueueStore::open(root.join("uploads/media_queue.json")).unwrap();
        let now = Utc::now();
        let old = now - Duration::days(40);

        let old_consumed = seed(&store, root, "old", MediaStatus::Consumed, old).await.unwrap();
        let new_consumed = seed(&store, root, "new", MediaStatus::Consumed, now).await.unwrap();
        let old_completed = seed(&store, root, "done", MediaStatus::Completed, old).await.unwrap();
        std::fs::write(root.join("uploads/.partial-x.part"), b"half").unwrap();

        let report = cleanup(&store, root, &root.join("uploads"), 30, now).await.unwrap();

        assert_eq!(
            report,
            CleanupReport {
                items_removed: 1,
                files_removed: 1,
                partials_removed: 1,
            }
        );
        assert!(!old_consumed.exists());
        assert!(new_consumed.exists());
        assert!(old_completed.exists());

        let doc = store.load().await.unwrap();
        assert!(!doc.contains("old"));
        assert!(doc.contains("new"));
        assert!(doc.contains("done"));
    }

    #[tokio::test]
    async fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let store = QueueStore::open(root.join("state/queue.json")).unwrap();
        let old = Utc::now() - Duration::days(90);
        let file = seed(&store, root, "gone", MediaStatus::Consumed, old).await.unwrap();
        std::fs::remove_file(file).unwrap();

        let report = cleanup(&store, root, &root.join("uploads"), 30, Utc::now())
            .await
            .unwrap();
        assert_eq!(report.items_removed, 1);
        assert_eq!(report.files_removed, 0);
    }

    #[tokio::test]
    async fn partials_survive_while_another_process_owns_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let store = QueueStore::open(root.join("uploads/media_queue.json")).unwrap();
        let partial = root.join("uploads/.partial-live.part");
        std::fs::write(&partial, b"half").unwrap();

        let owner = QueueStore::open(store.path()).unwrap();
        let _held = owner.try_worker_lock().unwrap().unwrap();

        let report = cleanup(&store, root, &root.join("uploads"), 30, Utc::now())
            .await
            .unwrap();
        assert_eq!(report.partials_removed, 0);
        assert!(partial.exists());
    }
}
