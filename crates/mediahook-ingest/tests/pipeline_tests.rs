// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline tests over a temp workspace and mock Bot API.

use std::time::Duration;

use mediahook_core::{FailureKind, MediaStatus};
use mediahook_storage::{PARTIAL_PREFIX, media_identity};
use mediahook_test_utils::fixtures::{
    document_update, file_ref_for, malformed_update, photo_update, text_update,
};
use mediahook_test_utils::{MockFile, TestHarness};
use tokio_util::sync::CancellationToken;

const PHOTO: &[u8] = b"\xff\xd8\xff\xe0 not really a jpeg";

async fn harness_with_photo(unique: &str) -> TestHarness {
    let h = TestHarness::new().unwrap();
    h.files
        .insert(&file_ref_for(unique), MockFile::new(PHOTO.to_vec()))
        .await;
    h
}

#[tokio::test]
async fn duplicate_webhook_delivery_enqueues_once() {
    let h = harness_with_photo("abc123").await;
    let update = photo_update(500, 42, 7, "abc123");
    let id = media_identity(42, 7, "abc123");

    let first = h.dispatcher.ingest(&update).await.unwrap();
    let second = h.dispatcher.ingest(&update).await.unwrap();

    assert_eq!(first.enqueued, vec![id.clone()]);
    assert!(second.enqueued.is_empty());
    assert_eq!(second.duplicates, vec![id.clone()]);

    let doc = h.store.load().await.unwrap();
    assert_eq!(doc.len(), 1);
    assert_eq!(doc.get(&id).unwrap().status, MediaStatus::Pending);
}

#[tokio::test]
async fn message_without_media_enqueues_nothing() {
    let h = TestHarness::new().unwrap();
    let report = h.dispatcher.ingest(&text_update(1, 42, 1)).await.unwrap();
    assert!(report.enqueued.is_empty());
    assert!(h.store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_push_is_rejected_without_state_change() {
    let h = TestHarness::new().unwrap();
    let err = h.dispatcher.ingest(&malformed_update(9)).await.unwrap_err();
    assert!(matches!(
        err,
        mediahook_core::MediaHookError::MalformedUpdate { .. }
    ));
    assert!(h.store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn worker_step_downloads_and_notifies() {
    let h = harness_with_photo("abc123").await;
    h.dispatcher
        .ingest(&photo_update(500, 42, 7, "abc123"))
        .await
        .unwrap();

    let item = h.worker(Duration::from_secs(60)).run_once().await.unwrap().unwrap();

    assert_eq!(item.status, MediaStatus::Completed);
    assert_eq!(item.attempts, 1);
    let local = item.local_path.clone().unwrap();
    assert!(local.starts_with("uploads/"), "{local}");
    assert!(local.ends_with(".jpg"), "{local}");

    let absolute = h.workspace_root().join(&local);
    assert_eq!(std::fs::read(&absolute).unwrap(), PHOTO);

    let saved = h.notifier.saved().await;
    assert_eq!(saved, vec![(item.id.clone(), absolute)]);
}

#[tokio::test]
async fn worker_step_is_idle_on_empty_queue() {
    let h = TestHarness::new().unwrap();
    assert!(h.worker(Duration::from_secs(60)).run_once().await.unwrap().is_none());
}

#[tokio::test]
async fn failed_download_can_be_retried() {
    let h = TestHarness::new().unwrap();
    let file_ref = file_ref_for("abc123");
    h.files
        .insert(&file_ref, MockFile::new(PHOTO.to_vec()).failing_after(0))
        .await;
    h.dispatcher
        .ingest(&photo_update(500, 42, 7, "abc123"))
        .await
        .unwrap();
    let id = media_identity(42, 7, "abc123");

    let failed = h.downloader.download(&id).await.unwrap();
    assert_eq!(failed.status, MediaStatus::Failed);
    assert_eq!(failed.failure, Some(FailureKind::TransferFailed));
    assert_eq!(failed.attempts, 1);
    assert!(h.upload_entries().is_empty());

    let retried = h.control.retry(&id).await.unwrap();
    assert_eq!(retried.status, MediaStatus::Pending);
    assert_eq!(retried.attempts, 1);

    h.files.insert(&file_ref, MockFile::new(PHOTO.to_vec())).await;
    let done = h.worker(Duration::from_secs(60)).run_once().await.unwrap().unwrap();
    assert_eq!(done.status, MediaStatus::Completed);
    assert_eq!(done.attempts, 2);
    assert!(done.last_error.is_none());
}

#[tokio::test]
async fn download_of_completed_item_is_refused() {
    let h = harness_with_photo("abc123").await;
    h.dispatcher
        .ingest(&photo_update(500, 42, 7, "abc123"))
        .await
        .unwrap();
    let id = media_identity(42, 7, "abc123");
    h.downloader.download(&id).await.unwrap();

    let err = h.downloader.download(&id).await.unwrap_err();
    assert!(matches!(
        err,
        mediahook_core::MediaHookError::InvalidState {
            actual: MediaStatus::Completed,
            ..
        }
    ));
}

#[tokio::test]
async fn pull_round_trip_advances_cursor() {
    let h = harness_with_photo("p102").await;
    h.store
        .mutate(|doc| {
            doc.advance_cursor(100);
            Ok(())
        })
        .await
        .unwrap();
    h.updates.push(text_update(101, 42, 1)).await;
    h.updates.push(photo_update(102, 42, 2, "p102")).await;
    h.updates.push(text_update(103, 42, 3)).await;

    let report = h.dispatcher.poll_once().await.unwrap();

    assert_eq!(report.fetched.len(), 1);
    let fetched = &report.fetched[0];
    assert_eq!(fetched.id, media_identity(42, 2, "p102"));
    assert!(fetched.path.starts_with(h.upload_dir()));
    assert!(fetched.path.exists());
    assert_eq!(fetched.caption.as_deref(), Some("from the test suite"));
    assert_eq!(report.cursor, Some(103));
    assert_eq!(h.updates.offsets().await, vec![Some(101)]);

    let again = h.dispatcher.poll_once().await.unwrap();
    assert!(again.fetched.is_empty());
    assert_eq!(again.cursor, Some(103));
    assert_eq!(h.updates.offsets().await, vec![Some(101), Some(104)]);
}

#[tokio::test]
async fn poll_downloads_items_left_pending_by_an_earlier_run() {
    let h = harness_with_photo("p102").await;
    let id = media_identity(42, 2, "p102");
    // An earlier fetch committed the item and the cursor, then died.
    h.dispatcher
        .ingest(&photo_update(102, 42, 2, "p102"))
        .await
        .unwrap();
    h.store
        .mutate(|doc| {
            doc.advance_cursor(102);
            Ok(())
        })
        .await
        .unwrap();

    let report = h.dispatcher.poll_once().await.unwrap();

    assert_eq!(h.updates.offsets().await, vec![Some(103)]);
    assert_eq!(report.fetched.len(), 1);
    assert_eq!(report.fetched[0].id, id);
    assert!(report.fetched[0].path.exists());
    assert_eq!(report.cursor, Some(102));
    let item = h.item(&id).await.unwrap().unwrap();
    assert_eq!(item.status, MediaStatus::Completed);
    assert_eq!(item.attempts, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn item_claimed_by_another_worker_is_not_reported_as_failed() {
    let h = TestHarness::new().unwrap();
    h.files
        .insert(
            &file_ref_for("slow"),
            MockFile::new(PHOTO.to_vec()).with_chunk_delay(Duration::from_millis(500)),
        )
        .await;
    h.files
        .insert(&file_ref_for("fast"), MockFile::new(PHOTO.to_vec()))
        .await;
    h.updates.push(photo_update(301, 42, 1, "slow")).await;
    h.updates.push(photo_update(302, 42, 2, "fast")).await;
    let slow = media_identity(42, 1, "slow");
    let fast = media_identity(42, 2, "fast");

    let dispatcher = h.dispatcher.clone();
    let poll = tokio::spawn(async move { dispatcher.poll_once().await });

    // Once the poll is busy with the first item, claim the second one.
    let mut claimed = None;
    for _ in 0..200 {
        if let Some(item) = h.item(&slow).await.unwrap()
            && item.status == MediaStatus::Downloading
        {
            claimed = h.downloader.claim_next().await.unwrap();
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let claimed = claimed.expect("second item should still be pending");
    assert_eq!(claimed.id, fast);

    let report = poll.await.unwrap().unwrap();
    assert_eq!(report.claimed_elsewhere, vec![fast.clone()]);
    assert!(report.failed.is_empty());
    assert_eq!(report.fetched.len(), 1);
    assert_eq!(report.fetched[0].id, slow);

    let done = h.downloader.download_claimed(claimed).await.unwrap();
    assert_eq!(done.status, MediaStatus::Completed);
}

#[tokio::test]
async fn first_poll_requests_without_offset() {
    let h = TestHarness::new().unwrap();
    let report = h.dispatcher.poll_once().await.unwrap();
    assert!(report.fetched.is_empty());
    assert_eq!(report.cursor, None);
    assert_eq!(h.updates.offsets().await, vec![None]);
}

#[tokio::test]
async fn malformed_pulled_update_is_skipped_but_consumed() {
    let h = harness_with_photo("p202").await;
    h.updates.push(malformed_update(201)).await;
    h.updates.push(photo_update(202, 42, 5, "p202")).await;

    let report = h.dispatcher.poll_once().await.unwrap();

    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].update_id, Some(201));
    assert_eq!(report.fetched.len(), 1);
    assert_eq!(report.cursor, Some(202));
}

#[tokio::test]
async fn fetch_failure_leaves_cursor_untouched() {
    let h = TestHarness::new().unwrap();
    h.updates.push(text_update(7, 42, 1)).await;
    h.updates.fail_next("bad gateway").await;

    assert!(h.dispatcher.poll_once().await.is_err());
    assert_eq!(h.store.load().await.unwrap().last_update_offset, None);
}

#[tokio::test]
async fn reported_size_over_ceiling_fails_before_transfer() {
    let h = TestHarness::builder().with_max_file_size_mb(1).build().unwrap();
    h.files
        .insert(
            &file_ref_for("big"),
            MockFile::new(PHOTO.to_vec()).with_reported_size(Some(2 * 1024 * 1024)),
        )
        .await;
    h.dispatcher
        .ingest(&photo_update(1, 42, 1, "big"))
        .await
        .unwrap();

    let item = h
        .downloader
        .download(&media_identity(42, 1, "big"))
        .await
        .unwrap();

    assert_eq!(item.status, MediaStatus::Failed);
    assert_eq!(item.failure, Some(FailureKind::SizeExceeded));
    assert!(item.local_path.is_none());
    assert!(h.upload_entries().is_empty());
}

#[tokio::test]
async fn unreported_size_is_enforced_while_streaming() {
    let h = TestHarness::builder().with_max_file_size_mb(1).build().unwrap();
    h.files
        .insert(
            &file_ref_for("big"),
            MockFile::new(vec![0u8; 1024 * 1024 + 1]).with_reported_size(None),
        )
        .await;
    h.dispatcher
        .ingest(&photo_update(1, 42, 1, "big"))
        .await
        .unwrap();

    let item = h
        .downloader
        .download(&media_identity(42, 1, "big"))
        .await
        .unwrap();

    assert_eq!(item.failure, Some(FailureKind::SizeExceeded));
    assert!(h.upload_entries().is_empty(), "{:?}", h.upload_entries());
}

#[tokio::test]
async fn stalled_transfer_times_out_and_leaves_no_partial() {
    let h = TestHarness::builder().with_timeout_secs(1).build().unwrap();
    h.files
        .insert(
            &file_ref_for("slow"),
            MockFile::new(PHOTO.to_vec())
                .with_chunks(4)
                .with_chunk_delay(Duration::from_secs(5)),
        )
        .await;
    h.dispatcher
        .ingest(&photo_update(1, 42, 1, "slow"))
        .await
        .unwrap();

    let item = h
        .downloader
        .download(&media_identity(42, 1, "slow"))
        .await
        .unwrap();

    assert_eq!(item.status, MediaStatus::Failed);
    assert_eq!(item.failure, Some(FailureKind::Timeout));
    assert!(h.upload_entries().is_empty(), "{:?}", h.upload_entries());
}

#[tokio::test]
async fn short_transfer_is_a_transfer_failure() {
    let h = TestHarness::new().unwrap();
    h.files
        .insert(
            &file_ref_for("short"),
            MockFile::new(vec![1u8; 50]).with_reported_size(Some(100)),
        )
        .await;
    h.dispatcher
        .ingest(&photo_update(1, 42, 1, "short"))
        .await
        .unwrap();

    let item = h
        .downloader
        .download(&media_identity(42, 1, "short"))
        .await
        .unwrap();

    assert_eq!(item.failure, Some(FailureKind::TransferFailed));
    assert!(
        item.last_error
            .as_deref()
            .is_some_and(|e| e.contains("expected 100 bytes"))
    );
    assert!(h.upload_entries().is_empty());
}

#[tokio::test]
async fn document_keeps_its_extension() {
    let h = TestHarness::new().unwrap();
    h.files
        .insert(&file_ref_for("doc1"), MockFile::new(b"%PDF-1.7".to_vec()))
        .await;
    h.dispatcher
        .ingest(&document_update(1, 42, 1, "doc1", "Report.PDF", "application/pdf"))
        .await
        .unwrap();

    let item = h
        .downloader
        .download(&media_identity(42, 1, "doc1"))
        .await
        .unwrap();

    assert_eq!(item.status, MediaStatus::Completed);
    assert!(item.local_path.unwrap().ends_with(".pdf"));
}

#[tokio::test]
async fn notifier_failure_does_not_change_item_state() {
    let h = harness_with_photo("abc123").await;
    h.notifier.set_failing(true);
    h.dispatcher
        .ingest(&photo_update(500, 42, 7, "abc123"))
        .await
        .unwrap();

    let item = h.worker(Duration::from_secs(60)).run_once().await.unwrap().unwrap();

    assert_eq!(item.status, MediaStatus::Completed);
    assert_eq!(h.notifier.saved().await.len(), 1);
    let stored = h.item(&item.id).await.unwrap().unwrap();
    assert_eq!(stored.status, MediaStatus::Completed);
}

#[tokio::test]
async fn abandoned_claim_is_recovered_as_interrupted() {
    let h = harness_with_photo("abc123").await;
    h.dispatcher
        .ingest(&photo_update(500, 42, 7, "abc123"))
        .await
        .unwrap();
    let claimed = h.downloader.claim_next().await.unwrap().unwrap();
    std::fs::create_dir_all(h.upload_dir()).unwrap();
    std::fs::write(
        h.upload_dir().join(format!("{PARTIAL_PREFIX}abandoned.part")),
        b"half",
    )
    .unwrap();

    let report = h.store.recover_interrupted(&h.upload_dir()).await.unwrap();

    assert_eq!(report.interrupted, vec![claimed.id.clone()]);
    assert_eq!(report.partials_removed, 1);
    let item = h.item(&claimed.id).await.unwrap().unwrap();
    assert_eq!(item.status, MediaStatus::Failed);
    assert_eq!(item.failure, Some(FailureKind::Interrupted));
    assert!(h.upload_entries().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn background_worker_wakes_on_ingest_and_stops_on_cancel() {
    let h = harness_with_photo("abc123").await;
    let cancel = CancellationToken::new();
    let worker = h.worker(Duration::from_secs(3600));
    let handle = tokio::spawn(worker.run(cancel.clone()));

    h.dispatcher
        .ingest(&photo_update(500, 42, 7, "abc123"))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(10), h.notifier.wait_for(1))
        .await
        .expect("worker should pick up the pushed item");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker should stop after cancellation")
        .unwrap();

    let item = h.item(&media_identity(42, 7, "abc123")).await.unwrap().unwrap();
    assert_eq!(item.status, MediaStatus::Completed);
}
