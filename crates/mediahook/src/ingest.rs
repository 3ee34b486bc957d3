// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mediahook fetch` and `mediahook ingest`.

use std::io::Read;
use std::path::Path;

use serde::Serialize;

use mediahook_core::{MediaHookError, MediaItem};
use mediahook_ingest::{DownloadWorker, FailedItem, FetchedItem, IngestReport, RejectedUpdate};

use crate::app::App;

/// `fetch` output, one JSON document on stdout.
#[derive(Debug, Serialize)]
struct FetchOutput {
    fetched: Vec<FetchedItem>,
    count: usize,
    failed: Vec<FailedItem>,
    duplicates: Vec<String>,
    claimed_elsewhere: Vec<String>,
    rejected: Vec<RejectedUpdate>,
    cursor: Option<i64>,
    message: String,
}

/// `ingest` output.
#[derive(Debug, Serialize)]
struct IngestOutput {
    #[serde(flatten)]
    report: IngestReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    downloaded: Vec<MediaItem>,
}

/// One pull-mode cycle.
///
/// Recovers what an earlier killed run left behind first, unless a `serve`
/// owns downloads for this workspace.
pub async fn run_fetch(app: &App) -> Result<(), MediaHookError> {
    let _worker_lock = app.recover_if_unowned().await?;
    let dispatcher = app.dispatcher(app.telegram()?);
    let report = dispatcher.poll_once().await?;

    let count = report.fetched.len();
    let message = if count == 0 {
        "No new media found".to_string()
    } else {
        format!("Downloaded {count} media file(s)")
    };
    print_json(&FetchOutput {
        fetched: report.fetched,
        count,
        failed: report.failed,
        duplicates: report.duplicates,
        claimed_elsewhere: report.claimed_elsewhere,
        rejected: report.rejected,
        cursor: report.cursor,
        message,
    })
}

/// Push path from a saved update, optionally draining the queue afterwards.
pub async fn run_ingest(app: &App, file: &Path, download: bool) -> Result<(), MediaHookError> {
    let raw = read_input(file)?;
    let update: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| MediaHookError::MalformedUpdate {
            reason: format!("{} is not JSON: {e}", file.display()),
        })?;

    let _worker_lock = if download {
        app.recover_if_unowned().await?
    } else {
        None
    };
    let dispatcher = app.dispatcher(app.telegram()?);
    let report = dispatcher.ingest(&update).await?;

    let mut downloaded = Vec::new();
    if download {
        let worker = DownloadWorker::new(
            dispatcher.downloader().clone(),
            dispatcher.wake_handle(),
            app.config.worker.idle_poll(),
            app.config.workspace.root.clone(),
        );
        while let Some(item) = worker.run_once().await? {
            downloaded.push(item);
        }
    }

    print_json(&IngestOutput { report, downloaded })
}

fn read_input(file: &Path) -> Result<String, MediaHookError> {
    if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(MediaHookError::storage)?;
        return Ok(buf);
    }
    std::fs::read_to_string(file).map_err(MediaHookError::storage)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), MediaHookError> {
    let out = serde_json::to_string_pretty(value).map_err(MediaHookError::storage)?;
    println!("{out}");
    Ok(())
}
