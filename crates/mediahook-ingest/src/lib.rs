// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion pipeline for mediahook.
//!
//! Inbound updates arrive either pushed (webhook) or pulled (`getUpdates`);
//! both go through [`parse_update`] and the [`Dispatcher`]. Downloads are done
//! by the [`Downloader`], either inline (pull mode) or by the background
//! [`DownloadWorker`] (push mode).

pub mod dispatcher;
pub mod downloader;
pub mod naming;
pub mod update;
pub mod worker;

pub use dispatcher::{Dispatcher, FailedItem, FetchedItem, IngestReport, PollReport, RejectedUpdate};
pub use downloader::Downloader;
pub use update::{ParsedUpdate, parse_update};
pub use worker::DownloadWorker;
