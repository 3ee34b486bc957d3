// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable queue storage for mediahook.
//!
//! The whole queue lives in one JSON document that is only ever changed
//! through [`QueueStore::mutate`]: an in-process gate plus an OS lock on a
//! sibling `.lock` file serialize read-modify-write cycles, and every write
//! replaces the document atomically.

pub mod control;
pub mod dedup;
pub mod store;

pub use control::{QueueControl, StatusSnapshot};
pub use dedup::{EnqueueOutcome, enqueue_if_new, hash8, media_identity};
pub use store::{PARTIAL_PREFIX, QueueStore, RecoveryReport, WorkerLock, remove_partial_files};
