// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for mediahook.
//!
//! This crate provides the media item lifecycle, the persisted queue
//! document, the shared error type, and the collaborator traits that the
//! storage, ingest, and platform crates plug into.

pub mod document;
pub mod error;
pub mod item;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use document::{DOCUMENT_VERSION, QueueDocument};
pub use error::MediaHookError;
pub use item::{MAX_CAPTION_CHARS, MediaItem};
pub use types::{FailureKind, HealthStatus, MediaRef, MediaStatus, MediaType, RemoteFile};

pub use traits::{ByteStream, FileSource, Notifier, PluginAdapter, UpdateSource};
