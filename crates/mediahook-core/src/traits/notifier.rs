// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notification after a successful download.

use std::path::Path;

use async_trait::async_trait;

use crate::error::MediaHookError;
use crate::item::MediaItem;

/// Told about every item that reaches `completed`.
///
/// Failures are the caller's to log; they never change item state.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn media_saved(&self, item: &MediaItem, path: &Path) -> Result<(), MediaHookError>;
}
