// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound collaborators: where updates and file bytes come from.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;

use crate::error::MediaHookError;
use crate::traits::adapter::PluginAdapter;
use crate::types::RemoteFile;

/// A stream of file chunks from the platform.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, MediaHookError>> + Send>>;

/// Resolves platform file references and streams their bytes.
#[async_trait]
pub trait FileSource: PluginAdapter {
    /// Resolves a file reference to a downloadable location and reported size.
    async fn resolve(&self, file_ref: &str) -> Result<RemoteFile, MediaHookError>;

    /// Opens a byte stream for a resolved file.
    async fn open(&self, file: &RemoteFile) -> Result<ByteStream, MediaHookError>;
}

/// Pull-mode source of raw platform updates.
#[async_trait]
pub trait UpdateSource: PluginAdapter {
    /// Fetches updates with id `>= offset`, oldest first.
    ///
    /// Updates are returned as raw JSON so push and pull share one parser.
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<Vec<serde_json::Value>, MediaHookError>;
}
