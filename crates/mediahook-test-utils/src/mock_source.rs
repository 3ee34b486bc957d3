// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory stand-ins for the Bot API's file and update endpoints.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::Mutex;

use mediahook_core::{
    ByteStream, FileSource, HealthStatus, MediaHookError, PluginAdapter, RemoteFile, UpdateSource,
};

/// One file the mock source can serve.
#[derive(Debug, Clone)]
pub struct MockFile {
    pub bytes: Bytes,
    /// Size returned by `resolve`. Defaults to the real length.
    pub reported_size: Option<u64>,
    pub chunk_size: usize,
    /// Sleep before every chunk.
    pub chunk_delay: Option<Duration>,
    /// Yield an error after this many chunks.
    pub fail_after_chunks: Option<usize>,
    /// Make `resolve` fail with this message.
    pub resolve_error: Option<String>,
}

impl MockFile {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            reported_size: Some(bytes.len() as u64),
            bytes,
            chunk_size: 64 * 1024,
            chunk_delay: None,
            fail_after_chunks: None,
            resolve_error: None,
        }
    }

    pub fn with_reported_size(mut self, size: Option<u64>) -> Self {
        self.reported_size = size;
        self
    }

    pub fn with_chunks(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    pub fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after_chunks = Some(chunks);
        self
    }

    pub fn unresolvable(mut self, message: &str) -> Self {
        self.resolve_error = Some(message.to_string());
        self
    }
}

/// Serves registered files by `file_ref`. Unknown refs fail to resolve.
#[derive(Clone, Default)]
pub struct MockFileSource {
    files: Arc<Mutex<HashMap<String, MockFile>>>,
    resolved: Arc<Mutex<Vec<String>>>,
}

impl MockFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the file served for `file_ref`.
    pub async fn insert(&self, file_ref: &str, file: MockFile) {
        self.files.lock().await.insert(file_ref.to_string(), file);
    }

    /// Every `file_ref` passed to `resolve`, in order.
    pub async fn resolved(&self) -> Vec<String> {
        self.resolved.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockFileSource {
    fn name(&self) -> &str {
        "mock-files"
    }

    async fn health_check(&self) -> Result<HealthStatus, MediaHookError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl FileSource for MockFileSource {
    async fn resolve(&self, file_ref: &str) -> Result<RemoteFile, MediaHookError> {
        self.resolved.lock().await.push(file_ref.to_string());
        let files = self.files.lock().await;
        let file = files.get(file_ref).ok_or_else(|| MediaHookError::Platform {
            message: format!("file {file_ref} not found"),
            source: None,
        })?;
        if let Some(message) = &file.resolve_error {
            return Err(MediaHookError::Platform {
                message: message.clone(),
                source: None,
            });
        }
        Ok(RemoteFile {
            file_ref: file_ref.to_string(),
            download_path: format!("mock/{file_ref}"),
            size: file.reported_size,
        })
    }

    async fn open(&self, remote: &RemoteFile) -> Result<ByteStream, MediaHookError> {
        let file = self
            .files
            .lock()
            .await
            .get(&remote.file_ref)
            .cloned()
            .ok_or_else(|| MediaHookError::TransferFailed {
                message: format!("file {} vanished", remote.file_ref),
                source: None,
            })?;

        let chunks: Vec<Bytes> = file
            .bytes
            .chunks(file.chunk_size)
            .map(Bytes::copy_from_slice)
            .collect();
        let delay = file.chunk_delay;
        let fail_after = file.fail_after_chunks;

        let stream = futures::stream::iter(chunks.into_iter().enumerate()).then(
            move |(index, chunk)| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                match fail_after {
                    Some(limit) if index >= limit => Err(MediaHookError::TransferFailed {
                        message: "connection reset by mock".to_string(),
                        source: None,
                    }),
                    _ => Ok(chunk),
                }
            },
        );
        Ok(Box::pin(stream))
    }
}

/// Serves a fixed backlog of raw updates, honoring `offset` like `getUpdates`.
#[derive(Clone, Default)]
pub struct MockUpdateSource {
    backlog: Arc<Mutex<Vec<serde_json::Value>>>,
    offsets: Arc<Mutex<Vec<Option<i64>>>>,
    fail: Arc<Mutex<Option<String>>>,
}

impl MockUpdateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, update: serde_json::Value) {
        self.backlog.lock().await.push(update);
    }

    /// Makes the next fetch fail with a platform error.
    pub async fn fail_next(&self, message: &str) {
        *self.fail.lock().await = Some(message.to_string());
    }

    /// Every offset passed to `fetch_updates`, in order.
    pub async fn offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockUpdateSource {
    fn name(&self) -> &str {
        "mock-updates"
    }

    async fn health_check(&self) -> Result<HealthStatus, MediaHookError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl UpdateSource for MockUpdateSource {
    async fn fetch_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<Vec<serde_json::Value>, MediaHookError> {
        self.offsets.lock().await.push(offset);
        if let Some(message) = self.fail.lock().await.take() {
            return Err(MediaHookError::Platform {
                message,
                source: None,
            });
        }
        let floor = offset.unwrap_or(i64::MIN);
        Ok(self
            .backlog
            .lock()
            .await
            .iter()
            .filter(|u| {
                u.get("update_id")
                    .and_then(serde_json::Value::as_i64)
                    .is_none_or(|id| id >= floor)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn update_source_honors_offset() {
        let source = MockUpdateSource::new();
        for id in [101, 102, 103] {
            source.push(json!({"update_id": id})).await;
        }
        let updates = source.fetch_updates(Some(102)).await.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(source.offsets().await, vec![Some(102)]);
    }

    #[tokio::test]
    async fn file_source_streams_in_chunks() {
        let source = MockFileSource::new();
        source
            .insert("f", MockFile::new(vec![7u8; 10]).with_chunks(4))
            .await;
        let remote = source.resolve("f").await.unwrap();
        assert_eq!(remote.size, Some(10));

        let chunks: Vec<_> = source.open(&remote).await.unwrap().collect().await;
        let lens: Vec<usize> = chunks.into_iter().map(|c| c.unwrap().len()).collect();
        assert_eq!(lens, vec![4, 4, 2]);
    }

    #[tokio::test]
    async fn unknown_file_fails_to_resolve() {
        let source = MockFileSource::new();
        assert!(matches!(
            source.resolve("nope").await,
            Err(MediaHookError::Platform { .. })
        ));
    }
}
