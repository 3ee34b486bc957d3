// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by every platform-facing adapter.

use async_trait::async_trait;

use crate::error::MediaHookError;
use crate::types::HealthStatus;

/// Identity and health reporting for adapters.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, MediaHookError>;
}
