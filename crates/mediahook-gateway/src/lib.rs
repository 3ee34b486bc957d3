// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface for mediahook.
//!
//! Receives Telegram webhook calls (push mode) and exposes the queue
//! query/control operations to the workspace agent.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::{AuthConfig, WEBHOOK_SECRET_HEADER};
pub use handlers::ApiError;
pub use server::{GatewayState, HealthState, router, start_server};
