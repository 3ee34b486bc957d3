// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the seams of the ingestion pipeline.
//!
//! The pipeline only talks to the bot platform and the downstream consumer
//! through these traits, so tests can swap in in-memory doubles.

pub mod adapter;
pub mod notifier;
pub mod source;

pub use adapter::PluginAdapter;
pub use notifier::Notifier;
pub use source::{ByteStream, FileSource, UpdateSource};
