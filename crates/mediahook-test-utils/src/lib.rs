// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for mediahook integration tests.
//!
//! Provides in-memory stand-ins for the Bot API and a harness that wires the
//! real store, downloader, and dispatcher to them inside a temp workspace.
//!
//! # Components
//!
//! - [`MockFileSource`] - Serves file bytes with injectable size, delay, and failures
//! - [`MockUpdateSource`] - Serves raw updates honoring the requested offset
//! - [`MockNotifier`] - Captures completion notifications
//! - [`TestHarness`] - Temp workspace with every pipeline component wired up

pub mod fixtures;
pub mod harness;
pub mod mock_notifier;
pub mod mock_source;

pub use harness::TestHarness;
pub use mock_notifier::MockNotifier;
pub use mock_source::{MockFile, MockFileSource, MockUpdateSource};
