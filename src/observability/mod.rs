// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and operational
//! logging throughout the-conduit. Message types follow a struct-based pattern
//! with `Display` trait implementation to:
//!
//! * Eliminate magic strings scattered throughout the codebase
//! * Keep log field names consistent between call sites
//! * Provide consistent, structured logging output
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::element` - Element actor lifecycle, callbacks and actions
//! * `messages::pipeline` - Pipeline orchestration and failure handling
//! * `messages::playback` - Playback transitions of elements and pipelines
//! * `messages::validation` - Topology validation
//!
//! # Usage
//!
//! ```rust
//! use the_conduit::observability::messages::element::CallbackFailed;
//! use the_conduit::observability::messages::StructuredLog;
//!
//! CallbackFailed {
//!     element: "sink",
//!     callback: "handle_process",
//!     reason: "disk full",
//! }
//! .log();
//! ```

pub mod messages;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `fmt` subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Only binaries should call this. A second call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
