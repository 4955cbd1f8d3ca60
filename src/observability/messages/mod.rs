// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit it at its documented level with structured fields.
//!
//! # Organization
//!
//! * `element` - Element actor lifecycle, callbacks and actions
//! * `pipeline` - Pipeline orchestration and failure handling
//! * `playback` - Playback transitions
//! * `validation` - Topology validation
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_conduit::observability::messages::pipeline::PipelineStarted;
//! use the_conduit::observability::messages::StructuredLog;
//!
//! let msg = PipelineStarted {
//!     pipeline: "demo",
//!     children: 3,
//! };
//!
//! msg.log();
//! tracing::info!("{}", msg);
//! ```

use tracing::Span;

pub mod element;
pub mod pipeline;
pub mod playback;
pub mod validation;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog: std::fmt::Display {
    /// Emit the message as a tracing event.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
