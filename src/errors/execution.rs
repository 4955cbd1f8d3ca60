// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use thiserror::Error;

use crate::engine::playback::PlaybackState;

/// How a pipeline reacts when one of its children fails.
///
/// # Variants
/// * `FailFast` - Halt the whole pipeline on the first child failure (default)
/// * `ContinueOnError` - Drop the failed child and its links, keep running the rest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    #[default]
    FailFast,
    ContinueOnError,
}

/// Errors surfaced to callers holding a [`crate::engine::PipelineHandle`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The pipeline task is gone; no further requests can be served.
    #[error("Pipeline '{0}' has terminated")]
    Terminated(String),

    /// A child failed and the pipeline halted (fail-fast).
    #[error("Pipeline '{pipeline}' halted after child '{child}' failed: {reason}")]
    ChildFailed {
        pipeline: String,
        child: String,
        reason: String,
    },

    /// The pipeline itself hit a fatal error.
    #[error("Pipeline '{pipeline}' failed: {reason}")]
    Failed { pipeline: String, reason: String },

    /// A playback request was superseded by a newer one before completing.
    #[error("Playback request for '{requested}' superseded by a request for '{superseded_by}'")]
    Superseded {
        requested: PlaybackState,
        superseded_by: PlaybackState,
    },

    /// `for_element` envelope names a child that does not exist.
    #[error("Pipeline '{pipeline}' has no child named '{child}'")]
    UnknownChild { pipeline: String, child: String },
}
