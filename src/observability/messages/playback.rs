// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for playback transitions of elements and pipelines.

use crate::engine::playback::PlaybackState;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An actor completed one adjacent playback step.
///
/// # Log Level
/// `debug!` for elements, `info!` for pipelines
///
/// # Example
/// ```
/// use the_conduit::engine::PlaybackState;
/// use the_conduit::observability::messages::playback::PlaybackStepCompleted;
///
/// let msg = PlaybackStepCompleted {
///     actor: "pipeline",
///     name: "demo",
///     from: PlaybackState::Stopped,
///     to: PlaybackState::Prepared,
/// };
///
/// assert_eq!(msg.to_string(), "pipeline 'demo' moved stopped -> prepared");
/// ```
pub struct PlaybackStepCompleted<'a> {
    pub actor: &'a str,
    pub name: &'a str,
    pub from: PlaybackState,
    pub to: PlaybackState,
}

impl Display for PlaybackStepCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} '{}' moved {} -> {}",
            self.actor, self.name, self.from, self.to
        )
    }
}

impl StructuredLog for PlaybackStepCompleted<'_> {
    fn log(&self) {
        if self.actor == "pipeline" {
            tracing::info!(
                actor = self.actor,
                name = self.name,
                from = %self.from,
                to = %self.to,
                "{}", self
            );
        } else {
            tracing::debug!(
                actor = self.actor,
                name = self.name,
                from = %self.from,
                to = %self.to,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "playback_step",
            span_name = name,
            actor = self.actor,
            name = self.name,
            from = %self.from,
            to = %self.to,
        )
    }
}

/// A teardown callback failed; shutdown continues.
///
/// # Log Level
/// `warn!` - Resource release problem, not fatal
pub struct TeardownFailed<'a> {
    pub name: &'a str,
    pub callback: &'a str,
    pub reason: &'a str,
}

impl Display for TeardownFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "'{}' {} failed during teardown, continuing: {}",
            self.name, self.callback, self.reason
        )
    }
}

impl StructuredLog for TeardownFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            name = self.name,
            callback = self.callback,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "teardown_failed",
            span_name = name,
            name = self.name,
            callback = self.callback,
        )
    }
}

/// A pending playback request was replaced by a newer target.
///
/// # Log Level
/// `debug!`
pub struct PlaybackRequestSuperseded<'a> {
    pub pipeline: &'a str,
    pub requested: PlaybackState,
    pub superseded_by: PlaybackState,
}

impl Display for PlaybackRequestSuperseded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' playback request for {} superseded by {}",
            self.pipeline, self.requested, self.superseded_by
        )
    }
}

impl StructuredLog for PlaybackRequestSuperseded<'_> {
    fn log(&self) {
        tracing::debug!(
            pipeline = self.pipeline,
            requested = %self.requested,
            superseded_by = %self.superseded_by,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "playback_superseded",
            span_name = name,
            pipeline = self.pipeline,
        )
    }
}
