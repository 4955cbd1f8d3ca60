// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline orchestration events.
//!
//! This module contains message types for logging events related to:
//! * Pipeline start and termination
//! * Topology changes (children added, removed)
//! * Child failures and the failure strategy applied to them
//! * Messages that could not be routed

use crate::errors::FailureStrategy;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Pipeline task started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineStarted<'a> {
    pub pipeline: &'a str,
    pub children: usize,
}

impl Display for PipelineStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' started with {} initial child(ren)",
            self.pipeline, self.children
        )
    }
}

impl StructuredLog for PipelineStarted<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline = self.pipeline,
            children = self.children,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline",
            span_name = name,
            pipeline = self.pipeline,
        )
    }
}

/// A topology spec was applied to a running pipeline.
///
/// # Log Level
/// `info!`
///
/// # Example
/// ```
/// use the_conduit::observability::messages::pipeline::SpecApplied;
///
/// let msg = SpecApplied {
///     pipeline: "demo",
///     children: 2,
///     links: 1,
/// };
///
/// assert_eq!(msg.to_string(), "Pipeline 'demo' added 2 child(ren) and 1 link(s)");
/// ```
pub struct SpecApplied<'a> {
    pub pipeline: &'a str,
    pub children: usize,
    pub links: usize,
}

impl Display for SpecApplied<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' added {} child(ren) and {} link(s)",
            self.pipeline, self.children, self.links
        )
    }
}

impl StructuredLog for SpecApplied<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline = self.pipeline,
            children = self.children,
            links = self.links,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "spec_applied",
            span_name = name,
            pipeline = self.pipeline,
            children = self.children,
            links = self.links,
        )
    }
}

pub struct ChildRemoved<'a> {
    pub pipeline: &'a str,
    pub child: &'a str,
}

impl Display for ChildRemoved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Pipeline '{}' removed child '{}'", self.pipeline, self.child)
    }
}

impl StructuredLog for ChildRemoved<'_> {
    fn log(&self) {
        tracing::info!(pipeline = self.pipeline, child = self.child, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "child_removed",
            span_name = name,
            pipeline = self.pipeline,
            child = self.child,
        )
    }
}

/// A child reported a failure.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ChildFailureHandled<'a> {
    pub pipeline: &'a str,
    pub child: &'a str,
    pub reason: &'a str,
    pub strategy: FailureStrategy,
}

impl Display for ChildFailureHandled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let outcome = match self.strategy {
            FailureStrategy::FailFast => "halting pipeline",
            FailureStrategy::ContinueOnError => "continuing without it",
        };
        write!(
            f,
            "Pipeline '{}' child '{}' failed ({}): {}",
            self.pipeline, self.child, outcome, self.reason
        )
    }
}

impl StructuredLog for ChildFailureHandled<'_> {
    fn log(&self) {
        tracing::error!(
            pipeline = self.pipeline,
            child = self.child,
            reason = self.reason,
            strategy = ?self.strategy,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "child_failed",
            span_name = name,
            pipeline = self.pipeline,
            child = self.child,
        )
    }
}

/// A `for_element` envelope or `Forward` action named a missing child.
///
/// # Log Level
/// `warn!`
pub struct ForwardToUnknownChild<'a> {
    pub pipeline: &'a str,
    pub child: &'a str,
}

impl Display for ForwardToUnknownChild<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' cannot forward to unknown child '{}'",
            self.pipeline, self.child
        )
    }
}

impl StructuredLog for ForwardToUnknownChild<'_> {
    fn log(&self) {
        tracing::warn!(pipeline = self.pipeline, child = self.child, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "forward_unknown_child",
            span_name = name,
            pipeline = self.pipeline,
            child = self.child,
        )
    }
}

/// The pipeline itself failed.
///
/// # Log Level
/// `error!`
pub struct PipelineFailed<'a> {
    pub pipeline: &'a str,
    pub reason: &'a str,
}

impl Display for PipelineFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Pipeline '{}' failed: {}", self.pipeline, self.reason)
    }
}

impl StructuredLog for PipelineFailed<'_> {
    fn log(&self) {
        tracing::error!(pipeline = self.pipeline, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "pipeline_failed",
            span_name = name,
            pipeline = self.pipeline,
        )
    }
}

pub struct PipelineTerminated<'a> {
    pub pipeline: &'a str,
}

impl Display for PipelineTerminated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Pipeline '{}' terminated", self.pipeline)
    }
}

impl StructuredLog for PipelineTerminated<'_> {
    fn log(&self) {
        tracing::info!(pipeline = self.pipeline, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_terminated",
            span_name = name,
            pipeline = self.pipeline,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_names_the_strategy() {
        let msg = ChildFailureHandled {
            pipeline: "p",
            child: "sink",
            reason: "boom",
            strategy: FailureStrategy::FailFast,
        };
        assert_eq!(msg.to_string(), "Pipeline 'p' child 'sink' failed (halting pipeline): boom");

        let msg = ChildFailureHandled {
            strategy: FailureStrategy::ContinueOnError,
            ..msg
        };
        assert!(msg.to_string().contains("continuing without it"));
    }
}
