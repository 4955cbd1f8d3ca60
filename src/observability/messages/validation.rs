// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for topology validation.
//!
//! This module contains message types for logging events related to:
//! * Default chain synthesis
//! * Rejected topology specs

use crate::errors::LinkError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// No explicit links were given; the children were chained in order.
///
/// # Log Level
/// `debug!`
///
/// # Example
/// ```
/// use the_conduit::observability::messages::validation::DefaultChainSynthesized;
///
/// let children = vec!["source", "filter", "sink"];
/// let msg = DefaultChainSynthesized {
///     pipeline: "demo",
///     children: &children,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Pipeline 'demo' has no explicit links, chaining source -> filter -> sink"
/// );
/// ```
pub struct DefaultChainSynthesized<'a> {
    pub pipeline: &'a str,
    pub children: &'a [&'a str],
}

impl Display for DefaultChainSynthesized<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' has no explicit links, chaining {}",
            self.pipeline,
            self.children.join(" -> ")
        )
    }
}

impl StructuredLog for DefaultChainSynthesized<'_> {
    fn log(&self) {
        tracing::debug!(
            pipeline = self.pipeline,
            chain = self.children.join(" -> "),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "default_chain",
            span_name = name,
            pipeline = self.pipeline,
            chain_length = self.children.len(),
        )
    }
}

/// A topology spec was rejected.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct TopologyRejected<'a> {
    pub pipeline: &'a str,
    pub errors: &'a [LinkError],
}

impl Display for TopologyRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let errors = self
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        write!(
            f,
            "Pipeline '{}' rejected topology with {} error(s): {}",
            self.pipeline,
            self.errors.len(),
            errors
        )
    }
}

impl StructuredLog for TopologyRejected<'_> {
    fn log(&self) {
        tracing::error!(
            pipeline = self.pipeline,
            error_count = self.errors.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "topology_rejected",
            span_name = name,
            pipeline = self.pipeline,
            error_count = self.errors.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_rejected_lists_every_error() {
        let errors = vec![
            LinkError::UnknownChild("ghost".to_string()),
            LinkError::DuplicateChild("sink".to_string()),
        ];
        let msg = TopologyRejected {
            pipeline: "p",
            errors: &errors,
        };
        assert_eq!(
            msg.to_string(),
            "Pipeline 'p' rejected topology with 2 error(s): Link references unknown child 'ghost'; Duplicate child name 'sink'"
        );
    }
}
