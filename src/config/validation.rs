// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Topology validation for link integrity and correctness.
//!
//! Every [`TopologySpec`] is checked before any child is spawned, both at startup
//! and when a running pipeline applies a new spec. The checks run in a fixed order
//! so that later checks only see a structurally valid description:
//!
//! 1. **Uniqueness**: child names are unique, including against children that
//!    are already running
//! 2. **References**: every link names existing children and existing pads
//!    (a dynamic pad is referenced as `name#id` against a dynamic template)
//! 3. **Direction**: links run from an output pad to an input pad
//! 4. **Modes**: the output's flow mode can feed the input's (see
//!    [`FlowMode::can_feed`])
//! 5. **Exclusivity**: each pad takes part in at most one link
//!
//! All errors found are accumulated and returned together, so a config author sees
//! every problem at once instead of fixing them one by one.
//!
//! # Examples
//!
//! ```rust
//! use the_conduit::backends::local::elements::{CountingSource, TestingSink};
//! use the_conduit::config::{validate_topology, LinkSpec, TopologyIndex, TopologySpec};
//!
//! let spec = TopologySpec::new()
//!     .child("source", CountingSource::new(3))
//!     .child("sink", TestingSink::new());
//!
//! let links = validate_topology(&spec, &TopologyIndex::new()).unwrap();
//! assert_eq!(links.len(), 1);
//! ```

use std::collections::{HashMap, HashSet};

use crate::config::topology::{Endpoint, LinkSpec, TopologySpec};
use crate::engine::pad::{spec_for, FlowMode, PadDirection, PadSpec};
use crate::errors::LinkError;

/// Pad definitions and link occupancy of an already-resolved topology.
#[derive(Debug, Clone, Default)]
pub struct TopologyIndex {
    pads: HashMap<String, Vec<PadSpec>>,
    linked: HashSet<Endpoint>,
}

impl TopologyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_child(&mut self, name: impl Into<String>, pads: Vec<PadSpec>) {
        self.pads.insert(name.into(), pads);
    }

    /// Forget a child and every link endpoint it owned.
    pub fn remove_child(&mut self, name: &str) {
        self.pads.remove(name);
        self.linked.retain(|endpoint| endpoint.element != name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pads.contains_key(name)
    }

    pub fn pad_specs(&self, name: &str) -> Option<&[PadSpec]> {
        self.pads.get(name).map(|p| p.as_slice())
    }

    pub fn mark_linked(&mut self, link: &LinkSpec) {
        self.linked.insert(link.from.clone());
        self.linked.insert(link.to.clone());
    }

    pub fn unmark_linked(&mut self, link: &LinkSpec) {
        self.linked.remove(&link.from);
        self.linked.remove(&link.to);
    }

    pub fn is_linked(&self, endpoint: &Endpoint) -> bool {
        self.linked.contains(endpoint)
    }
}

/// A link that passed validation, with the flow modes of both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLink {
    pub link: LinkSpec,
    pub output_mode: FlowMode,
    pub input_mode: FlowMode,
}

/// Validate `spec` against the topology already described by `existing`.
///
/// # Arguments
/// * `spec` - New children and links (default chain applied when links are omitted)
/// * `existing` - Children and linked pads that are already running
///
/// # Returns
/// * `Ok(Vec<ResolvedLink>)` - Links in declaration order, ready to be established
/// * `Err(Vec<LinkError>)` - Every violation found
pub fn validate_topology(
    spec: &TopologySpec,
    existing: &TopologyIndex,
) -> Result<Vec<ResolvedLink>, Vec<LinkError>> {
    let mut errors = Vec::new();

    if let Err(duplicate_errors) = validate_unique_children(spec, existing) {
        errors.extend(duplicate_errors);
    }

    let mut candidate = existing.clone();
    for child in &spec.children {
        if !candidate.contains(&child.name) {
            candidate.add_child(child.name.clone(), child.element.pads());
        }
    }

    let mut resolved = Vec::new();
    for link in spec.resolved_links() {
        match validate_link(&link, &candidate) {
            Ok(link) => {
                candidate.mark_linked(&link.link);
                resolved.push(link);
            }
            Err(link_errors) => errors.extend(link_errors),
        }
    }

    if errors.is_empty() {
        Ok(resolved)
    } else {
        Err(errors)
    }
}

/// Child names must be unique within the spec and against running children.
fn validate_unique_children(
    spec: &TopologySpec,
    existing: &TopologyIndex,
) -> Result<(), Vec<LinkError>> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for child in &spec.children {
        if existing.contains(&child.name) || !seen.insert(child.name.as_str()) {
            errors.push(LinkError::DuplicateChild(child.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check one link: references, direction, modes and pad exclusivity.
///
/// Reference errors short-circuit the remaining checks for this link, since
/// there is no pad definition to check direction or mode against.
fn validate_link(link: &LinkSpec, index: &TopologyIndex) -> Result<ResolvedLink, Vec<LinkError>> {
    let mut errors = Vec::new();

    let output = resolve_endpoint(&link.from, PadDirection::Output, index);
    let input = resolve_endpoint(&link.to, PadDirection::Input, index);

    let (output, input) = match (output, input) {
        (Ok(output), Ok(input)) => (output, input),
        (output, input) => {
            errors.extend(output.err());
            errors.extend(input.err());
            return Err(errors);
        }
    };

    if !FlowMode::can_feed(output.mode, input.mode) {
        errors.push(LinkError::IncompatibleModes {
            from_element: link.from.element.clone(),
            from_pad: link.from.pad.clone(),
            to_element: link.to.element.clone(),
            to_pad: link.to.pad.clone(),
            output: output.mode,
            input: input.mode,
        });
    }

    for endpoint in [&link.from, &link.to] {
        if index.is_linked(endpoint) {
            errors.push(LinkError::AlreadyLinked {
                element: endpoint.element.clone(),
                pad: endpoint.pad.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(ResolvedLink {
            link: link.clone(),
            output_mode: output.mode,
            input_mode: input.mode,
        })
    } else {
        Err(errors)
    }
}

fn resolve_endpoint<'a>(
    endpoint: &Endpoint,
    expected: PadDirection,
    index: &'a TopologyIndex,
) -> Result<&'a PadSpec, LinkError> {
    let specs = index
        .pad_specs(&endpoint.element)
        .ok_or_else(|| LinkError::UnknownChild(endpoint.element.clone()))?;

    let spec = spec_for(specs, &endpoint.pad).ok_or_else(|| LinkError::UnknownPad {
        element: endpoint.element.clone(),
        pad: endpoint.pad.clone(),
    })?;

    if spec.direction != expected {
        return Err(LinkError::DirectionMismatch {
            element: endpoint.element.clone(),
            pad: endpoint.pad.clone(),
            expected,
            actual: spec.direction,
        });
    }

    Ok(spec)
}
