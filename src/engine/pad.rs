// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pads: the typed connection points of an element.
//!
//! A pad is described twice:
//!
//! * [`PadSpec`] is part of an element's definition. Static specs become pads the
//!   moment the element starts; dynamic specs are templates that the runtime
//!   instantiates (as `name#id`) when a link asks for them.
//! * [`PadDescriptor`] is the runtime record owned by the element actor. Its
//!   direction, availability and mode never change after creation; only the peer
//!   reference and the flow-control counters move.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::mpsc;

use crate::engine::buffer::Caps;
use crate::engine::element_actor::ElementMessage;
use crate::errors::LinkError;

/// Name of the pad the default chain links from.
pub const DEFAULT_OUTPUT_PAD: &str = "output";
/// Name of the pad the default chain links into.
pub const DEFAULT_INPUT_PAD: &str = "input";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadDirection {
    /// Receives buffers from upstream.
    Input,
    /// Sends buffers downstream.
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Exists for the element's whole life.
    Static,
    /// Created and removed at runtime through links.
    Dynamic,
}

/// Flow-control discipline of a pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowMode {
    /// The producer sends without being asked.
    Push,
    /// The consumer must issue demand before anything is sent.
    Pull,
}

impl FlowMode {
    /// Whether an output pad in mode `output` may feed an input pad in mode `input`.
    ///
    /// `pull -> push` is the only rejected pairing: the consumer never issues demand,
    /// so the producer could never send.
    pub fn can_feed(output: FlowMode, input: FlowMode) -> bool {
        !matches!((output, input), (FlowMode::Pull, FlowMode::Push))
    }
}

/// Preferred queue size used as an advisory backpressure threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferPolicy {
    pub preferred_size: usize,
}

impl BufferPolicy {
    pub fn new(preferred_size: usize) -> Self {
        Self {
            preferred_size: preferred_size.max(1),
        }
    }

    /// In-flight count at or below which an engaged pad is released.
    pub fn low_watermark(&self) -> usize {
        self.preferred_size / 2
    }
}

/// Identifies a pad within its owner: `name` for static pads, `name#id` for
/// dynamic instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PadRef {
    name: String,
    id: Option<String>,
}

impl PadRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    pub fn dynamic(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Some(id.into()),
        }
    }

    /// Parse `name` or `name#id`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once('#') {
            Some((name, id)) if !name.is_empty() && !id.is_empty() => Some(Self::dynamic(name, id)),
            Some(_) => None,
            None if !s.is_empty() => Some(Self::new(s)),
            None => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_dynamic(&self) -> bool {
        self.id.is_some()
    }
}

impl From<&str> for PadRef {
    fn from(s: &str) -> Self {
        PadRef::parse(s).unwrap_or_else(|| PadRef::new(s))
    }
}

impl fmt::Display for PadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}#{}", self.name, id),
            None => f.write_str(&self.name),
        }
    }
}

impl PartialOrd for PadRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PadRef {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.name, &self.id).cmp(&(&other.name, &other.id))
    }
}

/// Part of an element definition: one static pad or one dynamic pad template.
#[derive(Debug, Clone, PartialEq)]
pub struct PadSpec {
    pub name: String,
    pub direction: PadDirection,
    pub availability: Availability,
    pub mode: FlowMode,
    pub policy: Option<BufferPolicy>,
}

impl PadSpec {
    pub fn new(
        name: impl Into<String>,
        direction: PadDirection,
        availability: Availability,
        mode: FlowMode,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            availability,
            mode,
            policy: None,
        }
    }

    pub fn input(name: impl Into<String>, mode: FlowMode) -> Self {
        Self::new(name, PadDirection::Input, Availability::Static, mode)
    }

    pub fn output(name: impl Into<String>, mode: FlowMode) -> Self {
        Self::new(name, PadDirection::Output, Availability::Static, mode)
    }

    pub fn dynamic_input(name: impl Into<String>, mode: FlowMode) -> Self {
        Self::new(name, PadDirection::Input, Availability::Dynamic, mode)
    }

    pub fn dynamic_output(name: impl Into<String>, mode: FlowMode) -> Self {
        Self::new(name, PadDirection::Output, Availability::Dynamic, mode)
    }

    pub fn with_policy(mut self, policy: BufferPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Whether this spec describes the pad `pad`.
    pub fn matches(&self, pad: &PadRef) -> bool {
        self.name == pad.name()
            && match self.availability {
                Availability::Static => !pad.is_dynamic(),
                Availability::Dynamic => pad.is_dynamic(),
            }
    }
}

/// Find the spec describing `pad` among an element's pad specs.
pub fn spec_for<'a>(specs: &'a [PadSpec], pad: &PadRef) -> Option<&'a PadSpec> {
    specs.iter().find(|spec| spec.matches(pad))
}

/// The other end of a link, as seen from one pad.
#[derive(Debug, Clone)]
pub struct Peer {
    pub element: String,
    pub pad: PadRef,
    pub mode: FlowMode,
    pub policy: Option<BufferPolicy>,
    pub sender: mpsc::UnboundedSender<ElementMessage>,
}

/// Where a pad is in its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    NotStarted,
    Started,
    Ended,
}

/// Runtime record of one pad.
#[derive(Debug, Clone)]
pub struct PadDescriptor {
    pad: PadRef,
    direction: PadDirection,
    availability: Availability,
    mode: FlowMode,
    policy: Option<BufferPolicy>,
    pub(crate) peer: Option<Peer>,
    /// Output, pull: demand received from downstream and not yet used.
    pub(crate) demand: u64,
    /// Input, pull: demand issued upstream and not yet satisfied.
    pub(crate) requested: u64,
    /// Output, push with a policy: buffers sent and not yet acknowledged.
    pub(crate) in_flight: u64,
    pub(crate) backpressure_engaged: bool,
    pub(crate) stream: StreamStatus,
    pub(crate) caps: Option<Caps>,
}

impl PadDescriptor {
    fn from_spec(spec: &PadSpec, pad: PadRef) -> Self {
        Self {
            pad,
            direction: spec.direction,
            availability: spec.availability,
            mode: spec.mode,
            policy: spec.policy,
            peer: None,
            demand: 0,
            requested: 0,
            in_flight: 0,
            backpressure_engaged: false,
            stream: StreamStatus::NotStarted,
            caps: None,
        }
    }

    pub fn pad(&self) -> &PadRef {
        &self.pad
    }

    pub fn direction(&self) -> PadDirection {
        self.direction
    }

    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn mode(&self) -> FlowMode {
        self.mode
    }

    /// The pad's own policy, or the one carried by its link.
    pub fn policy(&self) -> Option<BufferPolicy> {
        self.peer
            .as_ref()
            .and_then(|peer| peer.policy)
            .or(self.policy)
    }

    pub fn peer(&self) -> Option<&Peer> {
        self.peer.as_ref()
    }

    pub fn is_linked(&self) -> bool {
        self.peer.is_some()
    }

    /// Outstanding demand on an output pad.
    pub fn demand(&self) -> u64 {
        self.demand
    }

    /// Demand issued but not yet satisfied on an input pad.
    pub fn requested(&self) -> u64 {
        self.requested
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight
    }

    pub fn stream_status(&self) -> StreamStatus {
        self.stream
    }

    pub fn caps(&self) -> Option<&Caps> {
        self.caps.as_ref()
    }
}

/// All pads of one element, plus the specs they were created from.
#[derive(Debug, Clone, Default)]
pub struct PadSet {
    specs: Vec<PadSpec>,
    pads: BTreeMap<PadRef, PadDescriptor>,
}

impl PadSet {
    /// Create the static pads declared by `specs`; dynamic specs are kept as templates.
    pub fn from_specs(specs: Vec<PadSpec>) -> Self {
        let pads = specs
            .iter()
            .filter(|spec| spec.availability == Availability::Static)
            .map(|spec| {
                let pad = PadRef::new(spec.name.clone());
                (pad.clone(), PadDescriptor::from_spec(spec, pad))
            })
            .collect();

        Self { specs, pads }
    }

    pub fn specs(&self) -> &[PadSpec] {
        &self.specs
    }

    pub fn get(&self, pad: &PadRef) -> Option<&PadDescriptor> {
        self.pads.get(pad)
    }

    pub(crate) fn get_mut(&mut self, pad: &PadRef) -> Option<&mut PadDescriptor> {
        self.pads.get_mut(pad)
    }

    pub fn contains(&self, pad: &PadRef) -> bool {
        self.pads.contains_key(pad)
    }

    pub fn refs(&self) -> Vec<PadRef> {
        self.pads.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PadDescriptor> {
        self.pads.values()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &PadDescriptor> {
        self.pads
            .values()
            .filter(|p| p.direction == PadDirection::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &PadDescriptor> {
        self.pads
            .values()
            .filter(|p| p.direction == PadDirection::Output)
    }

    pub fn len(&self) -> usize {
        self.pads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
    }

    /// Instantiate a dynamic pad from its template.
    ///
    /// # Errors
    /// * [`LinkError::UnknownPad`] if no dynamic template matches `pad`
    /// * [`LinkError::PadExists`] if the instance already exists
    pub(crate) fn add_dynamic(&mut self, owner: &str, pad: PadRef) -> Result<(), LinkError> {
        let spec = spec_for(&self.specs, &pad)
            .filter(|spec| spec.availability == Availability::Dynamic)
            .ok_or_else(|| LinkError::UnknownPad {
                element: owner.to_string(),
                pad: pad.clone(),
            })?;

        if self.pads.contains_key(&pad) {
            return Err(LinkError::PadExists {
                element: owner.to_string(),
                pad,
            });
        }

        let descriptor = PadDescriptor::from_spec(spec, pad.clone());
        self.pads.insert(pad, descriptor);
        Ok(())
    }

    /// Remove a dynamic pad instance. Static pads are never removed.
    pub(crate) fn remove_dynamic(&mut self, pad: &PadRef) -> Option<PadDescriptor> {
        match self.pads.get(pad) {
            Some(descriptor) if descriptor.availability == Availability::Dynamic => {
                self.pads.remove(pad)
            }
            _ => None,
        }
    }

    /// The single pull input pad, if the element has exactly one.
    pub fn sole_pull_input(&self) -> Option<&PadRef> {
        let mut inputs = self.inputs().filter(|p| p.mode == FlowMode::Pull);
        match (inputs.next(), inputs.next()) {
            (Some(only), None) => Some(only.pad()),
            _ => None,
        }
    }
}
