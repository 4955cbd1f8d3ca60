// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The callback contract every element implements.
//!
//! An element is plain data plus behavior: the struct implementing [`Element`] is
//! its private state, and each `handle_*` method receives `&mut self` together
//! with a read-only [`CallbackContext`] describing the framework-owned metadata
//! (playback state, pads, demand counters).
//!
//! Every method has a default body, so an element only overrides what it needs.
//! Callbacks are synchronous: the actor never suspends inside one.

use serde_json::Value;

use crate::actions::{Action, CallbackResult};
use crate::engine::buffer::{Buffer, Caps};
use crate::engine::pad::{PadDescriptor, PadRef, PadSet, PadSpec};
use crate::engine::playback::PlaybackState;

/// Advisory backpressure signal for push-mode output pads with a buffering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backpressure {
    /// In-flight buffers rose above the preferred size.
    Engaged,
    /// In-flight buffers fell back to half the preferred size or below.
    Released,
}

/// Why an element is being shut down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The pipeline is shutting down.
    Normal,
    /// The element was removed from a running topology.
    Removed,
    /// The pipeline halted after a failure.
    Halted(String),
}

/// Read-only view of the framework-owned part of an element's state.
pub struct CallbackContext<'a> {
    name: &'a str,
    playback: PlaybackState,
    pads: &'a PadSet,
}

impl<'a> CallbackContext<'a> {
    pub fn new(name: &'a str, playback: PlaybackState, pads: &'a PadSet) -> Self {
        Self {
            name,
            playback,
            pads,
        }
    }

    /// Name of this element within its pipeline.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback
    }

    pub fn pads(&self) -> &PadSet {
        self.pads
    }

    pub fn pad(&self, pad: &PadRef) -> Option<&PadDescriptor> {
        self.pads.get(pad)
    }

    /// Outstanding downstream demand on an output pad (0 for unknown pads).
    pub fn demand(&self, pad: &PadRef) -> u64 {
        self.pads.get(pad).map(|p| p.demand()).unwrap_or(0)
    }
}

/// A processing unit with input and output pads.
pub trait Element: Send + 'static {
    /// Short kind name used in logs, e.g. `"counting_source"`.
    fn kind(&self) -> &'static str;

    /// Static pads and dynamic pad templates of this element.
    fn pads(&self) -> Vec<PadSpec>;

    fn handle_init(&mut self, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    /// Acquire resources here.
    fn handle_stopped_to_prepared(&mut self, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_prepared_to_playing(&mut self, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_playing_to_prepared(&mut self, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    /// Release resources here. An error is logged and shutdown continues.
    fn handle_prepared_to_stopped(&mut self, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    /// Downstream demand arrived on a pull output pad; `size` is the total outstanding.
    ///
    /// The default tops up the element's only pull input pad so that the demand
    /// issued upstream matches `size`, which is what a one-in/one-out filter wants.
    fn handle_demand(
        &mut self,
        _pad: &PadRef,
        size: u64,
        ctx: &CallbackContext<'_>,
    ) -> CallbackResult {
        let Some(input) = ctx.pads().sole_pull_input() else {
            return CallbackResult::Ok;
        };
        let requested = ctx.pad(input).map(|p| p.requested()).unwrap_or(0);
        match size.saturating_sub(requested) {
            0 => CallbackResult::Ok,
            units => CallbackResult::with_actions(vec![Action::Demand {
                pad: input.clone(),
                units,
            }]),
        }
    }

    fn handle_process(
        &mut self,
        _pad: &PadRef,
        _buffer: Buffer,
        _ctx: &CallbackContext<'_>,
    ) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_caps(
        &mut self,
        _pad: &PadRef,
        _caps: &Caps,
        _ctx: &CallbackContext<'_>,
    ) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_event(
        &mut self,
        _pad: &PadRef,
        _event: &Value,
        _ctx: &CallbackContext<'_>,
    ) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_start_of_stream(&mut self, _pad: &PadRef, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_end_of_stream(&mut self, _pad: &PadRef, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    /// A dynamic pad was created and linked; no data has crossed it yet.
    fn handle_pad_added(&mut self, _pad: &PadRef, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    /// A dynamic pad was unlinked and is about to be reclaimed.
    fn handle_pad_removed(&mut self, _pad: &PadRef, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_backpressure(
        &mut self,
        _pad: &PadRef,
        _signal: Backpressure,
        _ctx: &CallbackContext<'_>,
    ) -> CallbackResult {
        CallbackResult::Ok
    }

    /// Any message not produced by the framework, e.g. forwarded by the pipeline.
    fn handle_other(&mut self, _message: Value, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    /// Called once, after the element reached `stopped`, right before its task exits.
    fn handle_shutdown(&mut self, _reason: &ShutdownReason) {}
}
