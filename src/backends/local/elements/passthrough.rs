// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::VecDeque;

use serde_json::{json, Map, Value};

use super::{mode_option, MODE_CHOICES};
use crate::actions::{Action, CallbackResult};
use crate::config::schema::{OptionKind, OptionsSchema};
use crate::engine::buffer::{Buffer, Caps};
use crate::engine::pad::{FlowMode, PadRef, PadSpec, DEFAULT_INPUT_PAD, DEFAULT_OUTPUT_PAD};
use crate::traits::{Backpressure, CallbackContext, Element};

/// Demand a push-mode passthrough keeps outstanding upstream.
pub const PUSH_DEMAND_WINDOW: u64 = 4;

/// Passthrough filter - forwards buffers, caps and end of stream from `input` to `output`.
///
/// With a pull output, downstream demand is forwarded upstream and buffers that
/// arrive without demand (from a push producer) are held until it arrives. With a
/// push output, the filter keeps [`PUSH_DEMAND_WINDOW`] units requested upstream and
/// stops topping up while its output reports backpressure.
pub struct Passthrough {
    mode: FlowMode,
    held: VecDeque<Buffer>,
    end_of_stream_held: bool,
    engaged: bool,
}

impl Default for Passthrough {
    fn default() -> Self {
        Self::new()
    }
}

impl Passthrough {
    pub fn new() -> Self {
        Self {
            mode: FlowMode::Pull,
            held: VecDeque::new(),
            end_of_stream_held: false,
            engaged: false,
        }
    }

    /// Set the flow mode of the output pad.
    pub fn with_mode(mut self, mode: FlowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn schema() -> OptionsSchema {
        OptionsSchema::new().optional(
            "mode",
            OptionKind::OneOf(MODE_CHOICES),
            json!("pull"),
            "Flow mode of the output pad",
        )
    }

    pub fn from_options(options: &Map<String, Value>) -> Result<Box<dyn Element>, String> {
        Ok(Box::new(Self::new().with_mode(mode_option(options, "mode"))))
    }

    fn output() -> PadRef {
        PadRef::new(DEFAULT_OUTPUT_PAD)
    }

    fn input() -> PadRef {
        PadRef::new(DEFAULT_INPUT_PAD)
    }

    /// Demand needed on `input` to keep the push window full.
    fn top_up(&self, ctx: &CallbackContext<'_>) -> Option<Action> {
        if self.engaged {
            return None;
        }
        let requested = ctx.pad(&Self::input()).map(|p| p.requested()).unwrap_or(0);
        match PUSH_DEMAND_WINDOW.saturating_sub(requested) {
            0 => None,
            units => Some(Action::demand(DEFAULT_INPUT_PAD, units)),
        }
    }

    /// Send held buffers within `demand`, then a held end of stream once drained.
    fn release_held(&mut self, demand: u64) -> Vec<Action> {
        let n = (demand as usize).min(self.held.len());
        let mut actions = Vec::new();
        if n > 0 {
            actions.push(Action::Buffer {
                pad: Self::output(),
                buffers: self.held.drain(..n).collect(),
            });
        }
        if self.held.is_empty() && self.end_of_stream_held {
            self.end_of_stream_held = false;
            actions.push(Action::EndOfStream(Self::output()));
        }
        actions
    }
}

impl Element for Passthrough {
    fn kind(&self) -> &'static str {
        "passthrough"
    }

    fn pads(&self) -> Vec<PadSpec> {
        vec![
            PadSpec::input(DEFAULT_INPUT_PAD, FlowMode::Pull),
            PadSpec::output(DEFAULT_OUTPUT_PAD, self.mode),
        ]
    }

    fn handle_prepared_to_playing(&mut self, ctx: &CallbackContext<'_>) -> CallbackResult {
        match self.mode {
            FlowMode::Push => CallbackResult::with_actions(self.top_up(ctx).into_iter().collect()),
            FlowMode::Pull => CallbackResult::Ok,
        }
    }

    fn handle_demand(&mut self, _pad: &PadRef, size: u64, ctx: &CallbackContext<'_>) -> CallbackResult {
        let mut actions = self.release_held(size);
        let still_wanted = size.saturating_sub(
            actions
                .iter()
                .map(|a| match a {
                    Action::Buffer { buffers, .. } => buffers.len() as u64,
                    _ => 0,
                })
                .sum(),
        );
        let requested = ctx.pad(&Self::input()).map(|p| p.requested()).unwrap_or(0);
        let units = still_wanted.saturating_sub(requested);
        if units > 0 && !self.end_of_stream_held {
            actions.push(Action::demand(DEFAULT_INPUT_PAD, units));
        }
        CallbackResult::with_actions(actions)
    }

    fn handle_process(&mut self, _pad: &PadRef, buffer: Buffer, ctx: &CallbackContext<'_>) -> CallbackResult {
        match self.mode {
            FlowMode::Pull if ctx.demand(&Self::output()) == 0 => {
                self.held.push_back(buffer);
                CallbackResult::Ok
            }
            FlowMode::Pull => CallbackResult::with_actions(vec![Action::buffer(DEFAULT_OUTPUT_PAD, buffer)]),
            FlowMode::Push => {
                let mut actions = vec![Action::buffer(DEFAULT_OUTPUT_PAD, buffer)];
                actions.extend(self.top_up(ctx));
                CallbackResult::with_actions(actions)
            }
        }
    }

    fn handle_caps(&mut self, _pad: &PadRef, caps: &Caps, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::with_actions(vec![Action::Caps {
            pad: Self::output(),
            caps: caps.clone(),
        }])
    }

    fn handle_end_of_stream(&mut self, _pad: &PadRef, _ctx: &CallbackContext<'_>) -> CallbackResult {
        if self.held.is_empty() {
            CallbackResult::with_actions(vec![Action::EndOfStream(Self::output())])
        } else {
            self.end_of_stream_held = true;
            CallbackResult::Ok
        }
    }

    fn handle_backpressure(
        &mut self,
        _pad: &PadRef,
        signal: Backpressure,
        ctx: &CallbackContext<'_>,
    ) -> CallbackResult {
        self.engaged = signal == Backpressure::Engaged;
        CallbackResult::with_actions(self.top_up(ctx).into_iter().collect())
    }
}
