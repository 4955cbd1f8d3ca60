// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use super::unsigned_option;
use crate::actions::{Action, CallbackResult};
use crate::config::schema::{OptionKind, OptionsSchema};
use crate::engine::buffer::{Buffer, Caps};
use crate::engine::pad::{FlowMode, PadRef, PadSpec, DEFAULT_INPUT_PAD, DEFAULT_OUTPUT_PAD};
use crate::traits::{Backpressure, CallbackContext, Element};

/// Tee - copies every buffer from `input` to each linked dynamic `output#id` pad.
///
/// Outputs are push pads, so the tee drives its own upstream demand: it keeps
/// `window` units requested while no output reports backpressure.
pub struct Tee {
    window: u64,
    engaged: BTreeSet<PadRef>,
}

impl Default for Tee {
    fn default() -> Self {
        Self::new()
    }
}

impl Tee {
    pub fn new() -> Self {
        Self {
            window: 4,
            engaged: BTreeSet::new(),
        }
    }

    pub fn with_window(mut self, window: u64) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn schema() -> OptionsSchema {
        OptionsSchema::new().optional(
            "window",
            OptionKind::Unsigned,
            json!(4),
            "Buffers kept requested from upstream",
        )
    }

    pub fn from_options(options: &Map<String, Value>) -> Result<Box<dyn Element>, String> {
        Ok(Box::new(Self::new().with_window(unsigned_option(options, "window")?)))
    }

    fn linked_outputs(ctx: &CallbackContext<'_>) -> Vec<PadRef> {
        ctx.pads()
            .outputs()
            .filter(|p| p.is_linked())
            .map(|p| p.pad().clone())
            .collect()
    }

    fn top_up(&self, ctx: &CallbackContext<'_>) -> Option<Action> {
        if !self.engaged.is_empty() {
            return None;
        }
        let input = PadRef::new(DEFAULT_INPUT_PAD);
        let requested = ctx.pad(&input).map(|p| p.requested()).unwrap_or(0);
        match self.window.saturating_sub(requested) {
            0 => None,
            units => Some(Action::Demand { pad: input, units }),
        }
    }
}

impl Element for Tee {
    fn kind(&self) -> &'static str {
        "tee"
    }

    fn pads(&self) -> Vec<PadSpec> {
        vec![
            PadSpec::input(DEFAULT_INPUT_PAD, FlowMode::Pull),
            PadSpec::dynamic_output(DEFAULT_OUTPUT_PAD, FlowMode::Push),
        ]
    }

    fn handle_prepared_to_playing(&mut self, ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::with_actions(self.top_up(ctx).into_iter().collect())
    }

    fn handle_process(&mut self, _pad: &PadRef, buffer: Buffer, ctx: &CallbackContext<'_>) -> CallbackResult {
        let mut actions: Vec<Action> = Self::linked_outputs(ctx)
            .into_iter()
            .map(|pad| Action::buffer(pad, buffer.clone()))
            .collect();
        actions.extend(self.top_up(ctx));
        CallbackResult::with_actions(actions)
    }

    fn handle_caps(&mut self, _pad: &PadRef, caps: &Caps, ctx: &CallbackContext<'_>) -> CallbackResult {
        Self::linked_outputs(ctx)
            .into_iter()
            .map(|pad| Action::Caps {
                pad,
                caps: caps.clone(),
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn handle_end_of_stream(&mut self, _pad: &PadRef, ctx: &CallbackContext<'_>) -> CallbackResult {
        Self::linked_outputs(ctx)
            .into_iter()
            .map(Action::EndOfStream)
            .collect::<Vec<_>>()
            .into()
    }

    fn handle_pad_removed(&mut self, pad: &PadRef, ctx: &CallbackContext<'_>) -> CallbackResult {
        // A removed output can no longer release its backpressure.
        if self.engaged.remove(pad) {
            return CallbackResult::with_actions(self.top_up(ctx).into_iter().collect());
        }
        CallbackResult::Ok
    }

    fn handle_backpressure(
        &mut self,
        pad: &PadRef,
        signal: Backpressure,
        ctx: &CallbackContext<'_>,
    ) -> CallbackResult {
        match signal {
            Backpressure::Engaged => {
                self.engaged.insert(pad.clone());
                CallbackResult::Ok
            }
            Backpressure::Released => {
                self.engaged.remove(pad);
                CallbackResult::with_actions(self.top_up(ctx).into_iter().collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::elements::testing::{actions, linked};
    use crate::engine::pad::PadSet;
    use crate::engine::playback::PlaybackState;

    fn outputs() -> Vec<PadRef> {
        vec![PadRef::dynamic("output", "1"), PadRef::dynamic("output", "2")]
    }

    #[test]
    fn test_buffer_is_copied_to_every_linked_output() {
        let mut tee = Tee::new().with_window(1);
        let mut refs = outputs();
        refs.push(PadRef::new("input"));
        let mut pads = linked(PadSet::from_specs(tee.pads()), &refs);
        pads.get_mut(&PadRef::new("input")).unwrap().requested = 1;
        let ctx = CallbackContext::new("tee", PlaybackState::Playing, &pads);

        let sent: Vec<PadRef> = actions(tee.handle_process(&PadRef::new("input"), Buffer::new(vec![9]), &ctx))
            .into_iter()
            .map(|action| match action {
                Action::Buffer { pad, buffers } => {
                    assert_eq!(buffers, vec![Buffer::new(vec![9])]);
                    pad
                }
                other => panic!("Unexpected action {:?}", other),
            })
            .collect();
        assert_eq!(sent, outputs());
    }

    #[test]
    fn test_demand_is_suppressed_until_every_output_releases() {
        let mut tee = Tee::new();
        let pads = linked(PadSet::from_specs(tee.pads()), &outputs());
        let ctx = CallbackContext::new("tee", PlaybackState::Playing, &pads);
        let [first, second] = [outputs()[0].clone(), outputs()[1].clone()];

        tee.handle_backpressure(&first, Backpressure::Engaged, &ctx);
        tee.handle_backpressure(&second, Backpressure::Engaged, &ctx);
        assert!(actions(tee.handle_backpressure(&first, Backpressure::Released, &ctx)).is_empty());
        assert!(matches!(
            &actions(tee.handle_backpressure(&second, Backpressure::Released, &ctx))[..],
            [Action::Demand { units: 4, .. }]
        ));
    }

    #[test]
    fn test_end_of_stream_reaches_every_output() {
        let mut tee = Tee::new();
        let pads = linked(PadSet::from_specs(tee.pads()), &outputs());
        let ctx = CallbackContext::new("tee", PlaybackState::Playing, &pads);

        let ended: Vec<PadRef> = actions(tee.handle_end_of_stream(&PadRef::new("input"), &ctx))
            .into_iter()
            .map(|action| match action {
                Action::EndOfStream(pad) => pad,
                other => panic!("Unexpected action {:?}", other),
            })
            .collect();
        assert_eq!(ended, outputs());
    }
}
