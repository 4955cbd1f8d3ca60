// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{json, Map, Value};

use super::{mode_option, unsigned_option, MODE_CHOICES};
use crate::actions::{Action, CallbackResult};
use crate::config::schema::{OptionKind, OptionsSchema};
use crate::engine::buffer::{Buffer, Caps};
use crate::engine::pad::{FlowMode, PadRef, PadSpec, DEFAULT_INPUT_PAD};
use crate::traits::{CallbackContext, Element};

/// Testing sink - reports every buffer to its parent as `{"buffer": <buffer>}`.
///
/// With a pull input it demands `demand_batch` buffers once playing and tops the
/// demand back up as buffers arrive. Caps are reported as `{"caps": <caps>}`.
pub struct TestingSink {
    mode: FlowMode,
    demand_batch: u64,
}

impl Default for TestingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TestingSink {
    pub fn new() -> Self {
        Self {
            mode: FlowMode::Pull,
            demand_batch: 4,
        }
    }

    pub fn with_mode(mut self, mode: FlowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_demand_batch(mut self, demand_batch: u64) -> Self {
        self.demand_batch = demand_batch.max(1);
        self
    }

    pub fn schema() -> OptionsSchema {
        OptionsSchema::new()
            .optional(
                "mode",
                OptionKind::OneOf(MODE_CHOICES),
                json!("pull"),
                "Flow mode of the input pad",
            )
            .optional(
                "demand_batch",
                OptionKind::Unsigned,
                json!(4),
                "Buffers requested per demand",
            )
    }

    pub fn from_options(options: &Map<String, Value>) -> Result<Box<dyn Element>, String> {
        Ok(Box::new(
            Self::new()
                .with_mode(mode_option(options, "mode"))
                .with_demand_batch(unsigned_option(options, "demand_batch")?),
        ))
    }

    /// A fresh batch once everything requested so far has arrived.
    fn demand(&self, ctx: &CallbackContext<'_>) -> Option<Action> {
        if self.mode == FlowMode::Push {
            return None;
        }
        let input = PadRef::new(DEFAULT_INPUT_PAD);
        match ctx.pad(&input).map(|p| p.requested()) {
            Some(0) => Some(Action::Demand {
                pad: input,
                units: self.demand_batch,
            }),
            _ => None,
        }
    }
}

impl Element for TestingSink {
    fn kind(&self) -> &'static str {
        "testing_sink"
    }

    fn pads(&self) -> Vec<PadSpec> {
        vec![PadSpec::input(DEFAULT_INPUT_PAD, self.mode)]
    }

    fn handle_prepared_to_playing(&mut self, ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::with_actions(self.demand(ctx).into_iter().collect())
    }

    fn handle_process(&mut self, _pad: &PadRef, buffer: Buffer, ctx: &CallbackContext<'_>) -> CallbackResult {
        let mut actions = vec![Action::Notify(json!({ "buffer": buffer }))];
        actions.extend(self.demand(ctx));
        CallbackResult::with_actions(actions)
    }

    fn handle_caps(&mut self, _pad: &PadRef, caps: &Caps, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::with_actions(vec![Action::Notify(json!({ "caps": caps }))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::elements::testing::{actions, linked};
    use crate::engine::pad::PadSet;
    use crate::engine::playback::PlaybackState;

    #[test]
    fn test_sink_demands_a_batch_when_playing_starts() {
        let mut sink = TestingSink::new().with_demand_batch(2);
        let pads = linked(PadSet::from_specs(sink.pads()), &[PadRef::new("input")]);
        let ctx = CallbackContext::new("sink", PlaybackState::Prepared, &pads);

        match &actions(sink.handle_prepared_to_playing(&ctx))[..] {
            [Action::Demand { pad, units }] => {
                assert_eq!(pad, &PadRef::new("input"));
                assert_eq!(*units, 2);
            }
            other => panic!("Expected one Demand, got {:?}", other),
        }
    }

    #[test]
    fn test_sink_notifies_each_buffer_and_redemands_when_drained() {
        let mut sink = TestingSink::new().with_demand_batch(2);
        let mut pads = linked(PadSet::from_specs(sink.pads()), &[PadRef::new("input")]);
        pads.get_mut(&PadRef::new("input")).unwrap().requested = 1;

        {
            let ctx = CallbackContext::new("sink", PlaybackState::Playing, &pads);
            match &actions(sink.handle_process(&PadRef::new("input"), Buffer::new(vec![1]), &ctx))[..] {
                [Action::Notify(payload)] => {
                    assert_eq!(payload, &json!({"buffer": {"payload": [1], "metadata": {}}}))
                }
                other => panic!("Expected only a Notify, got {:?}", other),
            }
        }

        pads.get_mut(&PadRef::new("input")).unwrap().requested = 0;
        let ctx = CallbackContext::new("sink", PlaybackState::Playing, &pads);
        assert!(matches!(
            &actions(sink.handle_process(&PadRef::new("input"), Buffer::new(vec![2]), &ctx))[..],
            [Action::Notify(_), Action::Demand { units: 2, .. }]
        ));
    }

    #[test]
    fn test_push_sink_never_demands() {
        let mut sink = TestingSink::new().with_mode(FlowMode::Push);
        let pads = linked(PadSet::from_specs(sink.pads()), &[PadRef::new("input")]);
        let ctx = CallbackContext::new("sink", PlaybackState::Prepared, &pads);

        assert!(actions(sink.handle_prepared_to_playing(&ctx)).is_empty());
        assert_eq!(
            actions(sink.handle_process(&PadRef::new("input"), Buffer::new(vec![1]), &ctx)).len(),
            1
        );
    }
}
