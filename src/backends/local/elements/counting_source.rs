// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{json, Map, Value};

use super::{mode_option, unsigned_option, MODE_CHOICES};
use crate::actions::{Action, CallbackResult};
use crate::config::schema::{OptionKind, OptionsSchema};
use crate::engine::buffer::Buffer;
use crate::engine::pad::{FlowMode, PadRef, PadSpec, DEFAULT_OUTPUT_PAD};
use crate::traits::{CallbackContext, Element};

/// Counting source - emits `count` numbered buffers on `output`, then end of stream.
///
/// In pull mode it sends at most the outstanding demand per `handle_demand`. In push
/// mode it sends everything as soon as it starts playing.
pub struct CountingSource {
    count: u64,
    emitted: u64,
    mode: FlowMode,
    finished: bool,
}

impl CountingSource {
    pub fn new(count: u64) -> Self {
        Self {
            count,
            emitted: 0,
            mode: FlowMode::Pull,
            finished: false,
        }
    }

    pub fn with_mode(mut self, mode: FlowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn schema() -> OptionsSchema {
        OptionsSchema::new()
            .required("count", OptionKind::Unsigned, "Number of buffers to emit")
            .optional(
                "mode",
                OptionKind::OneOf(MODE_CHOICES),
                json!("pull"),
                "Flow mode of the output pad",
            )
    }

    pub fn from_options(options: &Map<String, Value>) -> Result<Box<dyn Element>, String> {
        let count = unsigned_option(options, "count")?;
        Ok(Box::new(Self::new(count).with_mode(mode_option(options, "mode"))))
    }

    /// Payload of the `n`th buffer (1-based).
    pub fn payload(n: u64) -> Vec<u8> {
        if n < 256 {
            vec![n as u8]
        } else {
            n.to_le_bytes().to_vec()
        }
    }

    fn remaining(&self) -> u64 {
        self.count - self.emitted
    }

    /// Emit up to `limit` buffers, and end of stream once the count is reached.
    fn emit(&mut self, limit: u64) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.finished {
            return actions;
        }

        let n = limit.min(self.remaining());
        if n > 0 {
            let buffers = (self.emitted + 1..=self.emitted + n)
                .map(|i| Buffer::new(Self::payload(i)))
                .collect();
            self.emitted += n;
            actions.push(Action::Buffer {
                pad: PadRef::new(DEFAULT_OUTPUT_PAD),
                buffers,
            });
        }

        if self.remaining() == 0 {
            self.finished = true;
            actions.push(Action::EndOfStream(PadRef::new(DEFAULT_OUTPUT_PAD)));
        }
        actions
    }
}

impl Element for CountingSource {
    fn kind(&self) -> &'static str {
        "counting_source"
    }

    fn pads(&self) -> Vec<PadSpec> {
        vec![PadSpec::output(DEFAULT_OUTPUT_PAD, self.mode)]
    }

    fn handle_prepared_to_playing(&mut self, _ctx: &CallbackContext<'_>) -> CallbackResult {
        match self.mode {
            FlowMode::Push => CallbackResult::with_actions(self.emit(self.remaining())),
            FlowMode::Pull => CallbackResult::Ok,
        }
    }

    fn handle_demand(&mut self, _pad: &PadRef, size: u64, _ctx: &CallbackContext<'_>) -> CallbackResult {
        CallbackResult::with_actions(self.emit(size))
    }
}
