// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod counting_source;
pub mod passthrough;
pub mod tee;
pub mod testing_sink;

pub use counting_source::*;
pub use passthrough::*;
pub use tee::*;
pub use testing_sink::*;

use serde_json::{Map, Value};

use crate::engine::pad::FlowMode;

/// Choices accepted by every `mode` option.
pub(crate) const MODE_CHOICES: &[&str] = &["pull", "push"];

/// Read a schema-validated `mode` option; absent means pull.
pub(crate) fn mode_option(options: &Map<String, Value>, key: &str) -> FlowMode {
    match options.get(key).and_then(Value::as_str) {
        Some("push") => FlowMode::Push,
        _ => FlowMode::Pull,
    }
}

/// Read a schema-validated unsigned option.
pub(crate) fn unsigned_option(options: &Map<String, Value>, key: &str) -> Result<u64, String> {
    options
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("option '{}' must be an unsigned integer", key))
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::actions::{Action, CallbackResult};
    use crate::engine::pad::{PadRef, PadSet, Peer};
    use tokio::sync::mpsc;

    /// Link every pad in `pads` to a throwaway peer so actions can be reasoned about.
    pub fn linked(mut pads: PadSet, refs: &[PadRef]) -> PadSet {
        for pad in refs {
            if !pads.contains(pad) {
                pads.add_dynamic("element", pad.clone()).unwrap();
            }
            let (sender, _receiver) = mpsc::unbounded_channel();
            let mode = pads.get(pad).unwrap().mode();
            pads.get_mut(pad).unwrap().peer = Some(Peer {
                element: "peer".to_string(),
                pad: PadRef::new("peer_pad"),
                mode,
                policy: None,
                sender,
            });
        }
        pads
    }

    pub fn actions(result: CallbackResult) -> Vec<Action> {
        result.into_actions().expect("callback returned an error")
    }
}
