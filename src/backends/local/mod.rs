// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod elements;

pub use elements::*;

use crate::config::registry::ElementRegistry;

/// Register every built-in element kind.
///
/// Kind names are what config files put in `kind:`:
/// - "counting_source" -> [`CountingSource`]
/// - "passthrough" -> [`Passthrough`]
/// - "tee" -> [`Tee`]
/// - "testing_sink" -> [`TestingSink`]
pub fn register_builtins(registry: &mut ElementRegistry) {
    registry.register(
        "counting_source",
        "Emits `count` numbered buffers on `output`, then end of stream.",
        CountingSource::schema(),
        CountingSource::from_options,
    );
    registry.register(
        "passthrough",
        "Forwards buffers, caps and end of stream from `input` to `output`.",
        Passthrough::schema(),
        Passthrough::from_options,
    );
    registry.register(
        "tee",
        "Copies every buffer from `input` to each linked dynamic `output#id` pad.",
        Tee::schema(),
        Tee::from_options,
    );
    registry.register(
        "testing_sink",
        "Reports every received buffer to its pipeline as a `{\"buffer\": ...}` notification.",
        TestingSink::schema(),
        TestingSink::from_options,
    );
}
