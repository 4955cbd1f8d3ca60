// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::actions::CallbackResult;
use crate::engine::buffer::{Buffer, Caps};
use crate::engine::pad::{PadRef, PadSpec};
use crate::traits::{Backpressure, CallbackContext, Element, ShutdownReason};

type Responder = Box<dyn FnMut(&CallbackContext<'_>) -> CallbackResult + Send>;

/// Shared, ordered record of callback invocations.
///
/// Entries are `callback` or `callback:pad` (plus `:signal` for backpressure).
#[derive(Debug, Clone, Default)]
pub struct CallbackLog(Arc<Mutex<Vec<String>>>);

impl CallbackLog {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

/// An element that records every callback and answers with scripted results.
///
/// Callbacks without a responder return `CallbackResult::Ok`.
pub struct RecordingElement {
    pads: Vec<PadSpec>,
    log: CallbackLog,
    responders: HashMap<&'static str, Responder>,
}

impl RecordingElement {
    pub fn new(pads: Vec<PadSpec>) -> Self {
        Self {
            pads,
            log: CallbackLog::default(),
            responders: HashMap::new(),
        }
    }

    pub fn with_log(mut self, log: CallbackLog) -> Self {
        self.log = log;
        self
    }

    /// Script the result of `callback` (e.g. `"handle_other"`).
    pub fn respond<F>(mut self, callback: &'static str, responder: F) -> Self
    where
        F: FnMut(&CallbackContext<'_>) -> CallbackResult + Send + 'static,
    {
        self.responders.insert(callback, Box::new(responder));
        self
    }

    /// An element whose `callback` always fails.
    pub fn failing_in(pads: Vec<PadSpec>, callback: &'static str) -> Self {
        Self::new(pads).respond(callback, move |_| {
            CallbackResult::error(format!("{} failed on purpose", callback))
        })
    }

    fn record(&mut self, callback: &'static str, entry: String, ctx: &CallbackContext<'_>) -> CallbackResult {
        self.log.push(entry);
        match self.responders.get_mut(callback) {
            Some(responder) => responder(ctx),
            None => CallbackResult::Ok,
        }
    }
}

impl Element for RecordingElement {
    fn kind(&self) -> &'static str {
        "recording"
    }

    fn pads(&self) -> Vec<PadSpec> {
        self.pads.clone()
    }

    fn handle_init(&mut self, ctx: &CallbackContext<'_>) -> CallbackResult {
        self.record("handle_init", "handle_init".to_string(), ctx)
    }

    fn handle_stopped_to_prepared(&mut self, ctx: &CallbackContext<'_>) -> CallbackResult {
        let name = "handle_stopped_to_prepared";
        self.record(name, name.to_string(), ctx)
    }

    fn handle_prepared_to_playing(&mut self, ctx: &CallbackContext<'_>) -> CallbackResult {
        let name = "handle_prepared_to_playing";
        self.record(name, name.to_string(), ctx)
    }

    fn handle_playing_to_prepared(&mut self, ctx: &CallbackContext<'_>) -> CallbackResult {
        let name = "handle_playing_to_prepared";
        self.record(name, name.to_string(), ctx)
    }

    fn handle_prepared_to_stopped(&mut self, ctx: &CallbackContext<'_>) -> CallbackResult {
        let name = "handle_prepared_to_stopped";
        self.record(name, name.to_string(), ctx)
    }

    fn handle_demand(&mut self, pad: &PadRef, _size: u64, ctx: &CallbackContext<'_>) -> CallbackResult {
        self.record("handle_demand", format!("handle_demand:{}", pad), ctx)
    }

    fn handle_process(&mut self, pad: &PadRef, _buffer: Buffer, ctx: &CallbackContext<'_>) -> CallbackResult {
        self.record("handle_process", format!("handle_process:{}", pad), ctx)
    }

    fn handle_caps(&mut self, pad: &PadRef, _caps: &Caps, ctx: &CallbackContext<'_>) -> CallbackResult {
        self.record("handle_caps", format!("handle_caps:{}", pad), ctx)
    }

    fn handle_event(&mut self, pad: &PadRef, _event: &Value, ctx: &CallbackContext<'_>) -> CallbackResult {
        self.record("handle_event", format!("handle_event:{}", pad), ctx)
    }

    fn handle_start_of_stream(&mut self, pad: &PadRef, ctx: &CallbackContext<'_>) -> CallbackResult {
        self.record("handle_start_of_stream", format!("handle_start_of_stream:{}", pad), ctx)
    }

    fn handle_end_of_stream(&mut self, pad: &PadRef, ctx: &CallbackContext<'_>) -> CallbackResult {
        self.record("handle_end_of_stream", format!("handle_end_of_stream:{}", pad), ctx)
    }

    fn handle_pad_added(&mut self, pad: &PadRef, ctx: &CallbackContext<'_>) -> CallbackResult {
        self.record("handle_pad_added", format!("handle_pad_added:{}", pad), ctx)
    }

    fn handle_pad_removed(&mut self, pad: &PadRef, ctx: &CallbackContext<'_>) -> CallbackResult {
        self.record("handle_pad_removed", format!("handle_pad_removed:{}", pad), ctx)
    }

    fn handle_backpressure(
        &mut self,
        pad: &PadRef,
        signal: Backpressure,
        ctx: &CallbackContext<'_>,
    ) -> CallbackResult {
        self.record(
            "handle_backpressure",
            format!("handle_backpressure:{}:{:?}", pad, signal),
            ctx,
        )
    }

    fn handle_other(&mut self, message: Value, ctx: &CallbackContext<'_>) -> CallbackResult {
        self.record("handle_other", format!("handle_other:{}", message), ctx)
    }

    fn handle_shutdown(&mut self, _reason: &ShutdownReason) {
        self.log.push("handle_shutdown".to_string());
    }
}
