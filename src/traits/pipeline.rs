// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Callback contract for a pipeline's governing module.
//!
//! A governing module is the user-supplied delegate of a pipeline. For every event
//! the pipeline first runs the module's callback, then its own handling, and
//! executes the concatenation of both action lists (see
//! [`crate::actions::combine_results`]). The module's state lives in the module
//! itself and is never touched by the framework.

use serde_json::Value;

use crate::actions::CallbackResult;
use crate::engine::pad::PadRef;
use crate::engine::playback::PlaybackState;

/// Read-only view of the pipeline's framework-owned state.
pub struct PipelineContext<'a> {
    name: &'a str,
    playback: PlaybackState,
    children: Vec<&'a str>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(name: &'a str, playback: PlaybackState, children: Vec<&'a str>) -> Self {
        Self {
            name,
            playback,
            children,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback
    }

    pub fn children(&self) -> &[&'a str] {
        &self.children
    }
}

pub trait PipelineModule: Send + 'static {
    /// Produce the initial topology, normally as a single `Action::Spec`.
    fn handle_init(&mut self) -> CallbackResult;

    fn handle_stopped_to_prepared(&mut self, _ctx: &PipelineContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_prepared_to_playing(&mut self, _ctx: &PipelineContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_playing_to_prepared(&mut self, _ctx: &PipelineContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_prepared_to_stopped(&mut self, _ctx: &PipelineContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    /// A child emitted a notification.
    fn handle_notification(
        &mut self,
        _notification: &Value,
        _element: &str,
        _ctx: &PipelineContext<'_>,
    ) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_element_start_of_stream(
        &mut self,
        _element: &str,
        _pad: &PadRef,
        _ctx: &PipelineContext<'_>,
    ) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_element_end_of_stream(
        &mut self,
        _element: &str,
        _pad: &PadRef,
        _ctx: &PipelineContext<'_>,
    ) -> CallbackResult {
        CallbackResult::Ok
    }

    /// Children from an `Action::Spec` have been spawned and linked.
    fn handle_spec_started(&mut self, _children: &[String], _ctx: &PipelineContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    /// A child failed. Whether the pipeline halts is decided by its `FailureStrategy`.
    fn handle_child_failure(
        &mut self,
        _element: &str,
        _reason: &str,
        _ctx: &PipelineContext<'_>,
    ) -> CallbackResult {
        CallbackResult::Ok
    }

    /// A message the framework does not recognize.
    fn handle_other(&mut self, _message: &Value, _ctx: &PipelineContext<'_>) -> CallbackResult {
        CallbackResult::Ok
    }

    fn handle_shutdown(&mut self) {}
}
