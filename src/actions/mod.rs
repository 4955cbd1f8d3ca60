// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The action protocol: side effects a callback asks the framework to perform.
//!
//! Callbacks never touch channels or other actors. They return a [`CallbackResult`]
//! and the dispatcher executes the contained [`Action`]s strictly in order once
//! the callback has returned.
//!
//! # Examples
//!
//! ```
//! use the_conduit::actions::{combine_results, Action, CallbackResult};
//! use serde_json::json;
//!
//! let delegate = CallbackResult::with_actions(vec![Action::Notify(json!("from module"))]);
//! let framework = CallbackResult::with_actions(vec![Action::Notify(json!("from framework"))]);
//!
//! let combined = combine_results(delegate, framework).into_actions().unwrap();
//! assert_eq!(combined.len(), 2);
//! ```

use serde_json::Value;

use crate::config::TopologySpec;
use crate::engine::buffer::{Buffer, Caps};
use crate::engine::pad::PadRef;

/// A tagged side-effect request.
///
/// Element actors accept the pad-level actions and `Notify`/`Shutdown`; pipeline
/// actors accept the topology actions and `Notify`/`Shutdown`. Anything else is a
/// callback-return contract violation.
#[derive(Debug)]
pub enum Action {
    /// Send buffers on an output pad. Each buffer consumes one demand unit in pull mode.
    Buffer { pad: PadRef, buffers: Vec<Buffer> },
    /// Announce stream capabilities on an output pad.
    Caps { pad: PadRef, caps: Caps },
    /// Ask the upstream peer of a pull input pad for `units` more buffers.
    Demand { pad: PadRef, units: u64 },
    /// Run `handle_demand` again for an output pad that still has demand.
    Redemand(PadRef),
    /// Send a custom in-band event on a pad.
    Event { pad: PadRef, event: Value },
    /// Send end-of-stream on an output pad.
    EndOfStream(PadRef),
    /// One-way message to the parent (element) or the observer (pipeline).
    Notify(Value),
    /// Deliver a message to a named child unchanged.
    Forward { child: String, message: Value },
    /// Add children and links to the running topology.
    Spec(TopologySpec),
    /// Unlink, stop and shut down a child.
    RemoveChild(String),
    /// Ask for this actor to be shut down.
    Shutdown,
}

impl Action {
    /// Send a single buffer.
    pub fn buffer(pad: impl Into<PadRef>, buffer: Buffer) -> Self {
        Action::Buffer {
            pad: pad.into(),
            buffers: vec![buffer],
        }
    }

    pub fn demand(pad: impl Into<PadRef>, units: u64) -> Self {
        Action::Demand {
            pad: pad.into(),
            units,
        }
    }

    pub fn forward(child: impl Into<String>, message: Value) -> Self {
        Action::Forward {
            child: child.into(),
            message,
        }
    }

    /// Tag used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Buffer { .. } => "buffer",
            Action::Caps { .. } => "caps",
            Action::Demand { .. } => "demand",
            Action::Redemand(_) => "redemand",
            Action::Event { .. } => "event",
            Action::EndOfStream(_) => "end_of_stream",
            Action::Notify(_) => "notify",
            Action::Forward { .. } => "forward",
            Action::Spec(_) => "spec",
            Action::RemoveChild(_) => "remove_child",
            Action::Shutdown => "shutdown",
        }
    }
}

/// The normalized return shape of every callback.
///
/// * `Ok` - success, no side effects
/// * `OkWithActions` - success, with an ordered list of actions
/// * `Error` - failure; terminates handling of the current message for this actor
///
/// The callback's updated private state is the `&mut self` it was invoked on.
#[derive(Debug)]
pub enum CallbackResult {
    Ok,
    OkWithActions(Vec<Action>),
    Error(String),
}

impl CallbackResult {
    pub fn ok() -> Self {
        CallbackResult::Ok
    }

    pub fn with_actions(actions: Vec<Action>) -> Self {
        CallbackResult::OkWithActions(actions)
    }

    pub fn error(reason: impl Into<String>) -> Self {
        CallbackResult::Error(reason.into())
    }

    /// Flatten to the action list; `Ok` is the empty list.
    pub fn into_actions(self) -> Result<Vec<Action>, String> {
        match self {
            CallbackResult::Ok => Ok(Vec::new()),
            CallbackResult::OkWithActions(actions) => Ok(actions),
            CallbackResult::Error(reason) => Err(reason),
        }
    }
}

impl From<Vec<Action>> for CallbackResult {
    fn from(actions: Vec<Action>) -> Self {
        CallbackResult::OkWithActions(actions)
    }
}

/// Combine a delegate's result with the framework's result for the same event.
///
/// The delegate's actions come first, then the framework's, each side keeping its
/// own order. A side with no actions contributes the empty list. An error on either
/// side wins, the delegate's error first.
pub fn combine_results(delegate: CallbackResult, framework: CallbackResult) -> CallbackResult {
    match (delegate, framework) {
        (CallbackResult::Error(reason), _) | (_, CallbackResult::Error(reason)) => {
            CallbackResult::Error(reason)
        }
        (CallbackResult::Ok, CallbackResult::Ok) => CallbackResult::Ok,
        (delegate, framework) => {
            let mut actions = delegate.into_actions().unwrap_or_default();
            actions.extend(framework.into_actions().unwrap_or_default());
            CallbackResult::OkWithActions(actions)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notify(tag: &str) -> Action {
        Action::Notify(json!(tag))
    }

    fn tags(result: CallbackResult) -> Vec<Value> {
        result
            .into_actions()
            .unwrap()
            .into_iter()
            .map(|action| match action {
                Action::Notify(value) => value,
                other => panic!("Unexpected action {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_combine_preserves_delegate_then_framework_order() {
        let delegate = CallbackResult::with_actions(vec![notify("d1"), notify("d2")]);
        let framework = CallbackResult::with_actions(vec![notify("f1"), notify("f2")]);

        assert_eq!(
            tags(combine_results(delegate, framework)),
            vec![json!("d1"), json!("d2"), json!("f1"), json!("f2")]
        );
    }

    #[test]
    fn test_combine_treats_no_actions_as_empty() {
        let framework = CallbackResult::with_actions(vec![notify("f1")]);
        assert_eq!(
            tags(combine_results(CallbackResult::Ok, framework)),
            vec![json!("f1")]
        );

        let delegate = CallbackResult::with_actions(vec![notify("d1")]);
        assert_eq!(
            tags(combine_results(delegate, CallbackResult::Ok)),
            vec![json!("d1")]
        );

        assert!(matches!(
            combine_results(CallbackResult::Ok, CallbackResult::Ok),
            CallbackResult::Ok
        ));
    }

    #[test]
    fn test_combine_propagates_errors() {
        let result = combine_results(
            CallbackResult::error("delegate failed"),
            CallbackResult::with_actions(vec![notify("f1")]),
        );
        assert_eq!(result.into_actions().unwrap_err(), "delegate failed");

        let result = combine_results(CallbackResult::Ok, CallbackResult::error("framework failed"));
        assert_eq!(result.into_actions().unwrap_err(), "framework failed");
    }

    #[test]
    fn test_action_names() {
        assert_eq!(Action::demand("input", 3).name(), "demand");
        assert_eq!(Action::buffer("output", Buffer::new(vec![1])).name(), "buffer");
        assert_eq!(Action::forward("sink", json!(null)).name(), "forward");
        assert_eq!(Action::Shutdown.name(), "shutdown");
    }
}
