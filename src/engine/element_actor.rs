// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The element actor: one tokio task per element, fed by an unbounded mailbox.
//!
//! The task reads one [`ElementMessage`] at a time and hands it to the
//! [`ElementRuntime`]; the only suspension point is the mailbox receive between
//! messages. Everything the element wants its parent to know travels as a
//! [`ChildReport`].

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::engine::buffer::{Buffer, Caps, StreamEvent};
use crate::engine::dispatcher::{ElementCallback, ElementRuntime, Flow};
use crate::engine::pad::{PadRef, Peer};
use crate::engine::playback::PlaybackState;
use crate::errors::RuntimeError;
use crate::observability::messages::element::{ElementFailed, ElementStarted, ElementTerminated};
use crate::observability::messages::StructuredLog;
use crate::traits::{Backpressure, Element, ShutdownReason};

/// Everything an element's mailbox accepts.
///
/// Pad-addressed variants name the pad on the receiving element.
#[derive(Debug)]
pub enum ElementMessage {
    /// Move one adjacent step towards `target` (or acknowledge if already there).
    ChangePlayback { target: PlaybackState },
    /// Link `pad` to `peer`, creating the pad first if it is a dynamic instance.
    LinkPad { pad: PadRef, peer: Peer },
    /// Tear down the link on `pad`; dynamic pads are then removed.
    UnlinkPad { pad: PadRef },
    Buffer { pad: PadRef, buffers: Vec<Buffer> },
    Caps { pad: PadRef, caps: Caps },
    /// Downstream demand for `units` more buffers on output `pad`.
    Demand { pad: PadRef, units: u64 },
    Event { pad: PadRef, event: StreamEvent },
    /// The consumer processed `units` buffers sent on push output `pad`.
    Ack { pad: PadRef, units: u64 },
    Backpressure { pad: PadRef, signal: Backpressure },
    Redemand { pad: PadRef },
    /// Anything else, e.g. a payload forwarded by the pipeline.
    Other(Value),
    Shutdown { reason: ShutdownReason },
}

/// A message from a child to its pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildReport {
    pub child: String,
    pub event: ChildEvent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChildEvent {
    /// Acknowledges a `ChangePlayback`; carries the state now reached.
    PlaybackChanged(PlaybackState),
    Notification(Value),
    StartOfStream(PadRef),
    EndOfStream(PadRef),
    /// The element returned `Action::Shutdown`.
    ShutdownRequested,
    /// The element hit a fatal error and its task has exited.
    Failed(String),
    /// The element shut down normally and its task has exited.
    Terminated,
}

/// The pipeline's handle on one running element.
#[derive(Debug)]
pub struct ElementHandle {
    name: String,
    sender: mpsc::UnboundedSender<ElementMessage>,
    task: JoinHandle<()>,
}

impl ElementHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sender(&self) -> &mpsc::UnboundedSender<ElementMessage> {
        &self.sender
    }

    /// Deliver a message. A closed mailbox means the element already exited.
    pub fn send(&self, message: ElementMessage) -> bool {
        self.sender.send(message).is_ok()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn `element` as a task named `name` reporting to `parent`.
pub fn spawn_element(
    name: impl Into<String>,
    element: Box<dyn Element>,
    parent: mpsc::UnboundedSender<ChildReport>,
) -> ElementHandle {
    let name = name.into();
    let (sender, mailbox) = mpsc::unbounded_channel();
    let runtime = ElementRuntime::new(name.clone(), element, parent, sender.clone());
    let span = tracing::info_span!("element", name = %name);
    let task = tokio::spawn(run_element(runtime, mailbox).instrument(span));

    ElementHandle { name, sender, task }
}

async fn run_element(mut runtime: ElementRuntime, mut mailbox: mpsc::UnboundedReceiver<ElementMessage>) {
    if let Err(error) = runtime.invoke(ElementCallback::Init) {
        fail(&runtime, error);
        return;
    }
    ElementStarted {
        element: runtime.name(),
        kind: runtime.kind(),
        pads: runtime.pads().len(),
    }
    .log();

    let parent = runtime.parent_sender();
    loop {
        let message = tokio::select! {
            message = mailbox.recv() => message,
            _ = parent.closed() => None,
        };
        // The parent is gone: stop on our own.
        let message = message.unwrap_or(ElementMessage::Shutdown {
            reason: ShutdownReason::Halted("parent pipeline terminated".to_string()),
        });

        match runtime.handle_message(message) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop(reason)) => {
                ElementTerminated {
                    element: runtime.name(),
                    reason: &reason,
                }
                .log();
                runtime.report(ChildEvent::Terminated);
                return;
            }
            Err(error) => {
                fail(&runtime, error);
                return;
            }
        }
    }
}

fn fail(runtime: &ElementRuntime, error: RuntimeError) {
    ElementFailed {
        element: runtime.name(),
        error: &error,
    }
    .log();
    runtime.report(ChildEvent::Failed(error.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Action, CallbackResult};
    use crate::backends::stub::{CallbackLog, RecordingElement};
    use crate::engine::pad::{FlowMode, PadSpec};
    use serde_json::json;
    use std::time::Duration;

    async fn next_event(reports: &mut mpsc::UnboundedReceiver<ChildReport>) -> ChildEvent {
        tokio::time::timeout(Duration::from_secs(1), reports.recv())
            .await
            .expect("timed out waiting for a report")
            .expect("report channel closed")
            .event
    }

    #[tokio::test]
    async fn test_element_runs_init_then_messages() {
        let log = CallbackLog::default();
        let element = RecordingElement::new(vec![PadSpec::input("input", FlowMode::Pull)])
            .with_log(log.clone())
            .respond("handle_other", |_| {
                CallbackResult::with_actions(vec![Action::Notify(json!("pong"))])
            });
        let (parent, mut reports) = mpsc::unbounded_channel();
        let handle = spawn_element("sink", Box::new(element), parent);

        assert!(handle.send(ElementMessage::Other(json!("ping"))));
        assert_eq!(next_event(&mut reports).await, ChildEvent::Notification(json!("pong")));
        assert_eq!(log.entries()[0], "handle_init");

        handle.send(ElementMessage::Shutdown {
            reason: ShutdownReason::Normal,
        });
        assert_eq!(next_event(&mut reports).await, ChildEvent::Terminated);
    }

    #[tokio::test]
    async fn test_element_reports_failure_and_exits() {
        let element = RecordingElement::new(Vec::new())
            .respond("handle_other", |_| CallbackResult::error("broken"));
        let (parent, mut reports) = mpsc::unbounded_channel();
        let handle = spawn_element("bad", Box::new(element), parent);

        handle.send(ElementMessage::Other(json!(null)));
        match next_event(&mut reports).await {
            ChildEvent::Failed(reason) => assert!(reason.contains("broken")),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_init_is_reported() {
        let element = RecordingElement::new(Vec::new()).respond("handle_init", |_| CallbackResult::error("bad options"));
        let (parent, mut reports) = mpsc::unbounded_channel();
        let _handle = spawn_element("bad", Box::new(element), parent);

        assert!(matches!(next_event(&mut reports).await, ChildEvent::Failed(_)));
    }

    #[tokio::test]
    async fn test_element_stops_when_parent_goes_away() {
        let log = CallbackLog::default();
        let element = RecordingElement::new(Vec::new()).with_log(log.clone());
        let (parent, reports) = mpsc::unbounded_channel();
        let handle = spawn_element("orphan", Box::new(element), parent);

        drop(reports);
        tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.is_finished() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("element did not stop");
        assert!(log.contains("handle_shutdown"));
    }
}
