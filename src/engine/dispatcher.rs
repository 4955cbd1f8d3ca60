// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Callback dispatch and action execution for one element.
//!
//! [`ElementRuntime`] owns an element together with its framework metadata
//! (playback state, pads, flow-control counters). Every inbound [`ElementMessage`]
//! goes through the same cycle:
//!
//! 1. Update framework metadata for the message (demand counters, stream status)
//! 2. Invoke the matching callback with a read-only [`CallbackContext`]
//! 3. Normalize the returned [`CallbackResult`]; `Error` is fatal to the element
//! 4. Execute the returned actions strictly in order
//!
//! Anything an action causes on this same element (redemand, backpressure engaged)
//! is queued as a message to its own mailbox, so a callback is never re-entered
//! while it is running.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::actions::{Action, CallbackResult};
use crate::engine::buffer::{Buffer, Caps, StreamEvent};
use crate::engine::element_actor::{ChildEvent, ChildReport, ElementMessage};
use crate::engine::pad::{
    Availability, FlowMode, PadDescriptor, PadDirection, PadRef, PadSet, Peer, StreamStatus,
};
use crate::engine::playback::{PlaybackState, PlaybackTransition};
use crate::errors::{ActionError, LinkError, RuntimeError};
use crate::observability::messages::element::{
    BackpressureChanged, CallbackFailed, CallbackInvoked, DataForUnknownPad, PadLinked, PadUnlinked,
};
use crate::observability::messages::playback::{PlaybackStepCompleted, TeardownFailed};
use crate::observability::messages::StructuredLog;
use crate::traits::{Backpressure, CallbackContext, Element, ShutdownReason};

/// A named callback with its positional arguments.
#[derive(Debug)]
pub enum ElementCallback {
    Init,
    PlaybackChange(PlaybackTransition),
    Demand { pad: PadRef, size: u64 },
    Process { pad: PadRef, buffer: Buffer },
    Caps { pad: PadRef, caps: Caps },
    Event { pad: PadRef, event: Value },
    StartOfStream(PadRef),
    EndOfStream(PadRef),
    PadAdded(PadRef),
    PadRemoved(PadRef),
    Backpressure { pad: PadRef, signal: Backpressure },
    Other(Value),
}

impl ElementCallback {
    pub fn name(&self) -> &'static str {
        match self {
            ElementCallback::Init => "handle_init",
            ElementCallback::PlaybackChange(transition) => transition.callback_name(),
            ElementCallback::Demand { .. } => "handle_demand",
            ElementCallback::Process { .. } => "handle_process",
            ElementCallback::Caps { .. } => "handle_caps",
            ElementCallback::Event { .. } => "handle_event",
            ElementCallback::StartOfStream(_) => "handle_start_of_stream",
            ElementCallback::EndOfStream(_) => "handle_end_of_stream",
            ElementCallback::PadAdded(_) => "handle_pad_added",
            ElementCallback::PadRemoved(_) => "handle_pad_removed",
            ElementCallback::Backpressure { .. } => "handle_backpressure",
            ElementCallback::Other(_) => "handle_other",
        }
    }
}

/// What the actor loop does after a message.
#[derive(Debug, PartialEq)]
pub(crate) enum Flow {
    Continue,
    Stop(ShutdownReason),
}

pub struct ElementRuntime {
    name: String,
    element: Box<dyn Element>,
    playback: PlaybackState,
    pads: PadSet,
    parent: mpsc::UnboundedSender<ChildReport>,
    mailbox: mpsc::UnboundedSender<ElementMessage>,
}

impl ElementRuntime {
    /// Create the runtime; static pads are instantiated from `element.pads()`.
    ///
    /// # Arguments
    /// * `parent` - Where reports for the owning pipeline go
    /// * `mailbox` - Sender half of this element's own mailbox, for self-messages
    pub fn new(
        name: impl Into<String>,
        element: Box<dyn Element>,
        parent: mpsc::UnboundedSender<ChildReport>,
        mailbox: mpsc::UnboundedSender<ElementMessage>,
    ) -> Self {
        let pads = PadSet::from_specs(element.pads());
        Self {
            name: name.into(),
            element,
            playback: PlaybackState::Stopped,
            pads,
            parent,
            mailbox,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &'static str {
        self.element.kind()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback
    }

    pub fn pads(&self) -> &PadSet {
        &self.pads
    }

    /// An owned handle on the report channel, for watching the parent go away.
    pub(crate) fn parent_sender(&self) -> mpsc::UnboundedSender<ChildReport> {
        self.parent.clone()
    }

    pub(crate) fn report(&self, event: ChildEvent) {
        let _ = self.parent.send(ChildReport {
            child: self.name.clone(),
            event,
        });
    }

    fn enqueue(&self, message: ElementMessage) {
        let _ = self.mailbox.send(message);
    }

    /// Invoke one callback and execute its actions in order.
    ///
    /// # Errors
    /// * [`RuntimeError::Callback`] if the callback returned `Error`
    /// * [`RuntimeError::Action`] on the first action that violates a pad invariant;
    ///   actions after it are not executed
    pub fn invoke(&mut self, callback: ElementCallback) -> Result<(), RuntimeError> {
        let name = callback.name();
        let invoked = CallbackInvoked {
            actor: "element",
            name: &self.name,
            callback: name,
        };
        let span = invoked.span("element_callback");
        let _guard = span.enter();
        invoked.log();

        match self.call(callback).into_actions() {
            Ok(actions) => self.execute_all(actions),
            Err(reason) => {
                CallbackFailed {
                    element: &self.name,
                    callback: name,
                    reason: &reason,
                }
                .log();
                Err(RuntimeError::Callback {
                    callback: name,
                    reason,
                })
            }
        }
    }

    fn call(&mut self, callback: ElementCallback) -> CallbackResult {
        let ctx = CallbackContext::new(&self.name, self.playback, &self.pads);
        let element = &mut self.element;

        match callback {
            ElementCallback::Init => element.handle_init(&ctx),
            ElementCallback::PlaybackChange(transition) => match transition {
                PlaybackTransition::STOPPED_TO_PREPARED => element.handle_stopped_to_prepared(&ctx),
                PlaybackTransition::PREPARED_TO_PLAYING => element.handle_prepared_to_playing(&ctx),
                PlaybackTransition::PLAYING_TO_PREPARED => element.handle_playing_to_prepared(&ctx),
                _ => element.handle_prepared_to_stopped(&ctx),
            },
            ElementCallback::Demand { pad, size } => element.handle_demand(&pad, size, &ctx),
            ElementCallback::Process { pad, buffer } => element.handle_process(&pad, buffer, &ctx),
            ElementCallback::Caps { pad, caps } => element.handle_caps(&pad, &caps, &ctx),
            ElementCallback::Event { pad, event } => element.handle_event(&pad, &event, &ctx),
            ElementCallback::StartOfStream(pad) => element.handle_start_of_stream(&pad, &ctx),
            ElementCallback::EndOfStream(pad) => element.handle_end_of_stream(&pad, &ctx),
            ElementCallback::PadAdded(pad) => element.handle_pad_added(&pad, &ctx),
            ElementCallback::PadRemoved(pad) => element.handle_pad_removed(&pad, &ctx),
            ElementCallback::Backpressure { pad, signal } => {
                element.handle_backpressure(&pad, signal, &ctx)
            }
            ElementCallback::Other(message) => element.handle_other(message, &ctx),
        }
    }

    fn execute_all(&mut self, actions: Vec<Action>) -> Result<(), RuntimeError> {
        for action in actions {
            self.execute(action)?;
        }
        Ok(())
    }

    fn execute(&mut self, action: Action) -> Result<(), RuntimeError> {
        match action {
            Action::Buffer { pad, buffers } => self.send_buffers(pad, buffers)?,
            Action::Caps { pad, caps } => self.send_caps(pad, caps)?,
            Action::Demand { pad, units } => self.request_demand(pad, units)?,
            Action::Redemand(pad) => self.enqueue(ElementMessage::Redemand { pad }),
            Action::Event { pad, event } => self.send_event(pad, StreamEvent::Custom(event))?,
            Action::EndOfStream(pad) => self.send_end_of_stream(pad)?,
            Action::Notify(payload) => self.report(ChildEvent::Notification(payload)),
            Action::Shutdown => self.report(ChildEvent::ShutdownRequested),
            other => {
                return Err(ActionError::Unsupported {
                    action: other.name(),
                    actor: "element",
                }
                .into())
            }
        }
        Ok(())
    }

    fn send_buffers(&mut self, pad: PadRef, buffers: Vec<Buffer>) -> Result<(), ActionError> {
        let count = buffers.len() as u64;
        let descriptor = pad_with_direction(&mut self.pads, &pad, PadDirection::Output)?;
        let peer = descriptor
            .peer
            .clone()
            .ok_or_else(|| ActionError::PadNotLinked(pad.clone()))?;
        if descriptor.stream == StreamStatus::Ended {
            return Err(ActionError::StreamEnded(pad));
        }
        if count == 0 {
            return Ok(());
        }

        let mut engaged = false;
        match descriptor.mode() {
            FlowMode::Pull => {
                if descriptor.demand < count {
                    return Err(ActionError::DemandExceeded {
                        pad,
                        requested: count,
                        available: descriptor.demand,
                    });
                }
                descriptor.demand -= count;
            }
            FlowMode::Push => {
                if let Some(policy) = descriptor.policy() {
                    descriptor.in_flight += count;
                    if !descriptor.backpressure_engaged
                        && descriptor.in_flight > policy.preferred_size as u64
                    {
                        descriptor.backpressure_engaged = true;
                        engaged = true;
                    }
                }
            }
        }
        descriptor.stream = StreamStatus::Started;
        let in_flight = descriptor.in_flight;

        let _ = peer.sender.send(ElementMessage::Buffer {
            pad: peer.pad,
            buffers,
        });

        if engaged {
            BackpressureChanged {
                element: &self.name,
                pad: &pad,
                signal: Backpressure::Engaged,
                in_flight,
            }
            .log();
            self.enqueue(ElementMessage::Backpressure {
                pad,
                signal: Backpressure::Engaged,
            });
        }
        Ok(())
    }

    fn send_caps(&mut self, pad: PadRef, caps: Caps) -> Result<(), ActionError> {
        let descriptor = pad_with_direction(&mut self.pads, &pad, PadDirection::Output)?;
        let peer = descriptor
            .peer
            .as_ref()
            .ok_or_else(|| ActionError::PadNotLinked(pad.clone()))?;
        let _ = peer.sender.send(ElementMessage::Caps {
            pad: peer.pad.clone(),
            caps: caps.clone(),
        });
        descriptor.caps = Some(caps);
        Ok(())
    }

    fn request_demand(&mut self, pad: PadRef, units: u64) -> Result<(), ActionError> {
        let descriptor = pad_with_direction(&mut self.pads, &pad, PadDirection::Input)?;
        if descriptor.mode() == FlowMode::Push {
            return Err(ActionError::DemandOnPushPad(pad));
        }
        let peer = descriptor
            .peer
            .as_ref()
            .ok_or_else(|| ActionError::PadNotLinked(pad.clone()))?;

        // A push producer sends without demand.
        if peer.mode == FlowMode::Push || units == 0 {
            return Ok(());
        }

        let _ = peer.sender.send(ElementMessage::Demand {
            pad: peer.pad.clone(),
            units,
        });
        descriptor.requested += units;
        Ok(())
    }

    fn send_event(&mut self, pad: PadRef, event: StreamEvent) -> Result<(), ActionError> {
        let descriptor = self
            .pads
            .get(&pad)
            .ok_or_else(|| ActionError::UnknownPad(pad.clone()))?;
        let peer = descriptor
            .peer()
            .ok_or_else(|| ActionError::PadNotLinked(pad.clone()))?;
        let _ = peer.sender.send(ElementMessage::Event {
            pad: peer.pad.clone(),
            event,
        });
        Ok(())
    }

    fn send_end_of_stream(&mut self, pad: PadRef) -> Result<(), ActionError> {
        let descriptor = pad_with_direction(&mut self.pads, &pad, PadDirection::Output)?;
        if descriptor.stream == StreamStatus::Ended {
            return Err(ActionError::StreamEnded(pad));
        }
        let peer = descriptor
            .peer
            .as_ref()
            .ok_or_else(|| ActionError::PadNotLinked(pad.clone()))?;
        let _ = peer.sender.send(ElementMessage::Event {
            pad: peer.pad.clone(),
            event: StreamEvent::EndOfStream,
        });
        descriptor.stream = StreamStatus::Ended;
        Ok(())
    }

    /// Handle one mailbox message.
    pub(crate) fn handle_message(&mut self, message: ElementMessage) -> Result<Flow, RuntimeError> {
        match message {
            ElementMessage::ChangePlayback { target } => self.change_playback(target)?,
            ElementMessage::LinkPad { pad, peer } => self.link_pad(pad, peer)?,
            ElementMessage::UnlinkPad { pad } => self.unlink_pad(pad)?,
            ElementMessage::Buffer { pad, buffers } => self.receive_buffers(pad, buffers)?,
            ElementMessage::Caps { pad, caps } => self.receive_caps(pad, caps)?,
            ElementMessage::Demand { pad, units } => self.receive_demand(pad, units)?,
            ElementMessage::Event { pad, event } => self.receive_event(pad, event)?,
            ElementMessage::Ack { pad, units } => self.receive_ack(pad, units)?,
            ElementMessage::Backpressure { pad, signal } => self.deliver_backpressure(pad, signal)?,
            ElementMessage::Redemand { pad } => self.redemand(pad)?,
            ElementMessage::Other(message) => self.invoke(ElementCallback::Other(message))?,
            ElementMessage::Shutdown { reason } => {
                self.shutdown(&reason);
                return Ok(Flow::Stop(reason));
            }
        }
        Ok(Flow::Continue)
    }

    fn change_playback(&mut self, target: PlaybackState) -> Result<(), RuntimeError> {
        if target != self.playback {
            let transition = PlaybackTransition::new(self.playback, target)?;
            self.step(transition)?;
        }
        self.report(ChildEvent::PlaybackChanged(self.playback));
        Ok(())
    }

    /// Perform one adjacent transition. Teardown errors are logged and swallowed.
    fn step(&mut self, transition: PlaybackTransition) -> Result<(), RuntimeError> {
        if let Err(error) = self.invoke(ElementCallback::PlaybackChange(transition)) {
            if !transition.is_teardown() {
                return Err(error);
            }
            TeardownFailed {
                name: &self.name,
                callback: transition.callback_name(),
                reason: &error.to_string(),
            }
            .log();
        }

        self.playback = transition.to();
        PlaybackStepCompleted {
            actor: "element",
            name: &self.name,
            from: transition.from(),
            to: transition.to(),
        }
        .log();

        if self.playback == PlaybackState::Playing {
            // Demand that arrived before playback started.
            let pending: Vec<PadRef> = self
                .pads
                .outputs()
                .filter(|p| p.demand() > 0)
                .map(|p| p.pad().clone())
                .collect();
            for pad in pending {
                self.enqueue(ElementMessage::Redemand { pad });
            }
        }
        Ok(())
    }

    fn link_pad(&mut self, pad: PadRef, peer: Peer) -> Result<(), RuntimeError> {
        if !self.pads.contains(&pad) {
            if !pad.is_dynamic() {
                return Err(LinkError::UnknownPad {
                    element: self.name.clone(),
                    pad,
                }
                .into());
            }
            self.pads.add_dynamic(&self.name, pad.clone())?;
        }

        let descriptor = self
            .pads
            .get_mut(&pad)
            .ok_or_else(|| ActionError::UnknownPad(pad.clone()))?;
        if descriptor.is_linked() {
            return Err(LinkError::AlreadyLinked {
                element: self.name.clone(),
                pad,
            }
            .into());
        }

        PadLinked {
            element: &self.name,
            pad: &pad,
            peer_element: &peer.element,
            peer_pad: &peer.pad,
        }
        .log();
        descriptor.peer = Some(peer);

        if descriptor.availability() == Availability::Dynamic {
            self.invoke(ElementCallback::PadAdded(pad))?;
        }
        Ok(())
    }

    fn unlink_pad(&mut self, pad: PadRef) -> Result<(), RuntimeError> {
        let Some(descriptor) = self.pads.get_mut(&pad) else {
            return Ok(());
        };
        let was_engaged = descriptor.backpressure_engaged;
        descriptor.peer = None;
        descriptor.demand = 0;
        descriptor.requested = 0;
        descriptor.in_flight = 0;
        descriptor.backpressure_engaged = false;
        let dynamic = descriptor.availability() == Availability::Dynamic;

        PadUnlinked {
            element: &self.name,
            pad: &pad,
        }
        .log();

        // Nothing is in flight any more, so the element must not stay throttled.
        if was_engaged {
            BackpressureChanged {
                element: &self.name,
                pad: &pad,
                signal: Backpressure::Released,
                in_flight: 0,
            }
            .log();
            self.invoke(ElementCallback::Backpressure {
                pad: pad.clone(),
                signal: Backpressure::Released,
            })?;
        }

        if dynamic {
            self.invoke(ElementCallback::PadRemoved(pad.clone()))?;
            self.pads.remove_dynamic(&pad);
        }
        Ok(())
    }

    /// Deliver a queued backpressure signal, unless an unlink already released the pad.
    fn deliver_backpressure(&mut self, pad: PadRef, signal: Backpressure) -> Result<(), RuntimeError> {
        let engaged = self.pads.get(&pad).is_some_and(|p| p.backpressure_engaged);
        if signal == Backpressure::Engaged && !engaged {
            return Ok(());
        }
        self.invoke(ElementCallback::Backpressure { pad, signal })
    }

    fn receive_buffers(&mut self, pad: PadRef, buffers: Vec<Buffer>) -> Result<(), RuntimeError> {
        let Some(descriptor) = self.pads.get_mut(&pad) else {
            DataForUnknownPad {
                element: &self.name,
                pad: &pad,
                what: "buffers",
            }
            .log();
            return Ok(());
        };

        let first = descriptor.stream == StreamStatus::NotStarted;
        if first {
            descriptor.stream = StreamStatus::Started;
        }

        let upstream = descriptor
            .peer()
            .map(|peer| (peer.mode, peer.policy.is_some(), peer.sender.clone(), peer.pad.clone()));
        let ack_to = match upstream {
            Some((FlowMode::Pull, _, _, _)) => {
                descriptor.requested = descriptor.requested.saturating_sub(buffers.len() as u64);
                None
            }
            Some((FlowMode::Push, true, sender, peer_pad)) => Some((sender, peer_pad)),
            _ => None,
        };

        if first {
            self.invoke(ElementCallback::StartOfStream(pad.clone()))?;
            self.report(ChildEvent::StartOfStream(pad.clone()));
        }

        for buffer in buffers {
            self.invoke(ElementCallback::Process {
                pad: pad.clone(),
                buffer,
            })?;
            if let Some((sender, peer_pad)) = &ack_to {
                let _ = sender.send(ElementMessage::Ack {
                    pad: peer_pad.clone(),
                    units: 1,
                });
            }
        }
        Ok(())
    }

    fn receive_caps(&mut self, pad: PadRef, caps: Caps) -> Result<(), RuntimeError> {
        let Some(descriptor) = self.pads.get_mut(&pad) else {
            DataForUnknownPad {
                element: &self.name,
                pad: &pad,
                what: "caps",
            }
            .log();
            return Ok(());
        };
        descriptor.caps = Some(caps.clone());
        self.invoke(ElementCallback::Caps { pad, caps })
    }

    fn receive_demand(&mut self, pad: PadRef, units: u64) -> Result<(), RuntimeError> {
        let Some(descriptor) = self.pads.get_mut(&pad) else {
            DataForUnknownPad {
                element: &self.name,
                pad: &pad,
                what: "demand",
            }
            .log();
            return Ok(());
        };
        descriptor.demand += units;
        let size = descriptor.demand;

        if self.playback == PlaybackState::Playing {
            self.invoke(ElementCallback::Demand { pad, size })?;
        }
        Ok(())
    }

    fn redemand(&mut self, pad: PadRef) -> Result<(), RuntimeError> {
        let size = self.pads.get(&pad).map(|p| p.demand()).unwrap_or(0);
        if self.playback == PlaybackState::Playing && size > 0 {
            self.invoke(ElementCallback::Demand { pad, size })?;
        }
        Ok(())
    }

    fn receive_event(&mut self, pad: PadRef, event: StreamEvent) -> Result<(), RuntimeError> {
        let Some(descriptor) = self.pads.get_mut(&pad) else {
            DataForUnknownPad {
                element: &self.name,
                pad: &pad,
                what: "event",
            }
            .log();
            return Ok(());
        };

        match event {
            StreamEvent::EndOfStream => {
                if descriptor.stream == StreamStatus::Ended {
                    return Ok(());
                }
                descriptor.stream = StreamStatus::Ended;
                self.invoke(ElementCallback::EndOfStream(pad.clone()))?;
                self.report(ChildEvent::EndOfStream(pad));
                Ok(())
            }
            StreamEvent::Custom(event) => self.invoke(ElementCallback::Event { pad, event }),
        }
    }

    fn receive_ack(&mut self, pad: PadRef, units: u64) -> Result<(), RuntimeError> {
        let Some(descriptor) = self.pads.get_mut(&pad) else {
            return Ok(());
        };
        descriptor.in_flight = descriptor.in_flight.saturating_sub(units);

        let released = match descriptor.policy() {
            Some(policy) if descriptor.backpressure_engaged => {
                descriptor.in_flight <= policy.low_watermark() as u64
            }
            _ => false,
        };
        if !released {
            return Ok(());
        }

        descriptor.backpressure_engaged = false;
        BackpressureChanged {
            element: &self.name,
            pad: &pad,
            signal: Backpressure::Released,
            in_flight: descriptor.in_flight,
        }
        .log();
        self.invoke(ElementCallback::Backpressure {
            pad,
            signal: Backpressure::Released,
        })
    }

    /// Walk down to `stopped`, then run `handle_shutdown`. Errors are logged only.
    fn shutdown(&mut self, reason: &ShutdownReason) {
        for transition in self.playback.path_to(PlaybackState::Stopped) {
            if let Err(error) = self.step(transition) {
                TeardownFailed {
                    name: &self.name,
                    callback: transition.callback_name(),
                    reason: &error.to_string(),
                }
                .log();
                self.playback = transition.to();
            }
        }
        self.element.handle_shutdown(reason);
    }
}

/// Look up `pad` and check it points in `expected` direction.
fn pad_with_direction<'a>(
    pads: &'a mut PadSet,
    pad: &PadRef,
    expected: PadDirection,
) -> Result<&'a mut PadDescriptor, ActionError> {
    let descriptor = pads
        .get_mut(pad)
        .ok_or_else(|| ActionError::UnknownPad(pad.clone()))?;
    if descriptor.direction() != expected {
        return Err(ActionError::WrongDirection {
            pad: pad.clone(),
            expected,
            actual: descriptor.direction(),
        });
    }
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::{CallbackLog, RecordingElement};
    use crate::engine::pad::{BufferPolicy, PadSpec};
    use serde_json::json;

    struct Harness {
        runtime: ElementRuntime,
        reports: mpsc::UnboundedReceiver<ChildReport>,
        mailbox: mpsc::UnboundedReceiver<ElementMessage>,
    }

    impl Harness {
        fn new(element: RecordingElement) -> Self {
            let (parent, reports) = mpsc::unbounded_channel();
            let (self_sender, mailbox) = mpsc::unbounded_channel();
            Self {
                runtime: ElementRuntime::new("el", Box::new(element), parent, self_sender),
                reports,
                mailbox,
            }
        }

        fn send(&mut self, message: ElementMessage) -> Result<Flow, RuntimeError> {
            self.runtime.handle_message(message)
        }

        fn play(&mut self) {
            for target in [PlaybackState::Prepared, PlaybackState::Playing] {
                self.send(ElementMessage::ChangePlayback { target }).unwrap();
            }
        }

        /// Link `pad` to a fake peer and return the peer's mailbox.
        fn link(
            &mut self,
            pad: PadRef,
            mode: FlowMode,
            policy: Option<BufferPolicy>,
        ) -> mpsc::UnboundedReceiver<ElementMessage> {
            let (sender, receiver) = mpsc::unbounded_channel();
            let peer = Peer {
                element: "peer".to_string(),
                pad: PadRef::new("peer_pad"),
                mode,
                policy,
                sender,
            };
            self.send(ElementMessage::LinkPad { pad, peer }).unwrap();
            receiver
        }

        fn drain_reports(&mut self) -> Vec<ChildEvent> {
            let mut events = Vec::new();
            while let Ok(report) = self.reports.try_recv() {
                events.push(report.event);
            }
            events
        }
    }

    fn source(mode: FlowMode) -> RecordingElement {
        RecordingElement::new(vec![PadSpec::output("output", mode)])
    }

    fn sink() -> RecordingElement {
        RecordingElement::new(vec![PadSpec::input("input", FlowMode::Pull)])
    }

    fn send_on_other(element: RecordingElement, count: usize) -> RecordingElement {
        element.respond("handle_other", move |_| {
            CallbackResult::with_actions(vec![Action::Buffer {
                pad: PadRef::new("output"),
                buffers: vec![Buffer::new(vec![1]); count],
            }])
        })
    }

    #[test]
    fn test_actions_execute_in_order() {
        let element = sink().respond("handle_other", |_| {
            CallbackResult::with_actions(vec![
                Action::Notify(json!(1)),
                Action::Notify(json!(2)),
                Action::Notify(json!(3)),
            ])
        });
        let mut harness = Harness::new(element);
        harness.send(ElementMessage::Other(json!("go"))).unwrap();

        assert_eq!(
            harness.drain_reports(),
            vec![
                ChildEvent::Notification(json!(1)),
                ChildEvent::Notification(json!(2)),
                ChildEvent::Notification(json!(3)),
            ]
        );
    }

    #[test]
    fn test_pull_send_within_demand() {
        let mut harness = Harness::new(send_on_other(source(FlowMode::Pull), 2));
        let mut peer = harness.link(PadRef::new("output"), FlowMode::Pull, None);
        harness.play();
        harness
            .send(ElementMessage::Demand {
                pad: PadRef::new("output"),
                units: 3,
            })
            .unwrap();

        harness.send(ElementMessage::Other(json!("send"))).unwrap();
        assert_eq!(harness.runtime.pads().get(&PadRef::new("output")).unwrap().demand(), 1);
        match peer.try_recv().unwrap() {
            ElementMessage::Buffer { pad, buffers } => {
                assert_eq!(pad, PadRef::new("peer_pad"));
                assert_eq!(buffers.len(), 2);
            }
            other => panic!("Expected Buffer, got {:?}", other),
        }
    }

    #[test]
    fn test_pull_send_beyond_demand_is_fatal() {
        let mut harness = Harness::new(send_on_other(source(FlowMode::Pull), 2));
        let mut peer = harness.link(PadRef::new("output"), FlowMode::Pull, None);
        harness.play();
        harness
            .send(ElementMessage::Demand {
                pad: PadRef::new("output"),
                units: 1,
            })
            .unwrap();

        let result = harness.send(ElementMessage::Other(json!("send")));
        assert_eq!(
            result,
            Err(RuntimeError::Action(ActionError::DemandExceeded {
                pad: PadRef::new("output"),
                requested: 2,
                available: 1,
            }))
        );
        assert!(peer.try_recv().is_err());
    }

    #[test]
    fn test_demand_is_held_until_playing() {
        let log = CallbackLog::default();
        let mut harness = Harness::new(source(FlowMode::Pull).with_log(log.clone()));
        harness.link(PadRef::new("output"), FlowMode::Pull, None);
        harness
            .send(ElementMessage::Demand {
                pad: PadRef::new("output"),
                units: 2,
            })
            .unwrap();
        assert!(!log.contains("handle_demand:output"));

        harness.play();
        match harness.mailbox.try_recv().unwrap() {
            ElementMessage::Redemand { pad } => {
                harness.send(ElementMessage::Redemand { pad }).unwrap();
            }
            other => panic!("Expected Redemand, got {:?}", other),
        }
        assert!(log.contains("handle_demand:output"));
    }

    #[test]
    fn test_demand_action_goes_upstream() {
        let element = sink().respond("handle_prepared_to_playing", |_| {
            CallbackResult::with_actions(vec![Action::demand("input", 4)])
        });
        let mut harness = Harness::new(element);
        let mut peer = harness.link(PadRef::new("input"), FlowMode::Pull, None);
        harness.play();

        match peer.try_recv().unwrap() {
            ElementMessage::Demand { pad, units } => {
                assert_eq!(pad, PadRef::new("peer_pad"));
                assert_eq!(units, 4);
            }
            other => panic!("Expected Demand, got {:?}", other),
        }
        assert_eq!(harness.runtime.pads().get(&PadRef::new("input")).unwrap().requested(), 4);
    }

    #[test]
    fn test_demand_on_output_pad_is_rejected() {
        let element = source(FlowMode::Pull).respond("handle_other", |_| {
            CallbackResult::with_actions(vec![Action::demand("output", 1)])
        });
        let mut harness = Harness::new(element);
        harness.link(PadRef::new("output"), FlowMode::Pull, None);

        assert!(matches!(
            harness.send(ElementMessage::Other(json!(null))),
            Err(RuntimeError::Action(ActionError::WrongDirection { .. }))
        ));
    }

    #[test]
    fn test_pipeline_actions_are_unsupported_for_elements() {
        let element = sink().respond("handle_other", |_| {
            CallbackResult::with_actions(vec![Action::RemoveChild("x".to_string())])
        });
        let mut harness = Harness::new(element);
        assert_eq!(
            harness.send(ElementMessage::Other(json!(null))),
            Err(RuntimeError::Action(ActionError::Unsupported {
                action: "remove_child",
                actor: "element",
            }))
        );
    }

    #[test]
    fn test_callback_error_is_fatal() {
        let element = sink().respond("handle_other", |_| CallbackResult::error("boom"));
        let mut harness = Harness::new(element);
        assert_eq!(
            harness.send(ElementMessage::Other(json!(null))),
            Err(RuntimeError::Callback {
                callback: "handle_other",
                reason: "boom".to_string(),
            })
        );
    }

    #[test]
    fn test_skipping_a_playback_state_is_rejected() {
        let mut harness = Harness::new(sink());
        let result = harness.send(ElementMessage::ChangePlayback {
            target: PlaybackState::Playing,
        });
        assert!(matches!(result, Err(RuntimeError::Playback(_))));
        assert_eq!(harness.runtime.playback_state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_teardown_error_does_not_block_stopping() {
        let element = sink().respond("handle_prepared_to_stopped", |_| CallbackResult::error("leak"));
        let mut harness = Harness::new(element);
        harness
            .send(ElementMessage::ChangePlayback {
                target: PlaybackState::Prepared,
            })
            .unwrap();
        harness
            .send(ElementMessage::ChangePlayback {
                target: PlaybackState::Stopped,
            })
            .unwrap();

        assert_eq!(harness.runtime.playback_state(), PlaybackState::Stopped);
        assert_eq!(
            harness.drain_reports(),
            vec![
                ChildEvent::PlaybackChanged(PlaybackState::Prepared),
                ChildEvent::PlaybackChanged(PlaybackState::Stopped),
            ]
        );
    }

    #[test]
    fn test_failure_in_other_transition_is_fatal() {
        let element = sink().respond("handle_stopped_to_prepared", |_| CallbackResult::error("no device"));
        let mut harness = Harness::new(element);
        let result = harness.send(ElementMessage::ChangePlayback {
            target: PlaybackState::Prepared,
        });
        assert!(matches!(result, Err(RuntimeError::Callback { .. })));
    }

    #[test]
    fn test_dynamic_pad_round_trip() {
        let log = CallbackLog::default();
        let element = RecordingElement::new(vec![
            PadSpec::input("input", FlowMode::Pull),
            PadSpec::dynamic_output("output", FlowMode::Push),
        ])
        .with_log(log.clone());
        let mut harness = Harness::new(element);
        let before = harness.runtime.pads().refs();

        let pad = PadRef::dynamic("output", "1");
        harness.link(pad.clone(), FlowMode::Pull, None);
        assert!(harness.runtime.pads().contains(&pad));
        harness.send(ElementMessage::UnlinkPad { pad }).unwrap();

        assert_eq!(harness.runtime.pads().refs(), before);
        assert_eq!(
            log.entries(),
            vec!["handle_pad_added:output#1", "handle_pad_removed:output#1"]
        );
    }

    #[test]
    fn test_static_pad_link_does_not_call_pad_added() {
        let log = CallbackLog::default();
        let mut harness = Harness::new(sink().with_log(log.clone()));
        harness.link(PadRef::new("input"), FlowMode::Pull, None);
        assert!(log.entries().is_empty());

        let (sender, _receiver) = mpsc::unbounded_channel();
        let again = harness.send(ElementMessage::LinkPad {
            pad: PadRef::new("input"),
            peer: Peer {
                element: "other".to_string(),
                pad: PadRef::new("output"),
                mode: FlowMode::Pull,
                policy: None,
                sender,
            },
        });
        assert!(matches!(again, Err(RuntimeError::Link(LinkError::AlreadyLinked { .. }))));
    }

    #[test]
    fn test_first_buffer_triggers_start_of_stream() {
        let log = CallbackLog::default();
        let mut harness = Harness::new(sink().with_log(log.clone()));
        harness.link(PadRef::new("input"), FlowMode::Pull, None);
        harness.play();
        harness.drain_reports();

        for _ in 0..2 {
            harness
                .send(ElementMessage::Buffer {
                    pad: PadRef::new("input"),
                    buffers: vec![Buffer::new(vec![7])],
                })
                .unwrap();
        }
        harness
            .send(ElementMessage::Event {
                pad: PadRef::new("input"),
                event: StreamEvent::EndOfStream,
            })
            .unwrap();

        let stream_entries: Vec<String> = log
            .entries()
            .into_iter()
            .filter(|e| !e.starts_with("handle_stopped") && !e.starts_with("handle_prepared"))
            .collect();
        assert_eq!(
            stream_entries,
            vec![
                "handle_start_of_stream:input",
                "handle_process:input",
                "handle_process:input",
                "handle_end_of_stream:input",
            ]
        );
        assert_eq!(
            harness.drain_reports(),
            vec![
                ChildEvent::StartOfStream(PadRef::new("input")),
                ChildEvent::EndOfStream(PadRef::new("input")),
            ]
        );
    }

    #[test]
    fn test_send_after_end_of_stream_is_rejected() {
        let element = source(FlowMode::Push).respond("handle_other", |_| {
            CallbackResult::with_actions(vec![
                Action::EndOfStream(PadRef::new("output")),
                Action::buffer("output", Buffer::new(vec![1])),
            ])
        });
        let mut harness = Harness::new(element);
        harness.link(PadRef::new("output"), FlowMode::Pull, None);
        assert_eq!(
            harness.send(ElementMessage::Other(json!(null))),
            Err(RuntimeError::Action(ActionError::StreamEnded(PadRef::new("output"))))
        );
    }

    #[test]
    fn test_push_backpressure_engages_and_releases() {
        let log = CallbackLog::default();
        let element = send_on_other(source(FlowMode::Push), 3).with_log(log.clone());
        let mut harness = Harness::new(element);
        harness.link(PadRef::new("output"), FlowMode::Pull, Some(BufferPolicy::new(2)));
        harness.play();

        harness.send(ElementMessage::Other(json!("send"))).unwrap();
        let descriptor = harness.runtime.pads().get(&PadRef::new("output")).unwrap();
        assert_eq!(descriptor.in_flight(), 3);

        let engaged = harness.mailbox.try_recv().unwrap();
        assert!(matches!(
            engaged,
            ElementMessage::Backpressure {
                signal: Backpressure::Engaged,
                ..
            }
        ));
        harness.send(engaged).unwrap();

        // 3 -> 2 stays engaged, 2 -> 1 releases (low watermark is 1).
        for _ in 0..2 {
            harness
                .send(ElementMessage::Ack {
                    pad: PadRef::new("output"),
                    units: 1,
                })
                .unwrap();
        }

        let signals: Vec<String> = log
            .entries()
            .into_iter()
            .filter(|e| e.starts_with("handle_backpressure"))
            .collect();
        assert_eq!(
            signals,
            vec![
                "handle_backpressure:output:Engaged",
                "handle_backpressure:output:Released",
            ]
        );
    }

    #[test]
    fn test_unlink_releases_engaged_backpressure() {
        let log = CallbackLog::default();
        let element = send_on_other(source(FlowMode::Push), 3).with_log(log.clone());
        let mut harness = Harness::new(element);
        harness.link(PadRef::new("output"), FlowMode::Pull, Some(BufferPolicy::new(2)));
        harness.play();

        harness.send(ElementMessage::Other(json!("send"))).unwrap();
        let engaged = harness.mailbox.try_recv().unwrap();
        harness.send(engaged).unwrap();
        harness
            .send(ElementMessage::UnlinkPad {
                pad: PadRef::new("output"),
            })
            .unwrap();

        let descriptor = harness.runtime.pads().get(&PadRef::new("output")).unwrap();
        assert_eq!(descriptor.in_flight(), 0);
        assert!(!descriptor.is_linked());
        let signals: Vec<String> = log
            .entries()
            .into_iter()
            .filter(|e| e.starts_with("handle_backpressure"))
            .collect();
        assert_eq!(
            signals,
            vec![
                "handle_backpressure:output:Engaged",
                "handle_backpressure:output:Released",
            ]
        );
    }

    #[test]
    fn test_engaged_signal_queued_before_unlink_is_dropped() {
        let log = CallbackLog::default();
        let element = send_on_other(source(FlowMode::Push), 3).with_log(log.clone());
        let mut harness = Harness::new(element);
        harness.link(PadRef::new("output"), FlowMode::Pull, Some(BufferPolicy::new(2)));
        harness.play();

        harness.send(ElementMessage::Other(json!("send"))).unwrap();
        let engaged = harness.mailbox.try_recv().unwrap();
        harness
            .send(ElementMessage::UnlinkPad {
                pad: PadRef::new("output"),
            })
            .unwrap();
        harness.send(engaged).unwrap();

        let signals: Vec<String> = log
            .entries()
            .into_iter()
            .filter(|e| e.starts_with("handle_backpressure"))
            .collect();
        assert_eq!(signals, vec!["handle_backpressure:output:Released"]);
    }

    #[test]
    fn test_push_consumer_acknowledges_buffers() {
        let mut harness = Harness::new(sink());
        let mut producer = harness.link(PadRef::new("input"), FlowMode::Push, Some(BufferPolicy::new(4)));
        harness
            .send(ElementMessage::Buffer {
                pad: PadRef::new("input"),
                buffers: vec![Buffer::new(vec![1]), Buffer::new(vec![2])],
            })
            .unwrap();

        let mut acked = 0;
        while let Ok(message) = producer.try_recv() {
            if let ElementMessage::Ack { pad, units } = message {
                assert_eq!(pad, PadRef::new("peer_pad"));
                acked += units;
            }
        }
        assert_eq!(acked, 2);
    }

    #[test]
    fn test_shutdown_walks_down_to_stopped() {
        let log = CallbackLog::default();
        let mut harness = Harness::new(sink().with_log(log.clone()));
        harness.play();

        let flow = harness
            .send(ElementMessage::Shutdown {
                reason: ShutdownReason::Normal,
            })
            .unwrap();
        assert_eq!(flow, Flow::Stop(ShutdownReason::Normal));
        assert_eq!(harness.runtime.playback_state(), PlaybackState::Stopped);
        assert_eq!(
            log.entries(),
            vec![
                "handle_stopped_to_prepared",
                "handle_prepared_to_playing",
                "handle_playing_to_prepared",
                "handle_prepared_to_stopped",
                "handle_shutdown",
            ]
        );
    }
}
