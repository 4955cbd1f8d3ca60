// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The pipeline actor: owns a topology of element actors and coordinates them.
//!
//! A pipeline is itself an actor with a private mailbox. It accepts requests from
//! its [`PipelineHandle`] and reports from its children, one at a time:
//!
//! * **Playback**: a requested state is reached one adjacent step at a time. Each
//!   step is sent to every child; once all of them have acknowledged, the
//!   governing module's transition callback runs and the observer is told.
//! * **Topology**: `Action::Spec` spawns and links further children, which are
//!   then brought up to the pipeline's current state step by step.
//!   `Action::RemoveChild` unlinks a child from its peers and shuts it down.
//! * **Relay**: child notifications and stream events go to the module first,
//!   then to the observer; `for_element` envelopes are forwarded unchanged.
//! * **Failure**: a failed child either halts the pipeline or is dropped from the
//!   topology, according to the pipeline's [`FailureStrategy`].

use std::collections::HashSet;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::actions::{combine_results, Action, CallbackResult};
use crate::config::options::{PipelineOptions, Startup};
use crate::config::topology::{Endpoint, TopologySpec};
use crate::config::validation::{validate_topology, ResolvedLink, TopologyIndex};
use crate::engine::element_actor::{spawn_element, ChildEvent, ChildReport, ElementHandle, ElementMessage};
use crate::engine::observer::{Observer, PipelineNotice};
use crate::engine::pad::{spec_for, BufferPolicy, Peer};
use crate::engine::playback::{PlaybackState, PlaybackTransition};
use crate::errors::{ActionError, ConfigError, FailureStrategy, PipelineError, RuntimeError};
use crate::observability::messages::element::CallbackInvoked;
use crate::observability::messages::pipeline::{
    ChildFailureHandled, ChildRemoved, ForwardToUnknownChild, PipelineFailed, PipelineStarted,
    PipelineTerminated, SpecApplied,
};
use crate::observability::messages::playback::{
    PlaybackRequestSuperseded, PlaybackStepCompleted, TeardownFailed,
};
use crate::observability::messages::validation::{DefaultChainSynthesized, TopologyRejected};
use crate::observability::messages::StructuredLog;
use crate::traits::{PipelineContext, PipelineModule, ShutdownReason};

/// Entry point for running pipelines.
pub struct Pipeline;

impl Pipeline {
    /// Validate `options` and spawn the pipeline task.
    ///
    /// The pipeline starts in `stopped`; call [`PipelineHandle::play`] to start the
    /// flow of data. Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Every [`ConfigError`] is returned synchronously, before any task is spawned.
    ///
    /// # Example
    /// ```
    /// use the_conduit::backends::local::{CountingSource, TestingSink};
    /// use the_conduit::config::PipelineOptions;
    /// use the_conduit::engine::{Pipeline, PlaybackState};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let options = PipelineOptions::new("demo")
    ///         .child("source", CountingSource::new(3))
    ///         .child("sink", TestingSink::new());
    ///
    ///     let pipeline = Pipeline::start(options)?;
    ///     assert_eq!(pipeline.play().await?, PlaybackState::Playing);
    ///     pipeline.shutdown().await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn start(options: PipelineOptions) -> Result<PipelineHandle, ConfigError> {
        let startup = options.into_startup()?;
        let name = startup.name.clone();
        let (sender, requests) = mpsc::unbounded_channel();

        let actor = PipelineActor::new(startup, requests);
        let span = tracing::info_span!("pipeline", name = %name);
        let task = tokio::spawn(actor.run().instrument(span));

        Ok(PipelineHandle { name, sender, task })
    }
}

enum PipelineRequest {
    ChangePlayback {
        target: PlaybackState,
        reply: oneshot::Sender<Result<PlaybackState, PipelineError>>,
    },
    PlaybackState {
        reply: oneshot::Sender<PlaybackState>,
    },
    /// The `for_element` envelope.
    ForElement {
        child: String,
        message: Value,
        reply: oneshot::Sender<Result<(), PipelineError>>,
    },
    Other(Value),
    Children {
        reply: oneshot::Sender<Vec<String>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Caller-side handle on a running pipeline.
///
/// Dropping every handle shuts the pipeline down.
#[derive(Debug)]
pub struct PipelineHandle {
    name: String,
    sender: mpsc::UnboundedSender<PipelineRequest>,
    task: JoinHandle<()>,
}

impl PipelineHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn play(&self) -> Result<PlaybackState, PipelineError> {
        self.change_playback(PlaybackState::Playing).await
    }

    pub async fn prepare(&self) -> Result<PlaybackState, PipelineError> {
        self.change_playback(PlaybackState::Prepared).await
    }

    pub async fn stop(&self) -> Result<PlaybackState, PipelineError> {
        self.change_playback(PlaybackState::Stopped).await
    }

    /// Walk the pipeline to `target` one adjacent step at a time.
    ///
    /// # Returns
    /// * `Ok(state)` - once every child and the pipeline have reached `target`
    /// * `Err(PipelineError::Superseded)` - a newer request replaced this one
    /// * `Err(..)` - the pipeline halted or has terminated
    pub async fn change_playback(&self, target: PlaybackState) -> Result<PlaybackState, PipelineError> {
        let (reply, response) = oneshot::channel();
        self.request(PipelineRequest::ChangePlayback { target, reply })?;
        response.await.map_err(|_| self.terminated())?
    }

    pub async fn playback_state(&self) -> Result<PlaybackState, PipelineError> {
        let (reply, response) = oneshot::channel();
        self.request(PipelineRequest::PlaybackState { reply })?;
        response.await.map_err(|_| self.terminated())
    }

    /// Deliver `message` unchanged to the child named `child` (its `handle_other`).
    pub async fn send_to_child(&self, child: impl Into<String>, message: Value) -> Result<(), PipelineError> {
        let (reply, response) = oneshot::channel();
        self.request(PipelineRequest::ForElement {
            child: child.into(),
            message,
            reply,
        })?;
        response.await.map_err(|_| self.terminated())?
    }

    /// Send a message the pipeline does not interpret: it goes to the module's
    /// `handle_other` and to the observer as [`PipelineNotice::Other`].
    pub fn send_message(&self, message: Value) -> Result<(), PipelineError> {
        self.request(PipelineRequest::Other(message))
    }

    /// Names of the current children, in the order they were added.
    pub async fn children(&self) -> Result<Vec<String>, PipelineError> {
        let (reply, response) = oneshot::channel();
        self.request(PipelineRequest::Children { reply })?;
        response.await.map_err(|_| self.terminated())
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Drive the pipeline to `stopped`, shut every child down and wait for the
    /// pipeline task to exit. A pipeline that already terminated is not an error.
    pub async fn shutdown(self) -> Result<(), PipelineError> {
        let PipelineHandle { name, sender, task } = self;
        let (reply, response) = oneshot::channel();
        if sender.send(PipelineRequest::Shutdown { reply }).is_ok() {
            let _ = response.await;
        }
        task.await.map_err(|e| PipelineError::Failed {
            pipeline: name,
            reason: e.to_string(),
        })
    }

    fn request(&self, request: PipelineRequest) -> Result<(), PipelineError> {
        self.sender.send(request).map_err(|_| self.terminated())
    }

    fn terminated(&self) -> PipelineError {
        PipelineError::Terminated(self.name.clone())
    }
}

struct Child {
    handle: ElementHandle,
    /// Last state the child acknowledged.
    playback: PlaybackState,
    /// A `ChangePlayback` is on its way and not yet acknowledged.
    stepping: bool,
    /// The child reported a failure and its task has exited.
    failed: bool,
}

impl Child {
    fn new(handle: ElementHandle) -> Self {
        Self {
            handle,
            playback: PlaybackState::Stopped,
            stepping: false,
            failed: false,
        }
    }

    fn name(&self) -> &str {
        self.handle.name()
    }
}

struct PendingStep {
    transition: PlaybackTransition,
    awaiting: HashSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    /// Walking down to `stopped` before shutting children down.
    Stopping,
    /// Children have been told to shut down; waiting for them to exit.
    Closing,
}

struct PipelineActor {
    name: String,
    module: Box<dyn PipelineModule>,
    observer: Option<Observer>,
    failure_strategy: FailureStrategy,
    initial_actions: Vec<Action>,

    children: Vec<Child>,
    links: Vec<ResolvedLink>,
    index: TopologyIndex,
    /// Removed or shut-down children whose tasks have not exited yet.
    retiring: Vec<ElementHandle>,

    playback: PlaybackState,
    target: PlaybackState,
    pending: Option<PendingStep>,
    waiter: Option<(PlaybackState, oneshot::Sender<Result<PlaybackState, PipelineError>>)>,

    phase: Phase,
    /// Why the pipeline halted, if it did.
    outcome: Option<PipelineError>,
    shutdown_replies: Vec<oneshot::Sender<()>>,

    reports_tx: mpsc::UnboundedSender<ChildReport>,
    reports: mpsc::UnboundedReceiver<ChildReport>,
    requests: mpsc::UnboundedReceiver<PipelineRequest>,
}

impl PipelineActor {
    fn new(startup: Startup, requests: mpsc::UnboundedReceiver<PipelineRequest>) -> Self {
        let (reports_tx, reports) = mpsc::unbounded_channel();
        Self {
            name: startup.name,
            module: startup.module,
            observer: startup.observer,
            failure_strategy: startup.failure_strategy,
            initial_actions: startup.initial_actions,
            children: Vec::new(),
            links: Vec::new(),
            index: TopologyIndex::new(),
            retiring: Vec::new(),
            playback: PlaybackState::Stopped,
            target: PlaybackState::Stopped,
            pending: None,
            waiter: None,
            phase: Phase::Running,
            outcome: None,
            shutdown_replies: Vec::new(),
            reports_tx,
            reports,
            requests,
        }
    }

    async fn run(mut self) {
        let initial = std::mem::take(&mut self.initial_actions);
        PipelineStarted {
            pipeline: &self.name,
            children: initial
                .iter()
                .map(|action| match action {
                    Action::Spec(spec) => spec.children.len(),
                    _ => 0,
                })
                .sum(),
        }
        .log();
        self.execute_all(initial);

        let mut requests_open = true;
        while !self.finished() {
            tokio::select! {
                biased;
                Some(report) = self.reports.recv() => self.handle_report(report),
                request = self.requests.recv(), if requests_open => match request {
                    Some(request) => self.handle_request(request),
                    None => {
                        // Every handle is gone.
                        requests_open = false;
                        self.begin_shutdown();
                    }
                },
                else => break,
            }
        }

        self.finish();
    }

    fn finished(&self) -> bool {
        self.phase == Phase::Closing && self.retiring.is_empty()
    }

    fn finish(mut self) {
        self.module.handle_shutdown();
        PipelineTerminated {
            pipeline: &self.name,
        }
        .log();

        if let Some((_, reply)) = self.waiter.take() {
            let _ = reply.send(Err(self.closed_error()));
        }
        self.notice(PipelineNotice::Terminated);
        for reply in self.shutdown_replies.drain(..) {
            let _ = reply.send(());
        }
    }

    fn handle_request(&mut self, request: PipelineRequest) {
        match request {
            PipelineRequest::ChangePlayback { target, reply } => self.request_playback(target, reply),
            PipelineRequest::PlaybackState { reply } => {
                let _ = reply.send(self.playback);
            }
            PipelineRequest::ForElement {
                child,
                message,
                reply,
            } => {
                let _ = reply.send(self.forward(&child, message));
            }
            PipelineRequest::Other(message) => {
                self.call_module("handle_other", |module, ctx| module.handle_other(&message, ctx));
                self.notice(PipelineNotice::Other(message));
            }
            PipelineRequest::Children { reply } => {
                let _ = reply.send(self.child_names());
            }
            PipelineRequest::Shutdown { reply } => {
                self.shutdown_replies.push(reply);
                self.begin_shutdown();
            }
        }
    }

    fn handle_report(&mut self, report: ChildReport) {
        let ChildReport { child, event } = report;

        match event {
            ChildEvent::Terminated => {
                self.retire_exited(&child);
            }
            ChildEvent::Failed(reason) => {
                if !self.retire_exited(&child) {
                    self.on_child_failed(&child, reason);
                }
            }
            // Anything else from a child that is already on its way out is stale.
            _ if !self.has_child(&child) => {}
            ChildEvent::PlaybackChanged(state) => self.on_child_playback(&child, state),
            ChildEvent::Notification(payload) => {
                self.call_module("handle_notification", |module, ctx| {
                    module.handle_notification(&payload, &child, ctx)
                });
                self.notice(PipelineNotice::Notification {
                    element: child,
                    payload,
                });
            }
            ChildEvent::StartOfStream(pad) => {
                self.call_module("handle_element_start_of_stream", |module, ctx| {
                    module.handle_element_start_of_stream(&child, &pad, ctx)
                });
                self.notice(PipelineNotice::StartOfStream { element: child, pad });
            }
            ChildEvent::EndOfStream(pad) => {
                self.call_module("handle_element_end_of_stream", |module, ctx| {
                    module.handle_element_end_of_stream(&child, &pad, ctx)
                });
                self.notice(PipelineNotice::EndOfStream { element: child, pad });
            }
            ChildEvent::ShutdownRequested => self.remove_child(&child),
        }
    }

    // ---- playback ----

    fn request_playback(
        &mut self,
        target: PlaybackState,
        reply: oneshot::Sender<Result<PlaybackState, PipelineError>>,
    ) {
        if self.phase != Phase::Running {
            let _ = reply.send(Err(self.closed_error()));
            return;
        }
        if let Some((requested, previous)) = self.waiter.take() {
            self.supersede(requested, previous, target);
        }
        self.target = target;
        self.waiter = Some((target, reply));
        self.advance();
    }

    fn supersede(
        &self,
        requested: PlaybackState,
        reply: oneshot::Sender<Result<PlaybackState, PipelineError>>,
        superseded_by: PlaybackState,
    ) {
        PlaybackRequestSuperseded {
            pipeline: &self.name,
            requested,
            superseded_by,
        }
        .log();
        let _ = reply.send(Err(PipelineError::Superseded {
            requested,
            superseded_by,
        }));
    }

    /// Start the next step towards `target`, or settle if it has been reached.
    fn advance(&mut self) {
        if self.pending.is_some() || self.phase == Phase::Closing {
            return;
        }

        match self.playback.next_step_to(self.target) {
            Some(transition) => {
                let awaiting = self.children.iter().map(|c| c.name().to_string()).collect();
                self.pending = Some(PendingStep {
                    transition,
                    awaiting,
                });
                for name in self.child_names() {
                    self.drive_child(&name);
                }
                self.maybe_complete_step();
            }
            None => {
                if let Some((_, reply)) = self.waiter.take() {
                    let _ = reply.send(Ok(self.playback));
                }
                if self.phase == Phase::Stopping {
                    self.close(ShutdownReason::Normal);
                }
            }
        }
    }

    /// The state every child should be heading for right now.
    fn child_target(&self) -> PlaybackState {
        self.pending
            .as_ref()
            .map(|pending| pending.transition.to())
            .unwrap_or(self.playback)
    }

    /// Send `name` its next adjacent step, or mark it as arrived.
    fn drive_child(&mut self, name: &str) {
        let wanted = self.child_target();
        let Some(child) = self.children.iter_mut().find(|c| c.name() == name) else {
            return;
        };
        if child.stepping {
            return;
        }

        match child.playback.next_step_to(wanted) {
            Some(step) => {
                child.stepping = true;
                child.handle.send(ElementMessage::ChangePlayback { target: step.to() });
            }
            None => {
                if let Some(pending) = &mut self.pending {
                    pending.awaiting.remove(name);
                }
            }
        }
    }

    fn on_child_playback(&mut self, name: &str, state: PlaybackState) {
        if let Some(child) = self.children.iter_mut().find(|c| c.name() == name) {
            child.stepping = false;
            child.playback = state;
        }
        self.drive_child(name);
        self.maybe_complete_step();
    }

    fn maybe_complete_step(&mut self) {
        let ready = matches!(&self.pending, Some(pending) if pending.awaiting.is_empty());
        if !ready {
            return;
        }
        if let Some(pending) = self.pending.take() {
            self.complete_step(pending.transition);
        }
    }

    /// Every child acknowledged `transition`: run the module callback, then tell the observer.
    fn complete_step(&mut self, transition: PlaybackTransition) {
        let callback = transition.callback_name();
        let result = self.invoke_module(callback, |module, ctx| match transition {
            PlaybackTransition::STOPPED_TO_PREPARED => module.handle_stopped_to_prepared(ctx),
            PlaybackTransition::PREPARED_TO_PLAYING => module.handle_prepared_to_playing(ctx),
            PlaybackTransition::PLAYING_TO_PREPARED => module.handle_playing_to_prepared(ctx),
            _ => module.handle_prepared_to_stopped(ctx),
        });

        self.playback = transition.to();
        PlaybackStepCompleted {
            actor: "pipeline",
            name: &self.name,
            from: transition.from(),
            to: transition.to(),
        }
        .log();

        match result.into_actions() {
            Ok(actions) => self.execute_all(actions),
            Err(reason) if transition.is_teardown() => TeardownFailed {
                name: &self.name,
                callback,
                reason: &reason,
            }
            .log(),
            Err(reason) => {
                self.fail(RuntimeError::Callback { callback, reason });
                return;
            }
        }

        self.notice(PipelineNotice::PlaybackChanged {
            from: transition.from(),
            to: transition.to(),
        });
        self.advance();
    }

    // ---- topology ----

    fn apply_spec(&mut self, spec: TopologySpec) {
        let resolved = match validate_topology(&spec, &self.index) {
            Ok(resolved) => resolved,
            Err(errors) => {
                TopologyRejected {
                    pipeline: &self.name,
                    errors: &errors,
                }
                .log();
                self.fail(ConfigError::InvalidTopology(errors));
                return;
            }
        };

        let names = spec.child_names();
        if spec.links.is_none() && names.len() > 1 {
            let chain: Vec<&str> = names.iter().map(String::as_str).collect();
            DefaultChainSynthesized {
                pipeline: &self.name,
                children: &chain,
            }
            .log();
        }

        for child in spec.children {
            self.index.add_child(child.name.clone(), child.element.pads());
            let handle = spawn_element(child.name.clone(), child.element, self.reports_tx.clone());
            if let Some(pending) = &mut self.pending {
                pending.awaiting.insert(child.name);
            }
            self.children.push(Child::new(handle));
        }

        let link_count = resolved.len();
        for resolved in resolved {
            self.index.mark_linked(&resolved.link);
            self.establish(&resolved);
            self.links.push(resolved);
        }

        SpecApplied {
            pipeline: &self.name,
            children: names.len(),
            links: link_count,
        }
        .log();

        for name in &names {
            self.drive_child(name);
        }
        self.call_module("handle_spec_started", |module, ctx| {
            module.handle_spec_started(&names, ctx)
        });
    }

    /// Send `LinkPad` to both ends; each end learns the other's mode and sender.
    fn establish(&self, resolved: &ResolvedLink) {
        let link = &resolved.link;
        let (Some(from), Some(to)) = (self.child(&link.from.element), self.child(&link.to.element)) else {
            return;
        };
        let policy = link
            .policy
            .or_else(|| self.spec_policy(&link.to))
            .or_else(|| self.spec_policy(&link.from));

        from.handle.send(ElementMessage::LinkPad {
            pad: link.from.pad.clone(),
            peer: Peer {
                element: link.to.element.clone(),
                pad: link.to.pad.clone(),
                mode: resolved.input_mode,
                policy,
                sender: to.handle.sender().clone(),
            },
        });
        to.handle.send(ElementMessage::LinkPad {
            pad: link.to.pad.clone(),
            peer: Peer {
                element: link.from.element.clone(),
                pad: link.from.pad.clone(),
                mode: resolved.output_mode,
                policy,
                sender: from.handle.sender().clone(),
            },
        });
    }

    fn spec_policy(&self, endpoint: &Endpoint) -> Option<BufferPolicy> {
        self.index
            .pad_specs(&endpoint.element)
            .and_then(|specs| spec_for(specs, &endpoint.pad))
            .and_then(|spec| spec.policy)
    }

    /// Unlink `name` from its peers and shut it down.
    fn remove_child(&mut self, name: &str) {
        let Some(position) = self.children.iter().position(|c| c.name() == name) else {
            tracing::warn!(pipeline = %self.name, child = name, "Cannot remove unknown child");
            return;
        };
        let child = self.children.remove(position);

        let (detached, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.links)
            .into_iter()
            .partition(|l| l.link.from.element == name || l.link.to.element == name);
        self.links = kept;
        for resolved in &detached {
            let peer_end = if resolved.link.from.element == name {
                &resolved.link.to
            } else {
                &resolved.link.from
            };
            if let Some(peer) = self.child(&peer_end.element) {
                peer.handle.send(ElementMessage::UnlinkPad {
                    pad: peer_end.pad.clone(),
                });
            }
            self.index.unmark_linked(&resolved.link);
        }
        self.index.remove_child(name);

        if let Some(pending) = &mut self.pending {
            pending.awaiting.remove(name);
        }
        if !child.failed {
            child.handle.send(ElementMessage::Shutdown {
                reason: ShutdownReason::Removed,
            });
            self.retiring.push(child.handle);
        }

        ChildRemoved {
            pipeline: &self.name,
            child: name,
        }
        .log();
        self.maybe_complete_step();
    }

    fn forward(&self, child: &str, message: Value) -> Result<(), PipelineError> {
        let delivered = self
            .child(child)
            .is_some_and(|target| target.handle.send(ElementMessage::Other(message)));
        if delivered {
            return Ok(());
        }

        ForwardToUnknownChild {
            pipeline: &self.name,
            child,
        }
        .log();
        Err(PipelineError::UnknownChild {
            pipeline: self.name.clone(),
            child: child.to_string(),
        })
    }

    // ---- failure and shutdown ----

    fn on_child_failed(&mut self, name: &str, reason: String) {
        let Some(child) = self.children.iter_mut().find(|c| c.name() == name) else {
            return;
        };
        child.failed = true;

        ChildFailureHandled {
            pipeline: &self.name,
            child: name,
            reason: &reason,
            strategy: self.failure_strategy,
        }
        .log();
        self.notice(PipelineNotice::ChildFailed {
            element: name.to_string(),
            reason: reason.clone(),
        });

        let delegate = self.invoke_module("handle_child_failure", |module, ctx| {
            module.handle_child_failure(name, &reason, ctx)
        });
        match self.failure_strategy {
            FailureStrategy::ContinueOnError => {
                let framework = CallbackResult::with_actions(vec![Action::RemoveChild(name.to_string())]);
                self.apply("handle_child_failure", combine_results(delegate, framework));
            }
            FailureStrategy::FailFast => {
                self.apply("handle_child_failure", delegate);
                let error = PipelineError::ChildFailed {
                    pipeline: self.name.clone(),
                    child: name.to_string(),
                    reason: reason.clone(),
                };
                self.halt(error, ShutdownReason::Halted(reason));
            }
        }
    }

    /// The pipeline itself failed: tell the observer and halt.
    fn fail(&mut self, error: impl std::fmt::Display) {
        if self.phase == Phase::Closing {
            return;
        }
        let reason = error.to_string();
        PipelineFailed {
            pipeline: &self.name,
            reason: &reason,
        }
        .log();
        self.notice(PipelineNotice::Failed {
            reason: reason.clone(),
        });
        let error = PipelineError::Failed {
            pipeline: self.name.clone(),
            reason: reason.clone(),
        };
        self.halt(error, ShutdownReason::Halted(reason));
    }

    fn halt(&mut self, error: PipelineError, reason: ShutdownReason) {
        if self.phase == Phase::Closing {
            return;
        }
        if let Some((_, reply)) = self.waiter.take() {
            let _ = reply.send(Err(error.clone()));
        }
        self.outcome = Some(error);
        self.close(reason);
    }

    /// Drive to `stopped`, then shut every child down.
    fn begin_shutdown(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.phase = Phase::Stopping;
        if let Some((requested, reply)) = self.waiter.take() {
            if requested == PlaybackState::Stopped {
                self.waiter = Some((requested, reply));
            } else {
                self.supersede(requested, reply, PlaybackState::Stopped);
            }
        }
        self.target = PlaybackState::Stopped;
        self.advance();
    }

    /// Tell every live child to shut down; each walks itself down to `stopped`.
    fn close(&mut self, reason: ShutdownReason) {
        self.phase = Phase::Closing;
        self.pending = None;
        for child in self.children.drain(..) {
            if child.failed {
                continue;
            }
            child.handle.send(ElementMessage::Shutdown {
                reason: reason.clone(),
            });
            self.retiring.push(child.handle);
        }
        self.links.clear();
        self.index = TopologyIndex::new();
    }

    fn retire_exited(&mut self, name: &str) -> bool {
        match self.retiring.iter().position(|handle| handle.name() == name) {
            Some(position) => {
                self.retiring.remove(position);
                true
            }
            None => false,
        }
    }

    fn closed_error(&self) -> PipelineError {
        self.outcome
            .clone()
            .unwrap_or_else(|| PipelineError::Terminated(self.name.clone()))
    }

    // ---- module callbacks and actions ----

    fn invoke_module<F>(&mut self, name: &'static str, callback: F) -> CallbackResult
    where
        F: FnOnce(&mut dyn PipelineModule, &PipelineContext<'_>) -> CallbackResult,
    {
        let invoked = CallbackInvoked {
            actor: "pipeline",
            name: &self.name,
            callback: name,
        };
        let span = invoked.span("module_callback");
        let _guard = span.enter();
        invoked.log();

        let children = self.children.iter().map(|c| c.name()).collect();
        let ctx = PipelineContext::new(&self.name, self.playback, children);
        callback(self.module.as_mut(), &ctx)
    }

    fn call_module<F>(&mut self, name: &'static str, callback: F)
    where
        F: FnOnce(&mut dyn PipelineModule, &PipelineContext<'_>) -> CallbackResult,
    {
        let result = self.invoke_module(name, callback);
        self.apply(name, result);
    }

    /// Execute a callback's actions; an `Error` result halts the pipeline.
    fn apply(&mut self, callback: &'static str, result: CallbackResult) {
        match result.into_actions() {
            Ok(actions) => self.execute_all(actions),
            Err(reason) => self.fail(RuntimeError::Callback { callback, reason }),
        }
    }

    fn execute_all(&mut self, actions: Vec<Action>) {
        for action in actions {
            if self.phase == Phase::Closing {
                break;
            }
            self.execute(action);
        }
    }

    fn execute(&mut self, action: Action) {
        match action {
            Action::Notify(payload) => self.notice(PipelineNotice::ModuleNotification(payload)),
            Action::Forward { child, message } => {
                let _ = self.forward(&child, message);
            }
            Action::Spec(spec) => self.apply_spec(spec),
            Action::RemoveChild(name) => self.remove_child(&name),
            Action::Shutdown => self.begin_shutdown(),
            other => self.fail(ActionError::Unsupported {
                action: other.name(),
                actor: "pipeline",
            }),
        }
    }

    // ---- helpers ----

    fn notice(&self, notice: PipelineNotice) {
        if let Some(observer) = &self.observer {
            observer.notify(notice);
        }
    }

    fn child(&self, name: &str) -> Option<&Child> {
        self.children.iter().find(|c| c.name() == name)
    }

    fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    fn child_names(&self) -> Vec<String> {
        self.children.iter().map(|c| c.name().to_string()).collect()
    }
}
