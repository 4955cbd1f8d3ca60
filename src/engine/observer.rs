// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observer protocol: tagged notices a pipeline emits to an external watcher.
//!
//! The observer is registered per pipeline instance through
//! `PipelineOptions::observer`. Notices are delivered asynchronously and in the
//! order the pipeline emits them. Faults are tagged distinctly
//! ([`PipelineNotice::ChildFailed`], [`PipelineNotice::Failed`]) so a watcher can tell
//! them apart from expected events.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::engine::pad::PadRef;
use crate::engine::playback::PlaybackState;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineNotice {
    /// The pipeline completed one playback step.
    PlaybackChanged {
        from: PlaybackState,
        to: PlaybackState,
    },
    /// A child notified its parent.
    Notification { element: String, payload: Value },
    /// First buffer arrived on a child's input pad.
    StartOfStream { element: String, pad: PadRef },
    /// A child's input pad received end-of-stream.
    EndOfStream { element: String, pad: PadRef },
    /// The pipeline's own module returned `Action::Notify`.
    ModuleNotification(Value),
    /// A message the pipeline did not recognize.
    Other(Value),
    /// A child failed; emitted before the failure strategy is applied.
    ChildFailed { element: String, reason: String },
    /// The pipeline itself hit a fatal error.
    Failed { reason: String },
    /// The pipeline task has exited.
    Terminated,
}

impl PipelineNotice {
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            PipelineNotice::ChildFailed { .. } | PipelineNotice::Failed { .. }
        )
    }
}

impl fmt::Display for PipelineNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineNotice::PlaybackChanged { from, to } => {
                write!(f, "PlaybackChanged: {} -> {}", from, to)
            }
            PipelineNotice::Notification { element, payload } => {
                write!(f, "Notification from {}: {}", element, payload)
            }
            PipelineNotice::StartOfStream { element, pad } => {
                write!(f, "StartOfStream on {}.{}", element, pad)
            }
            PipelineNotice::EndOfStream { element, pad } => {
                write!(f, "EndOfStream on {}.{}", element, pad)
            }
            PipelineNotice::ModuleNotification(payload) => write!(f, "Module notification: {}", payload),
            PipelineNotice::Other(message) => write!(f, "Other: {}", message),
            PipelineNotice::ChildFailed { element, reason } => {
                write!(f, "Child {} failed: {}", element, reason)
            }
            PipelineNotice::Failed { reason } => write!(f, "Pipeline failed: {}", reason),
            PipelineNotice::Terminated => write!(f, "Pipeline terminated"),
        }
    }
}

/// Sending half, held by the pipeline.
#[derive(Debug, Clone)]
pub struct Observer {
    sender: mpsc::UnboundedSender<PipelineNotice>,
}

impl Observer {
    /// Deliver a notice. A dropped receiver is not an error.
    pub fn notify(&self, notice: PipelineNotice) {
        let _ = self.sender.send(notice);
    }
}

/// Receiving half, held by whoever watches the pipeline.
#[derive(Debug)]
pub struct NoticeReceiver {
    receiver: mpsc::UnboundedReceiver<PipelineNotice>,
}

impl NoticeReceiver {
    /// Next notice, or `None` once the pipeline has dropped its observer.
    pub async fn recv(&mut self) -> Option<PipelineNotice> {
        self.receiver.recv().await
    }

    /// Next notice within `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<PipelineNotice> {
        tokio::time::timeout(timeout, self.receiver.recv())
            .await
            .ok()
            .flatten()
    }

    pub fn try_recv(&mut self) -> Option<PipelineNotice> {
        self.receiver.try_recv().ok()
    }

    /// Skip notices until one matches `predicate`, giving up after `timeout`.
    pub async fn wait_for<F>(&mut self, timeout: Duration, mut predicate: F) -> Option<PipelineNotice>
    where
        F: FnMut(&PipelineNotice) -> bool,
    {
        let search = async {
            while let Some(notice) = self.receiver.recv().await {
                if predicate(&notice) {
                    return Some(notice);
                }
            }
            None
        };
        tokio::time::timeout(timeout, search).await.ok().flatten()
    }
}

/// Create a connected observer pair.
pub fn observer() -> (Observer, NoticeReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Observer { sender }, NoticeReceiver { receiver })
}
