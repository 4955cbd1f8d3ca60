// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for element actor events.
//!
//! This module contains message types for logging events related to:
//! * Element actor start and termination
//! * Callback failures and rejected actions
//! * Pad linking and advisory backpressure

use crate::engine::pad::PadRef;
use crate::errors::RuntimeError;
use crate::observability::messages::StructuredLog;
use crate::traits::{Backpressure, ShutdownReason};
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Element actor started and ran `handle_init`.
///
/// # Log Level
/// `debug!` - Per-element lifecycle detail
///
/// # Example
/// ```
/// use the_conduit::observability::messages::element::ElementStarted;
///
/// let msg = ElementStarted {
///     element: "source",
///     kind: "counting_source",
///     pads: 1,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct ElementStarted<'a> {
    pub element: &'a str,
    pub kind: &'a str,
    pub pads: usize,
}

impl Display for ElementStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Element '{}' ({}) started with {} static pad(s)",
            self.element, self.kind, self.pads
        )
    }
}

impl StructuredLog for ElementStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            element = self.element,
            kind = self.kind,
            pads = self.pads,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "element",
            span_name = name,
            element = self.element,
            kind = self.kind,
        )
    }
}

/// A callback returned `CallbackResult::Error`.
///
/// # Log Level
/// `error!` - Fatal to the element
pub struct CallbackFailed<'a> {
    pub element: &'a str,
    pub callback: &'a str,
    pub reason: &'a str,
}

impl Display for CallbackFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Element '{}' callback {} failed: {}",
            self.element, self.callback, self.reason
        )
    }
}

impl StructuredLog for CallbackFailed<'_> {
    fn log(&self) {
        tracing::error!(
            element = self.element,
            callback = self.callback,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "callback_failed",
            span_name = name,
            element = self.element,
            callback = self.callback,
        )
    }
}

/// The element hit a fatal runtime error and is terminating.
///
/// # Log Level
/// `error!` - Failure reported to the parent pipeline
pub struct ElementFailed<'a> {
    pub element: &'a str,
    pub error: &'a RuntimeError,
}

impl Display for ElementFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Element '{}' failed: {}", self.element, self.error)
    }
}

impl StructuredLog for ElementFailed<'_> {
    fn log(&self) {
        tracing::error!(
            element = self.element,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "element_failed",
            span_name = name,
            element = self.element,
            error = %self.error,
        )
    }
}

/// Element actor exited after `handle_shutdown`.
///
/// # Log Level
/// `debug!`
pub struct ElementTerminated<'a> {
    pub element: &'a str,
    pub reason: &'a ShutdownReason,
}

impl Display for ElementTerminated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Element '{}' terminated ({:?})", self.element, self.reason)
    }
}

impl StructuredLog for ElementTerminated<'_> {
    fn log(&self) {
        tracing::debug!(
            element = self.element,
            reason = ?self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "element_terminated",
            span_name = name,
            element = self.element,
        )
    }
}

/// A buffer or event arrived for a pad the element does not have.
///
/// This happens when a dynamic pad was removed while data was still in flight.
///
/// # Log Level
/// `warn!`
pub struct DataForUnknownPad<'a> {
    pub element: &'a str,
    pub pad: &'a PadRef,
    pub what: &'a str,
}

impl Display for DataForUnknownPad<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Element '{}' dropped {} for unknown pad '{}'",
            self.element, self.what, self.pad
        )
    }
}

impl StructuredLog for DataForUnknownPad<'_> {
    fn log(&self) {
        tracing::warn!(
            element = self.element,
            pad = %self.pad,
            what = self.what,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "data_for_unknown_pad",
            span_name = name,
            element = self.element,
            pad = %self.pad,
        )
    }
}

pub struct PadLinked<'a> {
    pub element: &'a str,
    pub pad: &'a PadRef,
    pub peer_element: &'a str,
    pub peer_pad: &'a PadRef,
}

impl Display for PadLinked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pad {}.{} linked to {}.{}",
            self.element, self.pad, self.peer_element, self.peer_pad
        )
    }
}

impl StructuredLog for PadLinked<'_> {
    fn log(&self) {
        tracing::debug!(
            element = self.element,
            pad = %self.pad,
            peer_element = self.peer_element,
            peer_pad = %self.peer_pad,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "pad_linked",
            span_name = name,
            element = self.element,
            pad = %self.pad,
        )
    }
}

pub struct PadUnlinked<'a> {
    pub element: &'a str,
    pub pad: &'a PadRef,
}

impl Display for PadUnlinked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Pad {}.{} unlinked", self.element, self.pad)
    }
}

impl StructuredLog for PadUnlinked<'_> {
    fn log(&self) {
        tracing::debug!(element = self.element, pad = %self.pad, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "pad_unlinked",
            span_name = name,
            element = self.element,
            pad = %self.pad,
        )
    }
}

/// A callback is about to run on an element or a pipeline module.
///
/// # Log Level
/// `trace!` - One per callback; the span wraps the callback and its actions
pub struct CallbackInvoked<'a> {
    pub actor: &'a str,
    pub name: &'a str,
    pub callback: &'a str,
}

impl Display for CallbackInvoked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Invoking {} on {} '{}'", self.callback, self.actor, self.name)
    }
}

impl StructuredLog for CallbackInvoked<'_> {
    fn log(&self) {
        tracing::trace!(
            actor = self.actor,
            name = self.name,
            callback = self.callback,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "callback",
            span_name = name,
            actor = self.actor,
            name = self.name,
            callback = self.callback,
        )
    }
}

/// Advisory backpressure on a push output pad changed.
///
/// # Log Level
/// `debug!`
pub struct BackpressureChanged<'a> {
    pub element: &'a str,
    pub pad: &'a PadRef,
    pub signal: Backpressure,
    pub in_flight: u64,
}

impl Display for BackpressureChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Backpressure {:?} on {}.{} with {} buffer(s) in flight",
            self.signal, self.element, self.pad, self.in_flight
        )
    }
}

impl StructuredLog for BackpressureChanged<'_> {
    fn log(&self) {
        tracing::debug!(
            element = self.element,
            pad = %self.pad,
            signal = ?self.signal,
            in_flight = self.in_flight,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "backpressure",
            span_name = name,
            element = self.element,
            pad = %self.pad,
        )
    }
}
