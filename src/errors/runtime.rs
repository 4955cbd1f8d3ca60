// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while an actor is running.
//!
//! Any of these reaching the top of an actor's dispatch loop is fatal to that
//! actor; the framework never retries.

use thiserror::Error;

use crate::engine::pad::{FlowMode, PadDirection, PadRef};
use crate::engine::playback::PlaybackState;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("Illegal playback transition {from} -> {to}: only adjacent states may be crossed")]
    IllegalTransition {
        from: PlaybackState,
        to: PlaybackState,
    },
}

/// Violations found while resolving links between pads.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    #[error("Duplicate child name '{0}'")]
    DuplicateChild(String),

    #[error("Link references unknown child '{0}'")]
    UnknownChild(String),

    #[error("Child '{element}' has no pad '{pad}'")]
    UnknownPad { element: String, pad: PadRef },

    #[error("Pad '{pad}' of '{element}' is {actual:?}, expected {expected:?}")]
    DirectionMismatch {
        element: String,
        pad: PadRef,
        expected: PadDirection,
        actual: PadDirection,
    },

    #[error("Cannot link {from_element}.{from_pad} ({output:?}) to {to_element}.{to_pad} ({input:?}): incompatible flow modes")]
    IncompatibleModes {
        from_element: String,
        from_pad: PadRef,
        to_element: String,
        to_pad: PadRef,
        output: FlowMode,
        input: FlowMode,
    },

    #[error("Pad '{pad}' of '{element}' is already linked")]
    AlreadyLinked { element: String, pad: PadRef },

    #[error("Dynamic pad '{pad}' already exists on '{element}'")]
    PadExists { element: String, pad: PadRef },
}

/// An action returned by a callback that violates a pad/link invariant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Pad '{pad}' has outstanding demand {available}, cannot send {requested} buffer(s)")]
    DemandExceeded {
        pad: PadRef,
        requested: u64,
        available: u64,
    },

    #[error("Unknown pad '{0}'")]
    UnknownPad(PadRef),

    #[error("Pad '{0}' is not linked")]
    PadNotLinked(PadRef),

    #[error("Pad '{pad}' is {actual:?}, action requires {expected:?}")]
    WrongDirection {
        pad: PadRef,
        expected: PadDirection,
        actual: PadDirection,
    },

    #[error("Demand cannot be issued on push-mode pad '{0}'")]
    DemandOnPushPad(PadRef),

    #[error("Pad '{0}' already sent end of stream")]
    StreamEnded(PadRef),

    #[error("Action '{action}' is not supported by {actor}")]
    Unsupported {
        action: &'static str,
        actor: &'static str,
    },
}

/// The fatal error of a single actor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Callback '{callback}' returned an error: {reason}")]
    Callback {
        callback: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("Mailbox of '{0}' is closed")]
    MailboxClosed(String),
}
