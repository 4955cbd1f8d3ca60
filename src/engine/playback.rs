// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Playback state machine shared by elements and pipelines.
//!
//! Every actor moves through the same three states:
//!
//! ```text
//! stopped <-> prepared <-> playing
//! ```
//!
//! Only adjacent moves are legal. A caller that wants to go from `stopped` to
//! `playing` asks for a [`PlaybackState::path_to`] and performs each step in turn;
//! building a [`PlaybackTransition`] that skips a state is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::PlaybackError;

/// Lifecycle state of an element or pipeline.
///
/// `Stopped` is both the initial state and the only state from which an actor
/// may be shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Stopped,
    Prepared,
    Playing,
}

impl PlaybackState {
    fn rank(self) -> u8 {
        match self {
            PlaybackState::Stopped => 0,
            PlaybackState::Prepared => 1,
            PlaybackState::Playing => 2,
        }
    }

    fn from_rank(rank: u8) -> Self {
        match rank {
            0 => PlaybackState::Stopped,
            1 => PlaybackState::Prepared,
            _ => PlaybackState::Playing,
        }
    }

    /// The ordered list of single-step transitions that lead from `self` to `target`.
    ///
    /// Returns an empty list when `self == target`.
    ///
    /// # Examples
    /// ```
    /// use the_conduit::engine::playback::PlaybackState;
    ///
    /// let steps = PlaybackState::Playing.path_to(PlaybackState::Stopped);
    /// assert_eq!(steps.len(), 2);
    /// assert_eq!(steps[0].to(), PlaybackState::Prepared);
    /// assert_eq!(steps[1].to(), PlaybackState::Stopped);
    /// ```
    pub fn path_to(self, target: PlaybackState) -> Vec<PlaybackTransition> {
        let mut steps = Vec::new();
        let mut current = self.rank();
        let goal = target.rank();

        while current != goal {
            let next = if goal > current { current + 1 } else { current - 1 };
            steps.push(PlaybackTransition {
                from: PlaybackState::from_rank(current),
                to: PlaybackState::from_rank(next),
            });
            current = next;
        }

        steps
    }

    /// Move one step towards `target`, if not already there.
    pub fn next_step_to(self, target: PlaybackState) -> Option<PlaybackTransition> {
        self.path_to(target).into_iter().next()
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Prepared => "prepared",
            PlaybackState::Playing => "playing",
        };
        f.write_str(name)
    }
}

/// A single legal step of the playback state machine.
///
/// Can only be constructed for adjacent states, so holding one is proof that
/// the move is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackTransition {
    from: PlaybackState,
    to: PlaybackState,
}

impl PlaybackTransition {
    pub const STOPPED_TO_PREPARED: PlaybackTransition = PlaybackTransition {
        from: PlaybackState::Stopped,
        to: PlaybackState::Prepared,
    };
    pub const PREPARED_TO_PLAYING: PlaybackTransition = PlaybackTransition {
        from: PlaybackState::Prepared,
        to: PlaybackState::Playing,
    };
    pub const PLAYING_TO_PREPARED: PlaybackTransition = PlaybackTransition {
        from: PlaybackState::Playing,
        to: PlaybackState::Prepared,
    };
    pub const PREPARED_TO_STOPPED: PlaybackTransition = PlaybackTransition {
        from: PlaybackState::Prepared,
        to: PlaybackState::Stopped,
    };

    /// Validate a transition between two states.
    ///
    /// # Errors
    /// [`PlaybackError::IllegalTransition`] when the states are equal or not adjacent,
    /// e.g. `stopped -> playing`.
    pub fn new(from: PlaybackState, to: PlaybackState) -> Result<Self, PlaybackError> {
        let distance = (from.rank() as i8 - to.rank() as i8).abs();
        if distance != 1 {
            return Err(PlaybackError::IllegalTransition { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> PlaybackState {
        self.from
    }

    pub fn to(&self) -> PlaybackState {
        self.to
    }

    /// Name of the element/pipeline callback invoked for this step.
    pub fn callback_name(&self) -> &'static str {
        match (self.from, self.to) {
            (PlaybackState::Stopped, PlaybackState::Prepared) => "handle_stopped_to_prepared",
            (PlaybackState::Prepared, PlaybackState::Playing) => "handle_prepared_to_playing",
            (PlaybackState::Playing, PlaybackState::Prepared) => "handle_playing_to_prepared",
            _ => "handle_prepared_to_stopped",
        }
    }

    /// `prepared -> stopped` releases resources; errors there are logged, not fatal.
    pub fn is_teardown(&self) -> bool {
        *self == Self::PREPARED_TO_STOPPED
    }
}

impl fmt::Display for PlaybackTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
