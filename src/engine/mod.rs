// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The runtime: element actors, their pads, and the pipeline that coordinates them.

pub mod buffer;
pub mod dispatcher;
pub mod element_actor;
pub mod observer;
pub mod pad;
pub mod pipeline;
pub mod playback;

pub use buffer::{Buffer, Caps, StreamEvent};
pub use observer::{observer, NoticeReceiver, Observer, PipelineNotice};
pub use pad::{BufferPolicy, FlowMode, PadRef, PadSpec};
pub use pipeline::{Pipeline, PipelineHandle};
pub use playback::{PlaybackState, PlaybackTransition};
