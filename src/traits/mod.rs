// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod element;
pub mod pipeline;

pub use element::{Backpressure, CallbackContext, Element, ShutdownReason};
pub use pipeline::{PipelineContext, PipelineModule};
