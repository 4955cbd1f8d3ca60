// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod execution;
mod runtime;

pub use config::ConfigError;
pub use execution::{FailureStrategy, PipelineError};
pub use runtime::{ActionError, LinkError, PlaybackError, RuntimeError};
