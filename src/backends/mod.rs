// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Element implementations that ship with The Conduit.
//!
//! # Available Backends
//!
//! ## Local Backend
//! In-process elements used by config files, demos and tests:
//! - **Sources**: `counting_source` emits numbered buffers in pull or push mode
//! - **Filters**: `passthrough` forwards data, `tee` fans one input out to dynamic outputs
//! - **Sinks**: `testing_sink` reports every buffer to its pipeline as a notification
//!
//! ## Stub Backend (Test-Only)
//! Testing utilities for dispatcher and pipeline development (only available in test builds):
//! - **RecordingElement**: records every callback into a shared `CallbackLog` and
//!   answers with scripted results
//! - **Note**: NOT available in production builds
//!
//! # Examples
//!
//! ```rust
//! use the_conduit::config::ElementRegistry;
//! use serde_json::json;
//!
//! let registry = ElementRegistry::with_builtins();
//! let options = json!({"count": 3}).as_object().cloned().unwrap();
//! let source = registry.build("source", "counting_source", &options)?;
//! assert_eq!(source.kind(), "counting_source");
//! # Ok::<(), the_conduit::errors::ConfigError>(())
//! ```

pub mod local;
#[cfg(test)]
pub mod stub;
