// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod actions;        // callback results and actions
pub mod backends;       // built-in elements
pub mod config;         // options, topology, config files + registry
pub mod engine;         // element and pipeline actors
pub mod errors;         // error handling
pub mod observability;
pub mod traits;         // element and pipeline module contracts
