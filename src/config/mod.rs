// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod loader;
pub mod options;
pub mod registry;
pub mod schema;
pub mod topology;
pub mod validation;

#[cfg(test)]
mod integration_tests;

pub use loader::{load_config, parse_config, ElementConfig, LinkConfig, PipelineConfig};
pub use options::PipelineOptions;
pub use registry::{ElementBuilder, ElementKind, ElementRegistry};
pub use schema::{OptionKind, OptionsSchema};
pub use topology::{default_chain, ChildSpec, Endpoint, LinkSpec, TopologySpec};
pub use validation::{validate_topology, ResolvedLink, TopologyIndex};
