// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Startup configuration errors.
//!
//! Everything in here is detected before a single actor is spawned and is
//! returned synchronously to whoever called [`crate::engine::Pipeline::start`]
//! or the config loader. No partial startup happens when one of these fires.

use thiserror::Error;

use crate::errors::LinkError;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither a governing module nor an element list was supplied.
    #[error("Pipeline '{pipeline}' has no topology: supply either `elements` or a governing `module`")]
    MissingTopology { pipeline: String },

    /// A governing module and an explicit elements/links list are mutually exclusive.
    #[error("Pipeline '{pipeline}' was given both a governing `module` and an explicit `elements`/`links` topology")]
    ModuleWithExplicitTopology { pipeline: String },

    /// No links were given and there are too few elements to synthesize a chain.
    #[error("Pipeline '{pipeline}' needs at least two elements to build a default chain, got {count}")]
    NotEnoughElements { pipeline: String, count: usize },

    /// The governing module's `handle_init` failed or did not produce a topology.
    #[error("Governing module of pipeline '{pipeline}' failed to initialize: {reason}")]
    ModuleInit { pipeline: String, reason: String },

    /// One or more links or children failed validation.
    #[error("Topology validation failed:\n{}", format_link_errors(.0))]
    InvalidTopology(Vec<LinkError>),

    /// Element kind named in a config file is not registered.
    #[error("Unknown element kind '{kind}' for element '{element}'")]
    UnknownElementKind { element: String, kind: String },

    /// Element options failed schema validation.
    #[error("Invalid options for element '{element}': {reason}")]
    InvalidOptions { element: String, reason: String },

    /// Pad reference in a config file could not be parsed.
    #[error("Invalid endpoint '{0}': expected `element.pad` or `element.pad#id`")]
    InvalidEndpoint(String),

    /// Config file extension is neither YAML nor TOML.
    #[error("Unsupported config file format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
}

fn format_link_errors(errors: &[LinkError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
