// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::config::options::PipelineOptions;
use crate::config::registry::ElementRegistry;
use crate::config::topology::{ChildSpec, Endpoint, LinkSpec};
use crate::engine::pad::BufferPolicy;
use crate::errors::{ConfigError, FailureStrategy};

/// File-based description of a pipeline.
///
/// This struct is what a YAML or TOML pipeline file deserializes into. It names
/// element kinds rather than holding element instances; [`PipelineConfig::into_options`]
/// resolves the kinds through an [`ElementRegistry`].
///
/// # Fields
/// * `name` - Pipeline name used in logs and errors (defaults to `"pipeline"`)
/// * `failure_strategy` - What a child failure does (optional, defaults to FailFast)
/// * `elements` - Children in declaration order
/// * `links` - Explicit links; when omitted the elements are chained in order
///
/// # Example
/// ```yaml
/// name: demo
/// failure_strategy: fail_fast
/// elements:
///   - name: source
///     kind: counting_source
///     options:
///       count: 5
///   - name: sink
///     kind: testing_sink
/// links:
///   - from: source.output
///     to: sink.input
/// ```
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_pipeline_name")]
    pub name: String,
    #[serde(default)]
    pub failure_strategy: FailureStrategy,
    pub elements: Vec<ElementConfig>,
    #[serde(default)]
    pub links: Option<Vec<LinkConfig>>,
}

fn default_pipeline_name() -> String {
    "pipeline".to_string()
}

/// One child of a file-based pipeline.
///
/// # Fields
/// * `name` - Unique child name
/// * `kind` - Registered element kind, e.g. `counting_source`
/// * `options` - Kind-specific options, validated against the kind's schema
#[derive(Debug, Deserialize)]
pub struct ElementConfig {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// One link of a file-based pipeline.
///
/// Endpoints are written `element.pad`, or `element.pad#id` for a dynamic pad instance.
#[derive(Debug, Deserialize)]
pub struct LinkConfig {
    pub from: String,
    pub to: String,
    /// Buffering policy for push links.
    #[serde(default)]
    pub preferred_size: Option<usize>,
}

impl LinkConfig {
    fn to_link_spec(&self) -> Result<LinkSpec, ConfigError> {
        let parse = |s: &str| Endpoint::parse(s).ok_or_else(|| ConfigError::InvalidEndpoint(s.to_string()));
        let link = LinkSpec::new(parse(&self.from)?, parse(&self.to)?);
        Ok(match self.preferred_size {
            Some(size) => link.with_policy(BufferPolicy::new(size)),
            None => link,
        })
    }
}

impl PipelineConfig {
    /// Build startup options, constructing every element through `registry`.
    ///
    /// Topology checks (names, pads, modes) are left to `Pipeline::start`.
    pub fn into_options(self, registry: &ElementRegistry) -> Result<PipelineOptions, ConfigError> {
        let elements = self
            .elements
            .iter()
            .map(|e| {
                registry
                    .build(&e.name, &e.kind, &e.options)
                    .map(|element| ChildSpec::boxed(e.name.clone(), element))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut options = PipelineOptions::new(self.name)
            .elements(elements)
            .failure_strategy(self.failure_strategy);

        if let Some(links) = &self.links {
            let links = links
                .iter()
                .map(LinkConfig::to_link_spec)
                .collect::<Result<Vec<_>, _>>()?;
            options = options.links(links);
        }

        Ok(options)
    }
}

/// Parse a pipeline description, choosing the format by file extension.
pub fn parse_config(content: &str, extension: &str) -> Result<PipelineConfig, ConfigError> {
    match extension {
        "yaml" | "yml" => Ok(serde_yaml::from_str(content)?),
        "toml" => Ok(toml::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Load a pipeline description from a `.yaml`, `.yml` or `.toml` file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let content = fs::read_to_string(path)?;
    parse_config(&content, &extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
name: demo
failure_strategy: continue_on_error
elements:
  - name: source
    kind: counting_source
    options:
      count: 3
      mode: push
  - name: sink
    kind: testing_sink
links:
  - from: source.output
    to: sink.input
    preferred_size: 4
"#;

    #[test]
    fn parse_basic_yaml_config() {
        let cfg = parse_config(YAML, "yaml").unwrap();
        assert_eq!(cfg.name, "demo");
        assert_eq!(cfg.failure_strategy, FailureStrategy::ContinueOnError);
        assert_eq!(cfg.elements.len(), 2);
        assert_eq!(cfg.elements[0].kind, "counting_source");
        assert_eq!(cfg.elements[0].options.get("count"), Some(&Value::from(3)));
        assert!(cfg.elements[1].options.is_empty());
        let links = cfg.links.as_ref().unwrap();
        assert_eq!(links[0].preferred_size, Some(4));
    }

    #[test]
    fn parse_toml_config_with_defaults() {
        let toml = r#"
[[elements]]
name = "source"
kind = "counting_source"
options = { count = 2 }

[[elements]]
name = "sink"
kind = "testing_sink"
"#;
        let cfg = parse_config(toml, "toml").unwrap();
        assert_eq!(cfg.name, "pipeline");
        assert_eq!(cfg.failure_strategy, FailureStrategy::FailFast);
        assert!(cfg.links.is_none());
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            parse_config("{}", "json"),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "json"
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.name, "demo");
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_into_options_resolves_links_and_policies() {
        let options = parse_config(YAML, "yaml")
            .unwrap()
            .into_options(&ElementRegistry::with_builtins())
            .unwrap();

        assert_eq!(options.name, "demo");
        assert_eq!(options.failure_strategy, FailureStrategy::ContinueOnError);
        assert_eq!(options.elements.as_ref().map(|e| e.len()), Some(2));
        let links = options.links.unwrap();
        assert_eq!(links[0].to_string(), "source.output -> sink.input");
        assert_eq!(links[0].policy, Some(BufferPolicy::new(4)));
    }

    #[test]
    fn test_into_options_rejects_bad_endpoint() {
        let yaml = r#"
elements:
  - name: source
    kind: counting_source
    options: { count: 1 }
  - name: sink
    kind: testing_sink
links:
  - from: source
    to: sink.input
"#;
        let result = parse_config(yaml, "yml")
            .unwrap()
            .into_options(&ElementRegistry::with_builtins());
        assert!(matches!(result, Err(ConfigError::InvalidEndpoint(e)) if e == "source"));
    }

    #[test]
    fn test_into_options_rejects_unknown_kind() {
        let yaml = r#"
elements:
  - name: mix
    kind: mixer
"#;
        let result = parse_config(yaml, "yaml")
            .unwrap()
            .into_options(&ElementRegistry::with_builtins());
        assert!(matches!(result, Err(ConfigError::UnknownElementKind { .. })));
    }
}
