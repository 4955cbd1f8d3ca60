// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Config files all the way to running pipelines.

use std::io::Write;
use std::time::Duration;

use serde_json::json;
use tempfile::Builder;

use crate::config::{load_config, parse_config, ElementRegistry};
use crate::engine::observer::{observer, PipelineNotice};
use crate::engine::pipeline::Pipeline;
use crate::errors::{ConfigError, FailureStrategy, LinkError};

const WAIT: Duration = Duration::from_secs(3);

const FANOUT_YAML: &str = r#"
name: fanout
failure_strategy: continue_on_error
elements:
  - name: source
    kind: counting_source
    options:
      count: 2
  - name: tee
    kind: tee
  - name: left
    kind: testing_sink
    options:
      mode: push
  - name: right
    kind: testing_sink
    options:
      mode: push
links:
  - from: source.output
    to: tee.input
  - from: tee.output#left
    to: left.input
    preferred_size: 8
  - from: tee.output#right
    to: right.input
"#;

#[tokio::test]
async fn test_yaml_file_runs_to_end_of_stream() {
    let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(FANOUT_YAML.as_bytes()).unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.name, "fanout");
    assert_eq!(config.failure_strategy, FailureStrategy::ContinueOnError);

    let (observer, mut notices) = observer();
    let options = config
        .into_options(&ElementRegistry::with_builtins())
        .unwrap()
        .observer(observer);
    let pipeline = Pipeline::start(options).unwrap();
    pipeline.play().await.unwrap();

    let mut ended = Vec::new();
    while ended.len() < 2 {
        match notices
            .wait_for(WAIT, |n| matches!(n, PipelineNotice::EndOfStream { .. }))
            .await
        {
            Some(PipelineNotice::EndOfStream { element, .. }) if element != "tee" => ended.push(element),
            Some(_) => {}
            None => panic!("Timed out, sinks that ended: {:?}", ended),
        }
    }
    ended.sort();
    assert_eq!(ended, vec!["left", "right"]);

    pipeline.shutdown().await.unwrap();
}

#[test]
fn test_toml_config_with_default_chain() {
    let toml = r#"
name = "chain"

[[elements]]
name = "source"
kind = "counting_source"
options = { count = 3, mode = "push" }

[[elements]]
name = "sink"
kind = "testing_sink"
options = { mode = "push" }
"#;
    let config = parse_config(toml, "toml").unwrap();
    assert!(config.links.is_none());
    assert_eq!(config.elements[0].options.get("count"), Some(&json!(3)));
    assert!(config.into_options(&ElementRegistry::with_builtins()).is_ok());
}

#[tokio::test]
async fn test_file_topology_errors_surface_at_start() {
    struct TestCase {
        name: &'static str,
        yaml: &'static str,
        check: fn(&ConfigError) -> bool,
    }

    let test_cases = vec![
        TestCase {
            name: "pull output into push input",
            yaml: r#"
elements:
  - { name: source, kind: counting_source, options: { count: 1 } }
  - { name: sink, kind: testing_sink, options: { mode: push } }
"#,
            check: |e| {
                matches!(e, ConfigError::InvalidTopology(errors)
                    if matches!(errors[..], [LinkError::IncompatibleModes { .. }]))
            },
        },
        TestCase {
            name: "unknown pad",
            yaml: r#"
elements:
  - { name: source, kind: counting_source, options: { count: 1 } }
  - { name: sink, kind: testing_sink }
links:
  - { from: source.video, to: sink.input }
"#,
            check: |e| {
                matches!(e, ConfigError::InvalidTopology(errors)
                    if matches!(errors[..], [LinkError::UnknownPad { .. }]))
            },
        },
        TestCase {
            name: "single element without links",
            yaml: r#"
elements:
  - { name: source, kind: counting_source, options: { count: 1 } }
"#,
            check: |e| matches!(e, ConfigError::NotEnoughElements { count: 1, .. }),
        },
    ];

    let registry = ElementRegistry::with_builtins();
    for test_case in test_cases {
        let options = parse_config(test_case.yaml, "yaml")
            .and_then(|config| config.into_options(&registry))
            .unwrap_or_else(|e| panic!("{}: failed before start: {}", test_case.name, e));
        match Pipeline::start(options) {
            Err(error) => assert!((test_case.check)(&error), "{}: unexpected error {}", test_case.name, error),
            Ok(_) => panic!("{}: expected a config error", test_case.name),
        }
    }
}

#[test]
fn test_element_options_are_checked_against_the_schema() {
    let yaml = r#"
elements:
  - { name: source, kind: counting_source, options: { count: "lots" } }
  - { name: sink, kind: testing_sink }
"#;
    let config = parse_config(yaml, "yaml").unwrap();
    match config.into_options(&ElementRegistry::with_builtins()) {
        Err(ConfigError::InvalidOptions { element, reason }) => {
            assert_eq!(element, "source");
            assert!(reason.contains("count"), "unexpected reason: {}", reason);
        }
        other => panic!("Expected InvalidOptions, got {:?}", other.map(|_| ())),
    }
}
