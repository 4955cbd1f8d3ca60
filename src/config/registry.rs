// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Element kind registry used to resolve config files into element instances.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::backends::local::register_builtins;
use crate::config::schema::OptionsSchema;
use crate::errors::ConfigError;
use crate::traits::Element;

/// Constructor for one element kind, called with schema-validated options.
pub type ElementBuilder = fn(&Map<String, Value>) -> Result<Box<dyn Element>, String>;

/// A registered element kind.
#[derive(Clone)]
pub struct ElementKind {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: OptionsSchema,
    build: ElementBuilder,
}

impl fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementKind")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish()
    }
}

/// Maps element kind names (as used in config files) to schemas and constructors.
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    kinds: BTreeMap<&'static str, ElementKind>,
}

impl ElementRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in elements from [`crate::backends::local`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    /// Register a kind, replacing any previous registration under the same name.
    pub fn register(
        &mut self,
        name: &'static str,
        description: &'static str,
        schema: OptionsSchema,
        build: ElementBuilder,
    ) {
        self.kinds.insert(
            name,
            ElementKind {
                name,
                description,
                schema,
                build,
            },
        );
    }

    pub fn get(&self, kind: &str) -> Option<&ElementKind> {
        self.kinds.get(kind)
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Registered kinds, sorted by name.
    pub fn kinds(&self) -> impl Iterator<Item = &ElementKind> {
        self.kinds.values()
    }

    /// Validate `options` against the kind's schema and construct the element.
    ///
    /// # Arguments
    /// * `element` - Name of the element in the pipeline, used in errors
    /// * `kind` - Registered kind name
    /// * `options` - Raw options from the config file
    pub fn build(
        &self,
        element: &str,
        kind: &str,
        options: &Map<String, Value>,
    ) -> Result<Box<dyn Element>, ConfigError> {
        let entry = self
            .kinds
            .get(kind)
            .ok_or_else(|| ConfigError::UnknownElementKind {
                element: element.to_string(),
                kind: kind.to_string(),
            })?;

        let invalid = |reason: String| ConfigError::InvalidOptions {
            element: element.to_string(),
            reason,
        };

        let resolved = entry.schema.validate(options).map_err(invalid)?;
        (entry.build)(&resolved).map_err(invalid)
    }

    /// Markdown description of every registered kind and its options.
    pub fn describe(&self) -> String {
        self.kinds
            .values()
            .map(|kind| {
                format!(
                    "## {}\n\n{}\n\n{}",
                    kind.name,
                    kind.description,
                    kind.schema.render_table()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = ElementRegistry::with_builtins();
        let names: Vec<_> = registry.kinds().map(|k| k.name).collect();
        assert_eq!(
            names,
            vec!["counting_source", "passthrough", "tee", "testing_sink"]
        );
    }

    #[test]
    fn test_build_table_driven() {
        struct TestCase {
            name: &'static str,
            kind: &'static str,
            options: Value,
            expected_kind: Option<&'static str>,
        }

        let test_cases = vec![
            TestCase {
                name: "source with count",
                kind: "counting_source",
                options: json!({"count": 2}),
                expected_kind: Some("counting_source"),
            },
            TestCase {
                name: "push source",
                kind: "counting_source",
                options: json!({"count": 2, "mode": "push"}),
                expected_kind: Some("counting_source"),
            },
            TestCase {
                name: "source missing count",
                kind: "counting_source",
                options: json!({}),
                expected_kind: None,
            },
            TestCase {
                name: "sink with defaults",
                kind: "testing_sink",
                options: json!({}),
                expected_kind: Some("testing_sink"),
            },
            TestCase {
                name: "passthrough rejects options",
                kind: "passthrough",
                options: json!({"speed": 2}),
                expected_kind: None,
            },
        ];

        let registry = ElementRegistry::with_builtins();
        for case in test_cases {
            let result = registry.build("element", case.kind, &options(case.options));
            match (result, case.expected_kind) {
                (Ok(element), Some(kind)) => assert_eq!(element.kind(), kind, "{}", case.name),
                (Err(ConfigError::InvalidOptions { element, .. }), None) => {
                    assert_eq!(element, "element", "{}", case.name)
                }
                (Ok(_), None) => panic!("{}: expected an error", case.name),
                (Err(e), _) => panic!("{}: unexpected error {}", case.name, e),
            }
        }
    }

    #[test]
    fn test_unknown_kind() {
        let registry = ElementRegistry::with_builtins();
        match registry.build("x", "mixer", &Map::new()) {
            Err(ConfigError::UnknownElementKind { element, kind }) => {
                assert_eq!(element, "x");
                assert_eq!(kind, "mixer");
            }
            other => panic!("Expected UnknownElementKind, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_describe_lists_every_kind() {
        let description = ElementRegistry::with_builtins().describe();
        for kind in ["counting_source", "passthrough", "tee", "testing_sink"] {
            assert!(description.contains(&format!("## {}", kind)));
        }
    }
}
