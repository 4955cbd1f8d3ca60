// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative option schemas for element kinds.
//!
//! An [`OptionsSchema`] lists the options an element kind accepts. Config files pass
//! options as a free-form map; [`OptionsSchema::validate`] turns that map into a
//! complete, type-checked one:
//!
//! 1. Unknown option names are rejected
//! 2. Missing required options are rejected
//! 3. Missing optional options take their default
//! 4. Every value is checked against its declared [`OptionKind`]
//!
//! [`OptionsSchema::render_table`] renders the same schema as a Markdown table, which is
//! what `the-conduit --describe` prints.

use serde_json::{Map, Value};

/// Value type of one option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionKind {
    /// Non-negative integer.
    Unsigned,
    String,
    Boolean,
    /// One of a fixed set of strings.
    OneOf(&'static [&'static str]),
}

impl OptionKind {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            OptionKind::Unsigned => value.is_u64(),
            OptionKind::String => value.is_string(),
            OptionKind::Boolean => value.is_boolean(),
            OptionKind::OneOf(choices) => value
                .as_str()
                .map(|s| choices.contains(&s))
                .unwrap_or(false),
        }
    }

    fn describe(&self) -> String {
        match self {
            OptionKind::Unsigned => "unsigned integer".to_string(),
            OptionKind::String => "string".to_string(),
            OptionKind::Boolean => "boolean".to_string(),
            OptionKind::OneOf(choices) => format!("one of: {}", choices.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionField {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: OptionKind,
    pub default: Option<Value>,
}

impl OptionField {
    pub fn required(&self) -> bool {
        self.default.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsSchema {
    fields: Vec<OptionField>,
}

impl OptionsSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option that must be present.
    pub fn required(
        mut self,
        name: &'static str,
        kind: OptionKind,
        description: &'static str,
    ) -> Self {
        self.fields.push(OptionField {
            name,
            description,
            kind,
            default: None,
        });
        self
    }

    /// Add an option that falls back to `default` when absent.
    pub fn optional(
        mut self,
        name: &'static str,
        kind: OptionKind,
        default: Value,
        description: &'static str,
    ) -> Self {
        self.fields.push(OptionField {
            name,
            description,
            kind,
            default: Some(default),
        });
        self
    }

    pub fn fields(&self) -> &[OptionField] {
        &self.fields
    }

    /// Check `options` against the schema and fill in defaults.
    ///
    /// # Returns
    /// * `Ok(Map)` - every declared option, present or defaulted
    /// * `Err(String)` - all problems found, joined with `"; "`
    pub fn validate(&self, options: &Map<String, Value>) -> Result<Map<String, Value>, String> {
        let mut problems = Vec::new();

        for name in options.keys() {
            if !self.fields.iter().any(|f| f.name == name) {
                problems.push(format!("unknown option '{}'", name));
            }
        }

        let mut resolved = Map::new();
        for field in &self.fields {
            match (options.get(field.name), &field.default) {
                (Some(value), _) if field.kind.accepts(value) => {
                    resolved.insert(field.name.to_string(), value.clone());
                }
                (Some(value), _) => problems.push(format!(
                    "option '{}' expects {}, got {}",
                    field.name,
                    field.kind.describe(),
                    value
                )),
                (None, Some(default)) => {
                    resolved.insert(field.name.to_string(), default.clone());
                }
                (None, None) => problems.push(format!("missing required option '{}'", field.name)),
            }
        }

        if problems.is_empty() {
            Ok(resolved)
        } else {
            Err(problems.join("; "))
        }
    }

    /// Markdown table with one row per option.
    pub fn render_table(&self) -> String {
        let mut table = String::from("| Option | Type | Default | Description |\n|---|---|---|---|\n");
        if self.fields.is_empty() {
            table.push_str("| _none_ | | | |\n");
        }
        for field in &self.fields {
            let default = match &field.default {
                Some(value) => format!("`{}`", value),
                None => "required".to_string(),
            };
            table.push_str(&format!(
                "| `{}` | {} | {} | {} |\n",
                field.name,
                field.kind.describe(),
                default,
                field.description
            ));
        }
        table
    }
}
