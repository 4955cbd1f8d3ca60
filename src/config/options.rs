// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Startup options of a pipeline and their synchronous validation.

use crate::actions::Action;
use crate::config::topology::{ChildSpec, LinkSpec, TopologySpec};
use crate::config::validation::{validate_topology, TopologyIndex};
use crate::engine::observer::Observer;
use crate::errors::{ConfigError, FailureStrategy};
use crate::traits::{Element, PipelineModule};

/// Everything needed to start one pipeline.
///
/// Exactly one of two topology sources must be given:
/// * `elements` (optionally with `links`): a static topology
/// * `module`: a governing module whose `handle_init` returns the topology as `Action::Spec`
///
/// # Example
/// ```rust
/// use the_conduit::backends::local::elements::{CountingSource, TestingSink};
/// use the_conduit::config::PipelineOptions;
///
/// let options = PipelineOptions::new("demo")
///     .child("source", CountingSource::new(3))
///     .child("sink", TestingSink::new());
/// ```
pub struct PipelineOptions {
    pub name: String,
    pub elements: Option<Vec<ChildSpec>>,
    pub links: Option<Vec<LinkSpec>>,
    pub module: Option<Box<dyn PipelineModule>>,
    pub observer: Option<Observer>,
    pub failure_strategy: FailureStrategy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::new("pipeline")
    }
}

impl PipelineOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: None,
            links: None,
            module: None,
            observer: None,
            failure_strategy: FailureStrategy::default(),
        }
    }

    pub fn child(mut self, name: impl Into<String>, element: impl Element) -> Self {
        self.elements
            .get_or_insert_with(Vec::new)
            .push(ChildSpec::new(name, element));
        self
    }

    pub fn elements(mut self, elements: Vec<ChildSpec>) -> Self {
        self.elements = Some(elements);
        self
    }

    pub fn link(mut self, link: LinkSpec) -> Self {
        self.links.get_or_insert_with(Vec::new).push(link);
        self
    }

    pub fn links(mut self, links: Vec<LinkSpec>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn module(mut self, module: impl PipelineModule) -> Self {
        self.module = Some(Box::new(module));
        self
    }

    pub fn observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn failure_strategy(mut self, strategy: FailureStrategy) -> Self {
        self.failure_strategy = strategy;
        self
    }

    /// Validate the options and produce the actions the pipeline starts with.
    ///
    /// Nothing is spawned here. With a governing module, its `handle_init` runs
    /// synchronously and every `Action::Spec` it returns is validated in order.
    ///
    /// # Errors
    /// * [`ConfigError::ModuleWithExplicitTopology`] if both sources are given
    /// * [`ConfigError::MissingTopology`] if neither is given
    /// * [`ConfigError::NotEnoughElements`] for fewer than two elements without links
    /// * [`ConfigError::ModuleInit`] if `handle_init` fails or returns no topology
    /// * [`ConfigError::InvalidTopology`] if any spec fails validation
    pub(crate) fn into_startup(self) -> Result<Startup, ConfigError> {
        let PipelineOptions {
            name,
            elements,
            links,
            module,
            observer,
            failure_strategy,
        } = self;

        let (module, initial_actions) = match (module, elements, links) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(ConfigError::ModuleWithExplicitTopology { pipeline: name });
            }
            (None, None, None) => {
                return Err(ConfigError::MissingTopology { pipeline: name });
            }
            (Some(mut module), None, None) => {
                let actions = module
                    .handle_init()
                    .into_actions()
                    .map_err(|reason| ConfigError::ModuleInit {
                        pipeline: name.clone(),
                        reason,
                    })?;
                validate_initial_specs(&name, &actions)?;
                (module, actions)
            }
            (None, elements, links) => {
                let children = elements.unwrap_or_default();
                if links.is_none() && children.len() < 2 {
                    return Err(ConfigError::NotEnoughElements {
                        pipeline: name,
                        count: children.len(),
                    });
                }
                let spec = TopologySpec { children, links };
                validate_topology(&spec, &TopologyIndex::new())
                    .map_err(ConfigError::InvalidTopology)?;
                let module: Box<dyn PipelineModule> = Box::new(StaticTopology);
                (module, vec![Action::Spec(spec)])
            }
        };

        Ok(Startup {
            name,
            module,
            observer,
            failure_strategy,
            initial_actions,
        })
    }
}

/// Validated options, ready to be handed to the pipeline actor.
pub(crate) struct Startup {
    pub name: String,
    pub module: Box<dyn PipelineModule>,
    pub observer: Option<Observer>,
    pub failure_strategy: FailureStrategy,
    pub initial_actions: Vec<Action>,
}

fn validate_initial_specs(pipeline: &str, actions: &[Action]) -> Result<(), ConfigError> {
    let mut index = TopologyIndex::new();
    let mut found = false;

    for action in actions {
        if let Action::Spec(spec) = action {
            found = true;
            let links =
                validate_topology(spec, &index).map_err(ConfigError::InvalidTopology)?;
            for child in &spec.children {
                index.add_child(child.name.clone(), child.element.pads());
            }
            for resolved in &links {
                index.mark_linked(&resolved.link);
            }
        }
    }

    if found {
        Ok(())
    } else {
        Err(ConfigError::ModuleInit {
            pipeline: pipeline.to_string(),
            reason: "handle_init returned no topology spec".to_string(),
        })
    }
}

/// Governing module of a pipeline started from an explicit element list.
struct StaticTopology;

impl PipelineModule for StaticTopology {
    fn handle_init(&mut self) -> crate::actions::CallbackResult {
        crate::actions::CallbackResult::Ok
    }
}
