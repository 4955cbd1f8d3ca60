// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative topology descriptions.
//!
//! A [`TopologySpec`] names children and the links between their pads. It is
//! resolved once at pipeline start, or incrementally when a governing module
//! returns `Action::Spec`.

use std::fmt;

use crate::engine::pad::{BufferPolicy, PadRef, DEFAULT_INPUT_PAD, DEFAULT_OUTPUT_PAD};
use crate::traits::Element;

/// One named child and its element definition.
pub struct ChildSpec {
    pub name: String,
    pub element: Box<dyn Element>,
}

impl ChildSpec {
    pub fn new(name: impl Into<String>, element: impl Element) -> Self {
        Self {
            name: name.into(),
            element: Box::new(element),
        }
    }

    pub fn boxed(name: impl Into<String>, element: Box<dyn Element>) -> Self {
        Self {
            name: name.into(),
            element,
        }
    }
}

impl fmt::Debug for ChildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSpec")
            .field("name", &self.name)
            .field("kind", &self.element.kind())
            .finish()
    }
}

/// One end of a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub element: String,
    pub pad: PadRef,
}

impl Endpoint {
    pub fn new(element: impl Into<String>, pad: impl Into<PadRef>) -> Self {
        Self {
            element: element.into(),
            pad: pad.into(),
        }
    }

    /// Parse `element.pad` or `element.pad#id`.
    pub fn parse(s: &str) -> Option<Self> {
        let (element, pad) = s.split_once('.')?;
        if element.is_empty() {
            return None;
        }
        Some(Self {
            element: element.to_string(),
            pad: PadRef::parse(pad)?,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.element, self.pad)
    }
}

/// A directed edge from an output pad to an input pad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub from: Endpoint,
    pub to: Endpoint,
    pub policy: Option<BufferPolicy>,
}

impl LinkSpec {
    pub fn new(from: Endpoint, to: Endpoint) -> Self {
        Self {
            from,
            to,
            policy: None,
        }
    }

    /// Link `from`'s default output to `to`'s default input.
    pub fn default_pads(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(
            Endpoint::new(from, PadRef::new(DEFAULT_OUTPUT_PAD)),
            Endpoint::new(to, PadRef::new(DEFAULT_INPUT_PAD)),
        )
    }

    pub fn with_policy(mut self, policy: BufferPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

impl fmt::Display for LinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Children in declaration order plus an optional link list.
///
/// When `links` is `None` the links are synthesized with [`default_chain`].
#[derive(Debug, Default)]
pub struct TopologySpec {
    pub children: Vec<ChildSpec>,
    pub links: Option<Vec<LinkSpec>>,
}

impl TopologySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(mut self, name: impl Into<String>, element: impl Element) -> Self {
        self.children.push(ChildSpec::new(name, element));
        self
    }

    pub fn link(mut self, link: LinkSpec) -> Self {
        self.links.get_or_insert_with(Vec::new).push(link);
        self
    }

    pub fn child_names(&self) -> Vec<String> {
        self.children.iter().map(|c| c.name.clone()).collect()
    }

    /// The explicit links, or the default chain over the children.
    pub fn resolved_links(&self) -> Vec<LinkSpec> {
        match &self.links {
            Some(links) => links.clone(),
            None => default_chain(&self.child_names()),
        }
    }
}

/// Link each child's default output to the next child's default input.
///
/// Returns no links for fewer than two children.
///
/// # Examples
/// ```
/// use the_conduit::config::default_chain;
///
/// let links = default_chain(&["source".to_string(), "sink".to_string()]);
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].to_string(), "source.output -> sink.input");
/// ```
pub fn default_chain(children: &[String]) -> Vec<LinkSpec> {
    children
        .windows(2)
        .map(|pair| LinkSpec::default_pads(pair[0].clone(), pair[1].clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("e{}", i)).collect()
    }

    #[test]
    fn test_default_chain_links_consecutive_children() {
        for n in 2..6 {
            let children = names(n);
            let links = default_chain(&children);
            assert_eq!(links.len(), n - 1);
            for (i, link) in links.iter().enumerate() {
                assert_eq!(link.from, Endpoint::new(children[i].clone(), DEFAULT_OUTPUT_PAD));
                assert_eq!(link.to, Endpoint::new(children[i + 1].clone(), DEFAULT_INPUT_PAD));
                assert_eq!(link.policy, None);
            }
        }
    }

    #[test]
    fn test_default_chain_is_empty_for_fewer_than_two_children() {
        assert!(default_chain(&names(0)).is_empty());
        assert!(default_chain(&names(1)).is_empty());
    }

    #[test]
    fn test_endpoint_parse() {
        let endpoint = Endpoint::parse("tee.output#1").unwrap();
        assert_eq!(endpoint.element, "tee");
        assert_eq!(endpoint.pad, PadRef::dynamic("output", "1"));
        assert_eq!(endpoint.to_string(), "tee.output#1");

        assert!(Endpoint::parse("no_pad").is_none());
        assert!(Endpoint::parse(".input").is_none());
        assert!(Endpoint::parse("sink.").is_none());
    }

    #[test]
    fn test_explicit_links_win_over_default_chain() {
        let spec = TopologySpec {
            children: vec![],
            links: Some(vec![LinkSpec::default_pads("a", "c")]),
        };
        assert_eq!(spec.resolved_links(), vec![LinkSpec::default_pads("a", "c")]);
    }
}
