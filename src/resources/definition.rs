//! Definition tree: the document model actors are built from and emitted to.
//!
//! A [`DefinitionNode`] is an ordered, named node with attributes, optional
//! text and child nodes. Level files are loaded into it (JSON on disk) and the
//! template functions in [`crate::actors::templates`] build it in memory; both
//! go through the same factory path.
//!
//! Component parsers read their subtree through [`Fields`], which mirrors the
//! "set if defined" parsing style: absent optional values keep the component's
//! default, malformed values fail construction.
//!
//! # Example
//!
//! ```
//! use peglegengine::resources::definition::DefinitionNode;
//!
//! let node = DefinitionNode::new("HealthComponent")
//!     .with_text_child("Health", 100)
//!     .with_text_child("MaxHealth", 100);
//! assert_eq!(node.child_text("Health"), Some("100"));
//! ```

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefinitionNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DefinitionNode>,
}

impl DefinitionNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// `<name>value</name>`
    pub fn text_element(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            text: Some(value.to_string()),
            ..Self::new(name)
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: DefinitionNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text_child(self, name: impl Into<String>, value: impl ToString) -> Self {
        self.with_child(Self::text_element(name, value))
    }

    pub fn push_child(&mut self, child: DefinitionNode) {
        self.children.push(child);
    }

    pub fn push_text_child(&mut self, name: impl Into<String>, value: impl ToString) {
        self.children.push(Self::text_element(name, value));
    }

    /// Set (or replace) an attribute, keeping first-insertion order.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim)
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&DefinitionNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a DefinitionNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|c| c.text())
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to parse definition: {}", e))
    }

    pub fn to_json_string(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize definition: {}", e))
    }
}

/// Typed reader over a component's definition subtree.
///
/// Every error names the component so the factory can log which part of the
/// actor failed.
#[derive(Clone, Copy)]
pub struct Fields<'a> {
    node: &'a DefinitionNode,
    component: &'a str,
}

impl<'a> Fields<'a> {
    pub fn new(node: &'a DefinitionNode, component: &'a str) -> Self {
        Self { node, component }
    }

    pub fn node(&self) -> &'a DefinitionNode {
        self.node
    }

    /// Nested reader over a child element, if present.
    pub fn sub(&self, name: &str) -> Option<Fields<'a>> {
        self.node.child(name).map(|node| Fields {
            node,
            component: self.component,
        })
    }

    pub fn req_child(&self, name: &str) -> EngineResult<&'a DefinitionNode> {
        self.node
            .child(name)
            .ok_or_else(|| EngineError::missing(self.component, name))
    }

    pub fn text(&self, name: &str) -> Option<&'a str> {
        self.node.child_text(name)
    }

    pub fn req_text(&self, name: &str) -> EngineResult<&'a str> {
        self.text(name)
            .ok_or_else(|| EngineError::missing(self.component, name))
    }

    pub fn opt<T: FromStr>(&self, name: &str) -> EngineResult<Option<T>> {
        match self.text(name) {
            Some(raw) => self.parse(name, raw).map(Some),
            None => Ok(None),
        }
    }

    pub fn req<T: FromStr>(&self, name: &str) -> EngineResult<T> {
        let raw = self.req_text(name)?;
        self.parse(name, raw)
    }

    /// Overwrite `target` when the child is defined.
    pub fn set_if<T: FromStr>(&self, target: &mut T, name: &str) -> EngineResult<()> {
        if let Some(value) = self.opt(name)? {
            *target = value;
        }
        Ok(())
    }

    pub fn opt_bool(&self, name: &str) -> EngineResult<Option<bool>> {
        match self.text(name) {
            Some(raw) => parse_bool(raw)
                .map(Some)
                .ok_or_else(|| EngineError::malformed(self.component, name, raw)),
            None => Ok(None),
        }
    }

    pub fn set_bool_if(&self, target: &mut bool, name: &str) -> EngineResult<()> {
        if let Some(value) = self.opt_bool(name)? {
            *target = value;
        }
        Ok(())
    }

    /// Attribute `attr` of child element `name`, e.g. `<Position x=".."/>`.
    pub fn attr<T: FromStr>(&self, name: &str, attr: &str) -> EngineResult<Option<T>> {
        let Some(child) = self.node.child(name) else {
            return Ok(None);
        };
        match child.attr(attr) {
            Some(raw) => self
                .parse(&format!("{}.{}", name, attr), raw)
                .map(Some),
            None => Ok(None),
        }
    }

    pub fn req_attr<T: FromStr>(&self, name: &str, attr: &str) -> EngineResult<T> {
        self.attr(name, attr)?.ok_or_else(|| {
            EngineError::missing(self.component, &format!("{}.{}", name, attr))
        })
    }

    /// Attribute on this node itself.
    pub fn own_attr<T: FromStr>(&self, attr: &str) -> EngineResult<Option<T>> {
        match self.node.attr(attr) {
            Some(raw) => self.parse(attr, raw).map(Some),
            None => Ok(None),
        }
    }

    fn parse<T: FromStr>(&self, field: &str, raw: &str) -> EngineResult<T> {
        raw.trim()
            .parse::<T>()
            .map_err(|_| EngineError::malformed(self.component, field, raw))
    }
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
