//! Template model: the declarative tree a template is written as
//!
//! A template is a tree of [`Node`]s. Element and reference nodes may be
//! marked as *points*: named slots that data binds to at render time and that
//! can be located again once the markup has been materialized.
//!
//! # Example
//!
//! ```rust
//! use slotmark::model::{ElementNode, Node};
//!
//! let list: Node = ElementNode::new("ul")
//!     .point("list")
//!     .child(ElementNode::new("li").point("items").multiple())
//!     .into();
//! assert!(list.point().is_some());
//! ```

use std::collections::{BTreeMap, BTreeSet};

/// How many elements a point renders to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    /// At most one element
    #[default]
    Single,
    /// A variable-length repetition
    Multiple,
}

/// Tooling flags attached to a point. Not consulted while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointOptions {
    pub export: bool,
}

/// Point declaration carried by every parent-capable node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PointSpec {
    /// Point name; `None` means the node is not addressable
    pub id: Option<String>,
    pub cardinality: Cardinality,
    pub options: PointOptions,
}

impl PointSpec {
    /// An addressable single point
    pub fn named(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn is_multiple(&self) -> bool {
        self.cardinality == Cardinality::Multiple
    }
}

/// Insertion-ordered attribute map
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing an existing value in place
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `overrides` on top of these attributes
    ///
    /// Keys keep their original position; overriding values win and unknown
    /// keys are appended in the order they appear in `overrides`.
    pub fn merged(&self, overrides: Option<&Attributes>) -> Attributes {
        let mut merged = self.clone();
        if let Some(overrides) = overrides {
            for (key, value) in overrides.iter() {
                merged.insert(key, value);
            }
        }
        merged
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut attrs = Attributes::new();
        for (key, value) in iter {
            attrs.insert(key, value);
        }
        attrs
    }
}

/// A node of a template tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal markup, emitted unchanged
    Text(String),
    /// A markup element with static children
    Element(ElementNode),
    /// An inclusion of another registered template
    Reference(ReferenceNode),
}

/// Children of a node, as exposed by [`Node::children`]
#[derive(Debug, Clone, Copy)]
pub enum Children<'a> {
    Nodes(&'a [Node]),
    Points(&'a BTreeMap<String, PointInfo>),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    /// The point declaration of this node (`None` for text)
    pub fn point(&self) -> Option<&PointSpec> {
        match self {
            Node::Text(_) => None,
            Node::Element(e) => Some(&e.point),
            Node::Reference(r) => Some(&r.point),
        }
    }

    /// Static children of an element, or the slot overrides of a reference
    pub fn children(&self) -> Option<Children<'_>> {
        match self {
            Node::Text(_) => None,
            Node::Element(e) => Some(Children::Nodes(&e.children)),
            Node::Reference(r) => Some(Children::Points(&r.slots)),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    /// Names of every template referenced anywhere below (and including) this node
    pub fn referenced_templates(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        collect_references(self, &mut names);
        names
    }
}

fn collect_references(node: &Node, names: &mut BTreeSet<String>) {
    if let Node::Reference(r) = node {
        names.insert(r.template.clone());
    }
    match node.children() {
        None => {}
        Some(Children::Nodes(nodes)) => {
            for child in nodes {
                collect_references(child, names);
            }
        }
        Some(Children::Points(slots)) => {
            for child in slots.values().flat_map(|info| &info.children) {
                collect_references(child, names);
            }
        }
    }
}

/// Element node: tag, static attributes and ordered children
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: String,
    pub point: PointSpec,
    pub attributes: Attributes,
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            point: PointSpec::default(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    /// Make this element an addressable point
    pub fn point(mut self, id: impl Into<String>) -> Self {
        self.point.id = Some(id.into());
        self
    }

    /// Mark this point as repeated
    pub fn multiple(mut self) -> Self {
        self.point.cardinality = Cardinality::Multiple;
        self
    }

    pub fn export(mut self) -> Self {
        self.point.options.export = true;
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append a text child
    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::text(text))
    }
}

/// Inclusion of another template, with per-point overrides
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceNode {
    /// Name of the referenced template
    pub template: String,
    pub point: PointSpec,
    pub attributes: Attributes,
    /// Overrides keyed by the referenced template's point names
    pub slots: BTreeMap<String, PointInfo>,
}

impl ReferenceNode {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            point: PointSpec::default(),
            attributes: Attributes::new(),
            slots: BTreeMap::new(),
        }
    }

    pub fn point(mut self, id: impl Into<String>) -> Self {
        self.point.id = Some(id.into());
        self
    }

    pub fn multiple(mut self) -> Self {
        self.point.cardinality = Cardinality::Multiple;
        self
    }

    pub fn export(mut self) -> Self {
        self.point.options.export = true;
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    /// Override the referenced template's point `name`
    pub fn slot(mut self, name: impl Into<String>, info: PointInfo) -> Self {
        self.slots.insert(name.into(), info);
        self
    }
}

/// Override for one point of a referenced template
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointInfo {
    /// Exposes the overridden point under this name in the composing template
    pub id: Option<String>,
    pub attributes: Attributes,
    /// Replaces the referenced point's default content
    pub children: Vec<Node>,
}

impl PointInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }
}

impl From<ElementNode> for Node {
    fn from(node: ElementNode) -> Self {
        Node::Element(node)
    }
}

impl From<ReferenceNode> for Node {
    fn from(node: ReferenceNode) -> Self {
        Node::Reference(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_per_node_kind() {
        assert!(Node::text("hi").children().is_none());

        let element: Node = ElementNode::new("ul")
            .child(ElementNode::new("li"))
            .text("tail")
            .into();
        match element.children() {
            Some(Children::Nodes(nodes)) => {
                assert_eq!(nodes.len(), 2);
                assert!(nodes[1].is_text());
            }
            other => panic!("expected element children, got {:?}", other),
        }

        let reference: Node = ReferenceNode::new("Card")
            .slot("title", PointInfo::new().point("heading"))
            .into();
        match reference.children() {
            Some(Children::Points(slots)) => {
                assert_eq!(slots.keys().collect::<Vec<_>>(), vec!["title"]);
                assert_eq!(slots["title"].id.as_deref(), Some("heading"));
            }
            other => panic!("expected slot overrides, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_merge_override_wins() {
        let base: Attributes = [("class", "a"), ("href", "#")].into_iter().collect();
        let over: Attributes = [("class", "b"), ("title", "t")].into_iter().collect();
        let merged = base.merged(Some(&over));
        let pairs: Vec<_> = merged.iter().collect();
        assert_eq!(pairs, vec![("class", "b"), ("href", "#"), ("title", "t")]);
    }

    #[test]
    fn test_attribute_merge_without_override() {
        let base: Attributes = [("class", "a")].into_iter().collect();
        assert_eq!(base.merged(None), base);
    }

    #[test]
    fn test_children_by_kind() {
        let element: Node = ElementNode::new("div").text("hi").into();
        assert!(matches!(element.children(), Some(Children::Nodes(c)) if c.len() == 1));

        let reference: Node = ReferenceNode::new("Card")
            .slot("content", PointInfo::new().point("body"))
            .into();
        assert!(matches!(reference.children(), Some(Children::Points(p)) if p.contains_key("content")));

        assert!(Node::text("x").children().is_none());
    }

    #[test]
    fn test_referenced_templates_include_slot_children() {
        let node: Node = ElementNode::new("div")
            .child(
                ReferenceNode::new("Card").slot(
                    "title",
                    PointInfo::new().child(ReferenceNode::new("Gav")),
                ),
            )
            .into();
        let names: Vec<_> = node.referenced_templates().into_iter().collect();
        assert_eq!(names, vec!["Card".to_string(), "Gav".to_string()]);
    }

    #[test]
    fn test_builder_sets_point() {
        let node = ElementNode::new("li").point("items").multiple().export();
        assert_eq!(node.point.id.as_deref(), Some("items"));
        assert!(node.point.is_multiple());
        assert!(node.point.options.export);
    }
}
