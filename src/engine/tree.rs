//! Arena form of a compiled template
//!
//! Nodes are addressed by [`NodeId`]; parent links live in a separate table.

use std::collections::BTreeMap;

use crate::model::{Attributes, Node, PointSpec};

/// Index of a node inside one [`TemplateTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Element stored in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct TreeElement {
    pub tag: String,
    pub point: PointSpec,
    pub attributes: Attributes,
    pub children: Vec<NodeId>,
}

/// Template reference stored in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct TreeReference {
    pub template: String,
    pub point: PointSpec,
    pub attributes: Attributes,
    pub slots: BTreeMap<String, TreeSlot>,
}

/// Point override of a reference, with its replacement children
#[derive(Debug, Clone, PartialEq)]
pub struct TreeSlot {
    pub id: Option<String>,
    pub attributes: Attributes,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Text(String),
    Element(TreeElement),
    Reference(TreeReference),
}

impl TreeNode {
    pub fn is_text(&self) -> bool {
        matches!(self, TreeNode::Text(_))
    }

    pub fn point(&self) -> Option<&PointSpec> {
        match self {
            TreeNode::Text(_) => None,
            TreeNode::Element(e) => Some(&e.point),
            TreeNode::Reference(r) => Some(&r.point),
        }
    }

    /// Short label: the tag for elements, `use Name` for references
    pub fn label(&self) -> String {
        match self {
            TreeNode::Text(_) => "#text".to_string(),
            TreeNode::Element(e) => e.tag.clone(),
            TreeNode::Reference(r) => format!("use {}", r.template),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTree {
    nodes: Vec<TreeNode>,
    parents: Vec<Option<NodeId>>,
    root: NodeId,
}

impl TemplateTree {
    /// Flatten an owned template tree into an arena
    pub fn build(root: Node) -> Self {
        let mut tree = TemplateTree {
            nodes: Vec::new(),
            parents: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.insert(root, None);
        tree
    }

    fn insert(&mut self, node: Node, parent: Option<NodeId>) -> NodeId {
        // reserve the slot first so children can point at it
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode::Text(String::new()));
        self.parents.push(parent);

        let stored = match node {
            Node::Text(text) => TreeNode::Text(text),
            Node::Element(e) => TreeNode::Element(TreeElement {
                tag: e.tag,
                point: e.point,
                attributes: e.attributes,
                children: e
                    .children
                    .into_iter()
                    .map(|child| self.insert(child, Some(id)))
                    .collect(),
            }),
            Node::Reference(r) => TreeNode::Reference(TreeReference {
                template: r.template,
                point: r.point,
                attributes: r.attributes,
                slots: r
                    .slots
                    .into_iter()
                    .map(|(name, info)| {
                        let slot = TreeSlot {
                            id: info.id,
                            attributes: info.attributes,
                            children: info
                                .children
                                .into_iter()
                                .map(|child| self.insert(child, Some(id)))
                                .collect(),
                        };
                        (name, slot)
                    })
                    .collect(),
            }),
        };
        self.nodes[id.0] = stored;
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    /// The element or reference that owns `id`
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id.0).copied().flatten()
    }

    /// Nodes from the root down to `id`, both inclusive
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementNode, PointInfo, ReferenceNode};

    #[test]
    fn test_build_assigns_parents() {
        let tree = TemplateTree::build(
            ElementNode::new("div")
                .child(ElementNode::new("span").text("a"))
                .child(ReferenceNode::new("Card").slot(
                    "content",
                    PointInfo::new().child(ElementNode::new("b")),
                ))
                .into(),
        );
        assert_eq!(tree.len(), 5);

        let root = tree.root();
        assert_eq!(tree.parent(root), None);
        let TreeNode::Element(div) = tree.get(root) else {
            panic!("Expected element root");
        };
        let reference = div.children[1];
        let TreeNode::Reference(r) = tree.get(reference) else {
            panic!("Expected reference");
        };
        let bold = r.slots["content"].children[0];
        assert_eq!(tree.parent(bold), Some(reference));
        assert_eq!(tree.ancestry(bold), vec![root, reference, bold]);
        assert_eq!(tree.get(bold).label(), "b");
        assert_eq!(tree.get(reference).label(), "use Card");
    }
}
