//! Live element tree and markup materialization
//!
//! A [`Document`] is an arena of element and text nodes. Parent links are
//! kept in a separate child-to-parent table, so nodes never point back at
//! their owners. Rendered markup becomes live elements through
//! [`Document::materialize`].

use html5gum::{Token, Tokenizer};
use thiserror::Error;
use tracing::debug;

use crate::config::QuoteStyle;
use crate::markup::{escape_text, push_close_tag, push_open_tag};
use crate::model::Attributes;

/// Elements that never have children or a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Errors that can occur while materializing markup
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// The markup produced no element at all
    #[error("markup contains no element: {markup:?}")]
    NoElement { markup: String },

    /// A tag or attribute name was not valid UTF-8
    #[error("invalid UTF-8 in markup: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Handle to a node of a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomId(usize);

#[derive(Debug, Clone)]
enum DomNode {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attributes: Attributes,
    children: Vec<DomId>,
}

/// Extra wrapping needed for fragments that cannot stand alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scaffold {
    None,
    Row,
    Cell,
}

impl Scaffold {
    fn detect(markup: &str) -> Self {
        match leading_tag(markup).as_deref() {
            Some("tr") => Scaffold::Row,
            Some("td") | Some("th") => Scaffold::Cell,
            _ => Scaffold::None,
        }
    }

    fn wrap(self, markup: &str) -> String {
        match self {
            Scaffold::None => markup.to_string(),
            Scaffold::Row => format!("<table><tbody>{}</tbody></table>", markup),
            Scaffold::Cell => format!("<table><tbody><tr>{}</tr></tbody></table>", markup),
        }
    }

    /// Element levels between the container and the fragment
    fn depth(self) -> usize {
        match self {
            Scaffold::None => 1,
            Scaffold::Row => 3,
            Scaffold::Cell => 4,
        }
    }
}

/// Lowercased name of the first tag in `markup`, if it starts with one
fn leading_tag(markup: &str) -> Option<String> {
    let rest = markup.trim_start().strip_prefix('<')?;
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name.to_ascii_lowercase())
    }
}

/// Arena of live nodes
///
/// Nodes handed out stay allocated for the life of the document. Scratch
/// nodes used while materializing are recycled.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<DomNode>,
    parents: Vec<Option<DomId>>,
    free: Vec<usize>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, node: DomNode) -> DomId {
        if let Some(slot) = self.free.pop() {
            self.nodes[slot] = node;
            self.parents[slot] = None;
            return DomId(slot);
        }
        self.nodes.push(node);
        self.parents.push(None);
        DomId(self.nodes.len() - 1)
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: impl Into<String>, attributes: Attributes) -> DomId {
        self.alloc(DomNode::Element(ElementData {
            tag: tag.into(),
            attributes,
            children: Vec::new(),
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> DomId {
        self.alloc(DomNode::Text(text.into()))
    }

    fn element(&self, id: DomId) -> Option<&ElementData> {
        match self.nodes.get(id.0)? {
            DomNode::Element(e) => Some(e),
            DomNode::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: DomId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(id.0)? {
            DomNode::Element(e) => Some(e),
            DomNode::Text(_) => None,
        }
    }

    pub fn is_element(&self, id: DomId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag(&self, id: DomId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn attribute(&self, id: DomId, key: &str) -> Option<&str> {
        self.element(id)?.attributes.get(key)
    }

    pub fn attributes(&self, id: DomId) -> Option<&Attributes> {
        self.element(id).map(|e| &e.attributes)
    }

    pub fn parent(&self, id: DomId) -> Option<DomId> {
        self.parents.get(id.0).copied().flatten()
    }

    /// All child nodes, text included
    pub fn child_nodes(&self, id: DomId) -> &[DomId] {
        self.element(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// Child elements only; text nodes are skipped
    pub fn element_children(&self, id: DomId) -> Vec<DomId> {
        self.child_nodes(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    /// Position of `id` among its parent's child elements
    pub fn element_index(&self, id: DomId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.element_children(parent).iter().position(|c| *c == id)
    }

    /// Append `child` to `parent`, detaching it from any previous parent
    ///
    /// Returns false if `parent` is not an element or `child` is one of its
    /// ancestors.
    pub fn append_child(&mut self, parent: DomId, child: DomId) -> bool {
        if !self.is_element(parent) || self.ancestor_chain(child, parent).is_some() {
            return false;
        }
        self.detach(child);
        if let Some(e) = self.element_mut(parent) {
            e.children.push(child);
        }
        self.parents[child.0] = Some(parent);
        true
    }

    /// Remove `id` from its parent, keeping its own subtree intact
    pub fn detach(&mut self, id: DomId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(e) = self.element_mut(parent) {
            e.children.retain(|c| *c != id);
        }
        self.parents[id.0] = None;
    }

    /// Elements from `root` down to `descendant`, both inclusive
    ///
    /// Returns `None` when `descendant` is not inside `root`.
    pub fn ancestor_chain(&self, root: DomId, descendant: DomId) -> Option<Vec<DomId>> {
        let mut chain = Vec::new();
        let mut current = Some(descendant);
        while let Some(id) = current {
            chain.push(id);
            if id == root {
                chain.reverse();
                return Some(chain);
            }
            current = self.parent(id);
        }
        None
    }

    /// Concatenated text of every descendant text node
    pub fn text_content(&self, id: DomId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: DomId, out: &mut String) {
        match self.nodes.get(id.0) {
            Some(DomNode::Text(t)) => out.push_str(t),
            Some(DomNode::Element(e)) => {
                for child in &e.children {
                    self.collect_text(*child, out);
                }
            }
            None => {}
        }
    }

    /// Serialize a node and its subtree
    pub fn outer_html(&self, id: DomId) -> String {
        let mut out = String::new();
        self.serialize(id, &mut out);
        out
    }

    fn serialize(&self, id: DomId, out: &mut String) {
        match self.nodes.get(id.0) {
            Some(DomNode::Text(t)) => out.push_str(&escape_text(t)),
            Some(DomNode::Element(e)) => {
                let void = e.children.is_empty() && VOID_ELEMENTS.contains(&e.tag.as_str());
                push_open_tag(out, &e.tag, &e.attributes, QuoteStyle::Double, void);
                if !void {
                    for child in &e.children {
                        self.serialize(*child, out);
                    }
                    push_close_tag(out, &e.tag);
                }
            }
            None => {}
        }
    }

    /// Turn a markup string into a detached live element
    ///
    /// Row and cell fragments are parsed inside a table scaffold, then the
    /// fragment is taken back out of it. Only the first top-level element is
    /// returned.
    pub fn materialize(&mut self, markup: &str) -> Result<DomId, MaterializeError> {
        let scaffold = Scaffold::detect(markup);
        let container = self.create_element("div", Attributes::new());
        let fragment = self
            .parse_into(container, &scaffold.wrap(markup))
            .and_then(|()| self.descend(container, scaffold.depth(), markup));
        if let Ok(element) = fragment {
            self.detach(element);
        }
        self.release(container);
        fragment
    }

    /// Follow first element children `depth` levels down from `container`
    fn descend(&self, container: DomId, depth: usize, markup: &str) -> Result<DomId, MaterializeError> {
        let mut current = container;
        for _ in 0..depth {
            current = self
                .element_children(current)
                .first()
                .copied()
                .ok_or_else(|| MaterializeError::NoElement {
                    markup: markup.to_string(),
                })?;
        }
        Ok(current)
    }

    /// Recycle a detached subtree no handle was ever given out for
    fn release(&mut self, id: DomId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(node) = self.nodes.get_mut(id.0) else {
                continue;
            };
            if let DomNode::Element(e) = std::mem::replace(node, DomNode::Text(String::new())) {
                pending.extend(e.children);
            }
            self.parents[id.0] = None;
            self.free.push(id.0);
        }
    }

    fn parse_into(&mut self, container: DomId, markup: &str) -> Result<(), MaterializeError> {
        let mut open = vec![container];
        for token in Tokenizer::new(markup).infallible() {
            let parent = open.last().copied().unwrap_or(container);
            match token {
                Token::StartTag(start) => {
                    let name = std::str::from_utf8(start.name.as_slice())?.to_string();
                    let mut attributes = Attributes::new();
                    for (key, value) in &start.attributes {
                        attributes.insert(
                            std::str::from_utf8(key.as_slice())?,
                            std::str::from_utf8(value.as_slice())?,
                        );
                    }
                    let void = start.self_closing || VOID_ELEMENTS.contains(&name.as_str());
                    let id = self.create_element(name, attributes);
                    self.append_child(parent, id);
                    if !void {
                        open.push(id);
                    }
                }
                Token::EndTag(end) => {
                    let name = std::str::from_utf8(end.name.as_slice())?;
                    // the container itself is never closed by the markup
                    match open.iter().rposition(|id| self.tag(*id) == Some(name)) {
                        Some(pos) if pos > 0 => open.truncate(pos),
                        _ => debug!(tag = name, "ignoring unmatched end tag"),
                    }
                }
                Token::String(text) => {
                    let text = String::from_utf8_lossy(text.as_slice());
                    let last = self.child_nodes(parent).last().copied();
                    match last.and_then(|id| self.nodes.get_mut(id.0)) {
                        Some(DomNode::Text(previous)) => previous.push_str(&text),
                        _ => {
                            let id = self.create_text(text.into_owned());
                            self.append_child(parent, id);
                        }
                    }
                }
                Token::Comment(_) => {}
                Token::Doctype(_) => {}
                Token::Error(e) => debug!(error = ?e, "markup tokenizer error"),
            }
        }
        Ok(())
    }
}
