//! Markup generation
//!
//! Rendering walks a template tree with a stack of data scopes. Point ids
//! are looked up from the innermost scope outwards; an item value pushes a
//! new scope for the element's descendants. A referenced template starts a
//! fresh stack holding one synthesized scope built from the reference's
//! overrides.

use tracing::debug;

use super::descriptor::TemplateDescriptor;
use super::registry::{TemplateError, TemplateRegistry};
use super::tree::{NodeId, TemplateTree, TreeElement, TreeNode, TreeReference};
use crate::data::{attribute_key, Record, Value, ROOT_KEY};
use crate::markup::{escape_text, push_close_tag, push_open_tag};
use crate::model::{Attributes, Cardinality, PointSpec};

impl TemplateRegistry {
    /// Render template `name` with `data` bound to its points
    ///
    /// Problems inside the template (unregistered references, sequences
    /// bound to single points) render as inline `<error>` markers rather
    /// than failing the whole call.
    pub fn render(&self, name: &str, data: &Record) -> Result<String, TemplateError> {
        let descriptor = self.get(name).ok_or_else(|| TemplateError::NotFound {
            name: name.to_string(),
        })?;
        let tree = descriptor.tree();
        let mut out = String::new();
        Renderer { registry: self }.node(tree, tree.root(), true, &mut vec![data], &mut out);
        Ok(out)
    }

    /// Render only the node behind `point`, treating it as the root
    ///
    /// `_root` and `@_root` in `data` bind to that node. A point reached
    /// through a reference renders the way the full template shows it:
    /// the slot attributes and content the reference supplies are applied.
    pub fn render_point(&self, name: &str, point: &str, data: &Record) -> Result<String, TemplateError> {
        let descriptor = self.get(name).ok_or_else(|| TemplateError::NotFound {
            name: name.to_string(),
        })?;
        let mut out = String::new();
        Renderer { registry: self }.point(descriptor, point, data, &mut out)?;
        Ok(out)
    }
}

struct Renderer<'r> {
    registry: &'r TemplateRegistry,
}

/// One repetition of an element or reference
type Instance<'d> = (Option<&'d Value>, Option<Attributes>);

impl Renderer<'_> {
    fn point(
        &self,
        descriptor: &TemplateDescriptor,
        point: &str,
        data: &Record,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        let name = descriptor.name();
        if descriptor.is_ambiguous(point) {
            return Err(TemplateError::AmbiguousPoint {
                template: name.to_string(),
                point: point.to_string(),
            });
        }
        let entry = descriptor
            .point(point)
            .ok_or_else(|| TemplateError::UnknownPoint {
                template: name.to_string(),
                point: point.to_string(),
            })?;
        let tree = descriptor.tree();

        let Some(inherited) = &entry.inherited else {
            self.node(tree, entry.node, true, &mut vec![data], out);
            return Ok(());
        };
        let TreeNode::Reference(reference) = tree.get(inherited.reference) else {
            return Err(TemplateError::UnknownPoint {
                template: name.to_string(),
                point: point.to_string(),
            });
        };
        let sub = self
            .registry
            .get(&reference.template)
            .ok_or_else(|| TemplateError::NotFound {
                name: reference.template.clone(),
            })?;
        let data = self.slot_data(tree, reference, sub, &inherited.point, data);
        self.point(sub, &inherited.point, &data, out)
    }

    /// Root bindings for `point` of a referenced template, as the
    /// reference's slot supplies them; values in `data` take precedence
    fn slot_data(
        &self,
        tree: &TemplateTree,
        reference: &TreeReference,
        sub: &TemplateDescriptor,
        point: &str,
        data: &Record,
    ) -> Record {
        let mut bound = data.clone();
        let mut attributes = match sub.point(point) {
            // the referenced root carries the reference's own attributes
            Some(entry) if entry.path.is_empty() => reference.attributes.clone(),
            _ => Attributes::new(),
        };
        if let Some(slot) = reference.slots.get(point) {
            attributes = attributes.merged(Some(&slot.attributes));
            if !data.contains_key(ROOT_KEY) && !slot.children.is_empty() {
                let markup = self.fragment(tree, &slot.children, &mut vec![data]);
                bound.insert(ROOT_KEY, markup);
            }
        }
        let overrides = data
            .get(&attribute_key(ROOT_KEY))
            .and_then(|v| v.attributes_at(None));
        let attributes = attributes.merged(overrides.as_ref());
        if !attributes.is_empty() {
            bound.set_attributes(ROOT_KEY, &attributes);
        }
        bound
    }

    fn node<'d>(
        &self,
        tree: &TemplateTree,
        id: NodeId,
        is_root: bool,
        scope: &mut Vec<&'d Record>,
        out: &mut String,
    ) {
        match tree.get(id) {
            TreeNode::Text(text) => out.push_str(text),
            TreeNode::Element(element) => self.element(tree, element, is_root, scope, out),
            TreeNode::Reference(reference) => self.reference(tree, reference, is_root, scope, out),
        }
    }

    fn element<'d>(
        &self,
        tree: &TemplateTree,
        element: &TreeElement,
        is_root: bool,
        scope: &mut Vec<&'d Record>,
        out: &mut String,
    ) {
        let Some(instances) = instances(&element.point, is_root, scope, out) else {
            return;
        };
        for (value, overrides) in instances {
            let attributes = element.attributes.merged(overrides.as_ref());
            match value {
                None => self.specimen(tree, element, &attributes, scope, out),
                Some(Value::Scalar(markup)) => self.replaced(element, &attributes, markup, out),
                Some(Value::Item(record)) => {
                    scope.push(record);
                    self.specimen(tree, element, &attributes, scope, out);
                    scope.pop();
                }
                Some(Value::Sequence(_)) => error_marker(
                    out,
                    format!("nested sequence bound to point '{}'", point_label(&element.point)),
                ),
            }
        }
    }

    /// The element as written, children included
    fn specimen<'d>(
        &self,
        tree: &TemplateTree,
        element: &TreeElement,
        attributes: &Attributes,
        scope: &mut Vec<&'d Record>,
        out: &mut String,
    ) {
        let config = self.registry.config();
        if config.is_void(&element.tag) {
            push_open_tag(out, &element.tag, attributes, config.quote, true);
            return;
        }
        push_open_tag(out, &element.tag, attributes, config.quote, false);
        for &child in &element.children {
            self.node(tree, child, false, scope, out);
        }
        push_close_tag(out, &element.tag);
    }

    /// The element with its content replaced by scalar markup
    fn replaced(&self, element: &TreeElement, attributes: &Attributes, markup: &str, out: &mut String) {
        let config = self.registry.config();
        if config.is_void(&element.tag) {
            push_open_tag(out, &element.tag, attributes, config.quote, true);
            return;
        }
        push_open_tag(out, &element.tag, attributes, config.quote, false);
        out.push_str(markup);
        push_close_tag(out, &element.tag);
    }

    fn reference<'d>(
        &self,
        tree: &TemplateTree,
        reference: &TreeReference,
        is_root: bool,
        scope: &mut Vec<&'d Record>,
        out: &mut String,
    ) {
        let Some(sub) = self.registry.get(&reference.template) else {
            error_marker(out, format!("template '{}' is not registered", reference.template));
            return;
        };
        let Some(instances) = instances(&reference.point, is_root, scope, out) else {
            return;
        };
        let sub_tree = sub.tree();
        for (value, overrides) in instances {
            let data = self.instance_data(tree, reference, value, overrides.as_ref(), scope);
            self.node(sub_tree, sub_tree.root(), true, &mut vec![&data], out);
        }
    }

    /// Scope handed to a referenced template for one instance
    fn instance_data<'d>(
        &self,
        tree: &TemplateTree,
        reference: &TreeReference,
        value: Option<&'d Value>,
        overrides: Option<&Attributes>,
        scope: &mut Vec<&'d Record>,
    ) -> Record {
        let mut data = Record::new();
        let root_attributes = reference.attributes.merged(overrides);
        if !root_attributes.is_empty() {
            data.set_attributes(ROOT_KEY, &root_attributes);
        }
        match value {
            // the whole root content is replaced, slots would never show
            Some(scalar @ Value::Scalar(_)) => {
                data.insert(ROOT_KEY, scalar.clone());
                return data;
            }
            Some(other) => data.insert(ROOT_KEY, other.clone()),
            None => {}
        }

        let item = value.and_then(Value::as_item);
        if let Some(record) = item {
            scope.push(record);
        }
        for (point, slot) in &reference.slots {
            let slot_value = slot.id.as_deref().and_then(|id| lookup(scope, id));
            let bound_attributes = slot
                .id
                .as_deref()
                .and_then(|id| lookup(scope, &attribute_key(id)))
                .and_then(|v| v.attributes_at(None));
            let attributes = slot.attributes.merged(bound_attributes.as_ref());
            if !attributes.is_empty() {
                data.set_attributes(point, &attributes);
            }

            match slot_value {
                Some(Value::Item(record)) if !slot.children.is_empty() => {
                    scope.push(record);
                    let markup = self.fragment(tree, &slot.children, scope);
                    scope.pop();
                    data.insert(point.as_str(), markup);
                }
                Some(v) => data.insert(point.as_str(), v.clone()),
                None if !slot.children.is_empty() => {
                    let markup = self.fragment(tree, &slot.children, scope);
                    data.insert(point.as_str(), markup);
                }
                None => {}
            }
        }
        if item.is_some() {
            scope.pop();
        }
        data
    }

    fn fragment<'d>(&self, tree: &TemplateTree, children: &[NodeId], scope: &mut Vec<&'d Record>) -> String {
        let mut out = String::new();
        for &child in children {
            self.node(tree, child, false, scope, &mut out);
        }
        out
    }
}

/// Resolve the repetitions of a point-bearing node
///
/// Returns `None` after writing an error marker when a sequence is bound
/// to a single point.
fn instances<'d>(
    point: &PointSpec,
    is_root: bool,
    scope: &[&'d Record],
    out: &mut String,
) -> Option<Vec<Instance<'d>>> {
    let (value, overrides) = bound(point, is_root, scope);
    let whole = || overrides.and_then(|v| v.attributes_at(None));

    let instances = match (point.cardinality, value) {
        (Cardinality::Single, Some(Value::Sequence(_))) => {
            error_marker(
                out,
                format!("sequence bound to single point '{}'", point_label(point)),
            );
            return None;
        }
        (Cardinality::Single, value) => vec![(value, whole())],
        (Cardinality::Multiple, None) => Vec::new(),
        (Cardinality::Multiple, Some(Value::Sequence(items))) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (Some(item), overrides.and_then(|v| v.attributes_at(Some(i)))))
            .collect(),
        (Cardinality::Multiple, Some(value)) => vec![(Some(value), whole())],
    };
    Some(instances)
}

/// Value and attribute override bound to a node
fn bound<'d>(point: &PointSpec, is_root: bool, scope: &[&'d Record]) -> (Option<&'d Value>, Option<&'d Value>) {
    let value = point.id.as_deref().and_then(|id| lookup(scope, id));
    let overrides = point
        .id
        .as_deref()
        .and_then(|id| lookup(scope, &attribute_key(id)));
    if is_root {
        (
            lookup(scope, ROOT_KEY).or(value),
            lookup(scope, &attribute_key(ROOT_KEY)).or(overrides),
        )
    } else {
        (value, overrides)
    }
}

fn lookup<'d>(scope: &[&'d Record], key: &str) -> Option<&'d Value> {
    scope.iter().rev().copied().find_map(|record| record.get(key))
}

fn point_label(point: &PointSpec) -> &str {
    point.id.as_deref().unwrap_or(ROOT_KEY)
}

fn error_marker(out: &mut String, message: String) {
    debug!(%message, "rendering error marker");
    out.push_str("<error>");
    out.push_str(&escape_text(&message));
    out.push_str("</error>");
}
