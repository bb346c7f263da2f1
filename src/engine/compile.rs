//! Point path computation
//!
//! Walks a freshly built [`TemplateTree`] and records, for every point id,
//! the element-index route from the root to its element. Points of
//! referenced templates are inherited under their own names with the
//! reference's path prefixed.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{trace, warn};

use super::descriptor::{
    CompileIssue, Inherited, PathSegment, PointEntry, PointPath, TemplateDescriptor,
};
use super::registry::TemplateRegistry;
use super::tree::{NodeId, TemplateTree, TreeNode, TreeSlot};
use crate::model::{Node, PointSpec};

/// Build the descriptor for `root`, resolving references against `registry`
pub(crate) fn compile(registry: &TemplateRegistry, name: &str, root: Node) -> TemplateDescriptor {
    let dependencies = root.referenced_templates();
    let tree = TemplateTree::build(root);

    let mut compiler = Compiler {
        registry,
        owner: name,
        tree: &tree,
        points: BTreeMap::new(),
        ambiguous: BTreeSet::new(),
        issues: Vec::new(),
        detached: 0,
    };
    let mut path = Vec::new();
    compiler.visit(tree.root(), &mut path);

    let Compiler {
        points,
        ambiguous,
        issues,
        ..
    } = compiler;

    for issue in &issues {
        warn!(template = name, %issue, "template compiled with issue");
    }
    trace!(template = name, points = points.len(), nodes = tree.len(), "template compiled");

    TemplateDescriptor {
        name: name.to_string(),
        tree,
        points,
        ambiguous,
        dependencies,
        issues,
    }
}

struct Compiler<'a> {
    registry: &'a TemplateRegistry,
    owner: &'a str,
    tree: &'a TemplateTree,
    points: BTreeMap<String, PointEntry>,
    ambiguous: BTreeSet<String>,
    issues: Vec<CompileIssue>,
    /// Nesting depth below children without a fixed position
    detached: usize,
}

/// How many sibling elements a child node renders to
enum Footprint {
    None,
    Element,
    Repeated(String),
}

impl Footprint {
    fn is_element(&self) -> bool {
        !matches!(self, Footprint::None)
    }
}

fn footprint(node: &TreeNode) -> Footprint {
    match node.point() {
        None => Footprint::None,
        Some(point) if point.is_multiple() => match &point.id {
            Some(id) => Footprint::Repeated(id.clone()),
            // nothing can be bound to it, so it never renders
            None => Footprint::None,
        },
        Some(_) => Footprint::Element,
    }
}

impl<'a> Compiler<'a> {
    fn visit(&mut self, id: NodeId, path: &mut Vec<PathSegment>) {
        let tree = self.tree;
        match tree.get(id) {
            TreeNode::Text(_) => {}
            TreeNode::Element(element) => {
                self.own_point(id, &element.point, path);
                self.visit_children(&element.children, path);
            }
            TreeNode::Reference(reference) => {
                self.own_point(id, &reference.point, path);
                self.inherit(id, &reference.template, &reference.slots, path);
            }
        }
    }

    /// Children paths count element positions only
    ///
    /// Element children before the first repeated child keep their index,
    /// the repeated child gets an intermediate step, and children after it
    /// are counted from the end. With more than one repeated child nothing
    /// from the first repetition onwards has a fixed position.
    fn visit_children(&mut self, children: &[NodeId], path: &mut Vec<PathSegment>) {
        let tree = self.tree;
        let footprints: Vec<Footprint> = children.iter().map(|&c| footprint(tree.get(c))).collect();
        let elements = footprints.iter().filter(|f| f.is_element()).count();
        let repeated = footprints.iter().filter(|f| matches!(f, Footprint::Repeated(_))).count();

        let mut index = 0;
        let mut seen_repeated = false;
        for (&child, footprint) in children.iter().zip(&footprints) {
            let segment = match footprint {
                Footprint::Element if !seen_repeated => PathSegment::Index(index),
                Footprint::Element => PathSegment::FromEnd(elements - index - 1),
                Footprint::Repeated(key) => PathSegment::Intermediate {
                    key: key.clone(),
                    base: index,
                    trailing: elements - index - 1,
                },
                Footprint::None => PathSegment::Index(index),
            };
            let fixed = match footprint {
                Footprint::None => false,
                Footprint::Repeated(_) => repeated == 1,
                Footprint::Element => !seen_repeated || repeated == 1,
            };
            if !fixed {
                self.detached += 1;
            }
            path.push(segment);
            self.visit(child, path);
            path.pop();
            if !fixed {
                self.detached -= 1;
            }

            if footprint.is_element() {
                index += 1;
            }
            if matches!(footprint, Footprint::Repeated(_)) {
                seen_repeated = true;
            }
        }
    }

    fn own_point(&mut self, id: NodeId, point: &PointSpec, path: &[PathSegment]) {
        let Some(name) = &point.id else {
            return;
        };
        let entry = PointEntry {
            owner: self.owner.to_string(),
            node: id,
            cardinality: point.cardinality,
            path: PointPath::new(path.to_vec()),
            inherited: None,
        };
        self.record(name, entry);
    }

    fn inherit(
        &mut self,
        reference: NodeId,
        template: &str,
        slots: &BTreeMap<String, TreeSlot>,
        path: &mut Vec<PathSegment>,
    ) {
        let registry = self.registry;
        let Some(sub) = registry.get(template) else {
            self.issue(CompileIssue::UnresolvedTemplate {
                template: template.to_string(),
            });
            return;
        };

        if self.detached == 0 {
            for name in sub.ambiguous() {
                self.mark_ambiguous(name);
            }
        }
        for (name, entry) in sub.points() {
            let entry = PointEntry {
                path: prefixed(path, &entry.path),
                inherited: Some(Inherited {
                    reference,
                    point: name.clone(),
                }),
                ..entry.clone()
            };
            self.record(name, entry);
        }

        for (point, slot) in slots {
            let Some(target) = sub.point(point) else {
                self.issue(CompileIssue::UnknownSlot {
                    template: template.to_string(),
                    point: point.clone(),
                });
                continue;
            };
            let slot_path = prefixed(path, &target.path);
            if let Some(id) = &slot.id {
                let entry = PointEntry {
                    path: slot_path.clone(),
                    inherited: Some(Inherited {
                        reference,
                        point: point.clone(),
                    }),
                    ..target.clone()
                };
                self.record(id, entry);
            }
            let mut segments = slot_path.segments().to_vec();
            self.visit_children(&slot.children, &mut segments);
        }
    }

    fn record(&mut self, name: &str, entry: PointEntry) {
        if self.detached > 0 {
            self.issue(CompileIssue::UnaddressablePoint {
                point: name.to_string(),
            });
            return;
        }
        if self.ambiguous.contains(name) {
            return;
        }
        match self.points.get(name) {
            None => {
                self.points.insert(name.to_string(), entry);
            }
            // same location reached twice, e.g. a slot id equal to the point it overrides
            Some(existing) if existing.path == entry.path => {}
            Some(_) => self.mark_ambiguous(name),
        }
    }

    fn mark_ambiguous(&mut self, name: &str) {
        self.points.remove(name);
        if self.ambiguous.insert(name.to_string()) {
            self.issue(CompileIssue::AmbiguousPoint {
                point: name.to_string(),
            });
        }
    }

    fn issue(&mut self, issue: CompileIssue) {
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }
}

fn prefixed(prefix: &[PathSegment], path: &PointPath) -> PointPath {
    let mut segments = prefix.to_vec();
    segments.extend(path.segments().iter().cloned());
    PointPath::new(segments)
}
