//! Compiled form of a registered template

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

use super::tree::{NodeId, TemplateTree};
use crate::model::Cardinality;

/// One step from an element to one of its element children
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Fixed position among element children (text nodes do not count)
    Index(usize),
    /// Fixed position counted back from the last element child
    ///
    /// Used for siblings that follow a repeated point, whose start shifts
    /// with the number of repetitions.
    FromEnd(usize),
    /// Position chosen at lookup time; `key` names the repeated point
    ///
    /// Repetitions start at child `base` and are followed by `trailing`
    /// fixed siblings.
    Intermediate {
        key: String,
        base: usize,
        trailing: usize,
    },
}

impl PathSegment {
    pub fn intermediate(key: impl Into<String>) -> Self {
        PathSegment::Intermediate {
            key: key.into(),
            base: 0,
            trailing: 0,
        }
    }

    /// Child position for this step, given the parent's element child count
    ///
    /// `index` picks the repetition of an intermediate step and is ignored
    /// by fixed steps.
    pub fn resolve(&self, index: Option<usize>, count: usize) -> Option<usize> {
        let position = match self {
            PathSegment::Index(i) => *i,
            PathSegment::FromEnd(k) => count.checked_sub(k + 1)?,
            PathSegment::Intermediate { base, trailing, .. } => {
                let position = base + index?;
                if position + trailing >= count {
                    return None;
                }
                position
            }
        };
        (position < count).then_some(position)
    }

    /// Whether child `actual` of a parent with `count` element children
    /// lies on this step; repeated steps yield the repetition index
    pub fn capture(&self, actual: usize, count: usize) -> Option<Option<usize>> {
        match self {
            PathSegment::Index(i) => (*i == actual).then_some(None),
            PathSegment::FromEnd(k) => (count.checked_sub(k + 1) == Some(actual)).then_some(None),
            PathSegment::Intermediate { base, trailing, .. } => {
                (actual >= *base && actual + trailing < count).then(|| Some(actual - base))
            }
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "{}", i),
            PathSegment::FromEnd(k) => write!(f, "-{}", k + 1),
            PathSegment::Intermediate {
                key,
                base: 0,
                trailing: 0,
            } => write!(f, "{}", key),
            PathSegment::Intermediate { key, base, trailing } => {
                write!(f, "{}[{}..-{}]", key, base, trailing)
            }
        }
    }
}

/// Route from the rendered root element to a point's element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PointPath(Vec<PathSegment>);

impl PointPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PointPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", segment)?;
        }
        write!(f, "]")
    }
}

/// Where a point lives and how to reach it
#[derive(Debug, Clone, PartialEq)]
pub struct PointEntry {
    /// Template whose tree holds the target node
    pub owner: String,
    /// Target node in the owner's tree
    pub node: NodeId,
    pub cardinality: Cardinality,
    pub path: PointPath,
    /// Set when the point comes from a referenced template
    pub inherited: Option<Inherited>,
}

/// The reference a point was inherited through
#[derive(Debug, Clone, PartialEq)]
pub struct Inherited {
    /// Reference node in the inheriting template's tree
    pub reference: NodeId,
    /// Name of the point inside the referenced template
    pub point: String,
}

/// Non-fatal problem found while compiling a template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileIssue {
    #[error("template '{template}' is referenced but not registered")]
    UnresolvedTemplate { template: String },

    #[error("point '{point}' is reachable through more than one path")]
    AmbiguousPoint { point: String },

    #[error("template '{template}' has no point '{point}' to override")]
    UnknownSlot { template: String, point: String },

    #[error("point '{point}' shares its parent with several repeated points and has no fixed position")]
    UnaddressablePoint { point: String },
}

/// A registered template: its tree plus the derived point table
#[derive(Debug, Clone)]
pub struct TemplateDescriptor {
    pub(crate) name: String,
    pub(crate) tree: TemplateTree,
    pub(crate) points: BTreeMap<String, PointEntry>,
    pub(crate) ambiguous: BTreeSet<String>,
    pub(crate) dependencies: BTreeSet<String>,
    pub(crate) issues: Vec<CompileIssue>,
}

impl TemplateDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tree(&self) -> &TemplateTree {
        &self.tree
    }

    /// Every addressable point, by name
    pub fn points(&self) -> &BTreeMap<String, PointEntry> {
        &self.points
    }

    pub fn point(&self, name: &str) -> Option<&PointEntry> {
        self.points.get(name)
    }

    /// Names dropped from the point table because they resolve to several paths
    pub fn ambiguous(&self) -> &BTreeSet<String> {
        &self.ambiguous
    }

    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous.contains(name)
    }

    /// Templates referenced directly by this one
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn issues(&self) -> &[CompileIssue] {
        &self.issues
    }
}
