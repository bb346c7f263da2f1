//! Mapping between points and elements of rendered markup

use std::collections::BTreeMap;

use tracing::debug;

use super::descriptor::{PathSegment, PointEntry};
use super::registry::TemplateRegistry;
use crate::dom::{Document, DomId};

/// A point name plus the repetition indices needed to reach it
///
/// The point's own index defaults to 0; indices of enclosing repeated
/// points are given with [`PointSelector::with_index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointSelector {
    point: String,
    indices: BTreeMap<String, usize>,
}

impl PointSelector {
    pub fn new(point: impl Into<String>) -> Self {
        let point = point.into();
        let indices = BTreeMap::from([(point.clone(), 0)]);
        Self { point, indices }
    }

    /// Select the `index`th repetition of the point itself
    pub fn at(mut self, index: usize) -> Self {
        self.indices.insert(self.point.clone(), index);
        self
    }

    /// Select the `index`th repetition of an enclosing repeated point
    pub fn with_index(mut self, key: impl Into<String>, index: usize) -> Self {
        self.indices.insert(key.into(), index);
        self
    }

    pub fn point(&self) -> &str {
        &self.point
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.indices.get(key).copied()
    }
}

impl From<&str> for PointSelector {
    fn from(point: &str) -> Self {
        PointSelector::new(point)
    }
}

/// Points matching an element, each with its repetition index
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location(BTreeMap<String, usize>);

impl Location {
    pub fn contains(&self, point: &str) -> bool {
        self.0.contains_key(point)
    }

    pub fn index(&self, point: &str) -> Option<usize> {
        self.0.get(point).copied()
    }

    pub fn points(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TemplateRegistry {
    /// Find the element for a point inside markup rendered from `name`
    ///
    /// `root` is the element the template's root rendered to.
    pub fn locate(
        &self,
        document: &Document,
        root: DomId,
        name: &str,
        selector: &PointSelector,
    ) -> Option<DomId> {
        let Some(entry) = self.get(name).and_then(|d| d.point(selector.point())) else {
            debug!(template = name, point = selector.point(), "no such point to locate");
            return None;
        };

        let mut element = root;
        for segment in entry.path.segments() {
            let index = match segment {
                PathSegment::Intermediate { key, .. } => Some(selector.index_of(key)?),
                _ => None,
            };
            let children = document.element_children(element);
            element = *children.get(segment.resolve(index, children.len())?)?;
        }
        Some(element)
    }

    /// Find every point of `name` whose element is `target` or one of its ancestors
    ///
    /// Each point maps to the repetition index captured along its path.
    /// Returns `None` when `target` is not `root` or one of its descendants.
    pub fn reverse_locate(
        &self,
        document: &Document,
        root: DomId,
        name: &str,
        target: DomId,
    ) -> Option<Location> {
        let descriptor = self.get(name)?;
        let chain = document.ancestor_chain(root, target)?;
        let steps = chain
            .windows(2)
            .map(|pair| {
                let siblings = document.element_children(pair[0]);
                let index = siblings.iter().position(|&c| c == pair[1])?;
                Some(Step {
                    index,
                    siblings: siblings.len(),
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(match_points(descriptor.points(), &steps))
    }
}

/// Position of one element of the chain among its parent's element children
struct Step {
    index: usize,
    siblings: usize,
}

fn match_points(points: &BTreeMap<String, PointEntry>, steps: &[Step]) -> Location {
    let mut hits = BTreeMap::new();
    for (name, entry) in points {
        let segments = entry.path.segments();
        if segments.len() > steps.len() {
            continue;
        }
        let mut captured = None;
        let matched = segments.iter().zip(steps).all(|(segment, step)| {
            match segment.capture(step.index, step.siblings) {
                Some(index) => {
                    captured = index.or(captured);
                    true
                }
                None => false,
            }
        });
        if matched {
            // the innermost repeated level wins
            hits.insert(name.clone(), captured.unwrap_or(0));
        }
    }
    Location(hits)
}
