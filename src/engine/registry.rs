//! Template registry for storing compiled templates

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, trace};

use super::compile;
use super::descriptor::TemplateDescriptor;
use crate::config::MarkupConfig;
use crate::error::ParseError;
use crate::model::Node;
use crate::parser;

/// Errors that can occur during template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template not found in registry
    #[error("template not found: {name}")]
    NotFound { name: String },

    /// Point not present in a template's point table
    #[error("template {template} has no point {point}")]
    UnknownPoint { template: String, point: String },

    /// Point name resolving to more than one location
    #[error("point {point} of template {template} is ambiguous")]
    AmbiguousPoint { template: String, point: String },

    /// Duplicate template definition within one source
    #[error("duplicate template definition: {name}")]
    Duplicate { name: String },

    /// Circular template reference
    #[error("circular template reference detected: {chain}")]
    CircularReference { chain: String },

    /// Template source failed to parse
    #[error("template source has {} parse error(s)", .0.len())]
    Parse(Vec<ParseError>),
}

/// Registry of compiled templates
///
/// Registration is idempotent: the first registration of a name wins and
/// later ones return the stored descriptor unchanged.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, TemplateDescriptor>,
    config: MarkupConfig,
}

impl TemplateRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry rendering with the given markup options
    pub fn with_config(config: MarkupConfig) -> Self {
        Self {
            templates: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &MarkupConfig {
        &self.config
    }

    /// Compile and store `root` under `name`
    ///
    /// Referenced templates should be registered first; references that
    /// cannot be resolved are recorded as compile issues and render as
    /// error markers.
    pub fn register(&mut self, name: impl Into<String>, root: Node) -> &TemplateDescriptor {
        let name = name.into();
        if self.templates.contains_key(&name) {
            trace!(template = %name, "template already registered");
        } else {
            let descriptor = compile::compile(self, &name, root);
            debug!(
                template = %name,
                points = descriptor.points().len(),
                "registered template"
            );
            self.templates.insert(name.clone(), descriptor);
        }
        &self.templates[&name]
    }

    /// Register `name` on first use, building its tree lazily
    ///
    /// `build` receives the registry so it can ensure its own dependencies.
    pub fn ensure<F>(&mut self, name: &str, build: F) -> &TemplateDescriptor
    where
        F: FnOnce(&mut TemplateRegistry) -> Node,
    {
        if !self.templates.contains_key(name) {
            let root = build(self);
            self.register(name, root);
        }
        &self.templates[name]
    }

    /// Parse template source and register every declaration in dependency order
    ///
    /// Returns the registered names in the order they were compiled.
    pub fn register_source(&mut self, source: &str) -> Result<Vec<String>, TemplateError> {
        let decls = parser::parse(source).map_err(TemplateError::Parse)?;

        let mut declared: BTreeMap<String, Node> = BTreeMap::new();
        let mut order = Vec::new();
        for decl in decls {
            let name = decl.name.node;
            if declared.contains_key(&name) {
                return Err(TemplateError::Duplicate { name });
            }
            order.push(name.clone());
            declared.insert(name, decl.root);
        }

        let mut sorter = DependencySorter {
            declared: &declared,
            visiting: Vec::new(),
            done: Vec::new(),
        };
        for name in &order {
            sorter.visit(name)?;
        }
        let sorted = sorter.done;

        for name in &sorted {
            if let Some(root) = declared.remove(name) {
                self.register(name.clone(), root);
            }
        }
        Ok(sorted)
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<&TemplateDescriptor> {
        self.templates.get(name)
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Get all template names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|s| s.as_str())
    }
}

/// Depth-first ordering of declarations so dependencies compile first
struct DependencySorter<'a> {
    declared: &'a BTreeMap<String, Node>,
    visiting: Vec<String>,
    done: Vec<String>,
}

impl DependencySorter<'_> {
    fn visit(&mut self, name: &str) -> Result<(), TemplateError> {
        if self.done.iter().any(|n| n == name) {
            return Ok(());
        }
        if let Some(start) = self.visiting.iter().position(|n| n == name) {
            let mut chain = self.visiting[start..].to_vec();
            chain.push(name.to_string());
            return Err(TemplateError::CircularReference {
                chain: chain.join(" -> "),
            });
        }
        // names declared elsewhere are resolved against the registry at compile time
        let Some(root) = self.declared.get(name) else {
            return Ok(());
        };

        self.visiting.push(name.to_string());
        for dependency in root.referenced_templates() {
            self.visit(&dependency)?;
        }
        self.visiting.pop();
        self.done.push(name.to_string());
        Ok(())
    }
}
