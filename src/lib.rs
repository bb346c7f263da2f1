//! Slotmark - declarative markup templates with addressable points
//!
//! Templates are trees of markup whose nodes may be named *points*. Data
//! bound to those points replaces or repeats them at render time, and the
//! compiled point paths map rendered elements back to the point (and
//! repetition) they came from.
//!
//! # Example
//!
//! ```rust
//! use slotmark::{render_source, Record};
//!
//! let html = render_source(
//!     r#"template Hello { p { "Hello " b #name { "you" } } }"#,
//!     "Hello",
//!     &Record::new().with("name", "Ada"),
//! )
//! .unwrap();
//!
//! assert_eq!(html, "<p>Hello <b>Ada</b></p>");
//! ```

pub mod config;
pub mod data;
pub mod dom;
pub mod engine;
pub mod error;
pub mod markup;
pub mod model;
pub mod parser;

pub use config::{ConfigError, MarkupConfig, QuoteStyle};
pub use data::{DataError, Record, Value, ROOT_KEY};
pub use dom::{Document, DomId, MaterializeError};
pub use engine::{
    CompileIssue, Inherited, Location, PathSegment, PointEntry, PointPath, PointSelector,
    TemplateDescriptor, TemplateError, TemplateRegistry,
};
pub use error::ParseError;
pub use model::{
    Attributes, Cardinality, ElementNode, Node, PointInfo, PointOptions, PointSpec, ReferenceNode,
};
pub use parser::parse;

/// Register every template in `source` and render `template` with `data`
///
/// # Example
///
/// ```rust
/// use slotmark::{render_source, Record};
///
/// let html = render_source(
///     r#"
///     template List { ul { li #items* } }
///     "#,
///     "List",
///     &Record::new().with("items", vec!["a", "b"]),
/// )
/// .unwrap();
///
/// assert_eq!(html, "<ul><li>a</li><li>b</li></ul>");
/// ```
pub fn render_source(source: &str, template: &str, data: &Record) -> Result<String, TemplateError> {
    let mut registry = TemplateRegistry::new();
    registry.register_source(source)?;
    registry.render(template, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_source_simple() {
        let html = render_source(r#"template A { div [id: "x"] }"#, "A", &Record::new()).unwrap();
        assert_eq!(html, "<div id='x'></div>");
    }

    #[test]
    fn test_render_source_unknown_template() {
        let result = render_source("template A { div }", "B", &Record::new());
        assert!(matches!(result, Err(TemplateError::NotFound { name }) if name == "B"));
    }

    #[test]
    fn test_render_source_parse_error() {
        let result = render_source("template A {", "A", &Record::new());
        assert!(matches!(result, Err(TemplateError::Parse(_))));
    }
}
