//! Template engine: registration, rendering and point location
//!
//! Templates are registered as [`Node`](crate::model::Node) trees and
//! compiled into a [`TemplateDescriptor`] that records, for every point,
//! the path of element indices leading to it. Those paths let markup
//! rendered earlier be mapped back to points, and points forward to
//! elements.
//!
//! # Example
//!
//! ```text
//! template BaseCard {
//!     div [class: "card"] {
//!         h1 #title export
//!         div #content export
//!     }
//! }
//!
//! template Card {
//!     use BaseCard {
//!         title #title
//!         content #content { p { "Default" } }
//!     }
//! }
//! ```

mod compile;
mod descriptor;
mod locate;
mod registry;
mod render;
mod tree;

pub use descriptor::{
    CompileIssue, Inherited, PathSegment, PointEntry, PointPath, TemplateDescriptor,
};
pub use locate::{Location, PointSelector};
pub use registry::{TemplateError, TemplateRegistry};
pub use tree::{NodeId, TemplateTree, TreeElement, TreeNode, TreeReference, TreeSlot};
