//! Data model shared across the crawler, graph store, and query layers

mod kind;
mod resource;

pub use kind::ResourceKind;
pub use resource::{GraphEdge, GraphResource, Hierarchy, PodHealth};
