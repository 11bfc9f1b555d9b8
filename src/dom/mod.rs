//! Document tree: slab-pooled node arena plus the owning document facade

pub mod arena;
pub mod document;
pub mod node;

pub use arena::NodeArena;
pub use document::{Document, OpenOutcome};
pub use node::{Attribute, BoxKind, ElementData, NodeData, NodeId, NodeKind};
