//! Domain graph data model
//!
//! This module implements the typed entity graph:
//! - Entities with a type tag, canonical id and scalar fields
//! - Directed edges classified as ownership or association
//! - In-memory storage with subject- and object-keyed edge indexes

pub mod edge;
pub mod entity;
pub mod property;
pub mod store;
pub mod types;

// Re-export main types
pub use edge::{Edge, EdgeKey, EdgeKind};
pub use entity::Entity;
pub use property::{PropertyMap, PropertyValue};
pub use store::{EdgeSlot, GraphError, GraphResult, GraphSnapshot, GraphStore, RemovedEntity};
pub use types::{EntityId, EntityType, ParseEntityTypeError, Predicate};
