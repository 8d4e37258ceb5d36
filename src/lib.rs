//! Factograph
//!
//! Mutation engine for a manufacturing knowledge graph: enterprises, factories,
//! machines, human resources, capabilities, processes, products and supply chains.
//!
//! # Architecture
//!
//! - [`schema`]: declared entity types with scalar fields and relation fields,
//!   each relation marked owned (composition), shared (association) or mixed
//! - [`identity`]: dataset-scoped identifier minting and validation
//! - [`repository`]: transactional graph adapter traits and an in-memory adapter
//! - [`mutation`]: nested upsert, idempotent relation edits, cascading and bulk
//!   deletion, and the `{code, message, payload}` result envelope
//! - [`service`]: the typed API (`create_factory`, `add_capability_to_machine`, ...)
//!
//! Every service call runs in one transaction. Domain failures (not found,
//! validation, ownership violation, conflict, forbidden) come back as non-200
//! envelopes and leave the graph untouched; repository failures are returned
//! as errors.
//!
//! ## Example Usage
//!
//! ```rust
//! use factograph::{EngineConfig, EntityInput, MemoryRepository, MutationService, Principal};
//!
//! let service = MutationService::new(MemoryRepository::new(), EngineConfig::default()).unwrap();
//! let user = Principal::anonymous();
//!
//! // Create a machine with a nested, owned capability
//! let input = EntityInput::new()
//!     .set("label", "Laser cutter")
//!     .child("providedCapabilities", EntityInput::new().set("label", "Cutting"));
//! let created = service.create_machine(&user, &input).unwrap();
//! assert_eq!(created.code, 200);
//!
//! let machine = created.entity_payload().unwrap();
//! assert_eq!(machine.children("providedCapabilities").len(), 1);
//!
//! // Cascading delete removes the capability with it
//! let deleted = service.delete_machine(&user, machine.id.as_str(), true).unwrap();
//! assert_eq!(deleted.message, format!("Deleted {}", machine.id));
//! assert_eq!(service.repository().entity_count().unwrap(), 0);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod graph;
pub mod identity;
pub mod mutation;
pub mod query;
pub mod repository;
pub mod schema;
pub mod service;

// Re-export main types for convenience
pub use graph::{
    Edge, EdgeKey, EdgeKind, Entity, EntityId, EntityType, GraphError, GraphResult,
    GraphSnapshot, GraphStore, Predicate, PropertyMap, PropertyValue,
};

pub use repository::{
    GraphRepository, GraphTransaction, MemoryRepository, MemoryTransaction, RepositoryError,
    RepositoryResult, RepositoryStats,
};

pub use schema::{
    Cardinality, Ownership, RelationDef, ScalarType, SchemaBuilder, SchemaError, SchemaRegistry,
    SchemaResult, TypeSchema,
};

pub use identity::{
    Dataset, IdentifierService, IdentityError, IdentityResult, SequentialIdentifiers,
    UuidIdentifiers,
};

pub use auth::{AllowAll, Permission, PermissionHook, Principal, RoleTable, TargetRef};

pub use config::{ConfigError, ConfigResult, EngineConfig, IdStrategy};

pub use error::{EngineResult, MutationError};

pub use mutation::{
    DeletionEngine, DeletionReport, EdgeChange, EntityInput, InputError, InputValue,
    MutationResult, Payload, RelationEditor, UpsertEngine, UpsertOutcome,
};

pub use query::{EntityTree, Projector, RelationValue};

pub use service::{MutationService, ServiceResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
