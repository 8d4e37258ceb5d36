//! Domain-graph mutation engines
//!
//! - [`upsert`]: nested create/update by identity
//! - [`relation`]: idempotent association edits
//! - [`delete`]: detach, cascading and bulk deletion
//! - [`result`]: the `{code, message, payload}` envelope

pub mod delete;
pub mod input;
pub mod relation;
pub mod result;
pub mod upsert;

pub use delete::{DeletionEngine, DeletionReport};
pub use input::{EntityInput, InputError, InputValue};
pub use relation::{EdgeChange, RelationEditor};
pub use result::{wrap, MutationResult, Payload};
pub use upsert::{UpsertEngine, UpsertOutcome};
