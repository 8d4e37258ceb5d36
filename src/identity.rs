//! Identifier service
//!
//! Entity identifiers are IRIs of the form `{dataset_base}{TypeTag}/{token}`.
//! The dataset base scopes every identifier to one graph.

use crate::graph::{EntityId, EntityType};
use oxrdf::NamedNode;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentityError {
    #[error("Invalid IRI '{iri}': {reason}")]
    InvalidIri { iri: String, reason: String },

    #[error("Dataset base '{0}' must end with '/' or '#'")]
    InvalidBase(String),

    #[error("Identifier '{id}' is outside dataset {base}")]
    OutsideDataset { id: String, base: String },
}

pub type IdentityResult<T> = Result<T, IdentityError>;

fn parse_iri(iri: &str) -> IdentityResult<NamedNode> {
    NamedNode::new(iri).map_err(|e| IdentityError::InvalidIri {
        iri: iri.to_string(),
        reason: e.to_string(),
    })
}

/// Identifier namespace of one graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    base: String,
}

impl Dataset {
    pub fn new(base: impl Into<String>) -> IdentityResult<Self> {
        let base = base.into();
        parse_iri(&base)?;
        if !base.ends_with('/') && !base.ends_with('#') {
            return Err(IdentityError::InvalidBase(base));
        }
        Ok(Dataset { base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Prefix shared by every identifier of one type
    pub fn type_prefix(&self, entity_type: EntityType) -> String {
        format!("{}{}/", self.base, entity_type)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        id.as_str().starts_with(&self.base)
    }

    /// Type tag encoded in an identifier minted for this dataset
    pub fn type_of(&self, id: &EntityId) -> Option<EntityType> {
        let rest = id.as_str().strip_prefix(&self.base)?;
        let (tag, _) = rest.split_once('/')?;
        tag.parse().ok()
    }
}

/// Mints and validates entity identifiers
pub trait IdentifierService: Send + Sync {
    /// Mint a fresh identifier for an entity of the given type
    fn new_id(&self, dataset: &Dataset, entity_type: EntityType) -> EntityId;

    /// Check that a caller-supplied identifier is a well-formed IRI in the dataset
    fn validate(&self, dataset: &Dataset, id: &str) -> IdentityResult<EntityId> {
        parse_iri(id)?;
        let id = EntityId::new(id);
        if !dataset.contains(&id) {
            return Err(IdentityError::OutsideDataset {
                id: id.to_string(),
                base: dataset.base().to_string(),
            });
        }
        Ok(id)
    }
}

/// Random (UUID v4) identifiers
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdentifiers;

impl IdentifierService for UuidIdentifiers {
    fn new_id(&self, dataset: &Dataset, entity_type: EntityType) -> EntityId {
        EntityId::new(format!(
            "{}{}",
            dataset.type_prefix(entity_type),
            Uuid::new_v4().simple()
        ))
    }
}

/// Deterministic counter-based identifiers
#[derive(Debug)]
pub struct SequentialIdentifiers {
    next: AtomicU64,
}

impl SequentialIdentifiers {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        SequentialIdentifiers {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIdentifiers {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierService for SequentialIdentifiers {
    fn new_id(&self, dataset: &Dataset, entity_type: EntityType) -> EntityId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        EntityId::new(format!("{}{}", dataset.type_prefix(entity_type), n))
    }
}
