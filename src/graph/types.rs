//! Core type definitions for the domain graph

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical identifier of an entity
///
/// Identifiers are dataset-scoped IRIs minted by the identifier service. They are
/// opaque to callers apart from the dataset prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        EntityId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId(s.to_string())
    }
}

/// Error returned when parsing an unknown entity type tag
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown entity type: {0}")]
pub struct ParseEntityTypeError(pub String);

/// Type tag of an entity in the manufacturing graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum EntityType {
    Enterprise,
    Factory,
    Machine,
    HumanResource,
    Capability,
    Process,
    Product,
    ProductClass,
    ProductApplication,
    ProductPassport,
    Property,
    SemanticReference,
    SupplyChain,
    SupplyChainElement,
    Location,
}

impl EntityType {
    /// Every entity type, in declaration order
    pub const ALL: [EntityType; 15] = [
        EntityType::Enterprise,
        EntityType::Factory,
        EntityType::Machine,
        EntityType::HumanResource,
        EntityType::Capability,
        EntityType::Process,
        EntityType::Product,
        EntityType::ProductClass,
        EntityType::ProductApplication,
        EntityType::ProductPassport,
        EntityType::Property,
        EntityType::SemanticReference,
        EntityType::SupplyChain,
        EntityType::SupplyChainElement,
        EntityType::Location,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Enterprise => "Enterprise",
            EntityType::Factory => "Factory",
            EntityType::Machine => "Machine",
            EntityType::HumanResource => "HumanResource",
            EntityType::Capability => "Capability",
            EntityType::Process => "Process",
            EntityType::Product => "Product",
            EntityType::ProductClass => "ProductClass",
            EntityType::ProductApplication => "ProductApplication",
            EntityType::ProductPassport => "ProductPassport",
            EntityType::Property => "Property",
            EntityType::SemanticReference => "SemanticReference",
            EntityType::SupplyChain => "SupplyChain",
            EntityType::SupplyChainElement => "SupplyChainElement",
            EntityType::Location => "Location",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = ParseEntityTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEntityTypeError(s.to_string()))
    }
}

/// Edge predicate (the relation field name, e.g. "providedCapabilities")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Predicate(String);

impl Predicate {
    pub fn new(predicate: impl Into<String>) -> Self {
        Predicate(predicate.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Predicate {
    fn from(s: String) -> Self {
        Predicate(s)
    }
}

impl From<&str> for Predicate {
    fn from(s: &str) -> Self {
        Predicate(s.to_string())
    }
}
