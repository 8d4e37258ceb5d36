//! Schema registry
//!
//! Static description, per entity type, of scalar fields and relation fields.
//! Relation fields declare their target type, cardinality and whether they own
//! their elements (composition), share them (association), or admit both.
//! The upsert, relation and deletion engines traverse the graph only through
//! these declarations.

pub mod builder;
pub mod manufacturing;

pub use builder::{SchemaBuilder, TypeBuilder};

use crate::graph::{EntityType, Predicate, PropertyValue};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Schema errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Entity type {0} is not declared")]
    UndeclaredType(EntityType),

    #[error("Entity type {0} is declared twice")]
    DuplicateType(EntityType),

    #[error("Field '{field}' is declared twice on {entity_type}")]
    DuplicateField {
        entity_type: EntityType,
        field: String,
    },

    #[error("{entity_type} has no field '{field}'")]
    UnknownField {
        entity_type: EntityType,
        field: String,
    },

    #[error("Field '{field}' of {entity_type} is not a relation")]
    NotARelation {
        entity_type: EntityType,
        field: String,
    },

    #[error("Field '{field}' of {entity_type} is not a scalar")]
    NotAScalar {
        entity_type: EntityType,
        field: String,
    },

    #[error("Field '{field}' of {entity_type} expects {expected}, got {found}")]
    InvalidValue {
        entity_type: EntityType,
        field: String,
        expected: ScalarType,
        found: String,
    },

    #[error("Field '{field}' of {entity_type} is required")]
    MissingRequired {
        entity_type: EntityType,
        field: String,
    },
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Value domain of a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScalarType {
    String,
    /// BCP-47 style language tag such as `en` or `de-CH`
    LanguageCode,
    Number,
    Boolean,
    Any,
}

fn language_code_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-z]{2,3}(-[A-Za-z0-9]{2,8})*$").ok())
        .as_ref()
}

impl ScalarType {
    /// Check a non-null value against this type
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        match (self, value) {
            (ScalarType::Any, _) => true,
            (ScalarType::String, PropertyValue::String(_)) => true,
            (ScalarType::LanguageCode, PropertyValue::String(code)) => {
                language_code_pattern().map_or(false, |re| re.is_match(code))
            }
            (ScalarType::Number, PropertyValue::Integer(_) | PropertyValue::Float(_)) => true,
            (ScalarType::Boolean, PropertyValue::Boolean(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::String => "String",
            ScalarType::LanguageCode => "LanguageCode",
            ScalarType::Number => "Number",
            ScalarType::Boolean => "Boolean",
            ScalarType::Any => "Any",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Cardinality {
    One,
    Many,
}

/// What kind of edges a relation field produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Ownership {
    /// Composition: nested elements only, bound by ownership edges
    Owned,
    /// Association: references to existing entities only
    Shared,
    /// Nested elements become owned children, references become associations
    Mixed,
}

impl Ownership {
    /// Whether nested (inline) elements are accepted
    pub fn allows_inline(&self) -> bool {
        matches!(self, Ownership::Owned | Ownership::Mixed)
    }

    /// Whether references to existing entities are accepted
    pub fn allows_reference(&self) -> bool {
        matches!(self, Ownership::Shared | Ownership::Mixed)
    }
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Ownership::Owned => "owned",
            Ownership::Shared => "shared",
            Ownership::Mixed => "owned+shared",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarDef {
    pub scalar_type: ScalarType,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationDef {
    /// Edge predicate, equal to the field name
    pub predicate: Predicate,
    pub target: EntityType,
    pub cardinality: Cardinality,
    pub ownership: Ownership,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldKind {
    Scalar(ScalarDef),
    Relation(RelationDef),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn as_scalar(&self) -> Option<&ScalarDef> {
        match &self.kind {
            FieldKind::Scalar(def) => Some(def),
            FieldKind::Relation(_) => None,
        }
    }

    pub fn as_relation(&self) -> Option<&RelationDef> {
        match &self.kind {
            FieldKind::Relation(def) => Some(def),
            FieldKind::Scalar(_) => None,
        }
    }
}

/// Declared shape of one entity type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSchema {
    pub entity_type: EntityType,
    pub fields: IndexMap<String, FieldDef>,
}

impl TypeSchema {
    pub fn new(entity_type: EntityType) -> Self {
        TypeSchema {
            entity_type,
            fields: IndexMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn scalars(&self) -> impl Iterator<Item = (&str, &ScalarDef)> {
        self.fields
            .values()
            .filter_map(|f| f.as_scalar().map(|def| (f.name.as_str(), def)))
    }

    pub fn relations(&self) -> impl Iterator<Item = &RelationDef> {
        self.fields.values().filter_map(FieldDef::as_relation)
    }

    /// Relation declared under the given predicate
    pub fn relation(&self, predicate: &Predicate) -> Option<&RelationDef> {
        self.field(predicate.as_str()).and_then(FieldDef::as_relation)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.scalars()
            .filter(|(_, def)| def.required)
            .map(|(name, _)| name)
    }
}

/// Immutable registry of every entity type's schema
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    types: HashMap<EntityType, TypeSchema>,
}

impl SchemaRegistry {
    pub(crate) fn from_types(types: HashMap<EntityType, TypeSchema>) -> Self {
        SchemaRegistry { types }
    }

    /// The manufacturing domain schema
    pub fn manufacturing() -> SchemaResult<Self> {
        manufacturing::build()
    }

    pub fn get(&self, entity_type: EntityType) -> SchemaResult<&TypeSchema> {
        self.types
            .get(&entity_type)
            .ok_or(SchemaError::UndeclaredType(entity_type))
    }

    /// Relation field of a type
    pub fn relation(&self, entity_type: EntityType, field: &str) -> SchemaResult<&RelationDef> {
        let def = self.get(entity_type)?.field(field).ok_or_else(|| SchemaError::UnknownField {
            entity_type,
            field: field.to_string(),
        })?;
        def.as_relation().ok_or_else(|| SchemaError::NotARelation {
            entity_type,
            field: field.to_string(),
        })
    }

    /// Check a scalar value for a field. `null` passes unless the field is required.
    pub fn check_scalar(
        &self,
        entity_type: EntityType,
        field: &str,
        value: &PropertyValue,
    ) -> SchemaResult<&ScalarDef> {
        let def = self.get(entity_type)?.field(field).ok_or_else(|| SchemaError::UnknownField {
            entity_type,
            field: field.to_string(),
        })?;
        let scalar = def.as_scalar().ok_or_else(|| SchemaError::NotAScalar {
            entity_type,
            field: field.to_string(),
        })?;

        if value.is_null() {
            if scalar.required {
                return Err(SchemaError::MissingRequired {
                    entity_type,
                    field: field.to_string(),
                });
            }
            return Ok(scalar);
        }
        if !scalar.scalar_type.accepts(value) {
            return Err(SchemaError::InvalidValue {
                entity_type,
                field: field.to_string(),
                expected: scalar.scalar_type,
                found: value.to_string(),
            });
        }
        Ok(scalar)
    }

    /// Declared types in canonical order
    pub fn types(&self) -> impl Iterator<Item = &TypeSchema> {
        EntityType::ALL.iter().filter_map(|t| self.types.get(t))
    }

    /// Check that every entity type is declared
    pub fn validate(&self) -> SchemaResult<()> {
        for entity_type in EntityType::ALL {
            if !self.types.contains_key(&entity_type) {
                return Err(SchemaError::UndeclaredType(entity_type));
            }
        }
        for schema in self.types.values() {
            for relation in schema.relations() {
                if !self.types.contains_key(&relation.target) {
                    return Err(SchemaError::UndeclaredType(relation.target));
                }
            }
        }
        Ok(())
    }
}
