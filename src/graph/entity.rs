//! Entity (typed node) of the manufacturing graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{EntityId, EntityType};
use serde::{Deserialize, Serialize};

/// A typed node in the domain graph
///
/// Entities have:
/// - A canonical, immutable identifier
/// - A type tag
/// - Scalar fields (label, description, value, ...)
/// - A version counter and creation/update timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical identifier, assigned at creation and never changed
    pub id: EntityId,

    /// Type tag
    pub entity_type: EntityType,

    /// Scalar fields
    pub fields: PropertyMap,

    /// Incremented on every committed field change
    pub version: u64,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Entity {
    /// Create a new entity without fields
    pub fn new(id: EntityId, entity_type: EntityType) -> Self {
        let now = chrono::Utc::now().timestamp_millis();

        Entity {
            id,
            entity_type,
            fields: PropertyMap::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new entity with initial fields
    pub fn new_with_fields(id: EntityId, entity_type: EntityType, fields: PropertyMap) -> Self {
        let mut entity = Self::new(id, entity_type);
        entity.fields = fields;
        entity
    }

    /// Set a field value, returning the previous one
    pub fn set_field(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.fields.insert(key.into(), value.into())
    }

    /// Get a field value
    pub fn get_field(&self, key: &str) -> Option<&PropertyValue> {
        self.fields.get(key)
    }

    /// Remove a field, keeping the order of the remaining ones
    pub fn remove_field(&mut self, key: &str) -> Option<PropertyValue> {
        self.fields.shift_remove(key)
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Bump the version and update timestamp after a modification
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}
