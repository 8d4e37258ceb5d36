//! SchemaBuilder for constructing an immutable SchemaRegistry.

use super::{
    Cardinality, FieldDef, FieldKind, Ownership, RelationDef, ScalarDef, ScalarType,
    SchemaError, SchemaRegistry, TypeSchema,
};
use crate::graph::{EntityType, Predicate};
use std::collections::HashMap;

/// Builder for constructing an immutable SchemaRegistry.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    types: HashMap<EntityType, TypeSchema>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start declaring an entity type.
    pub fn add_type(&mut self, entity_type: EntityType) -> TypeBuilder<'_> {
        TypeBuilder {
            builder: self,
            schema: TypeSchema::new(entity_type),
            duplicate: None,
        }
    }

    /// Build the registry, checking that every entity type was declared.
    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let registry = SchemaRegistry::from_types(self.types);
        registry.validate()?;
        Ok(registry)
    }
}

/// Builder for one entity type.
pub struct TypeBuilder<'a> {
    builder: &'a mut SchemaBuilder,
    schema: TypeSchema,
    duplicate: Option<String>,
}

impl<'a> TypeBuilder<'a> {
    fn field(mut self, name: &str, kind: FieldKind) -> Self {
        if self.schema.fields.contains_key(name) {
            self.duplicate.get_or_insert_with(|| name.to_string());
            return self;
        }
        self.schema.fields.insert(
            name.to_string(),
            FieldDef {
                name: name.to_string(),
                kind,
            },
        );
        self
    }

    fn relation(
        self,
        name: &str,
        target: EntityType,
        cardinality: Cardinality,
        ownership: Ownership,
    ) -> Self {
        self.field(
            name,
            FieldKind::Relation(RelationDef {
                predicate: Predicate::new(name),
                target,
                cardinality,
                ownership,
            }),
        )
    }

    /// Optional scalar field
    pub fn scalar(self, name: &str, scalar_type: ScalarType) -> Self {
        self.field(
            name,
            FieldKind::Scalar(ScalarDef {
                scalar_type,
                required: false,
            }),
        )
    }

    /// Scalar field that must be set on creation and can never be cleared
    pub fn required(self, name: &str, scalar_type: ScalarType) -> Self {
        self.field(
            name,
            FieldKind::Scalar(ScalarDef {
                scalar_type,
                required: true,
            }),
        )
    }

    /// Composition field
    pub fn owns(self, name: &str, target: EntityType, cardinality: Cardinality) -> Self {
        self.relation(name, target, cardinality, Ownership::Owned)
    }

    /// Association field
    pub fn links(self, name: &str, target: EntityType, cardinality: Cardinality) -> Self {
        self.relation(name, target, cardinality, Ownership::Shared)
    }

    /// Field admitting both owned nested elements and shared references
    pub fn owns_or_links(self, name: &str, target: EntityType, cardinality: Cardinality) -> Self {
        self.relation(name, target, cardinality, Ownership::Mixed)
    }

    /// Common descriptive fields (label, description, their language codes, sourceId)
    pub fn described(self) -> Self {
        self.scalar("label", ScalarType::String)
            .scalar("labelLanguageCode", ScalarType::LanguageCode)
            .scalar("description", ScalarType::String)
            .scalar("descriptionLanguageCode", ScalarType::LanguageCode)
            .scalar("sourceId", ScalarType::String)
    }

    /// Finish the type declaration.
    pub fn done(self) -> Result<EntityType, SchemaError> {
        let entity_type = self.schema.entity_type;
        if let Some(field) = self.duplicate {
            return Err(SchemaError::DuplicateField { entity_type, field });
        }
        if self.builder.types.contains_key(&entity_type) {
            return Err(SchemaError::DuplicateType(entity_type));
        }
        self.builder.types.insert(entity_type, self.schema);
        Ok(entity_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_builder() {
        let mut builder = SchemaBuilder::new();
        builder
            .add_type(EntityType::Machine)
            .described()
            .owns("machineProperties", EntityType::Property, Cardinality::Many)
            .done()
            .unwrap();

        let schema = builder.types.get(&EntityType::Machine).unwrap();
        assert_eq!(schema.scalars().count(), 5);
        let relation = schema.relations().next().unwrap();
        assert_eq!(relation.predicate, Predicate::new("machineProperties"));
        assert_eq!(relation.ownership, Ownership::Owned);
    }

    #[test]
    fn test_duplicate_field() {
        let mut builder = SchemaBuilder::new();
        let result = builder
            .add_type(EntityType::Location)
            .scalar("city", ScalarType::String)
            .scalar("city", ScalarType::String)
            .done();

        assert_eq!(
            result,
            Err(SchemaError::DuplicateField {
                entity_type: EntityType::Location,
                field: "city".to_string(),
            })
        );
    }

    #[test]
    fn test_duplicate_type() {
        let mut builder = SchemaBuilder::new();
        builder.add_type(EntityType::Location).done().unwrap();
        assert_eq!(
            builder.add_type(EntityType::Location).done(),
            Err(SchemaError::DuplicateType(EntityType::Location))
        );
    }

    #[test]
    fn test_build_requires_every_type() {
        let mut builder = SchemaBuilder::new();
        builder.add_type(EntityType::Location).done().unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            SchemaError::UndeclaredType(EntityType::Enterprise)
        );
    }
}
