//! Declared schema of the manufacturing knowledge graph

use super::{Cardinality, SchemaBuilder, SchemaRegistry, SchemaResult, ScalarType};
use crate::graph::EntityType;

use Cardinality::{Many, One};

/// Build the manufacturing registry
pub fn build() -> SchemaResult<SchemaRegistry> {
    let mut builder = SchemaBuilder::new();

    builder
        .add_type(EntityType::Enterprise)
        .described()
        .owns("factories", EntityType::Factory, Many)
        .owns("location", EntityType::Location, One)
        .owns_or_links("properties", EntityType::Property, Many)
        .owns_or_links("semanticReferences", EntityType::SemanticReference, Many)
        .done()?;

    builder
        .add_type(EntityType::Factory)
        .described()
        .owns("location", EntityType::Location, One)
        .owns("machines", EntityType::Machine, Many)
        .owns("humanResources", EntityType::HumanResource, Many)
        .owns("products", EntityType::Product, Many)
        .owns("processes", EntityType::Process, Many)
        .owns_or_links("properties", EntityType::Property, Many)
        .owns_or_links("semanticReferences", EntityType::SemanticReference, Many)
        .done()?;

    builder
        .add_type(EntityType::Machine)
        .described()
        .owns("machineProperties", EntityType::Property, Many)
        .owns_or_links("providedCapabilities", EntityType::Capability, Many)
        .owns_or_links("semanticReferences", EntityType::SemanticReference, Many)
        .done()?;

    builder
        .add_type(EntityType::HumanResource)
        .described()
        .owns_or_links("providedCapabilities", EntityType::Capability, Many)
        .owns_or_links("certificates", EntityType::Property, Many)
        .links("usingProcesses", EntityType::Process, Many)
        .owns_or_links("semanticReferences", EntityType::SemanticReference, Many)
        .done()?;

    builder
        .add_type(EntityType::Capability)
        .described()
        .owns_or_links("properties", EntityType::Property, Many)
        .owns_or_links("semanticReferences", EntityType::SemanticReference, Many)
        .done()?;

    builder
        .add_type(EntityType::Process)
        .described()
        .links("realizedCapabilities", EntityType::Capability, Many)
        .links("requiredCapabilities", EntityType::Capability, Many)
        .links("rawMaterials", EntityType::Product, Many)
        .links("operatingMaterials", EntityType::Product, Many)
        .links("preliminaryProducts", EntityType::Product, Many)
        .links("inputProducts", EntityType::Product, Many)
        .links("endProducts", EntityType::Product, Many)
        .links("byProducts", EntityType::Product, Many)
        .links("wasteProducts", EntityType::Product, Many)
        .links("outputProducts", EntityType::Product, Many)
        .owns_or_links("properties", EntityType::Property, Many)
        .owns_or_links("semanticReferences", EntityType::SemanticReference, Many)
        .done()?;

    builder
        .add_type(EntityType::Product)
        .described()
        .owns("productPassport", EntityType::ProductPassport, One)
        .owns("billOfMaterials", EntityType::ProductApplication, Many)
        .links("productClasses", EntityType::ProductClass, Many)
        .owns_or_links("properties", EntityType::Property, Many)
        .owns_or_links("semanticReferences", EntityType::SemanticReference, Many)
        .done()?;

    builder
        .add_type(EntityType::ProductClass)
        .described()
        .links("parentClass", EntityType::ProductClass, One)
        .owns_or_links("semanticReferences", EntityType::SemanticReference, Many)
        .done()?;

    builder
        .add_type(EntityType::ProductApplication)
        .described()
        .links("product", EntityType::Product, One)
        .owns("quantity", EntityType::Property, One)
        .done()?;

    builder
        .add_type(EntityType::ProductPassport)
        .described()
        .scalar("identifier", ScalarType::String)
        .owns_or_links("properties", EntityType::Property, Many)
        .done()?;

    builder
        .add_type(EntityType::Property)
        .described()
        .required("value", ScalarType::Any)
        .scalar("unit", ScalarType::String)
        .owns_or_links("semanticReferences", EntityType::SemanticReference, Many)
        .done()?;

    builder
        .add_type(EntityType::SemanticReference)
        .described()
        .scalar("sourceUri", ScalarType::String)
        .done()?;

    builder
        .add_type(EntityType::SupplyChain)
        .described()
        .owns_or_links("supplyChainElements", EntityType::SupplyChainElement, Many)
        .done()?;

    builder
        .add_type(EntityType::SupplyChainElement)
        .described()
        .links("enterprise", EntityType::Enterprise, One)
        .owns_or_links("semanticReferences", EntityType::SemanticReference, Many)
        .done()?;

    builder
        .add_type(EntityType::Location)
        .scalar("label", ScalarType::String)
        .scalar("street", ScalarType::String)
        .scalar("city", ScalarType::String)
        .scalar("zipCode", ScalarType::String)
        .scalar("country", ScalarType::String)
        .scalar("latitude", ScalarType::Number)
        .scalar("longitude", ScalarType::Number)
        .done()?;

    builder.build()
}
