//! Typed mutation API
//!
//! [`MutationService`] wires the engines to a repository, the schema registry,
//! an identifier service and a permission hook. Every call checks permission,
//! runs in exactly one transaction, commits on success and rolls back on any
//! failure. Domain failures come back as non-200 envelopes; repository failures
//! come back as `Err`.

use crate::auth::{AllowAll, Permission, PermissionHook, Principal, RoleTable, TargetRef};
use crate::config::{ConfigResult, EngineConfig, IdStrategy};
use crate::error::{EngineResult, MutationError};
use crate::graph::{EntityId, EntityType};
use crate::identity::{Dataset, IdentifierService, SequentialIdentifiers, UuidIdentifiers};
use crate::mutation::{
    wrap, DeletionEngine, DeletionReport, EdgeChange, EntityInput, MutationResult,
    RelationEditor, UpsertEngine, UpsertOutcome,
};
use crate::query::{EntityTree, Projector};
use crate::repository::{GraphRepository, GraphTransaction, RepositoryError};
use crate::schema::SchemaRegistry;
use tracing::{info, warn};

/// Result of a service call
pub type ServiceResult = Result<MutationResult, RepositoryError>;

pub struct MutationService<R> {
    repository: R,
    registry: SchemaRegistry,
    identifiers: Box<dyn IdentifierService>,
    permissions: Box<dyn PermissionHook>,
    dataset: Dataset,
    config: EngineConfig,
}

/// Commit on success, roll back on failure
fn finish<T: GraphTransaction, V>(tx: T, outcome: EngineResult<V>) -> EngineResult<V> {
    match outcome {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback() {
                warn!("Rollback failed: {}", rollback);
            }
            warn!("Rolled back: {}", err);
            Err(err)
        }
    }
}

impl<R: GraphRepository> MutationService<R> {
    pub fn new(repository: R, config: EngineConfig) -> ConfigResult<Self> {
        config.validate()?;
        let dataset = config.dataset()?;
        let registry = SchemaRegistry::manufacturing()?;

        let identifiers: Box<dyn IdentifierService> = match config.id_strategy {
            IdStrategy::Uuid => Box::new(UuidIdentifiers),
            IdStrategy::Sequential => Box::new(SequentialIdentifiers::new()),
        };
        let permissions: Box<dyn PermissionHook> = match &config.roles {
            Some(roles) => Box::new(RoleTable::from(roles.clone())),
            None => Box::new(AllowAll),
        };

        info!(
            "Mutation service ready (dataset {}, ids {:?})",
            dataset.base(),
            config.id_strategy
        );

        Ok(MutationService {
            repository,
            registry,
            identifiers,
            permissions,
            dataset,
            config,
        })
    }

    pub fn with_permissions(mut self, hook: impl PermissionHook + 'static) -> Self {
        self.permissions = Box::new(hook);
        self
    }

    pub fn with_identifiers(mut self, identifiers: impl IdentifierService + 'static) -> Self {
        self.identifiers = Box::new(identifiers);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn upsert_engine(&self) -> UpsertEngine<'_> {
        UpsertEngine::new(
            &self.registry,
            self.identifiers.as_ref(),
            &self.dataset,
            self.config.max_nesting_depth,
        )
    }

    fn relation_editor(&self) -> RelationEditor<'_> {
        RelationEditor::new(&self.registry, self.identifiers.as_ref(), &self.dataset)
    }

    fn projector(&self) -> Projector<'_> {
        Projector::new(&self.registry, self.config.query_depth)
    }

    fn authorize(
        &self,
        principal: &Principal,
        target: TargetRef,
        permission: Permission,
    ) -> EngineResult<()> {
        if self.permissions.has_permission(principal, &target, permission) {
            Ok(())
        } else {
            warn!("Denied {} on {} to {}", permission, target, principal.subject);
            Err(MutationError::Forbidden(format!(
                "{} may not {} {}",
                principal.subject, permission, target
            )))
        }
    }

    fn parse_id(&self, id: &str) -> EngineResult<EntityId> {
        Ok(self.identifiers.validate(&self.dataset, id)?)
    }

    /// Projection of an entity written in the current transaction
    fn written<T: GraphTransaction>(
        &self,
        tx: &T,
        entity_type: Option<EntityType>,
        id: &EntityId,
    ) -> EngineResult<EntityTree> {
        self.projector()
            .project(tx, entity_type, id)?
            .ok_or_else(|| MutationError::NotFound(format!("Entity {} not found", id)))
    }

    fn run_upsert(
        &self,
        principal: &Principal,
        entity_type: EntityType,
        id: Option<EntityId>,
        input: &EntityInput,
    ) -> EngineResult<(UpsertOutcome, EntityTree)> {
        let (target, permission) = match &id {
            Some(id) => (TargetRef::entity(Some(entity_type), id.clone()), Permission::Update),
            None => (TargetRef::of_type(entity_type), Permission::Create),
        };
        self.authorize(principal, target, permission)?;

        let mut tx = self.repository.begin()?;
        let engine = self.upsert_engine();
        let outcome = match &id {
            Some(id) => engine.update(&mut tx, entity_type, id, input),
            None => engine.create(&mut tx, entity_type, input),
        }
        .and_then(|outcome| {
            let tree = self.written(&tx, Some(entity_type), &outcome.id)?;
            Ok((outcome, tree))
        });
        let (outcome, tree) = finish(tx, outcome)?;

        info!(
            "Upserted {} {} (created {}, updated {}, +{} -{} edges)",
            entity_type,
            outcome.id,
            outcome.created.len(),
            outcome.updated.len(),
            outcome.edges_added,
            outcome.edges_removed
        );
        Ok((outcome, tree))
    }

    /// Create an entity tree; nested elements without an id become owned children
    pub fn create(
        &self,
        principal: &Principal,
        entity_type: EntityType,
        input: &EntityInput,
    ) -> ServiceResult {
        wrap(
            self.run_upsert(principal, entity_type, None, input),
            |(_, tree)| MutationResult::entity(tree),
        )
    }

    /// Merge an input tree into an existing entity
    pub fn update(
        &self,
        principal: &Principal,
        entity_type: EntityType,
        id: &str,
        input: &EntityInput,
    ) -> ServiceResult {
        let outcome = self
            .parse_id(id)
            .and_then(|id| self.run_upsert(principal, entity_type, Some(id), input));
        wrap(outcome, |(_, tree)| MutationResult::entity(tree))
    }

    /// Create or update depending on whether the input carries an id
    pub fn upsert(
        &self,
        principal: &Principal,
        entity_type: EntityType,
        input: &EntityInput,
    ) -> ServiceResult {
        match &input.id {
            Some(id) => self.update(principal, entity_type, id, input),
            None => self.create(principal, entity_type, input),
        }
    }

    fn run_delete(
        &self,
        principal: &Principal,
        entity_type: EntityType,
        id: &str,
        mode: DeleteMode,
    ) -> EngineResult<DeletionReport> {
        let id = self.parse_id(id)?;
        self.authorize(
            principal,
            TargetRef::entity(Some(entity_type), id.clone()),
            Permission::Delete,
        )?;

        let mut tx = self.repository.begin()?;
        let engine = DeletionEngine::new(self.config.bulk_batch_size);
        let outcome = match mode {
            DeleteMode::Detach => engine.delete(&mut tx, Some(entity_type), &id, false),
            DeleteMode::Cascade => engine.delete(&mut tx, Some(entity_type), &id, true),
            DeleteMode::Bulk => engine.bulk_delete(&mut tx, Some(entity_type), &id),
        };
        let report = finish(tx, outcome)?;

        info!(
            "Deleted {} {} ({:?}: {} entities, {} edges, {} writes)",
            entity_type,
            report.root,
            mode,
            report.deleted.len(),
            report.edges_removed,
            report.write_calls
        );
        Ok(report)
    }

    /// Delete an entity; with `cascade` its owned subtree goes too, without it
    /// the entity is detached and its children survive
    pub fn delete(
        &self,
        principal: &Principal,
        entity_type: EntityType,
        id: &str,
        cascade: bool,
    ) -> ServiceResult {
        let mode = if cascade {
            DeleteMode::Cascade
        } else {
            DeleteMode::Detach
        };
        wrap(self.run_delete(principal, entity_type, id, mode), |report| {
            MutationResult::deleted(&report.root)
        })
    }

    /// Cascading delete with batched repository writes
    pub fn bulk_delete(
        &self,
        principal: &Principal,
        entity_type: EntityType,
        id: &str,
    ) -> ServiceResult {
        wrap(
            self.run_delete(principal, entity_type, id, DeleteMode::Bulk),
            |report| MutationResult::deleted(&report.root),
        )
    }

    fn run_relation(
        &self,
        principal: &Principal,
        source_type: Option<EntityType>,
        predicate: &str,
        source: &str,
        target: &str,
        add: bool,
    ) -> EngineResult<(EdgeChange, EntityTree)> {
        let source_id = self.parse_id(source)?;
        self.authorize(
            principal,
            TargetRef::entity(source_type, source_id.clone()),
            Permission::Link,
        )?;

        let mut tx = self.repository.begin()?;
        let editor = self.relation_editor();
        let change = if add {
            editor.add_edge(&mut tx, source_type, predicate, source, target)
        } else {
            editor.remove_edge(&mut tx, source_type, predicate, source, target)
        }
        .and_then(|change| {
            let tree = self.written(&tx, source_type, &source_id)?;
            Ok((change, tree))
        });
        let (change, tree) = finish(tx, change)?;

        info!(
            "{} {} (changed: {})",
            if add { "Linked" } else { "Unlinked" },
            change.edge,
            change.changed
        );
        Ok((change, tree))
    }

    /// Add an association edge; the payload is the source entity
    pub fn add_relation(
        &self,
        principal: &Principal,
        source_type: Option<EntityType>,
        predicate: &str,
        source: &str,
        target: &str,
    ) -> ServiceResult {
        wrap(
            self.run_relation(principal, source_type, predicate, source, target, true),
            |(_, tree)| MutationResult::entity(tree),
        )
    }

    /// Remove an association edge; the payload is the source entity
    pub fn remove_relation(
        &self,
        principal: &Principal,
        source_type: Option<EntityType>,
        predicate: &str,
        source: &str,
        target: &str,
    ) -> ServiceResult {
        wrap(
            self.run_relation(principal, source_type, predicate, source, target, false),
            |(_, tree)| MutationResult::entity(tree),
        )
    }

    fn run_get(
        &self,
        principal: &Principal,
        entity_type: EntityType,
        id: &str,
    ) -> EngineResult<EntityTree> {
        let id = self.parse_id(id)?;
        self.authorize(
            principal,
            TargetRef::entity(Some(entity_type), id.clone()),
            Permission::Read,
        )?;

        let tx = self.repository.begin()?;
        let tree = self
            .projector()
            .project(&tx, Some(entity_type), &id)
            .map_err(MutationError::from)
            .and_then(|tree| {
                tree.ok_or_else(|| {
                    MutationError::NotFound(format!("{} {} not found", entity_type, id))
                })
            });
        finish(tx, tree)
    }

    fn run_list(
        &self,
        principal: &Principal,
        entity_type: EntityType,
    ) -> EngineResult<Vec<EntityTree>> {
        self.authorize(principal, TargetRef::of_type(entity_type), Permission::Read)?;

        let tx = self.repository.begin()?;
        let trees = self
            .projector()
            .list(&tx, entity_type)
            .map_err(MutationError::from);
        finish(tx, trees)
    }

    /// Read one entity with its relations expanded
    pub fn get(&self, principal: &Principal, entity_type: EntityType, id: &str) -> ServiceResult {
        wrap(self.run_get(principal, entity_type, id), MutationResult::entity)
    }

    /// Read every entity of a type
    pub fn list(&self, principal: &Principal, entity_type: EntityType) -> ServiceResult {
        wrap(self.run_list(principal, entity_type), MutationResult::entities)
    }
}

#[derive(Debug, Clone, Copy)]
enum DeleteMode {
    Detach,
    Cascade,
    Bulk,
}

macro_rules! entity_operations {
    ($($entity:ident => $create:ident, $update:ident, $upsert:ident, $delete:ident,
        $bulk_delete:ident, $get:ident, $list:ident;)*) => {
        impl<R: GraphRepository> MutationService<R> {
            $(
                #[doc = concat!("Create a ", stringify!($entity), " with its nested children")]
                pub fn $create(&self, principal: &Principal, input: &EntityInput) -> ServiceResult {
                    self.create(principal, EntityType::$entity, input)
                }

                #[doc = concat!("Merge an input into an existing ", stringify!($entity))]
                pub fn $update(
                    &self,
                    principal: &Principal,
                    id: &str,
                    input: &EntityInput,
                ) -> ServiceResult {
                    self.update(principal, EntityType::$entity, id, input)
                }

                #[doc = concat!("Create or update a ", stringify!($entity))]
                pub fn $upsert(&self, principal: &Principal, input: &EntityInput) -> ServiceResult {
                    self.upsert(principal, EntityType::$entity, input)
                }

                #[doc = concat!("Delete a ", stringify!($entity))]
                pub fn $delete(
                    &self,
                    principal: &Principal,
                    id: &str,
                    cascade: bool,
                ) -> ServiceResult {
                    self.delete(principal, EntityType::$entity, id, cascade)
                }

                #[doc = concat!(
                    "Delete a ", stringify!($entity), " and its owned subtree in batches"
                )]
                pub fn $bulk_delete(&self, principal: &Principal, id: &str) -> ServiceResult {
                    self.bulk_delete(principal, EntityType::$entity, id)
                }

                #[doc = concat!("Read a ", stringify!($entity))]
                pub fn $get(&self, principal: &Principal, id: &str) -> ServiceResult {
                    self.get(principal, EntityType::$entity, id)
                }

                #[doc = concat!("List every ", stringify!($entity))]
                pub fn $list(&self, principal: &Principal) -> ServiceResult {
                    self.list(principal, EntityType::$entity)
                }
            )*
        }
    };
}

entity_operations! {
    Enterprise => create_enterprise, update_enterprise, upsert_enterprise, delete_enterprise,
        bulk_delete_enterprise, get_enterprise, list_enterprises;
    Factory => create_factory, update_factory, upsert_factory, delete_factory, bulk_delete_factory,
        get_factory, list_factories;
    Machine => create_machine, update_machine, upsert_machine, delete_machine, bulk_delete_machine,
        get_machine, list_machines;
    HumanResource => create_human_resource, update_human_resource, upsert_human_resource,
        delete_human_resource, bulk_delete_human_resource, get_human_resource, list_human_resources;
    Capability => create_capability, update_capability, upsert_capability, delete_capability,
        bulk_delete_capability, get_capability, list_capabilities;
    Process => create_process, update_process, upsert_process, delete_process, bulk_delete_process,
        get_process, list_processes;
    Product => create_product, update_product, upsert_product, delete_product, bulk_delete_product,
        get_product, list_products;
    ProductClass => create_product_class, update_product_class, upsert_product_class,
        delete_product_class, bulk_delete_product_class, get_product_class, list_product_classes;
    ProductApplication => create_product_application, update_product_application,
        upsert_product_application, delete_product_application, bulk_delete_product_application,
        get_product_application, list_product_applications;
    ProductPassport => create_product_passport, update_product_passport, upsert_product_passport,
        delete_product_passport, bulk_delete_product_passport, get_product_passport,
        list_product_passports;
    Property => create_property, update_property, upsert_property, delete_property,
        bulk_delete_property, get_property, list_properties;
    SemanticReference => create_semantic_reference, update_semantic_reference,
        upsert_semantic_reference, delete_semantic_reference, bulk_delete_semantic_reference,
        get_semantic_reference, list_semantic_references;
    SupplyChain => create_supply_chain, update_supply_chain, upsert_supply_chain,
        delete_supply_chain, bulk_delete_supply_chain, get_supply_chain, list_supply_chains;
    SupplyChainElement => create_supply_chain_element, update_supply_chain_element,
        upsert_supply_chain_element, delete_supply_chain_element, bulk_delete_supply_chain_element,
        get_supply_chain_element, list_supply_chain_elements;
    Location => create_location, update_location, upsert_location, delete_location,
        bulk_delete_location, get_location, list_locations;
}

macro_rules! relation_operations {
    ($($add:ident, $remove:ident => $source:expr, $predicate:literal;)*) => {
        impl<R: GraphRepository> MutationService<R> {
            $(
                #[doc = concat!("Link a target under `", $predicate, "`")]
                pub fn $add(
                    &self,
                    principal: &Principal,
                    source: &str,
                    target: &str,
                ) -> ServiceResult {
                    self.add_relation(principal, $source, $predicate, source, target)
                }

                #[doc = concat!("Unlink a target from `", $predicate, "`")]
                pub fn $remove(
                    &self,
                    principal: &Principal,
                    source: &str,
                    target: &str,
                ) -> ServiceResult {
                    self.remove_relation(principal, $source, $predicate, source, target)
                }
            )*
        }
    };
}

relation_operations! {
    add_capability_to_machine, remove_capability_from_machine =>
        Some(EntityType::Machine), "providedCapabilities";
    add_capability_to_human_resource, remove_capability_from_human_resource =>
        Some(EntityType::HumanResource), "providedCapabilities";
    add_process_to_human_resource, remove_process_from_human_resource =>
        Some(EntityType::HumanResource), "usingProcesses";
    add_certificate_to_human_resource, remove_certificate_from_human_resource =>
        Some(EntityType::HumanResource), "certificates";
    add_realized_capability_to_process, remove_realized_capability_from_process =>
        Some(EntityType::Process), "realizedCapabilities";
    add_required_capability_to_process, remove_required_capability_from_process =>
        Some(EntityType::Process), "requiredCapabilities";
    add_raw_material_to_process, remove_raw_material_from_process =>
        Some(EntityType::Process), "rawMaterials";
    add_operating_material_to_process, remove_operating_material_from_process =>
        Some(EntityType::Process), "operatingMaterials";
    add_preliminary_product_to_process, remove_preliminary_product_from_process =>
        Some(EntityType::Process), "preliminaryProducts";
    add_input_product_to_process, remove_input_product_from_process =>
        Some(EntityType::Process), "inputProducts";
    add_end_product_to_process, remove_end_product_from_process =>
        Some(EntityType::Process), "endProducts";
    add_by_product_to_process, remove_by_product_from_process =>
        Some(EntityType::Process), "byProducts";
    add_waste_product_to_process, remove_waste_product_from_process =>
        Some(EntityType::Process), "wasteProducts";
    add_output_product_to_process, remove_output_product_from_process =>
        Some(EntityType::Process), "outputProducts";
    add_product_class_to_product, remove_product_class_from_product =>
        Some(EntityType::Product), "productClasses";
    add_parent_class_to_product_class, remove_parent_class_from_product_class =>
        Some(EntityType::ProductClass), "parentClass";
    add_product_to_product_application, remove_product_from_product_application =>
        Some(EntityType::ProductApplication), "product";
    add_element_to_supply_chain, remove_element_from_supply_chain =>
        Some(EntityType::SupplyChain), "supplyChainElements";
    add_enterprise_to_supply_chain_element, remove_enterprise_from_supply_chain_element =>
        Some(EntityType::SupplyChainElement), "enterprise";
    add_semantic_reference_to_entity, remove_semantic_reference_from_entity =>
        None, "semanticReferences";
    add_property_to_entity, remove_property_from_entity => None, "properties";
}
