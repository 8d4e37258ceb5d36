//! Integration tests for detach, cascading and bulk deletion

mod common;

use common::{id_of, labelled, listed, service, tree, user};
use factograph::{
    Edge, EntityId, EntityInput, GraphRepository, GraphTransaction, MemoryRepository,
    MutationService,
};

/// Enterprise with `factories` factories of `machines` machines each, every
/// machine owning a property and a capability
fn enterprise_input(factories: usize, machines: usize) -> EntityInput {
    let mut enterprise = labelled("Acme");
    for f in 0..factories {
        let mut factory = labelled(&format!("Plant {}", f));
        for m in 0..machines {
            factory = factory.child(
                "machines",
                labelled(&format!("Machine {}.{}", f, m))
                    .child("machineProperties", EntityInput::new().set("value", m as i64))
                    .child("providedCapabilities", labelled("Cutting")),
            );
        }
        enterprise = enterprise.child("factories", factory);
    }
    enterprise
}

fn seeded(factories: usize, machines: usize) -> (MutationService<MemoryRepository>, String) {
    let service = service();
    let created = service
        .create_enterprise(&user(), &enterprise_input(factories, machines))
        .unwrap();
    let id = id_of(&created);
    (service, id)
}

#[test]
fn test_cascade_removes_subtree_and_crossing_edges() {
    let service = service();
    let outsider = id_of(&service.create_capability(&user(), &labelled("Shared QA")).unwrap());
    let created = service
        .create_factory(
            &user(),
            &labelled("Plant").child(
                "machines",
                labelled("Mill")
                    .child("providedCapabilities", labelled("Milling"))
                    .reference("providedCapabilities", outsider.as_str()),
            ),
        )
        .unwrap();
    let factory = id_of(&created);
    let mill = tree(&created).children("machines")[0].id.to_string();

    // An outside process points into the subtree
    let process = id_of(&service.create_process(&user(), &labelled("Finishing")).unwrap());
    let owned_capability = tree(&created).children("machines")[0]
        .children("providedCapabilities")
        .into_iter()
        .find(|c| c.id.as_str() != outsider)
        .map(|c| c.id.to_string())
        .unwrap();
    service
        .add_realized_capability_to_process(&user(), &process, &owned_capability)
        .unwrap();

    let deleted = service.delete_factory(&user(), &factory, true).unwrap();
    assert_eq!(deleted.message, format!("Deleted {}", factory));

    assert_eq!(service.get_factory(&user(), &factory).unwrap().code, 404);
    assert_eq!(service.get_machine(&user(), &mill).unwrap().code, 404);
    assert_eq!(service.get_capability(&user(), &owned_capability).unwrap().code, 404);

    // Outside entities survive, and nothing references the removed ones
    let remaining = listed(service.list_capabilities(&user()).unwrap());
    assert_eq!(remaining, vec![outsider]);
    let process_now = service.get_process(&user(), &process).unwrap();
    assert!(tree(&process_now).ids("realizedCapabilities").is_empty());
    assert_eq!(service.repository().edge_count().unwrap(), 0);
    assert_eq!(service.repository().entity_count().unwrap(), 2);
}

#[test]
fn test_detach_keeps_owned_children() {
    let (service, enterprise) = seeded(1, 2);
    assert_eq!(service.repository().entity_count().unwrap(), 8);

    let deleted = service.delete_enterprise(&user(), &enterprise, false).unwrap();
    assert_eq!(deleted.code, 200);

    assert_eq!(service.get_enterprise(&user(), &enterprise).unwrap().code, 404);
    assert_eq!(service.repository().entity_count().unwrap(), 7);

    // The factory is now an ownerless root, still addressable by id
    let factories = listed(service.list_factories(&user()).unwrap());
    assert_eq!(factories.len(), 1);
    let factory = service.get_factory(&user(), &factories[0]).unwrap();
    assert_eq!(tree(&factory).children("machines").len(), 2);
}

#[test]
fn test_delete_missing_or_mistyped_is_not_found() {
    let (service, enterprise) = seeded(1, 1);
    let ghost = format!("{}Machine/404", common::DATASET);

    assert_eq!(service.delete_machine(&user(), &ghost, true).unwrap().code, 404);
    assert_eq!(service.bulk_delete_machine(&user(), &ghost).unwrap().code, 404);

    let result = service.delete_factory(&user(), &enterprise, true).unwrap();
    assert_eq!(result.code, 404);
    assert!(result.message.starts_with("NOT_FOUND: Factory"));
    assert_eq!(service.repository().entity_count().unwrap(), 5);
}

#[test]
fn test_bulk_matches_cascade() {
    let (standard, enterprise) = seeded(3, 4);
    let (bulk, same_enterprise) = seeded(3, 4);
    assert_eq!(enterprise, same_enterprise);

    // Link something outside the subtree into it
    for service in [&standard, &bulk] {
        let process = id_of(&service.create_process(&user(), &labelled("Assembly")).unwrap());
        let capabilities = listed(service.list_capabilities(&user()).unwrap());
        service
            .add_required_capability_to_process(&user(), &process, &capabilities[0])
            .unwrap();
    }
    assert_eq!(
        standard.repository().snapshot().unwrap(),
        bulk.repository().snapshot().unwrap()
    );

    standard.repository().reset_stats();
    bulk.repository().reset_stats();

    let a = standard.delete_enterprise(&user(), &enterprise, true).unwrap();
    let b = bulk.bulk_delete_enterprise(&user(), &enterprise).unwrap();
    assert_eq!(a, b);

    let left = standard.repository().snapshot().unwrap();
    assert_eq!(left, bulk.repository().snapshot().unwrap());
    assert_eq!(left.entities.len(), 1);
    assert!(left.edges.is_empty());

    assert!(bulk.repository().stats().round_trips < standard.repository().stats().round_trips);
}

#[test]
fn test_ownership_cycle_terminates() {
    let (service, enterprise) = seeded(1, 1);
    let machine = listed(service.list_machines(&user()).unwrap()).remove(0);

    // Corrupt the store: the machine claims to own the enterprise
    {
        let mut tx = service.repository().begin().unwrap();
        tx.add_edge(Edge::ownership(
            "machineProperties",
            EntityId::new(machine.as_str()),
            EntityId::new(enterprise.as_str()),
        ))
        .unwrap();
        tx.commit().unwrap();
    }

    let result = service.bulk_delete_enterprise(&user(), &enterprise).unwrap();
    assert_eq!(result.code, 200);
    assert_eq!(service.repository().entity_count().unwrap(), 0);
    assert_eq!(service.repository().edge_count().unwrap(), 0);
}

#[test]
fn test_deletion_is_atomic_per_call() {
    let (service, enterprise) = seeded(2, 2);
    let before = service.repository().snapshot().unwrap();

    // A denied delete never opens a transaction
    let guarded = service.with_permissions(factograph::RoleTable::new());
    let result = guarded.delete_enterprise(&user(), &enterprise, true).unwrap();
    assert_eq!(result.code, 403);
    assert_eq!(guarded.repository().snapshot().unwrap(), before);

    let tx = guarded.repository().begin().unwrap();
    assert!(tx.exists(&EntityId::new(enterprise.as_str())).unwrap());
    tx.rollback().unwrap();
}
