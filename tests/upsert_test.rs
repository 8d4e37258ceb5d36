//! Integration tests for nested create and merge-by-identity updates

mod common;

use common::{id_of, labelled, service, service_with, tree, user};
use factograph::{EngineConfig, EntityInput};
use serde_json::json;

#[test]
fn test_update_merges_scalars_only() {
    let service = service();
    let machine = id_of(
        &service
            .create_machine(
                &user(),
                &labelled("Mill")
                    .set("description", "Vertical mill")
                    .set("sourceId", "M-100"),
            )
            .unwrap(),
    );

    let updated = service
        .update_machine(&user(), &machine, &EntityInput::new().set("label", "Mill 2"))
        .unwrap();
    let root = tree(&updated);
    assert_eq!(root.field("label"), Some(&"Mill 2".into()));
    assert_eq!(root.field("description"), Some(&"Vertical mill".into()));
    assert_eq!(root.field("sourceId"), Some(&"M-100".into()));
}

#[test]
fn test_null_clears_optional_field() {
    let service = service();
    let machine = id_of(
        &service
            .create_machine(&user(), &labelled("Mill").set("description", "old"))
            .unwrap(),
    );

    let updated = service
        .update_machine(&user(), &machine, &EntityInput::new().clear("description"))
        .unwrap();
    assert!(tree(&updated).field("description").is_none());
    assert!(tree(&updated).field("label").is_some());
}

#[test]
fn test_update_missing_entity_is_not_found() {
    let service = service();
    let missing = format!("{}Machine/404", common::DATASET);
    let result = service
        .update_machine(&user(), &missing, &labelled("ghost"))
        .unwrap();
    assert_eq!(result.code, 404);
    assert!(result.message.starts_with("NOT_FOUND"));
}

#[test]
fn test_update_with_wrong_type_is_not_found() {
    let service = service();
    let capability = id_of(&service.create_capability(&user(), &labelled("Drilling")).unwrap());
    let result = service
        .update_machine(&user(), &capability, &labelled("Drill press"))
        .unwrap();
    assert_eq!(result.code, 404);
}

#[test]
fn test_nested_child_added_on_update() {
    let service = service();
    let factory = id_of(&service.create_factory(&user(), &labelled("Plant")).unwrap());

    let updated = service
        .update_factory(
            &user(),
            &factory,
            &EntityInput::new().child("machines", labelled("Saw")),
        )
        .unwrap();
    assert_eq!(tree(&updated).children("machines").len(), 1);

    // A second nested element without an id adds another child; the first stays
    let updated = service
        .update_factory(
            &user(),
            &factory,
            &EntityInput::new().child("machines", labelled("Press")),
        )
        .unwrap();
    let labels: Vec<_> = tree(&updated)
        .children("machines")
        .iter()
        .filter_map(|m| m.field("label").and_then(|v| v.as_string()))
        .collect();
    assert_eq!(labels, vec!["Saw", "Press"]);
}

#[test]
fn test_nested_update_of_foreign_child_is_ownership_violation() {
    let service = service();
    let north = service
        .create_factory(&user(), &labelled("North").child("machines", labelled("Saw")))
        .unwrap();
    let saw = tree(&north).children("machines")[0].id.to_string();
    let south = id_of(&service.create_factory(&user(), &labelled("South")).unwrap());

    let hijack = EntityInput::new().child(
        "machines",
        EntityInput::with_id(saw.as_str()).set("label", "Stolen saw"),
    );
    let result = service.update_factory(&user(), &south, &hijack).unwrap();
    assert_eq!(result.code, 422);
    assert!(result.message.starts_with("OWNERSHIP_VIOLATION"));

    let saw_now = service.get_machine(&user(), &saw).unwrap();
    assert_eq!(tree(&saw_now).field("label"), Some(&"Saw".into()));
}

#[test]
fn test_failure_deep_in_tree_rolls_back_everything() {
    let service = service();
    let missing_capability = format!("{}Capability/999", common::DATASET);
    let input = labelled("Plant").child(
        "machines",
        labelled("Mill")
            .child("machineProperties", EntityInput::new().set("value", 1i64))
            .reference("providedCapabilities", missing_capability.as_str()),
    );

    let result = service.create_factory(&user(), &input).unwrap();
    assert_eq!(result.code, 404);
    assert_eq!(service.repository().entity_count().unwrap(), 0);
    assert_eq!(service.repository().edge_count().unwrap(), 0);
    assert_eq!(service.repository().stats().rollbacks, 1);
}

#[test]
fn test_validation_errors() {
    let service = service();
    let cases = vec![
        // Unknown field
        labelled("Mill").set("colour", "red"),
        // Malformed language code
        labelled("Mill").set("labelLanguageCode", "english"),
        // Wrong scalar type
        EntityInput::new().set("label", 42i64),
        // Required field missing on a nested property
        labelled("Mill").child("machineProperties", labelled("no value")),
        // Owned field given a reference
        labelled("Mill").reference(
            "machineProperties",
            "http://factograph.io/graph/test/Property/1",
        ),
    ];

    for input in cases {
        let result = service.create_machine(&user(), &input).unwrap();
        assert_eq!(result.code, 400, "{:?}", input);
    }
    assert_eq!(service.repository().entity_count().unwrap(), 0);
}

#[test]
fn test_create_with_caller_id_is_rejected() {
    let service = service();
    let input = EntityInput::with_id(format!("{}Machine/7", common::DATASET)).set("label", "Mill");
    let result = service.create_machine(&user(), &input).unwrap();
    assert_eq!(result.code, 400);
}

#[test]
fn test_single_valued_owned_field() {
    let service = service();
    let two_locations = labelled("Plant")
        .child("location", EntityInput::new().set("city", "Bremen"))
        .child("location", EntityInput::new().set("city", "Hamburg"));
    assert_eq!(service.create_factory(&user(), &two_locations).unwrap().code, 400);

    let created = service
        .create_factory(
            &user(),
            &labelled("Plant").child("location", EntityInput::new().set("city", "Bremen")),
        )
        .unwrap();
    let factory = id_of(&created);
    let location = tree(&created).children("location")[0].id.to_string();

    // A second location without an id cannot replace the owned one
    let result = service
        .update_factory(
            &user(),
            &factory,
            &EntityInput::new().child("location", EntityInput::new().set("city", "Hamburg")),
        )
        .unwrap();
    assert_eq!(result.code, 400);

    // Updating it by id works
    let result = service
        .update_factory(
            &user(),
            &factory,
            &EntityInput::new().child(
                "location",
                EntityInput::with_id(location.as_str()).set("city", "Hamburg"),
            ),
        )
        .unwrap();
    let city = tree(&result).children("location")[0].field("city").cloned();
    assert_eq!(city, Some("Hamburg".into()));
}

#[test]
fn test_mixed_field_owns_nested_and_links_references() {
    let service = service();
    let shared = id_of(&service.create_capability(&user(), &labelled("Deburring")).unwrap());

    let created = service
        .create_machine(
            &user(),
            &labelled("Grinder")
                .child("providedCapabilities", labelled("Grinding"))
                .reference("providedCapabilities", shared.as_str()),
        )
        .unwrap();
    let machine = id_of(&created);
    assert_eq!(tree(&created).children("providedCapabilities").len(), 2);

    // Cascade removes the nested capability and only unlinks the shared one
    service.delete_machine(&user(), &machine, true).unwrap();
    let remaining = common::listed(service.list_capabilities(&user()).unwrap());
    assert_eq!(remaining, vec![shared]);
}

#[test]
fn test_reference_of_wrong_type_is_validation() {
    let service = service();
    let product = id_of(&service.create_product(&user(), &labelled("Bolt")).unwrap());
    let result = service
        .create_machine(
            &user(),
            &labelled("Mill").reference("providedCapabilities", product.as_str()),
        )
        .unwrap();
    assert_eq!(result.code, 400);
}

#[test]
fn test_null_on_shared_field_clears_links() {
    let service = service();
    let class = id_of(&service.create_product_class(&user(), &labelled("Fasteners")).unwrap());
    let product = id_of(
        &service
            .create_product(&user(), &labelled("Bolt").reference("productClasses", class.as_str()))
            .unwrap(),
    );

    let input = EntityInput::try_from(json!({"productClasses": null})).unwrap();
    let updated = service.update_product(&user(), &product, &input).unwrap();
    assert!(tree(&updated).ids("productClasses").is_empty());
    assert!(service.get_product_class(&user(), &class).unwrap().is_success());
}

#[test]
fn test_nesting_depth_limit() {
    let service = service_with(EngineConfig {
        max_nesting_depth: 2,
        ..common::config()
    });
    let input = labelled("Acme").child(
        "factories",
        labelled("Plant").child(
            "machines",
            labelled("Mill").child("providedCapabilities", labelled("Milling")),
        ),
    );
    let result = service.create_enterprise(&user(), &input).unwrap();
    assert_eq!(result.code, 400);
    assert_eq!(service.repository().entity_count().unwrap(), 0);
}

#[test]
fn test_upsert_dispatches_on_id() {
    let service = service();
    let created = service.upsert_product(&user(), &labelled("Nut")).unwrap();
    let product = id_of(&created);

    let updated = service
        .upsert_product(&user(), &EntityInput::with_id(product.as_str()).set("label", "Hex nut"))
        .unwrap();
    assert_eq!(id_of(&updated), product);
    assert_eq!(tree(&updated).field("label"), Some(&"Hex nut".into()));
    assert_eq!(service.repository().entity_count().unwrap(), 1);
}
