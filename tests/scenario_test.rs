//! End-to-end scenarios through the typed API

mod common;

use common::{id_of, labelled, listed, service, tree, user};
use factograph::EntityInput;
use serde_json::{json, Value};

/// Drop generated `id` and `type` keys so a projection can be compared with its input
fn shape(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| key != "id" && key != "type")
                .map(|(key, value)| (key, shape(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(shape).collect()),
        other => other,
    }
}

#[test]
fn test_capability_lifecycle_with_semantic_reference() {
    let service = service();
    let input = EntityInput::try_from(json!({
        "label": "Welding",
        "labelLanguageCode": "en",
        "semanticReferences": [{
            "label": "ECLASS welding",
            "sourceUri": "https://eclass.eu/0173-1#02-AAO677"
        }]
    }))
    .unwrap();

    let created = service.create_capability(&user(), &input).unwrap();
    let capability = id_of(&created);
    assert_eq!(tree(&created).children("semanticReferences").len(), 1);

    let before = listed(service.list_capabilities(&user()).unwrap());
    assert!(before.contains(&capability));

    let deleted = service.delete_capability(&user(), &capability, true).unwrap();
    assert_eq!(deleted.code, 200);
    assert_eq!(deleted.message, format!("Deleted {}", capability));

    let after = listed(service.list_capabilities(&user()).unwrap());
    assert!(!after.contains(&capability));
    // The owned reference went with it
    assert!(listed(service.list_semantic_references(&user()).unwrap()).is_empty());
    assert_eq!(service.repository().entity_count().unwrap(), 0);
}

#[test]
fn test_add_and_remove_capability_on_machine() {
    let service = service();
    let machine = id_of(&service.create_machine(&user(), &labelled("Press")).unwrap());
    let capability = id_of(&service.create_capability(&user(), &labelled("Pressing")).unwrap());

    let linked = service
        .add_capability_to_machine(&user(), &machine, &capability)
        .unwrap();
    let ids: Vec<String> = tree(&linked)
        .ids("providedCapabilities")
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(ids, vec![capability.clone()]);

    let unlinked = service
        .remove_capability_from_machine(&user(), &machine, &capability)
        .unwrap();
    assert!(tree(&unlinked).ids("providedCapabilities").is_empty());

    // The capability itself is untouched
    let fetched = service.get_capability(&user(), &capability).unwrap();
    assert_eq!(tree(&fetched).field("label"), Some(&"Pressing".into()));
}

#[test]
fn test_bulk_enterprise_round_trip_and_targeted_update() {
    let service = service();
    let document = json!({
        "label": "Acme Manufacturing",
        "description": "Precision parts",
        "descriptionLanguageCode": "en",
        "location": {"city": "Kassel", "country": "DE", "latitude": 51.31, "longitude": 9.49},
        "factories": [{
            "label": "Plant North",
            "machines": [{
                "label": "5-axis mill",
                "providedCapabilities": [{
                    "label": "Milling",
                    "properties": [{"label": "Max spindle speed", "value": 24000, "unit": "rpm"}]
                }],
                "machineProperties": [
                    {"label": "Weight", "value": 3.5, "unit": "t"},
                    {"label": "Axes", "value": 5}
                ]
            }, {
                "label": "Lathe"
            }]
        }]
    });

    let created = service
        .create_enterprise(&user(), &EntityInput::try_from(document.clone()).unwrap())
        .unwrap();
    let enterprise = id_of(&created);

    // Re-query returns the same shape and values, with every node identified
    let fetched = service.get_enterprise(&user(), &enterprise).unwrap();
    let root = tree(&fetched);
    assert_eq!(shape(root.to_json()), document);
    assert_eq!(service.repository().entity_count().unwrap(), 9);

    let factory = root.children("factories")[0];
    let mill = factory.children("machines")[0];
    let lathe = factory.children("machines")[1];
    assert!(mill.id.as_str().starts_with(common::DATASET));

    // Address only the mill through its owners
    let update = EntityInput::try_from(json!({
        "id": enterprise.as_str(),
        "factories": [{
            "id": factory.id.as_str(),
            "machines": [{"id": mill.id.as_str(), "label": "5-axis mill (retrofitted)"}]
        }]
    }))
    .unwrap();
    let updated = service.upsert_enterprise(&user(), &update).unwrap();
    assert_eq!(updated.code, 200);

    let after = service.get_enterprise(&user(), &enterprise).unwrap();
    let mut expected = document.clone();
    expected["factories"][0]["machines"][0]["label"] = json!("5-axis mill (retrofitted)");
    assert_eq!(shape(tree(&after).to_json()), expected);

    let lathe_after = service.get_machine(&user(), lathe.id.as_str()).unwrap();
    assert_eq!(tree(&lathe_after).field("label"), Some(&"Lathe".into()));
    assert_eq!(service.repository().entity_count().unwrap(), 9);
}
