//! Property-based tests over random inputs and tree shapes

mod common;

use common::{id_of, labelled, listed, service, tree, user};
use factograph::{EntityId, EntityInput, EntityType, PropertyValue, ScalarType};
use proptest::prelude::*;
use std::collections::HashSet;

/// Shape of a generated enterprise: per factory, per machine, whether the
/// machine owns a capability and whether it links the shared one
type Shape = Vec<Vec<(bool, bool)>>;

fn shape_strategy() -> impl Strategy<Value = Shape> {
    prop::collection::vec(
        prop::collection::vec((any::<bool>(), any::<bool>()), 0..4),
        0..4,
    )
}

fn enterprise_input(shape: &Shape, shared: &str) -> EntityInput {
    let mut enterprise = labelled("Generated");
    for (f, machines) in shape.iter().enumerate() {
        let mut factory = labelled(&format!("F{}", f));
        for (m, (owns, links)) in machines.iter().enumerate() {
            let mut machine = labelled(&format!("M{}.{}", f, m))
                .child("machineProperties", EntityInput::new().set("value", m as i64));
            if *owns {
                machine = machine.child("providedCapabilities", labelled("Owned"));
            }
            if *links {
                machine = machine.reference("providedCapabilities", shared);
            }
            factory = factory.child("machines", machine);
        }
        enterprise = enterprise.child("factories", factory);
    }
    enterprise
}

/// A value of the given scalar type built from generated seeds
fn scalar_value(
    scalar_type: ScalarType,
    text: &str,
    number: i32,
    flag: bool,
    language: &str,
) -> PropertyValue {
    match scalar_type {
        ScalarType::String => PropertyValue::String(text.to_string()),
        ScalarType::LanguageCode => PropertyValue::String(language.to_string()),
        ScalarType::Number => PropertyValue::Float(f64::from(number) / 4.0),
        ScalarType::Boolean => PropertyValue::Boolean(flag),
        ScalarType::Any if flag => PropertyValue::String(text.to_string()),
        ScalarType::Any => PropertyValue::Integer(i64::from(number)),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Scalars written on create are read back unchanged, for every entity type
    #[test]
    fn prop_scalar_round_trip(
        entity_type in prop::sample::select(EntityType::ALL.to_vec()),
        text in "[A-Za-z0-9 ]{1,24}",
        number in any::<i32>(),
        flag in any::<bool>(),
        language in prop::sample::select(vec!["en", "de", "de-CH", "fra"]),
        omitted in any::<u16>(),
    ) {
        let service = service();
        let schema = service.registry().get(entity_type).unwrap();

        let mut input = EntityInput::new();
        let mut expected = Vec::new();
        for (i, (name, def)) in schema.scalars().enumerate() {
            // Optional fields are left out at random, required ones never
            if !def.required && (omitted >> (i % 16)) & 1 == 1 {
                expected.push((name.to_string(), None));
                continue;
            }
            let value = scalar_value(def.scalar_type, &text, number, flag, language);
            input = input.set(name, value.clone());
            expected.push((name.to_string(), Some(value)));
        }

        let id = id_of(&service.create(&user(), entity_type, &input).unwrap());
        let fetched = service.get(&user(), entity_type, &id).unwrap();
        let root = tree(&fetched);
        for (name, value) in &expected {
            prop_assert_eq!(root.field(name), value.as_ref(), "{} on {}", name, entity_type);
        }
    }

    /// An update touching one field leaves every other field as it was
    #[test]
    fn prop_merge_only_update(
        original in "[a-z]{1,12}",
        replacement in "[a-z]{1,12}",
        description in "[a-z ]{1,30}",
    ) {
        let service = service();
        let id = id_of(
            &service
                .create_product(
                    &user(),
                    &labelled(&original).set("description", description.as_str()),
                )
                .unwrap(),
        );
        let updated = service
            .update_product(&user(), &id, &labelled(&replacement))
            .unwrap();
        let root = tree(&updated);
        let text = |name: &str| root.field(name).and_then(|v| v.as_string());
        prop_assert_eq!(text("label"), Some(replacement.as_str()));
        prop_assert_eq!(text("description"), Some(description.as_str()));
    }

    /// Association edits behave like set insert and remove
    #[test]
    fn prop_association_edits_are_set_operations(
        ops in prop::collection::vec((any::<bool>(), 0usize..3, 0usize..3), 1..24),
    ) {
        let service = service();
        let machines: Vec<String> = (0..3)
            .map(|i| {
                let created = service.create_machine(&user(), &labelled(&format!("M{}", i)));
                id_of(&created.unwrap())
            })
            .collect();
        let capabilities: Vec<String> = (0..3)
            .map(|i| {
                let created = service.create_capability(&user(), &labelled(&format!("C{}", i)));
                id_of(&created.unwrap())
            })
            .collect();

        let mut model: HashSet<(usize, usize)> = HashSet::new();
        for (add, m, c) in ops {
            let result = if add {
                model.insert((m, c));
                service.add_capability_to_machine(&user(), &machines[m], &capabilities[c])
            } else {
                model.remove(&(m, c));
                service.remove_capability_from_machine(&user(), &machines[m], &capabilities[c])
            }
            .unwrap();
            prop_assert_eq!(result.code, 200);
        }

        prop_assert_eq!(service.repository().edge_count().unwrap(), model.len());
        for (m, machine) in machines.iter().enumerate() {
            let fetched = service.get_machine(&user(), machine).unwrap();
            let linked: HashSet<String> = tree(&fetched)
                .ids("providedCapabilities")
                .into_iter()
                .map(|id| id.to_string())
                .collect();
            let expected: HashSet<String> = model
                .iter()
                .filter(|(mm, _)| *mm == m)
                .map(|(_, c)| capabilities[*c].clone())
                .collect();
            prop_assert_eq!(linked, expected);
        }
    }

    /// Cascade removes the whole owned subtree and every edge into it, and bulk
    /// deletion ends in the same state
    #[test]
    fn prop_cascade_complete_and_bulk_equivalent(shape in shape_strategy()) {
        let standard = service();
        let bulk = service();

        let mut seeded = Vec::new();
        for service in [&standard, &bulk] {
            let shared = id_of(&service.create_capability(&user(), &labelled("Shared")).unwrap());
            let created = service
                .create_enterprise(&user(), &enterprise_input(&shape, &shared))
                .unwrap();
            seeded.push((shared, id_of(&created)));
        }
        prop_assert_eq!(&seeded[0], &seeded[1]);
        let (shared, root) = seeded.swap_remove(0);

        let before = standard.repository().snapshot().unwrap();
        let subtree: Vec<EntityId> = before
            .entities
            .keys()
            .filter(|id| id.as_str() != shared)
            .cloned()
            .collect();

        let a = standard.delete_enterprise(&user(), &root, true).unwrap();
        let b = bulk.bulk_delete_enterprise(&user(), &root).unwrap();
        prop_assert_eq!(&a, &b);

        let after = standard.repository().snapshot().unwrap();
        prop_assert_eq!(&after, &bulk.repository().snapshot().unwrap());

        // Only the shared capability survives, unreferenced
        prop_assert_eq!(after.entities.len(), 1);
        prop_assert!(after.edges.is_empty());
        for id in &subtree {
            prop_assert!(!after.references(id));
        }
        let remaining = listed(standard.list_capabilities(&user()).unwrap());
        prop_assert_eq!(remaining.len(), 1);
    }
}
