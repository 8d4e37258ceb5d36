//! Shared fixtures for integration tests

#![allow(dead_code)]

use factograph::{
    EngineConfig, EntityInput, EntityTree, IdStrategy, MemoryRepository, MutationResult,
    MutationService, Principal,
};

pub const DATASET: &str = "http://factograph.io/graph/test/";

pub fn config() -> EngineConfig {
    EngineConfig {
        dataset_base: DATASET.to_string(),
        id_strategy: IdStrategy::Sequential,
        bulk_batch_size: 4,
        ..EngineConfig::default()
    }
}

pub fn service() -> MutationService<MemoryRepository> {
    service_with(config())
}

pub fn service_with(config: EngineConfig) -> MutationService<MemoryRepository> {
    init_tracing();
    MutationService::new(MemoryRepository::new(), config).unwrap()
}

pub fn user() -> Principal {
    Principal::anonymous()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Root tree of a successful envelope
pub fn tree(result: &MutationResult) -> &EntityTree {
    assert_eq!(result.code, 200, "unexpected failure: {}", result.message);
    result.entity_payload().expect("entity payload")
}

/// Id of the root of a successful envelope
pub fn id_of(result: &MutationResult) -> String {
    tree(result).id.to_string()
}

pub fn labelled(label: &str) -> EntityInput {
    EntityInput::new().set("label", label)
}

/// Ids listed for a type
pub fn listed(list: MutationResult) -> Vec<String> {
    assert!(list.is_success(), "{}", list.message);
    list.entities_payload()
        .expect("entities payload")
        .iter()
        .map(|tree| tree.id.to_string())
        .collect()
}
