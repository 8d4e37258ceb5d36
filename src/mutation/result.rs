//! Mutation result envelope

use crate::error::{EngineResult, MutationError};
use crate::graph::EntityId;
use crate::query::EntityTree;
use crate::repository::RepositoryError;
use serde::Serialize;

pub const SUCCESS_CODE: u16 = 200;
pub const SUCCESS_MESSAGE: &str = "Success";

/// Entity or entity list carried by an envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Entity(EntityTree),
    Entities(Vec<EntityTree>),
}

/// Uniform result of every engine call: `{code, message, payload?}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationResult {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl MutationResult {
    pub fn success() -> Self {
        MutationResult {
            code: SUCCESS_CODE,
            message: SUCCESS_MESSAGE.to_string(),
            payload: None,
        }
    }

    pub fn entity(tree: EntityTree) -> Self {
        MutationResult {
            payload: Some(Payload::Entity(tree)),
            ..Self::success()
        }
    }

    pub fn entities(trees: Vec<EntityTree>) -> Self {
        MutationResult {
            payload: Some(Payload::Entities(trees)),
            ..Self::success()
        }
    }

    pub fn deleted(id: &EntityId) -> Self {
        MutationResult {
            code: SUCCESS_CODE,
            message: format!("Deleted {}", id),
            payload: None,
        }
    }

    /// Envelope for a domain failure
    pub fn failure(err: &MutationError) -> Self {
        MutationResult {
            code: err.code(),
            message: format!("{}: {}", err.kind(), err),
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    pub fn entity_payload(&self) -> Option<&EntityTree> {
        match &self.payload {
            Some(Payload::Entity(tree)) => Some(tree),
            _ => None,
        }
    }

    pub fn entities_payload(&self) -> Option<&[EntityTree]> {
        match &self.payload {
            Some(Payload::Entities(trees)) => Some(trees),
            _ => None,
        }
    }

    /// Identifier of the entity payload
    pub fn id(&self) -> Option<&EntityId> {
        self.entity_payload().map(|tree| &tree.id)
    }
}

/// Wrap an engine outcome. Domain failures become envelopes; repository
/// failures are returned as errors.
pub fn wrap<T>(
    outcome: EngineResult<T>,
    on_success: impl FnOnce(T) -> MutationResult,
) -> Result<MutationResult, RepositoryError> {
    match outcome {
        Ok(value) => Ok(on_success(value)),
        Err(MutationError::Repository(err)) => Err(err),
        Err(err) => Ok(MutationResult::failure(&err)),
    }
}
