//! Mutation error taxonomy

use crate::identity::IdentityError;
use crate::repository::RepositoryError;
use crate::schema::SchemaError;
use thiserror::Error;

/// Errors raised by the mutation engines
///
/// Every variant except [`MutationError::Repository`] is a domain failure that is
/// reported inside a result envelope. Repository failures propagate to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    OwnershipViolation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl MutationError {
    /// Status code reported in the result envelope
    pub fn code(&self) -> u16 {
        match self {
            MutationError::NotFound(_) => 404,
            MutationError::Validation(_) => 400,
            MutationError::OwnershipViolation(_) => 422,
            MutationError::Conflict(_) => 409,
            MutationError::Forbidden(_) => 403,
            MutationError::Repository(_) => 500,
        }
    }

    /// Taxonomy name
    pub fn kind(&self) -> &'static str {
        match self {
            MutationError::NotFound(_) => "NOT_FOUND",
            MutationError::Validation(_) => "VALIDATION",
            MutationError::OwnershipViolation(_) => "OWNERSHIP_VIOLATION",
            MutationError::Conflict(_) => "CONFLICT",
            MutationError::Forbidden(_) => "FORBIDDEN",
            MutationError::Repository(_) => "REPOSITORY",
        }
    }

    pub fn is_domain(&self) -> bool {
        !matches!(self, MutationError::Repository(_))
    }
}

impl From<IdentityError> for MutationError {
    fn from(err: IdentityError) -> Self {
        MutationError::Validation(err.to_string())
    }
}

impl From<SchemaError> for MutationError {
    fn from(err: SchemaError) -> Self {
        MutationError::Validation(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, MutationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EntityType;

    #[test]
    fn test_codes() {
        assert_eq!(MutationError::NotFound("x".into()).code(), 404);
        assert_eq!(MutationError::Validation("x".into()).code(), 400);
        assert_eq!(MutationError::OwnershipViolation("x".into()).code(), 422);
        assert_eq!(MutationError::Conflict("x".into()).code(), 409);
        assert_eq!(MutationError::Forbidden("x".into()).code(), 403);
    }

    #[test]
    fn test_conversions() {
        let err: MutationError = SchemaError::UndeclaredType(EntityType::Machine).into();
        assert_eq!(err.kind(), "VALIDATION");
        assert!(err.is_domain());

        let err: MutationError = RepositoryError::Unavailable("down".into()).into();
        assert_eq!(err.kind(), "REPOSITORY");
        assert!(!err.is_domain());
        assert_eq!(err.to_string(), "Repository error: Repository unavailable: down");
    }
}
