//! Directed relationship edges between entities

use super::types::{EntityId, Predicate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether an edge binds the target's lifetime to the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum EdgeKind {
    /// Composition edge: the target is owned by the source and eligible for cascade
    Ownership,
    /// Non-owning many-to-many link with an independent target lifetime
    Association,
}

/// Identity of an edge: at most one edge exists per (predicate, source, target)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EdgeKey {
    pub predicate: Predicate,
    pub source: EntityId,
    pub target: EntityId,
}

impl EdgeKey {
    pub fn new(predicate: impl Into<Predicate>, source: EntityId, target: EntityId) -> Self {
        EdgeKey {
            predicate: predicate.into(),
            source,
            target,
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.predicate, self.target)
    }
}

/// A directed edge in the domain graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Relation the edge belongs to
    pub predicate: Predicate,

    /// Source entity (edge goes FROM this entity)
    pub source: EntityId,

    /// Target entity (edge goes TO this entity)
    pub target: EntityId,

    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(
        predicate: impl Into<Predicate>,
        source: EntityId,
        target: EntityId,
        kind: EdgeKind,
    ) -> Self {
        Edge {
            predicate: predicate.into(),
            source,
            target,
            kind,
        }
    }

    /// Create an ownership (composition) edge
    pub fn ownership(predicate: impl Into<Predicate>, owner: EntityId, child: EntityId) -> Self {
        Self::new(predicate, owner, child, EdgeKind::Ownership)
    }

    /// Create an association edge
    pub fn association(
        predicate: impl Into<Predicate>,
        source: EntityId,
        target: EntityId,
    ) -> Self {
        Self::new(predicate, source, target, EdgeKind::Association)
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            predicate: self.predicate.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
        }
    }

    pub fn is_ownership(&self) -> bool {
        self.kind == EdgeKind::Ownership
    }

    /// Check if this edge touches an entity at either end
    pub fn touches(&self, id: &EntityId) -> bool {
        &self.source == id || &self.target == id
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.kind {
            EdgeKind::Ownership => "owns",
            EdgeKind::Association => "links",
        };
        write!(
            f,
            "{} -[{} {}]-> {}",
            self.source, marker, self.predicate, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_constructors() {
        let machine = EntityId::new("urn:m");
        let capability = EntityId::new("urn:c");

        let owned = Edge::ownership("providedCapabilities", machine.clone(), capability.clone());
        assert!(owned.is_ownership());

        let linked = Edge::association("providedCapabilities", machine.clone(), capability.clone());
        assert!(!linked.is_ownership());

        // Same identity regardless of kind
        assert_eq!(owned.key(), linked.key());
        assert!(owned.touches(&machine));
        assert!(owned.touches(&capability));
        assert!(!owned.touches(&EntityId::new("urn:other")));
    }

    #[test]
    fn test_display() {
        let edge = Edge::association("usingProcesses", "urn:hr".into(), "urn:p".into());
        assert_eq!(format!("{}", edge), "urn:hr -[links usingProcesses]-> urn:p");
        assert_eq!(format!("{}", edge.key()), "urn:hr -[usingProcesses]-> urn:p");
    }
}
