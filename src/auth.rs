//! Permission hook
//!
//! The engine asks a [`PermissionHook`] before every operation and never
//! evaluates policy itself. Principals are resolved by the caller.

use crate::graph::{EntityId, EntityType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject: String,
    pub roles: BTreeSet<String>,
}

impl Principal {
    pub fn new(subject: impl Into<String>) -> Self {
        Principal {
            subject: subject.into(),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn anonymous() -> Self {
        Self::new("anonymous")
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Create,
    Update,
    Delete,
    Link,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::Read => "read",
            Permission::Create => "create",
            Permission::Update => "update",
            Permission::Delete => "delete",
            Permission::Link => "link",
        };
        f.write_str(name)
    }
}

/// What an operation acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRef {
    pub entity_type: Option<EntityType>,
    pub id: Option<EntityId>,
}

impl TargetRef {
    pub fn of_type(entity_type: EntityType) -> Self {
        TargetRef {
            entity_type: Some(entity_type),
            id: None,
        }
    }

    pub fn entity(entity_type: Option<EntityType>, id: EntityId) -> Self {
        TargetRef {
            entity_type,
            id: Some(id),
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.entity_type, &self.id) {
            (Some(t), Some(id)) => write!(f, "{} {}", t, id),
            (Some(t), None) => write!(f, "{}", t),
            (None, Some(id)) => write!(f, "{}", id),
            (None, None) => f.write_str("graph"),
        }
    }
}

pub trait PermissionHook: Send + Sync {
    fn has_permission(
        &self,
        principal: &Principal,
        target: &TargetRef,
        permission: Permission,
    ) -> bool;
}

/// Permits everything. A placeholder for deployments without a policy engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionHook for AllowAll {
    fn has_permission(&self, _: &Principal, _: &TargetRef, _: Permission) -> bool {
        true
    }
}

/// Role to permission mapping
#[derive(Debug, Default, Clone)]
pub struct RoleTable {
    grants: HashMap<String, HashSet<Permission>>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, role: impl Into<String>, permissions: &[Permission]) -> Self {
        self.grants
            .entry(role.into())
            .or_default()
            .extend(permissions.iter().copied());
        self
    }
}

impl From<HashMap<String, Vec<Permission>>> for RoleTable {
    fn from(roles: HashMap<String, Vec<Permission>>) -> Self {
        roles
            .into_iter()
            .fold(RoleTable::new(), |table, (role, permissions)| {
                table.grant(role, &permissions)
            })
    }
}

impl PermissionHook for RoleTable {
    fn has_permission(&self, principal: &Principal, _: &TargetRef, permission: Permission) -> bool {
        principal.roles.iter().any(|role| {
            self.grants
                .get(role)
                .map_or(false, |granted| granted.contains(&permission))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let target = TargetRef::of_type(EntityType::Machine);
        assert!(AllowAll.has_permission(&Principal::anonymous(), &target, Permission::Delete));
    }

    #[test]
    fn test_role_table() {
        let table = RoleTable::new()
            .grant("viewer", &[Permission::Read])
            .grant("editor", &[Permission::Read, Permission::Create, Permission::Update]);
        let target = TargetRef::entity(Some(EntityType::Factory), EntityId::new("urn:f"));

        let viewer = Principal::new("ada").with_role("viewer");
        assert!(table.has_permission(&viewer, &target, Permission::Read));
        assert!(!table.has_permission(&viewer, &target, Permission::Create));

        let editor = Principal::new("lin").with_role("viewer").with_role("editor");
        assert!(table.has_permission(&editor, &target, Permission::Update));
        assert!(!table.has_permission(&editor, &target, Permission::Delete));

        assert!(!table.has_permission(&Principal::anonymous(), &target, Permission::Read));
    }

    #[test]
    fn test_role_table_from_map() {
        let mut roles = HashMap::new();
        roles.insert("admin".to_string(), vec![Permission::Delete, Permission::Link]);
        let table = RoleTable::from(roles);

        let admin = Principal::new("root").with_role("admin");
        let process = TargetRef::of_type(EntityType::Process);
        assert!(table.has_permission(&admin, &process, Permission::Link));
    }

    #[test]
    fn test_target_display() {
        let target = TargetRef::entity(Some(EntityType::Machine), EntityId::new("urn:m"));
        assert_eq!(target.to_string(), "Machine urn:m");
        assert_eq!(TargetRef::of_type(EntityType::Product).to_string(), "Product");
    }
}
