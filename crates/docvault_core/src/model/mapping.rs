//! Ownership graph edges between subjects and resources.
//!
//! # Invariants
//! - `Owner` outranks `Member`: every capability granted to members is also
//!   granted to owners.
//! - Mappings are immutable once written.

use crate::model::id::Id;
use serde::{Deserialize, Serialize};

/// Capability tier of a subject over a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Owner,
    Member,
}

/// Kind of resource a mapping points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Organizations,
    Documents,
    Users,
}

/// One `(subject, tier, resource)` edge. `user_id` is the subject and may
/// name an organization when an organization owns a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResourceMapping {
    pub user_id: Id,
    pub user_type: UserType,
    pub resource_type: ResourceType,
    pub resource_id: Id,
}

/// Conjunctive filter; `None` fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingFilter {
    pub user_id: Option<Id>,
    pub user_type: Option<UserType>,
    pub resource_type: Option<ResourceType>,
    pub resource_id: Option<Id>,
}

impl MappingFilter {
    pub fn matches(&self, mapping: &UserResourceMapping) -> bool {
        self.user_id.map_or(true, |id| id == mapping.user_id)
            && self.user_type.map_or(true, |kind| kind == mapping.user_type)
            && self
                .resource_type
                .map_or(true, |kind| kind == mapping.resource_type)
            && self.resource_id.map_or(true, |id| id == mapping.resource_id)
    }
}
