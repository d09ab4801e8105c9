//! Transaction-bound authorization index for documents.
//!
//! # Responsibility
//! - Decide whether a subject owns or belongs to an organization.
//! - Record and query document ownership through the relation store.
//!
//! # Invariants
//! - An index borrows exactly one in-flight transaction and cannot outlive
//!   it.
//! - Owners are validated against the directory before any mapping is
//!   written.
//! - Missing relations fail closed with `Unauthorized`.

use crate::error::{DocError, DocResult};
use crate::kv::Tx;
use crate::model::id::Id;
use crate::model::mapping::{MappingFilter, ResourceType, UserResourceMapping, UserType};
use crate::repo::directory_repo::Directory;
use crate::repo::mapping_repo::RelationStore;
use log::debug;

/// Owner kind string for organizations.
pub const OWNER_KIND_ORG: &str = "org";
/// Owner kind string for users.
pub const OWNER_KIND_USER: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OwnerKind {
    Organization,
    User,
}

fn parse_owner_kind(value: &str) -> DocResult<OwnerKind> {
    match value {
        OWNER_KIND_ORG | "organization" => Ok(OwnerKind::Organization),
        OWNER_KIND_USER => Ok(OwnerKind::User),
        other => Err(DocError::Internal(format!("unknown owner type `{other}`"))),
    }
}

/// Authorization view over one transaction.
///
/// Built by the document store for each operation and handed to create and
/// find options.
pub struct DocumentIndex<'a> {
    tx: &'a dyn Tx,
    relations: &'a dyn RelationStore,
    directory: &'a dyn Directory,
}

impl<'a> DocumentIndex<'a> {
    pub fn new(
        tx: &'a dyn Tx,
        relations: &'a dyn RelationStore,
        directory: &'a dyn Directory,
    ) -> Self {
        Self {
            tx,
            relations,
            directory,
        }
    }

    /// Records `owner_id` as an owner of `doc_id`.
    ///
    /// # Errors
    /// - `Internal` for an unrecognized `owner_kind`; nothing is written.
    /// - `NotFound` when the owner does not exist in the directory.
    pub fn add_owner(&self, doc_id: Id, owner_kind: &str, owner_id: Id) -> DocResult<()> {
        self.owner_exists(parse_owner_kind(owner_kind)?, owner_id)?;

        self.relations.create_mapping(
            self.tx,
            &UserResourceMapping {
                user_id: owner_id,
                user_type: UserType::Owner,
                resource_type: ResourceType::Documents,
                resource_id: doc_id,
            },
        )
    }

    /// Ids of every document `owner_id` owns directly.
    pub fn documents_owned_by(&self, owner_kind: &str, owner_id: Id) -> DocResult<Vec<Id>> {
        self.owner_exists(parse_owner_kind(owner_kind)?, owner_id)?;

        let mappings = self.relations.find_mappings(
            self.tx,
            &MappingFilter {
                user_id: Some(owner_id),
                user_type: Some(UserType::Owner),
                resource_type: Some(ResourceType::Documents),
                resource_id: None,
            },
        )?;
        Ok(mappings.into_iter().map(|m| m.resource_id).collect())
    }

    /// Drops every ownership mapping of `doc_id`; used when the document is
    /// deleted in the same transaction.
    pub fn remove_owners(&self, doc_id: Id) -> DocResult<usize> {
        self.relations.delete_mappings(
            self.tx,
            &MappingFilter {
                user_id: None,
                user_type: None,
                resource_type: Some(ResourceType::Documents),
                resource_id: Some(doc_id),
            },
        )
    }

    /// Subjects (users or organizations) that own `doc_id`.
    pub fn owners_of(&self, doc_id: Id) -> DocResult<Vec<Id>> {
        let mappings = self.relations.find_mappings(
            self.tx,
            &MappingFilter {
                user_id: None,
                user_type: Some(UserType::Owner),
                resource_type: Some(ResourceType::Documents),
                resource_id: Some(doc_id),
            },
        )?;
        Ok(mappings.into_iter().map(|m| m.user_id).collect())
    }

    /// Organizations `user_id` owns.
    pub fn organizations_of(&self, user_id: Id) -> DocResult<Vec<Id>> {
        let mappings = self.relations.find_mappings(
            self.tx,
            &MappingFilter {
                user_id: Some(user_id),
                user_type: Some(UserType::Owner),
                resource_type: Some(ResourceType::Organizations),
                resource_id: None,
            },
        )?;
        Ok(mappings.into_iter().map(|m| m.resource_id).collect())
    }

    pub fn is_org_owner(&self, user_id: Id, org_id: Id) -> DocResult<()> {
        let tiers = self.org_tiers(user_id, org_id)?;
        if tiers.contains(&UserType::Owner) {
            return Ok(());
        }
        debug!(
            "event=authz_check module=authz status=denied required=owner user_id={user_id} org_id={org_id}"
        );
        Err(DocError::Unauthorized("user is not org owner".to_string()))
    }

    /// Owners count as members.
    pub fn is_org_member(&self, user_id: Id, org_id: Id) -> DocResult<()> {
        let tiers = self.org_tiers(user_id, org_id)?;
        if tiers
            .iter()
            .any(|tier| matches!(tier, UserType::Owner | UserType::Member))
        {
            return Ok(());
        }
        debug!(
            "event=authz_check module=authz status=denied required=member user_id={user_id} org_id={org_id}"
        );
        Err(DocError::Unauthorized("user is not org member".to_string()))
    }

    pub fn resolve_organization_id(&self, name: &str) -> DocResult<Id> {
        Ok(self.directory.find_organization_by_name(self.tx, name)?.id)
    }

    fn org_tiers(&self, user_id: Id, org_id: Id) -> DocResult<Vec<UserType>> {
        let mappings = self.relations.find_mappings(
            self.tx,
            &MappingFilter {
                user_id: Some(user_id),
                user_type: None,
                resource_type: Some(ResourceType::Organizations),
                resource_id: Some(org_id),
            },
        )?;
        Ok(mappings.into_iter().map(|m| m.user_type).collect())
    }

    fn owner_exists(&self, kind: OwnerKind, owner_id: Id) -> DocResult<()> {
        match kind {
            OwnerKind::Organization => {
                self.directory.find_organization_by_id(self.tx, owner_id)?;
            }
            OwnerKind::User => {
                self.directory.find_user_by_id(self.tx, owner_id)?;
            }
        }
        Ok(())
    }
}
