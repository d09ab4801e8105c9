//! Create and find predicates for document store calls.
//!
//! # Responsibility
//! - Register ownership when a document is created ([`CreateOption`]).
//! - Resolve the ids a caller may read or delete ([`FindOption`]).
//!
//! # Invariants
//! - Options are plain values; applying one never mutates it, so a value
//!   can be reused across calls.
//! - A failing option fails the whole store call.
//! - The union of several find options is deduplicated, keeping the order in
//!   which ids were first produced.

use crate::authz::index::{DocumentIndex, OWNER_KIND_ORG, OWNER_KIND_USER};
use crate::error::{DocError, DocResult, ErrorKind};
use crate::model::id::Id;
use std::collections::HashSet;

/// Ownership rule applied to a freshly created document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOption {
    /// Organization becomes an owner; no actor check.
    WithOrg { org: String },
    /// As `WithOrg`, but `actor` must own the organization.
    AuthorizedWithOrg { actor: Id, org: String },
}

impl CreateOption {
    pub fn apply(&self, index: &DocumentIndex<'_>, doc_id: Id) -> DocResult<()> {
        match self {
            Self::WithOrg { org } => {
                let org_id = index.resolve_organization_id(org)?;
                index.add_owner(doc_id, OWNER_KIND_ORG, org_id)
            }
            Self::AuthorizedWithOrg { actor, org } => {
                let org_id = index.resolve_organization_id(org)?;
                index.is_org_owner(*actor, org_id)?;
                index.add_owner(doc_id, OWNER_KIND_ORG, org_id)
            }
        }
    }
}

/// Rule producing the document ids a call operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindOption {
    /// Documents owned by the organization; no actor check.
    WhereOrg { org: String },
    /// As `WhereOrg`, but `actor` must be at least a member.
    AuthorizedWhereOrg { actor: Id, org: String },
    /// Documents `actor` owns plus documents of every organization `actor`
    /// owns.
    AuthorizedWhere { actor: Id },
    /// Exactly this id, unchecked.
    WhereId(Id),
    /// This id, if `actor` owns one of the organizations owning it.
    AuthorizedWhereId { actor: Id, id: Id },
}

impl FindOption {
    pub fn apply(&self, index: &DocumentIndex<'_>) -> DocResult<Vec<Id>> {
        match self {
            Self::WhereOrg { org } => {
                let org_id = index.resolve_organization_id(org)?;
                index.documents_owned_by(OWNER_KIND_ORG, org_id)
            }
            Self::AuthorizedWhereOrg { actor, org } => {
                let org_id = index.resolve_organization_id(org)?;
                index.is_org_member(*actor, org_id)?;
                index.documents_owned_by(OWNER_KIND_ORG, org_id)
            }
            Self::AuthorizedWhere { actor } => {
                let mut ids = index.documents_owned_by(OWNER_KIND_USER, *actor)?;
                for org_id in index.organizations_of(*actor)? {
                    ids.extend(index.documents_owned_by(OWNER_KIND_ORG, org_id)?);
                }
                Ok(ids)
            }
            Self::WhereId(id) => Ok(vec![*id]),
            Self::AuthorizedWhereId { actor, id } => {
                for owner_id in index.owners_of(*id)? {
                    match index.is_org_owner(*actor, owner_id) {
                        Ok(()) => return Ok(vec![*id]),
                        Err(err) if err.kind() == ErrorKind::Unauthorized => continue,
                        Err(err) => return Err(err),
                    }
                }
                Err(DocError::Unauthorized(format!(
                    "actor cannot access document {id}"
                )))
            }
        }
    }
}

/// Applies `options` in order and returns the deduplicated union.
pub fn resolve_ids(index: &DocumentIndex<'_>, options: &[FindOption]) -> DocResult<Vec<Id>> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for option in options {
        for id in option.apply(index)? {
            if seen.insert(id) {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}

pub fn with_org(org: impl Into<String>) -> CreateOption {
    CreateOption::WithOrg { org: org.into() }
}

pub fn authorized_with_org(actor: Id, org: impl Into<String>) -> CreateOption {
    CreateOption::AuthorizedWithOrg {
        actor,
        org: org.into(),
    }
}

pub fn where_org(org: impl Into<String>) -> FindOption {
    FindOption::WhereOrg { org: org.into() }
}

pub fn authorized_where_org(actor: Id, org: impl Into<String>) -> FindOption {
    FindOption::AuthorizedWhereOrg {
        actor,
        org: org.into(),
    }
}

pub fn authorized_where(actor: Id) -> FindOption {
    FindOption::AuthorizedWhere { actor }
}

pub fn where_id(id: Id) -> FindOption {
    FindOption::WhereId(id)
}

pub fn authorized_where_id(actor: Id, id: Id) -> FindOption {
    FindOption::AuthorizedWhereId { actor, id }
}
