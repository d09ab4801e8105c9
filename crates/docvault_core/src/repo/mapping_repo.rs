//! Relation store for ownership mappings.
//!
//! # Responsibility
//! - Persist `UserResourceMapping` edges and answer filtered lookups.
//!
//! # Invariants
//! - At most one mapping exists per `(resource, subject)` pair.
//! - The store does not validate subjects; callers check the directory
//!   before writing.

use crate::error::{DocError, DocResult};
use crate::kv::Tx;
use crate::model::id::{Id, ID_ENCODED_LEN};
use crate::model::mapping::{MappingFilter, UserResourceMapping};

const MAPPINGS_BUCKET: &[u8] = b"userresourcemappingsv1";

/// Persistence for ownership-graph edges, bound to the caller's transaction.
pub trait RelationStore {
    /// Fails with `Conflict` when the pair is already mapped.
    fn create_mapping(&self, tx: &dyn Tx, mapping: &UserResourceMapping) -> DocResult<()>;

    fn find_mappings(
        &self,
        tx: &dyn Tx,
        filter: &MappingFilter,
    ) -> DocResult<Vec<UserResourceMapping>>;

    /// Removes every mapping matching `filter`; returns how many were removed.
    fn delete_mappings(&self, tx: &dyn Tx, filter: &MappingFilter) -> DocResult<usize>;
}

/// Relation store kept in the `userresourcemappingsv1` bucket.
///
/// Keys are `resource_id ++ user_id`, so the entries of one resource are
/// adjacent in cursor order.
#[derive(Debug, Clone, Copy, Default)]
pub struct KvRelationStore;

impl RelationStore for KvRelationStore {
    fn create_mapping(&self, tx: &dyn Tx, mapping: &UserResourceMapping) -> DocResult<()> {
        let bucket = tx.bucket(MAPPINGS_BUCKET)?;
        let key = mapping_key(mapping.resource_id, mapping.user_id);
        if bucket.contains(&key)? {
            return Err(DocError::Conflict(format!(
                "mapping between subject {} and resource {} already exists",
                mapping.user_id, mapping.resource_id
            )));
        }

        bucket.put(&key, &serde_json::to_vec(mapping)?)?;
        Ok(())
    }

    fn find_mappings(
        &self,
        tx: &dyn Tx,
        filter: &MappingFilter,
    ) -> DocResult<Vec<UserResourceMapping>> {
        Ok(scan(tx, filter)?
            .into_iter()
            .map(|(_, mapping)| mapping)
            .collect())
    }

    fn delete_mappings(&self, tx: &dyn Tx, filter: &MappingFilter) -> DocResult<usize> {
        let bucket = tx.bucket(MAPPINGS_BUCKET)?;
        let matched = scan(tx, filter)?;
        for (key, _) in &matched {
            bucket.delete(key)?;
        }
        Ok(matched.len())
    }
}

/// Matching `(key, mapping)` pairs. A set `resource_id` narrows the read to
/// that resource's key prefix.
fn scan(tx: &dyn Tx, filter: &MappingFilter) -> DocResult<Vec<(Vec<u8>, UserResourceMapping)>> {
    let bucket = tx.bucket(MAPPINGS_BUCKET)?;
    let entries = match filter.resource_id {
        Some(resource_id) => bucket.prefix_cursor(&resource_id.encode())?,
        None => bucket.cursor()?,
    };

    let mut matched = Vec::new();
    for entry in entries {
        let mapping: UserResourceMapping = serde_json::from_slice(&entry.value)?;
        if filter.matches(&mapping) {
            matched.push((entry.key, mapping));
        }
    }
    Ok(matched)
}

fn mapping_key(resource_id: Id, user_id: Id) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_ENCODED_LEN * 2);
    key.extend_from_slice(&resource_id.encode());
    key.extend_from_slice(&user_id.encode());
    key
}

#[cfg(test)]
mod tests {
    use super::{KvRelationStore, RelationStore};
    use crate::db::open_db_in_memory;
    use crate::error::{DocError, ErrorKind};
    use crate::kv::{KvStore, SqliteKv};
    use crate::model::id::{IdGenerator, RandomIdGenerator};
    use crate::model::mapping::{MappingFilter, ResourceType, UserResourceMapping, UserType};

    #[test]
    fn create_then_filter_mappings() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let kv = SqliteKv::new(&conn);
        let store = KvRelationStore;
        let user = RandomIdGenerator.id();
        let org = RandomIdGenerator.id();
        let doc = RandomIdGenerator.id();

        kv.update(|tx| {
            store.create_mapping(
                tx,
                &UserResourceMapping {
                    user_id: user,
                    user_type: UserType::Member,
                    resource_type: ResourceType::Organizations,
                    resource_id: org,
                },
            )?;
            store.create_mapping(
                tx,
                &UserResourceMapping {
                    user_id: org,
                    user_type: UserType::Owner,
                    resource_type: ResourceType::Documents,
                    resource_id: doc,
                },
            )
        })
        .expect("mappings should be created");

        let owners_of_doc = kv
            .view(|tx| {
                store.find_mappings(
                    tx,
                    &MappingFilter {
                        resource_type: Some(ResourceType::Documents),
                        resource_id: Some(doc),
                        ..MappingFilter::default()
                    },
                )
            })
            .expect("lookup should succeed");
        assert_eq!(owners_of_doc.len(), 1);
        assert_eq!(owners_of_doc[0].user_id, org);

        let all = kv
            .view(|tx| store.find_mappings(tx, &MappingFilter::default()))
            .expect("lookup should succeed");
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn duplicate_pair_is_conflict() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let kv = SqliteKv::new(&conn);
        let mapping = UserResourceMapping {
            user_id: RandomIdGenerator.id(),
            user_type: UserType::Owner,
            resource_type: ResourceType::Organizations,
            resource_id: RandomIdGenerator.id(),
        };

        kv.update(|tx| KvRelationStore.create_mapping(tx, &mapping))
            .expect("first mapping should be created");
        let err: DocError = kv
            .update(|tx| KvRelationStore.create_mapping(tx, &mapping))
            .expect_err("duplicate mapping must be rejected");
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn delete_mappings_removes_only_matches() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let kv = SqliteKv::new(&conn);
        let org = RandomIdGenerator.id();
        let user = RandomIdGenerator.id();
        let doc = RandomIdGenerator.id();
        let other_doc = RandomIdGenerator.id();

        kv.update(|tx| {
            for (subject, resource) in [(org, doc), (user, doc), (org, other_doc)] {
                KvRelationStore.create_mapping(
                    tx,
                    &UserResourceMapping {
                        user_id: subject,
                        user_type: UserType::Owner,
                        resource_type: ResourceType::Documents,
                        resource_id: resource,
                    },
                )?;
            }
            Ok::<_, DocError>(())
        })
        .expect("mappings should be created");

        let removed = kv
            .update(|tx| {
                KvRelationStore.delete_mappings(
                    tx,
                    &MappingFilter {
                        resource_type: Some(ResourceType::Documents),
                        resource_id: Some(doc),
                        ..MappingFilter::default()
                    },
                )
            })
            .expect("delete should succeed");
        assert_eq!(removed, 2);

        let remaining = kv
            .view(|tx| KvRelationStore.find_mappings(tx, &MappingFilter::default()))
            .expect("lookup should succeed");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].resource_id, other_doc);
        assert_eq!(remaining[0].user_id, org);
    }
}
