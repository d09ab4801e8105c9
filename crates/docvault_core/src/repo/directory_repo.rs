//! Organization and user directory.
//!
//! # Responsibility
//! - Register organizations and users with unique names.
//! - Resolve organizations by name and validate that ids exist.
//!
//! # Invariants
//! - Names are trimmed and unique per record type (case-sensitive).
//! - The name index and the record bucket are written in one transaction.

use crate::error::{DocError, DocResult};
use crate::kv::{KvError, Tx};
use crate::model::directory::{Organization, User};
use crate::model::id::Id;
use serde::de::DeserializeOwned;
use serde::Serialize;

const ORGANIZATIONS_BUCKET: &[u8] = b"organizationsv1";
const ORGANIZATION_INDEX_BUCKET: &[u8] = b"organizationindexv1";
const USERS_BUCKET: &[u8] = b"usersv1";
const USER_INDEX_BUCKET: &[u8] = b"userindexv1";

/// Lookup and registration of the subjects that can own documents.
pub trait Directory {
    fn create_organization(&self, tx: &dyn Tx, org: &Organization) -> DocResult<()>;
    fn create_user(&self, tx: &dyn Tx, user: &User) -> DocResult<()>;
    fn find_organization_by_id(&self, tx: &dyn Tx, id: Id) -> DocResult<Organization>;
    fn find_organization_by_name(&self, tx: &dyn Tx, name: &str) -> DocResult<Organization>;
    fn find_user_by_id(&self, tx: &dyn Tx, id: Id) -> DocResult<User>;
}

/// Directory kept in the `organizations*` and `users*` buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct KvDirectory;

impl Directory for KvDirectory {
    fn create_organization(&self, tx: &dyn Tx, org: &Organization) -> DocResult<()> {
        put_named(
            tx,
            "organization",
            ORGANIZATIONS_BUCKET,
            ORGANIZATION_INDEX_BUCKET,
            org.id,
            &org.name,
            org,
        )
    }

    fn create_user(&self, tx: &dyn Tx, user: &User) -> DocResult<()> {
        put_named(
            tx,
            "user",
            USERS_BUCKET,
            USER_INDEX_BUCKET,
            user.id,
            &user.name,
            user,
        )
    }

    fn find_organization_by_id(&self, tx: &dyn Tx, id: Id) -> DocResult<Organization> {
        find_by_id(tx, "organization", ORGANIZATIONS_BUCKET, id)
    }

    fn find_organization_by_name(&self, tx: &dyn Tx, name: &str) -> DocResult<Organization> {
        let raw_id = match tx.bucket(ORGANIZATION_INDEX_BUCKET)?.get(name.trim().as_bytes()) {
            Ok(raw_id) => raw_id,
            Err(KvError::KeyNotFound { .. }) => {
                return Err(DocError::NotFound(format!(
                    "organization name `{name}` not found"
                )));
            }
            Err(err) => return Err(err.into()),
        };
        let id = Id::decode(&raw_id).map_err(|err| {
            DocError::InvalidData(format!("organization index entry for `{name}`: {err}"))
        })?;
        self.find_organization_by_id(tx, id)
    }

    fn find_user_by_id(&self, tx: &dyn Tx, id: Id) -> DocResult<User> {
        find_by_id(tx, "user", USERS_BUCKET, id)
    }
}

fn put_named<T: Serialize>(
    tx: &dyn Tx,
    label: &str,
    records: &[u8],
    index: &[u8],
    id: Id,
    name: &str,
    record: &T,
) -> DocResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DocError::Invalid(format!("{label} name cannot be empty")));
    }
    if !id.is_valid() {
        return Err(DocError::Invalid(format!("{label} id must be set")));
    }

    let index = tx.bucket(index)?;
    if index.contains(name.as_bytes())? {
        return Err(DocError::Conflict(format!(
            "{label} with name `{name}` already exists"
        )));
    }
    let records = tx.bucket(records)?;
    if records.contains(&id.encode())? {
        return Err(DocError::Conflict(format!("{label} {id} already exists")));
    }

    records.put(&id.encode(), &serde_json::to_vec(record)?)?;
    index.put(name.as_bytes(), &id.encode())?;
    Ok(())
}

fn find_by_id<T: DeserializeOwned>(
    tx: &dyn Tx,
    label: &str,
    records: &[u8],
    id: Id,
) -> DocResult<T> {
    match tx.bucket(records)?.get(&id.encode()) {
        Ok(raw) => Ok(serde_json::from_slice(&raw)?),
        Err(KvError::KeyNotFound { .. }) => {
            Err(DocError::NotFound(format!("{label} {id} not found")))
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::{Directory, KvDirectory};
    use crate::db::open_db_in_memory;
    use crate::error::{DocError, ErrorKind};
    use crate::kv::{KvStore, SqliteKv};
    use crate::model::directory::{Organization, User};
    use crate::model::id::{IdGenerator, RandomIdGenerator};

    #[test]
    fn organization_resolves_by_name_and_id() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let kv = SqliteKv::new(&conn);
        let org = Organization {
            id: RandomIdGenerator.id(),
            name: "acme".to_string(),
        };

        kv.update(|tx| KvDirectory.create_organization(tx, &org))
            .expect("organization should be created");

        let by_name = kv
            .view(|tx| KvDirectory.find_organization_by_name(tx, "acme"))
            .expect("name lookup should succeed");
        assert_eq!(by_name, org);
        let by_id = kv
            .view(|tx| KvDirectory.find_organization_by_id(tx, org.id))
            .expect("id lookup should succeed");
        assert_eq!(by_id, org);
    }

    #[test]
    fn unknown_records_are_not_found() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let kv = SqliteKv::new(&conn);

        let err: DocError = kv
            .view(|tx| KvDirectory.find_organization_by_name(tx, "nobody"))
            .expect_err("missing organization must fail");
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: DocError = kv
            .view(|tx| KvDirectory.find_user_by_id(tx, RandomIdGenerator.id()))
            .expect_err("missing user must fail");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let kv = SqliteKv::new(&conn);
        let user = User {
            id: RandomIdGenerator.id(),
            name: "ada".to_string(),
        };
        kv.update(|tx| KvDirectory.create_user(tx, &user))
            .expect("user should be created");

        let duplicate = User {
            id: RandomIdGenerator.id(),
            name: " ada ".to_string(),
        };
        let err: DocError = kv
            .update(|tx| KvDirectory.create_user(tx, &duplicate))
            .expect_err("duplicate name must be rejected");
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let unnamed = User {
            id: RandomIdGenerator.id(),
            name: "  ".to_string(),
        };
        let err: DocError = kv
            .update(|tx| KvDirectory.create_user(tx, &unnamed))
            .expect_err("empty name must be rejected");
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }
}
