//! Transactional, bucketed key/value engine contract.
//!
//! # Responsibility
//! - Define the transaction, bucket and store seams the document layer is
//!   written against.
//! - Provide the SQLite-backed engine used by default.
//!
//! # Invariants
//! - Every closure passed to [`KvStore::view`] or [`KvStore::update`] runs in
//!   exactly one transaction; `update` commits only when the closure returns
//!   `Ok`, everything else rolls back.
//! - Read transactions reject mutations with [`KvError::ReadOnly`].
//! - [`Bucket::cursor`] yields entries in ascending byte order of key.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite;

pub use sqlite::SqliteKv;

pub type KvResult<T> = Result<T, KvError>;

/// One stored entry as returned by [`Bucket::cursor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Store able to run closures inside read-only or read-write transactions.
pub trait KvStore {
    /// Runs `f` in a read-only transaction. Nothing `f` does is persisted.
    fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn Tx) -> Result<T, E>,
        E: From<KvError>;

    /// Runs `f` in a read-write transaction committed iff `f` returns `Ok`.
    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn Tx) -> Result<T, E>,
        E: From<KvError>;
}

/// In-flight transaction handle.
pub trait Tx {
    fn is_writable(&self) -> bool;

    /// Opens an existing bucket. Fails with [`KvError::BucketNotFound`].
    fn bucket(&self, name: &[u8]) -> KvResult<Box<dyn Bucket + '_>>;

    /// Opens a bucket, creating it first when absent. Write transactions only.
    fn create_bucket_if_not_exists(&self, name: &[u8]) -> KvResult<Box<dyn Bucket + '_>>;
}

/// Ordered byte-keyed container scoped to one transaction.
pub trait Bucket {
    /// Fails with [`KvError::KeyNotFound`] when `key` is absent.
    fn get(&self, key: &[u8]) -> KvResult<Vec<u8>>;

    /// Inserts or overwrites `key`.
    fn put(&self, key: &[u8], value: &[u8]) -> KvResult<()>;

    /// Removes `key`; removing an absent key is not an error.
    fn delete(&self, key: &[u8]) -> KvResult<()>;

    /// Snapshot of every entry, ascending by key.
    fn cursor(&self) -> KvResult<Vec<KeyValue>>;

    /// Entries whose key starts with `prefix`, ascending by key.
    fn prefix_cursor(&self, prefix: &[u8]) -> KvResult<Vec<KeyValue>> {
        let mut entries = self.cursor()?;
        entries.retain(|entry| entry.key.starts_with(prefix));
        Ok(entries)
    }

    fn contains(&self, key: &[u8]) -> KvResult<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(KvError::KeyNotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Errors raised by the key/value engine.
#[derive(Debug)]
pub enum KvError {
    BucketNotFound(String),
    KeyNotFound { bucket: String, key: String },
    ReadOnly(&'static str),
    Db(DbError),
}

impl KvError {
    pub(crate) fn key_not_found(bucket: &[u8], key: &[u8]) -> Self {
        Self::KeyNotFound {
            bucket: String::from_utf8_lossy(bucket).into_owned(),
            key: hex::encode(key),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BucketNotFound(_) | Self::KeyNotFound { .. })
    }
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BucketNotFound(name) => write!(f, "bucket not found: {name}"),
            Self::KeyNotFound { bucket, key } => {
                write!(f, "key not found in bucket `{bucket}`: {key}")
            }
            Self::ReadOnly(operation) => {
                write!(f, "cannot {operation} in a read-only transaction")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for KvError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

#[cfg(test)]
mod tests {
    use super::KvError;

    #[test]
    fn key_not_found_renders_hex_key() {
        let err = KvError::key_not_found(b"things", &[0x00, 0x6b, 0xff]);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "key not found in bucket `things`: 006bff"
        );
    }
}
