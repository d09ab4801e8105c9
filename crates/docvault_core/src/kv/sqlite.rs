//! SQLite implementation of the key/value engine.
//!
//! Buckets are rows of `kv_buckets`; entries live in `kv_entries` keyed by
//! `(bucket, key)`. BLOB comparison in SQLite is `memcmp`, which gives the
//! byte-ordered cursor the engine contract requires.

use super::{Bucket, KeyValue, KvError, KvResult, KvStore, Tx};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Key/value store over one migrated SQLite connection.
///
/// Cheap to copy; every copy shares the borrowed connection. Threads that
/// need concurrent access open their own connection to the same file.
#[derive(Clone, Copy)]
pub struct SqliteKv<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKv<'conn> {
    /// Wraps a connection returned by [`crate::db::open_db`] or
    /// [`crate::db::open_db_in_memory`].
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl KvStore for SqliteKv<'_> {
    fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn Tx) -> Result<T, E>,
        E: From<KvError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)
            .map_err(KvError::from)?;
        let handle: &dyn Tx = &SqliteTx {
            conn: &tx,
            writable: false,
        };
        // Dropping `tx` rolls back; read transactions never commit.
        f(handle)
    }

    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn Tx) -> Result<T, E>,
        E: From<KvError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(KvError::from)?;
        let value = {
            let handle: &dyn Tx = &SqliteTx {
                conn: &tx,
                writable: true,
            };
            f(handle)?
        };
        tx.commit().map_err(KvError::from)?;
        Ok(value)
    }
}

struct SqliteTx<'t> {
    conn: &'t Connection,
    writable: bool,
}

impl SqliteTx<'_> {
    fn bucket_exists(&self, name: &[u8]) -> KvResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM kv_buckets WHERE name = ?1);",
            [name],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn open(&self, name: &[u8]) -> Box<dyn Bucket + '_> {
        Box::new(SqliteBucket {
            conn: self.conn,
            name: name.to_vec(),
            writable: self.writable,
        })
    }
}

impl Tx for SqliteTx<'_> {
    fn is_writable(&self) -> bool {
        self.writable
    }

    fn bucket(&self, name: &[u8]) -> KvResult<Box<dyn Bucket + '_>> {
        if !self.bucket_exists(name)? {
            return Err(KvError::BucketNotFound(
                String::from_utf8_lossy(name).into_owned(),
            ));
        }
        Ok(self.open(name))
    }

    fn create_bucket_if_not_exists(&self, name: &[u8]) -> KvResult<Box<dyn Bucket + '_>> {
        if !self.writable {
            return Err(KvError::ReadOnly("create bucket"));
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO kv_buckets (name) VALUES (?1);",
            [name],
        )?;
        Ok(self.open(name))
    }
}

struct SqliteBucket<'t> {
    conn: &'t Connection,
    name: Vec<u8>,
    writable: bool,
}

impl SqliteBucket<'_> {
    fn ensure_writable(&self, operation: &'static str) -> KvResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(KvError::ReadOnly(operation))
        }
    }
}

impl Bucket for SqliteBucket<'_> {
    fn get(&self, key: &[u8]) -> KvResult<Vec<u8>> {
        let value: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE bucket = ?1 AND key = ?2;",
                params![self.name.as_slice(), key],
                |row| row.get(0),
            )
            .optional()?;
        value.ok_or_else(|| KvError::key_not_found(&self.name, key))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> KvResult<()> {
        self.ensure_writable("put")?;
        self.conn.execute(
            "INSERT INTO kv_entries (bucket, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (bucket, key) DO UPDATE SET value = excluded.value;",
            params![self.name.as_slice(), key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> KvResult<()> {
        self.ensure_writable("delete")?;
        self.conn.execute(
            "DELETE FROM kv_entries WHERE bucket = ?1 AND key = ?2;",
            params![self.name.as_slice(), key],
        )?;
        Ok(())
    }

    fn cursor(&self) -> KvResult<Vec<KeyValue>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value FROM kv_entries WHERE bucket = ?1 ORDER BY key ASC;",
        )?;
        let mut rows = stmt.query([self.name.as_slice()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(KeyValue {
                key: row.get(0)?,
                value: row.get(1)?,
            });
        }
        Ok(entries)
    }

    fn prefix_cursor(&self, prefix: &[u8]) -> KvResult<Vec<KeyValue>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value FROM kv_entries
             WHERE bucket = ?1 AND substr(key, 1, length(?2)) = ?2
             ORDER BY key ASC;",
        )?;
        let mut rows = stmt.query(params![self.name.as_slice(), prefix])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(KeyValue {
                key: row.get(0)?,
                value: row.get(1)?,
            });
        }
        Ok(entries)
    }
}
