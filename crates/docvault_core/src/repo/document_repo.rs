//! Namespace storage layout for documents.
//!
//! # Responsibility
//! - Build bucket paths `<namespace>/documents/meta` and
//!   `<namespace>/documents/data`.
//! - Read, write and delete the two halves of a document inside a caller
//!   supplied transaction.
//!
//! # Invariants
//! - Metadata and payload of one id are always written and deleted in the
//!   same transaction.
//! - Payload bytes are stored verbatim; metadata is JSON.

use crate::error::{DocError, DocResult};
use crate::kv::{KvError, Tx};
use crate::model::document::{Document, DocumentMeta};
use crate::model::id::Id;
use once_cell::sync::Lazy;
use regex::Regex;

const DOCUMENT_META_BUCKET: &str = "documents/meta";
const DOCUMENT_DATA_BUCKET: &str = "documents/data";

static NAMESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,127}$").expect("valid namespace regex")
});

/// Bucket holding `id -> DocumentMeta` for `namespace`.
pub fn meta_bucket(namespace: &str) -> Vec<u8> {
    format!("{namespace}/{DOCUMENT_META_BUCKET}").into_bytes()
}

/// Bucket holding `id -> payload` for `namespace`.
pub fn data_bucket(namespace: &str) -> Vec<u8> {
    format!("{namespace}/{DOCUMENT_DATA_BUCKET}").into_bytes()
}

/// Rejects empty names and names that could alias another bucket path.
pub fn validate_namespace(namespace: &str) -> DocResult<()> {
    if namespace.trim().is_empty() {
        return Err(DocError::Invalid("namespace cannot be empty".to_string()));
    }
    if !NAMESPACE_RE.is_match(namespace) {
        return Err(DocError::Invalid(format!(
            "invalid namespace `{namespace}`; expected 1-128 chars of [A-Za-z0-9_.-] starting alphanumeric"
        )));
    }
    Ok(())
}

/// Creates both namespace buckets when missing.
pub fn ensure_namespace(tx: &dyn Tx, namespace: &str) -> DocResult<()> {
    tx.create_bucket_if_not_exists(&data_bucket(namespace))?;
    tx.create_bucket_if_not_exists(&meta_bucket(namespace))?;
    Ok(())
}

/// Succeeds only when both namespace buckets exist.
pub fn probe_namespace(tx: &dyn Tx, namespace: &str) -> DocResult<()> {
    for bucket in [data_bucket(namespace), meta_bucket(namespace)] {
        match tx.bucket(&bucket) {
            Ok(_) => {}
            Err(KvError::BucketNotFound(_)) => {
                return Err(DocError::NotFound(format!(
                    "document namespace `{namespace}` not found"
                )));
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

pub fn document_exists(tx: &dyn Tx, namespace: &str, id: Id) -> DocResult<bool> {
    Ok(tx.bucket(&meta_bucket(namespace))?.contains(&id.encode())?)
}

/// Writes metadata then payload under `id`.
pub fn put_document(
    tx: &dyn Tx,
    namespace: &str,
    id: Id,
    meta: &DocumentMeta,
    data: &[u8],
) -> DocResult<()> {
    let key = id.encode();
    let meta = serde_json::to_vec(meta)?;

    tx.bucket(&meta_bucket(namespace))?.put(&key, &meta)?;
    tx.bucket(&data_bucket(namespace))?.put(&key, data)?;
    Ok(())
}

/// Loads metadata then payload; either half missing is `NotFound`.
pub fn find_document_by_id(tx: &dyn Tx, namespace: &str, id: Id) -> DocResult<Document> {
    let key = id.encode();

    let raw_meta = tx
        .bucket(&meta_bucket(namespace))?
        .get(&key)
        .map_err(|err| document_not_found(err, namespace, id))?;
    let meta: DocumentMeta = serde_json::from_slice(&raw_meta)?;

    let data = tx
        .bucket(&data_bucket(namespace))?
        .get(&key)
        .map_err(|err| document_not_found(err, namespace, id))?;

    Ok(Document { id, meta, data })
}

/// Loads every id in order; the first missing document aborts the call.
pub fn find_documents_by_id(tx: &dyn Tx, namespace: &str, ids: &[Id]) -> DocResult<Vec<Document>> {
    ids.iter()
        .map(|id| find_document_by_id(tx, namespace, *id))
        .collect()
}

/// Every `(id, meta)` pair of the namespace, ascending by encoded id.
pub fn list_document_metas(tx: &dyn Tx, namespace: &str) -> DocResult<Vec<(Id, DocumentMeta)>> {
    let entries = tx.bucket(&meta_bucket(namespace))?.cursor()?;
    let mut metas = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = Id::decode(&entry.key).map_err(|err| {
            DocError::InvalidData(format!("document key in namespace `{namespace}`: {err}"))
        })?;
        metas.push((id, serde_json::from_slice(&entry.value)?));
    }
    Ok(metas)
}

/// Deletes both halves of an existing document.
pub fn delete_document(tx: &dyn Tx, namespace: &str, id: Id) -> DocResult<()> {
    if !document_exists(tx, namespace, id)? {
        return Err(DocError::NotFound(format!(
            "document {id} not found in namespace `{namespace}`"
        )));
    }

    let key = id.encode();
    tx.bucket(&meta_bucket(namespace))?.delete(&key)?;
    tx.bucket(&data_bucket(namespace))?.delete(&key)?;
    Ok(())
}

fn document_not_found(err: KvError, namespace: &str, id: Id) -> DocError {
    match err {
        KvError::KeyNotFound { .. } => {
            DocError::NotFound(format!("document {id} not found in namespace `{namespace}`"))
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::{data_bucket, meta_bucket, validate_namespace};
    use crate::error::ErrorKind;

    #[test]
    fn bucket_paths_are_namespace_scoped() {
        assert_eq!(meta_bucket("ns1"), b"ns1/documents/meta".to_vec());
        assert_eq!(data_bucket("ns1"), b"ns1/documents/data".to_vec());
    }

    #[test]
    fn namespace_validation() {
        assert!(validate_namespace("ns1").is_ok());
        assert!(validate_namespace("dashboards.v2-prod_1").is_ok());

        for bad in ["", "   ", "a/b", "-leading", "has space"] {
            let err = validate_namespace(bad).expect_err("namespace should be rejected");
            assert_eq!(err.kind(), ErrorKind::Invalid, "namespace `{bad}`");
        }
    }
}
