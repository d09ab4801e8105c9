//! Document store use-case service.
//!
//! # Responsibility
//! - Create and open namespaced document stores.
//! - Run every document operation in exactly one KV transaction, with the
//!   authorization index bound to that same transaction.
//! - Register organizations, users and organization memberships.
//!
//! # Invariants
//! - `create_document` stores the document and all ownership relations, or
//!   nothing at all.
//! - `delete_documents` removes every resolved document together with its
//!   ownership mappings, or nothing.
//! - A document's `id` is assigned only after its transaction commits.

use crate::authz::index::DocumentIndex;
use crate::authz::options::{resolve_ids, CreateOption, FindOption};
use crate::error::{DocError, DocResult, ErrorKind};
use crate::kv::{KvStore, Tx};
use crate::model::directory::{Organization, User};
use crate::model::document::{Document, DocumentMeta};
use crate::model::id::{Id, IdGenerator, RandomIdGenerator};
use crate::model::mapping::{ResourceType, UserResourceMapping, UserType};
use crate::repo::directory_repo::{Directory, KvDirectory};
use crate::repo::document_repo::{
    delete_document, document_exists, ensure_namespace, find_documents_by_id,
    list_document_metas, probe_namespace, put_document, validate_namespace,
};
use crate::repo::mapping_repo::{KvRelationStore, RelationStore};
use log::{error, info, warn};
use std::time::Instant;

/// Entry point owning the KV store and the pluggable collaborators.
pub struct DocumentService<S: KvStore> {
    kv: S,
    ids: Box<dyn IdGenerator>,
    relations: Box<dyn RelationStore>,
    directory: Box<dyn Directory>,
}

impl<S: KvStore> DocumentService<S> {
    /// Creates a service with random ids and the KV-backed relation store and
    /// directory.
    pub fn new(kv: S) -> Self {
        Self {
            kv,
            ids: Box::new(RandomIdGenerator),
            relations: Box::new(KvRelationStore),
            directory: Box::new(KvDirectory),
        }
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_relation_store(mut self, relations: impl RelationStore + 'static) -> Self {
        self.relations = Box::new(relations);
        self
    }

    pub fn with_directory(mut self, directory: impl Directory + 'static) -> Self {
        self.directory = Box::new(directory);
        self
    }

    /// Creates the namespace buckets when missing and returns a handle.
    ///
    /// Idempotent: calling it again for an existing namespace keeps every
    /// stored document.
    pub fn create_document_store(&self, namespace: &str) -> DocResult<DocumentStore<'_, S>> {
        let started_at = Instant::now();
        validate_namespace(namespace)?;

        match self.kv.update(|tx| ensure_namespace(tx, namespace)) {
            Ok(()) => {
                info!(
                    "event=namespace_create module=document status=ok ns={namespace} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(self.store(namespace))
            }
            Err(err) => {
                log_failure("namespace_create", namespace, started_at, &err);
                Err(err)
            }
        }
    }

    /// Returns a handle for an existing namespace, `NotFound` otherwise.
    pub fn find_document_store(&self, namespace: &str) -> DocResult<DocumentStore<'_, S>> {
        let started_at = Instant::now();
        validate_namespace(namespace)?;

        match self.kv.view(|tx| probe_namespace(tx, namespace)) {
            Ok(()) => {
                info!(
                    "event=namespace_find module=document status=ok ns={namespace} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(self.store(namespace))
            }
            Err(err) => {
                log_failure("namespace_find", namespace, started_at, &err);
                Err(err)
            }
        }
    }

    /// Registers an organization under a fresh id.
    pub fn create_organization(&self, name: &str) -> DocResult<Organization> {
        let org = Organization {
            id: self.ids.id(),
            name: name.trim().to_string(),
        };
        self.kv
            .update(|tx| self.directory.create_organization(tx, &org))?;
        info!(
            "event=directory_create module=directory status=ok kind=organization id={}",
            org.id
        );
        Ok(org)
    }

    /// Registers a user under a fresh id.
    pub fn create_user(&self, name: &str) -> DocResult<User> {
        let user = User {
            id: self.ids.id(),
            name: name.trim().to_string(),
        };
        self.kv.update(|tx| self.directory.create_user(tx, &user))?;
        info!(
            "event=directory_create module=directory status=ok kind=user id={}",
            user.id
        );
        Ok(user)
    }

    /// Grants `user_id` the `user_type` tier on organization `org_id`.
    ///
    /// # Errors
    /// - `NotFound` when either subject is unknown.
    /// - `Conflict` when the user already has a tier on the organization.
    pub fn add_organization_member(
        &self,
        org_id: Id,
        user_id: Id,
        user_type: UserType,
    ) -> DocResult<()> {
        self.kv.update(|tx| -> DocResult<()> {
            self.directory.find_organization_by_id(tx, org_id)?;
            self.directory.find_user_by_id(tx, user_id)?;
            self.relations.create_mapping(
                tx,
                &UserResourceMapping {
                    user_id,
                    user_type,
                    resource_type: ResourceType::Organizations,
                    resource_id: org_id,
                },
            )
        })?;
        info!(
            "event=membership_add module=directory status=ok org_id={org_id} user_id={user_id} tier={user_type:?}"
        );
        Ok(())
    }

    fn store(&self, namespace: &str) -> DocumentStore<'_, S> {
        DocumentStore {
            service: self,
            namespace: namespace.to_string(),
        }
    }

    fn index<'a>(&'a self, tx: &'a dyn Tx) -> DocumentIndex<'a> {
        DocumentIndex::new(tx, self.relations.as_ref(), self.directory.as_ref())
    }
}

/// Handle onto one namespace of a [`DocumentService`].
pub struct DocumentStore<'svc, S: KvStore> {
    service: &'svc DocumentService<S>,
    namespace: String,
}

impl<S: KvStore> DocumentStore<'_, S> {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Stores `doc` under a freshly generated id and applies `options` in
    /// order inside the same transaction.
    ///
    /// On success `doc.id` holds the new id. On any failure nothing is
    /// persisted and `doc` is left untouched.
    pub fn create_document(&self, doc: &mut Document, options: &[CreateOption]) -> DocResult<()> {
        let started_at = Instant::now();
        let namespace = self.namespace.as_str();

        let result = self.service.kv.update(|tx| -> DocResult<Id> {
            let id = self.service.ids.id();
            if !id.is_valid() {
                return Err(DocError::Internal(
                    "id generator returned the invalid id".to_string(),
                ));
            }
            if document_exists(tx, namespace, id)? {
                return Err(DocError::Internal(format!(
                    "generated id {id} already in use in namespace `{namespace}`"
                )));
            }

            put_document(tx, namespace, id, &doc.meta, &doc.data)?;
            let index = self.service.index(tx);
            for option in options {
                option.apply(&index, id)?;
            }
            Ok(id)
        });

        match result {
            Ok(id) => {
                doc.id = id;
                info!(
                    "event=document_create module=document status=ok ns={namespace} doc_id={id} options={} duration_ms={}",
                    options.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                log_failure("document_create", namespace, started_at, &err);
                Err(err)
            }
        }
    }

    /// Loads documents in the order of `ids`. Performs no authorization.
    pub fn find_documents_by_id(&self, ids: &[Id]) -> DocResult<Vec<Document>> {
        let started_at = Instant::now();
        let namespace = self.namespace.as_str();

        let result = self
            .service
            .kv
            .view(|tx| find_documents_by_id(tx, namespace, ids));
        self.log_find(started_at, &result);
        result
    }

    /// Resolves `options` to ids (deduplicated union) and loads them.
    pub fn find_documents(&self, options: &[FindOption]) -> DocResult<Vec<Document>> {
        let started_at = Instant::now();
        let namespace = self.namespace.as_str();

        let result = self.service.kv.view(|tx| -> DocResult<Vec<Document>> {
            let ids = resolve_ids(&self.service.index(tx), options)?;
            find_documents_by_id(tx, namespace, &ids)
        });
        self.log_find(started_at, &result);
        result
    }

    /// Metadata of every document in the namespace, ascending by id.
    ///
    /// Payloads are not loaded and no authorization is applied; intended for
    /// administrative tooling.
    pub fn list_document_metas(&self) -> DocResult<Vec<(Id, DocumentMeta)>> {
        let namespace = self.namespace.as_str();
        self.service
            .kv
            .view(|tx| list_document_metas(tx, namespace))
    }

    /// Deletes every document `options` resolve to, in one transaction.
    pub fn delete_documents(&self, options: &[FindOption]) -> DocResult<()> {
        let started_at = Instant::now();
        let namespace = self.namespace.as_str();

        let result = self.service.kv.update(|tx| -> DocResult<usize> {
            let index = self.service.index(tx);
            let ids = resolve_ids(&index, options)?;
            for id in &ids {
                delete_document(tx, namespace, *id)?;
                index.remove_owners(*id)?;
            }
            Ok(ids.len())
        });

        match result {
            Ok(deleted) => {
                info!(
                    "event=document_delete module=document status=ok ns={namespace} deleted={deleted} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                log_failure("document_delete", namespace, started_at, &err);
                Err(err)
            }
        }
    }

    fn log_find(&self, started_at: Instant, result: &DocResult<Vec<Document>>) {
        match result {
            Ok(docs) => info!(
                "event=document_find module=document status=ok ns={} count={} duration_ms={}",
                self.namespace,
                docs.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("document_find", &self.namespace, started_at, err),
        }
    }
}

/// Caller mistakes and denials are warnings; everything else is an error.
fn log_failure(event: &str, namespace: &str, started_at: Instant, err: &DocError) {
    let kind = err.kind();
    let duration_ms = started_at.elapsed().as_millis();
    match kind {
        ErrorKind::Internal => error!(
            "event={event} module=document status=error ns={namespace} error_kind={} duration_ms={duration_ms} error={err}",
            kind.as_str()
        ),
        _ => warn!(
            "event={event} module=document status=error ns={namespace} error_kind={} duration_ms={duration_ms} error={err}",
            kind.as_str()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentService;
    use crate::db::open_db_in_memory;
    use crate::error::ErrorKind;
    use crate::kv::SqliteKv;
    use crate::model::document::{Document, DocumentMeta};

    #[test]
    fn create_document_store_is_idempotent() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let service = DocumentService::new(SqliteKv::new(&conn));

        let store = service
            .create_document_store("ns1")
            .expect("namespace should be created");
        let mut doc = Document::new("first", b"payload".to_vec());
        store
            .create_document(&mut doc, &[])
            .expect("document should be created");

        let again = service
            .create_document_store("ns1")
            .expect("second create should succeed");
        let found = again
            .find_documents_by_id(&[doc.id])
            .expect("document should survive re-create");
        assert_eq!(found, vec![doc]);
    }

    #[test]
    fn find_document_store_requires_existing_namespace() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let service = DocumentService::new(SqliteKv::new(&conn));

        let err = service
            .find_document_store("missing")
            .err()
            .expect("missing namespace must fail");
        assert_eq!(err.kind(), ErrorKind::NotFound);

        service
            .create_document_store("present")
            .expect("namespace should be created");
        let store = service
            .find_document_store("present")
            .expect("existing namespace should open");
        assert_eq!(store.namespace(), "present");
    }
}
