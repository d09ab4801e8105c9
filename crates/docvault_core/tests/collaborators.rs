use docvault_core::{
    open_db_in_memory, where_org, with_org, Directory, DocError, DocResult, Document,
    DocumentService, ErrorKind, Id, IdGenerator, KvRelationStore, MappingFilter, Organization,
    RandomIdGenerator, RelationStore, ResourceType, SqliteKv, Tx, User, UserResourceMapping,
    UserType,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Delegates to the KV relation store and remembers every mapping written.
struct RecordingRelationStore {
    created: Rc<RefCell<Vec<UserResourceMapping>>>,
}

impl RelationStore for RecordingRelationStore {
    fn create_mapping(&self, tx: &dyn Tx, mapping: &UserResourceMapping) -> DocResult<()> {
        KvRelationStore.create_mapping(tx, mapping)?;
        self.created.borrow_mut().push(mapping.clone());
        Ok(())
    }

    fn find_mappings(
        &self,
        tx: &dyn Tx,
        filter: &MappingFilter,
    ) -> DocResult<Vec<UserResourceMapping>> {
        KvRelationStore.find_mappings(tx, filter)
    }

    fn delete_mappings(&self, tx: &dyn Tx, filter: &MappingFilter) -> DocResult<usize> {
        KvRelationStore.delete_mappings(tx, filter)
    }
}

/// Read-only directory knowing exactly one organization and no users.
struct SingleOrgDirectory {
    org: Organization,
}

impl Directory for SingleOrgDirectory {
    fn create_organization(&self, _tx: &dyn Tx, _org: &Organization) -> DocResult<()> {
        Err(DocError::Internal("directory is read-only".to_string()))
    }

    fn create_user(&self, _tx: &dyn Tx, _user: &User) -> DocResult<()> {
        Err(DocError::Internal("directory is read-only".to_string()))
    }

    fn find_organization_by_id(&self, _tx: &dyn Tx, id: Id) -> DocResult<Organization> {
        if id == self.org.id {
            Ok(self.org.clone())
        } else {
            Err(DocError::NotFound(format!("organization {id} not found")))
        }
    }

    fn find_organization_by_name(&self, _tx: &dyn Tx, name: &str) -> DocResult<Organization> {
        if name == self.org.name {
            Ok(self.org.clone())
        } else {
            Err(DocError::NotFound(format!("organization name `{name}` not found")))
        }
    }

    fn find_user_by_id(&self, _tx: &dyn Tx, id: Id) -> DocResult<User> {
        Err(DocError::NotFound(format!("user {id} not found")))
    }
}

#[test]
fn injected_relation_store_receives_ownership_writes() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKv::new(&conn);
    let acme = DocumentService::new(kv).create_organization("acme").unwrap();

    let created = Rc::new(RefCell::new(Vec::new()));
    let service = DocumentService::new(kv).with_relation_store(RecordingRelationStore {
        created: Rc::clone(&created),
    });
    let store = service.create_document_store("ns1").unwrap();

    let mut doc = Document::new("tracked", b"t".to_vec());
    store.create_document(&mut doc, &[with_org("acme")]).unwrap();

    assert_eq!(
        created.borrow().as_slice(),
        &[UserResourceMapping {
            user_id: acme.id,
            user_type: UserType::Owner,
            resource_type: ResourceType::Documents,
            resource_id: doc.id,
        }]
    );
    assert_eq!(store.find_documents(&[where_org("acme")]).unwrap(), vec![doc]);
}

#[test]
fn injected_directory_resolves_organizations() {
    let conn = open_db_in_memory().unwrap();
    let org = Organization {
        id: RandomIdGenerator.id(),
        name: "acme".to_string(),
    };
    let service = DocumentService::new(SqliteKv::new(&conn))
        .with_directory(SingleOrgDirectory { org: org.clone() });
    let store = service.create_document_store("ns1").unwrap();

    let mut doc = Document::new("external", b"e".to_vec());
    store.create_document(&mut doc, &[with_org("acme")]).unwrap();
    assert_eq!(store.find_documents(&[where_org("acme")]).unwrap(), vec![doc]);

    let mut rejected = Document::new("rejected", b"r".to_vec());
    let err = store
        .create_document(&mut rejected, &[with_org("globex")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service.create_organization("globex").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}
