//! Core domain logic for DocVault.
//! Namespaced document storage with organization-based ownership, on top of a
//! transactional key/value engine.

pub mod authz;
pub mod config;
pub mod db;
pub mod error;
pub mod kv;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use authz::index::{DocumentIndex, OWNER_KIND_ORG, OWNER_KIND_USER};
pub use authz::options::{
    authorized_where, authorized_where_id, authorized_where_org, authorized_with_org, where_id,
    where_org, with_org, CreateOption, FindOption,
};
pub use config::{ConfigError, CoreConfig, LogConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_config, DbError, DbResult};
pub use error::{DocError, DocResult, ErrorKind};
pub use kv::{Bucket, KeyValue, KvError, KvResult, KvStore, SqliteKv, Tx};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::directory::{Organization, User};
pub use model::document::{Document, DocumentMeta};
pub use model::id::{Id, IdError, IdGenerator, RandomIdGenerator};
pub use model::mapping::{MappingFilter, ResourceType, UserResourceMapping, UserType};
pub use repo::directory_repo::{Directory, KvDirectory};
pub use repo::mapping_repo::{KvRelationStore, RelationStore};
pub use service::document_service::{DocumentService, DocumentStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
