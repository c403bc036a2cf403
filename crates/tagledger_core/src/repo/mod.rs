//! Persistence contracts and SQLite implementations.

pub mod registry_repo;

pub use registry_repo::{
    RegistryStore, RepoError, RepoResult, SqliteRegistryStore, TagEvent, TagEventKind,
};
