//! Core tag-registry engine for tagledger.
//!
//! Privileged taggers attach boolean tags to items owned through an external
//! ownership ledger; anyone queries tag membership per item or per account.
//! This crate is the single source of truth for registry invariants.

pub mod authority;
pub mod db;
pub mod logging;
pub mod model;
pub mod oracle;
pub mod repo;
pub mod service;

pub use authority::{AuthorityError, MemoryRoleAuthority, RoleAuthority, ROOT_ADMIN_ROLE};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::account::{Account, AccountParseError};
pub use model::item::ItemId;
pub use model::tag::{RoleId, TagId};
pub use oracle::{
    ItemOwnership, MemoryLedgerError, MemoryOwnershipOracle, OracleError, OwnershipOracle,
};
pub use repo::registry_repo::{
    RegistryStore, RepoError, RepoResult, SqliteRegistryStore, TagEvent, TagEventKind,
};
pub use service::registry_service::{RegistryConfig, RegistryError, TagRegistry};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
