//! Role authority seam.
//!
//! # Responsibility
//! - Define the hierarchical permission interface the registry consumes to
//!   gate tag mutations.
//! - Provide an in-memory reference authority for embedding and tests.
//!
//! # Invariants
//! - Every role has exactly one admin role; unset admin defaults to
//!   [`ROOT_ADMIN_ROLE`].
//! - Granting or revoking a role requires holding that role's admin role.
//! - The registry consumes `has_role`/`role_admin` checks; it never inspects
//!   authority internals.

use crate::model::{Account, RoleId, TagId};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Admin role at the top of the hierarchy. Administers every role whose
/// admin was never reassigned, including itself.
pub const ROOT_ADMIN_ROLE: RoleId = TagId::NIL;

/// Authorization failures raised by an authority implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    /// The caller does not hold the admin role for the target role.
    NotRoleAdmin { role: RoleId, account: Account },
}

impl Display for AuthorityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotRoleAdmin { role, account } => {
                write!(f, "account {account} does not administer role {role}")
            }
        }
    }
}

impl Error for AuthorityError {}

/// Hierarchical role-check interface consumed by the registry.
pub trait RoleAuthority {
    /// Answers whether `account` currently holds `role`.
    fn has_role(&self, role: RoleId, account: &Account) -> bool;
    /// Returns the role permitted to grant/revoke `role`.
    fn role_admin(&self, role: RoleId) -> RoleId;
    /// Reassigns the admin role for `role`.
    ///
    /// Callers must gate this on the current admin role themselves; the
    /// registry's public surface does so before delegating here.
    fn set_role_admin(&mut self, role: RoleId, admin_role: RoleId);
    /// Grants `role` to `account`; `caller` must hold the role's admin role.
    fn grant_role(
        &mut self,
        caller: &Account,
        role: RoleId,
        account: &Account,
    ) -> Result<(), AuthorityError>;
    /// Revokes `role` from `account`; `caller` must hold the role's admin role.
    fn revoke_role(
        &mut self,
        caller: &Account,
        role: RoleId,
        account: &Account,
    ) -> Result<(), AuthorityError>;
}

/// In-memory reference authority with per-role member sets.
#[derive(Debug, Default)]
pub struct MemoryRoleAuthority {
    members: BTreeMap<RoleId, BTreeSet<Account>>,
    admins: BTreeMap<RoleId, RoleId>,
}

impl MemoryRoleAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an authority with `root` holding [`ROOT_ADMIN_ROLE`].
    ///
    /// Bootstrap-only path; after construction all grants go through the
    /// admin-gated [`RoleAuthority::grant_role`].
    pub fn with_root(root: Account) -> Self {
        let mut authority = Self::new();
        authority
            .members
            .entry(ROOT_ADMIN_ROLE)
            .or_default()
            .insert(root);
        authority
    }

    fn require_admin(&self, role: RoleId, caller: &Account) -> Result<(), AuthorityError> {
        if self.has_role(self.role_admin(role), caller) {
            Ok(())
        } else {
            Err(AuthorityError::NotRoleAdmin {
                role,
                account: caller.clone(),
            })
        }
    }
}

impl RoleAuthority for MemoryRoleAuthority {
    fn has_role(&self, role: RoleId, account: &Account) -> bool {
        self.members
            .get(&role)
            .is_some_and(|holders| holders.contains(account))
    }

    fn role_admin(&self, role: RoleId) -> RoleId {
        self.admins.get(&role).copied().unwrap_or(ROOT_ADMIN_ROLE)
    }

    fn set_role_admin(&mut self, role: RoleId, admin_role: RoleId) {
        self.admins.insert(role, admin_role);
    }

    fn grant_role(
        &mut self,
        caller: &Account,
        role: RoleId,
        account: &Account,
    ) -> Result<(), AuthorityError> {
        self.require_admin(role, caller)?;
        self.members.entry(role).or_default().insert(account.clone());
        Ok(())
    }

    fn revoke_role(
        &mut self,
        caller: &Account,
        role: RoleId,
        account: &Account,
    ) -> Result<(), AuthorityError> {
        self.require_admin(role, caller)?;
        if let Some(holders) = self.members.get_mut(&role) {
            holders.remove(account);
        }
        Ok(())
    }
}
