//! Tag mutation protocol and derived queries.
//!
//! # Responsibility
//! - Gate add/remove mutations on the caller holding the role named by the
//!   tag token.
//! - Run the burn-safe public cleanup path for destroyed items.
//! - Answer account-level tag queries through the representative item.
//!
//! # Invariants
//! - Every mutation is all-or-nothing; a failed precondition leaves no
//!   partial state.
//! - The item's owner is read from the oracle at call time, never cached.
//! - The automatic representative default never overwrites an existing
//!   entry ("first qualifying item wins").

use crate::authority::RoleAuthority;
use crate::model::{Account, ItemId, RoleId, TagId};
use crate::oracle::{ItemOwnership, OracleError, OwnershipOracle};
use crate::repo::registry_repo::{RegistryStore, RepoError, TagEvent};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Tunable registry policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// When true, a successful tag-add assigns the item as the owner's
    /// representative item if the owner has none yet.
    pub auto_default: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { auto_default: true }
    }
}

/// Service error for registry use-cases.
#[derive(Debug)]
pub enum RegistryError {
    /// The item already carries the tag.
    AlreadyTagged { tag: TagId, item: ItemId },
    /// The item does not carry the tag.
    NotTagged { tag: TagId, item: ItemId },
    /// Burn-safe removal was attempted on a live item.
    TokenNotBurned(ItemId),
    /// The caller does not hold the required role.
    Unauthorized { role: RoleId, account: Account },
    /// The ownership ledger reports the item as nonexistent.
    ItemNotFound(ItemId),
    /// Ownership ledger infrastructure failure.
    Oracle(OracleError),
    /// Persistence-layer failure.
    Store(RepoError),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyTagged { tag, item } => {
                write!(f, "item {item} already carries tag {tag}")
            }
            Self::NotTagged { tag, item } => {
                write!(f, "item {item} does not carry tag {tag}")
            }
            Self::TokenNotBurned(item) => {
                write!(f, "item {item} still has a live owner; not burned")
            }
            Self::Unauthorized { role, account } => {
                write!(f, "account {account} does not hold role {role}")
            }
            Self::ItemNotFound(item) => write!(f, "item not found: {item}"),
            Self::Oracle(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Oracle(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RegistryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::AlreadyTagged { tag, item } => Self::AlreadyTagged { tag, item },
            RepoError::NotTagged { tag, item } => Self::NotTagged { tag, item },
            other => Self::Store(other),
        }
    }
}

impl From<OracleError> for RegistryError {
    fn from(value: OracleError) -> Self {
        Self::Oracle(value)
    }
}

/// Registry facade over storage, ownership oracle, and role authority.
pub struct TagRegistry<S, O, A> {
    store: S,
    oracle: O,
    authority: A,
    config: RegistryConfig,
}

impl<S, O, A> TagRegistry<S, O, A>
where
    S: RegistryStore,
    O: OwnershipOracle,
    A: RoleAuthority,
{
    /// Creates a registry with default policies.
    pub fn new(store: S, oracle: O, authority: A) -> Self {
        Self::with_config(store, oracle, authority, RegistryConfig::default())
    }

    pub fn with_config(store: S, oracle: O, authority: A, config: RegistryConfig) -> Self {
        Self {
            store,
            oracle,
            authority,
            config,
        }
    }

    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// External ledger mutations (mint/transfer/burn) happen outside the
    /// registry; this accessor exists for hosts that embed the reference
    /// ledger directly.
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    pub fn authority_mut(&mut self) -> &mut A {
        &mut self.authority
    }

    /// Attaches `tag` to `item`.
    ///
    /// `caller` must hold the role named by `tag`. On success the item's
    /// current owner may receive the item as representative default, per
    /// [`RegistryConfig::auto_default`].
    pub fn add_tag(
        &mut self,
        caller: &Account,
        item: ItemId,
        tag: TagId,
    ) -> Result<(), RegistryError> {
        self.require_role(tag, caller)?;

        if self.store.item_has_tag(tag, item)? {
            warn!("event=tag_add module=service status=rejected reason=already_tagged tag={tag} item={item}");
            return Err(RegistryError::AlreadyTagged { tag, item });
        }

        let owner = match self.oracle.owner_of(item)? {
            ItemOwnership::Owner(owner) => owner,
            ItemOwnership::NotFound => {
                warn!("event=tag_add module=service status=rejected reason=item_not_found tag={tag} item={item}");
                return Err(RegistryError::ItemNotFound(item));
            }
        };

        let default_for = self.default_assignment_target(&owner)?;
        self.store.add_tag(tag, item, default_for.as_ref())?;

        info!(
            "event=tag_add module=service status=ok tag={tag} item={item} caller={caller} default_assigned={}",
            default_for.is_some()
        );
        Ok(())
    }

    /// Detaches `tag` from `item`. `caller` must hold the role named by `tag`.
    pub fn remove_tag(
        &mut self,
        caller: &Account,
        item: ItemId,
        tag: TagId,
    ) -> Result<(), RegistryError> {
        self.require_role(tag, caller)?;
        self.store.remove_tag(tag, item)?;
        info!("event=tag_remove module=service status=ok tag={tag} item={item} caller={caller}");
        Ok(())
    }

    /// Detaches `tag` from a burned `item`. Public: callable by anyone.
    ///
    /// Once an item is destroyed no owner exists to be re-tagged under
    /// authorization, so cleanup is open to prevent permanent count drift.
    /// Fails with `TokenNotBurned` while the ledger still reports an owner.
    pub fn remove_tag_from_burned(
        &mut self,
        item: ItemId,
        tag: TagId,
    ) -> Result<(), RegistryError> {
        match self.oracle.owner_of(item)? {
            ItemOwnership::Owner(_) => {
                warn!("event=tag_remove_burned module=service status=rejected reason=not_burned tag={tag} item={item}");
                Err(RegistryError::TokenNotBurned(item))
            }
            ItemOwnership::NotFound => {
                self.store.remove_tag(tag, item)?;
                info!("event=tag_remove_burned module=service status=ok tag={tag} item={item}");
                Ok(())
            }
        }
    }

    /// Answers whether `account` currently holds `tag` through its
    /// representative item.
    ///
    /// Returns false for accounts with no representative, and for stale
    /// representatives the account no longer owns (including burned items).
    /// Never errors on non-existence; only oracle infrastructure failures
    /// propagate.
    pub fn has_tag(&self, account: &Account, tag: TagId) -> Result<bool, RegistryError> {
        let Some(item) = self.store.resolve_default(account)? else {
            return Ok(false);
        };

        match self.oracle.owner_of(item)? {
            ItemOwnership::Owner(owner) if owner == *account => {
                Ok(self.store.item_has_tag(tag, item)?)
            }
            _ => Ok(false),
        }
    }

    /// Direct item-scoped membership lookup, no ownership re-validation.
    pub fn item_has_tag(&self, item: ItemId, tag: TagId) -> Result<bool, RegistryError> {
        Ok(self.store.item_has_tag(tag, item)?)
    }

    /// Live count of items carrying `tag`.
    pub fn total_tag_havers(&self, tag: TagId) -> Result<u64, RegistryError> {
        Ok(self.store.tag_count(tag)?)
    }

    /// Self-service representative override: `caller` overwrites their own
    /// entry unconditionally. The entry is never asserted valid; account
    /// queries re-validate ownership on every read.
    pub fn set_default(&mut self, caller: &Account, item: ItemId) -> Result<(), RegistryError> {
        self.store.set_default(caller, item)?;
        info!("event=default_set module=service status=ok account={caller} item={item}");
        Ok(())
    }

    /// Delegates administration of `role` to `admin_role`.
    ///
    /// `caller` must hold the role's current admin role. This is how a
    /// top-level administrator hands tag management to a second tier without
    /// granting full administrative control.
    pub fn set_role_admin(
        &mut self,
        caller: &Account,
        role: RoleId,
        admin_role: RoleId,
    ) -> Result<(), RegistryError> {
        let current_admin = self.authority.role_admin(role);
        if !self.authority.has_role(current_admin, caller) {
            warn!("event=role_admin_set module=service status=rejected role={role} caller={caller}");
            return Err(RegistryError::Unauthorized {
                role: current_admin,
                account: caller.clone(),
            });
        }

        self.authority.set_role_admin(role, admin_role);
        info!("event=role_admin_set module=service status=ok role={role} admin_role={admin_role} caller={caller}");
        Ok(())
    }

    /// Returns notifications appended after `after_seq`, in append order.
    pub fn events_since(&self, after_seq: i64) -> Result<Vec<TagEvent>, RegistryError> {
        Ok(self.store.events_since(after_seq)?)
    }

    fn require_role(&self, role: RoleId, caller: &Account) -> Result<(), RegistryError> {
        if self.authority.has_role(role, caller) {
            Ok(())
        } else {
            warn!("event=role_check module=service status=rejected role={role} caller={caller}");
            Err(RegistryError::Unauthorized {
                role,
                account: caller.clone(),
            })
        }
    }

    /// Post-add default policy: the first tagged item an owner qualifies for
    /// becomes their representative, once. Returns the account to assign for,
    /// or `None` when the policy is disabled or an entry already exists.
    fn default_assignment_target(
        &self,
        owner: &Account,
    ) -> Result<Option<Account>, RegistryError> {
        if !self.config.auto_default {
            return Ok(None);
        }
        if self.store.resolve_default(owner)?.is_some() {
            return Ok(None);
        }
        Ok(Some(owner.clone()))
    }
}
