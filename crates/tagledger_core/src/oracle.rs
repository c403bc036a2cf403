//! Ownership oracle seam.
//!
//! # Responsibility
//! - Define the read-only interface the registry uses to ask "who owns item
//!   X" against the external authoritative ledger.
//! - Provide an in-memory reference ledger for embedding and tests.
//!
//! # Invariants
//! - Non-existence ("burned or never minted") is data, not an error: it is
//!   the `ItemOwnership::NotFound` variant. `OracleError` is reserved for
//!   infrastructure failures and always propagates to the caller.
//! - The registry never mutates the ledger.

use crate::model::{Account, ItemId};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Outcome of one ownership lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOwnership {
    /// The item exists and is owned by this account.
    Owner(Account),
    /// The item was burned or never minted.
    NotFound,
}

/// Infrastructure failure while querying the ownership ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    Unavailable(String),
}

impl Display for OracleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(details) => {
                write!(f, "ownership ledger unavailable: {details}")
            }
        }
    }
}

impl Error for OracleError {}

/// Read-only ownership lookup interface consumed by the registry.
pub trait OwnershipOracle {
    fn owner_of(&self, item: ItemId) -> Result<ItemOwnership, OracleError>;
}

/// Precondition failures on the in-memory reference ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryLedgerError {
    ItemExists(ItemId),
    UnknownItem(ItemId),
}

impl Display for MemoryLedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemExists(item) => write!(f, "item already minted: {item}"),
            Self::UnknownItem(item) => write!(f, "item does not exist: {item}"),
        }
    }
}

impl Error for MemoryLedgerError {}

/// In-memory reference ledger with mint/transfer/burn lifecycle.
#[derive(Debug, Default)]
pub struct MemoryOwnershipOracle {
    owners: BTreeMap<ItemId, Account>,
}

impl MemoryOwnershipOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates one item owned by `owner`.
    pub fn mint(&mut self, item: ItemId, owner: Account) -> Result<(), MemoryLedgerError> {
        if self.owners.contains_key(&item) {
            return Err(MemoryLedgerError::ItemExists(item));
        }
        self.owners.insert(item, owner);
        Ok(())
    }

    /// Moves one item to a new owner.
    pub fn transfer(&mut self, item: ItemId, to: Account) -> Result<(), MemoryLedgerError> {
        let owner = self
            .owners
            .get_mut(&item)
            .ok_or(MemoryLedgerError::UnknownItem(item))?;
        *owner = to;
        Ok(())
    }

    /// Permanently destroys one item. Burned ids are never re-minted by
    /// this ledger's callers, but the type does not enforce that.
    pub fn burn(&mut self, item: ItemId) -> Result<(), MemoryLedgerError> {
        self.owners
            .remove(&item)
            .map(|_| ())
            .ok_or(MemoryLedgerError::UnknownItem(item))
    }
}

impl OwnershipOracle for MemoryOwnershipOracle {
    fn owner_of(&self, item: ItemId) -> Result<ItemOwnership, OracleError> {
        Ok(match self.owners.get(&item) {
            Some(owner) => ItemOwnership::Owner(owner.clone()),
            None => ItemOwnership::NotFound,
        })
    }
}
