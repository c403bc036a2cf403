//! Domain identifier models shared across the registry.

pub mod account;
pub mod item;
pub mod tag;

pub use account::{Account, AccountParseError};
pub use item::ItemId;
pub use tag::{RoleId, TagId};
