//! Account identifier model.
//!
//! # Responsibility
//! - Represent one external-ledger identity in normalized form.
//! - Reject malformed identities at the boundary instead of storing them.
//!
//! # Invariants
//! - Stored form is always `0x` followed by exactly 40 lowercase hex chars.
//! - Two accounts differing only in input casing compare equal.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const ACCOUNT_HEX_CHARS: usize = 40;

/// Normalized address-like identity from the external ownership ledger.
///
/// The registry keeps no record of accounts beyond their representative-item
/// entry; this type only guarantees a canonical comparable spelling.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Account(String);

impl Account {
    /// Parses and normalizes one account identity.
    pub fn parse(value: &str) -> Result<Self, AccountParseError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AccountParseError::Empty);
        }

        let lowered = trimmed.to_ascii_lowercase();
        let hex = lowered
            .strip_prefix("0x")
            .ok_or(AccountParseError::MissingPrefix)?;

        if hex.chars().count() != ACCOUNT_HEX_CHARS {
            return Err(AccountParseError::BadLength(hex.chars().count()));
        }
        if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(AccountParseError::BadCharacter(bad));
        }

        Ok(Self(lowered))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Account {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Account {
    type Err = AccountParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Account {
    type Error = AccountParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Account> for String {
    fn from(value: Account) -> Self {
        value.0
    }
}

/// Account normalization failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountParseError {
    Empty,
    MissingPrefix,
    BadLength(usize),
    BadCharacter(char),
}

impl Display for AccountParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "account is required"),
            Self::MissingPrefix => write!(f, "account must start with `0x`"),
            Self::BadLength(found) => write!(
                f,
                "account must contain exactly {ACCOUNT_HEX_CHARS} hex chars, found {found}"
            ),
            Self::BadCharacter(c) => write!(f, "account contains non-hex character `{c}`"),
        }
    }
}

impl Error for AccountParseError {}
