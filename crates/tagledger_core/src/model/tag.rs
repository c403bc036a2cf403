//! Opaque tag token model.
//!
//! # Responsibility
//! - Define the hash-sized token identifying one tag.
//! - Keep the token space shared with the role authority, so every tag is
//!   also the role that gates mutations of that tag.
//!
//! # Invariants
//! - A token's identity is stable and comparable by equality only.
//! - The same label always derives the same token.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, hash-sized tag token.
///
/// Labels never exist at runtime; callers derive a token once via
/// [`TagId::from_label`] and pass the token everywhere after that.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TagId(Uuid);

/// Role identifier in the external role authority.
///
/// Kept as a type alias: the registry reuses the tag token space as the
/// permission space, so holding role `t` means being allowed to tag with `t`.
pub type RoleId = TagId;

impl TagId {
    /// The all-zero token. Reserved as the root administration role.
    pub const NIL: TagId = TagId(Uuid::nil());

    /// Derives the stable token for a human-readable label.
    pub fn from_label(label: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, label.as_bytes()))
    }

    /// Creates a fresh random token with no label provenance.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for TagId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TagId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::TagId;

    #[test]
    fn label_derivation_is_stable() {
        assert_eq!(TagId::from_label("verified"), TagId::from_label("verified"));
        assert_ne!(TagId::from_label("verified"), TagId::from_label("banned"));
    }

    #[test]
    fn labels_are_case_sensitive_tokens() {
        assert_ne!(TagId::from_label("Verified"), TagId::from_label("verified"));
    }

    #[test]
    fn display_parse_round_trips() {
        let tag = TagId::from_label("verified");
        let parsed: TagId = tag.to_string().parse().expect("token text should parse");
        assert_eq!(parsed, tag);
    }

    #[test]
    fn nil_token_is_distinct_from_derived_tokens() {
        assert_ne!(TagId::NIL, TagId::from_label(""));
    }
}
