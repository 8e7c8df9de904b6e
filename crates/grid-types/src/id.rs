use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Globally unique 128-bit identifier for agents, groups, assets, items, and
/// folders on the grid.
///
/// The all-zero value is the "unset" sentinel: a record whose parent is
/// `InventoryId::nil()` has no parent, an item whose group is nil belongs to
/// no group.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryId(Uuid);

impl InventoryId {
    /// The nil identifier (all zeros). Represents "no value".
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns `true` if this is the nil identifier.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// A fresh random (v4) identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Wrap a `u128`, mostly useful for readable fixtures.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// The raw 16 bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Short form (first 8 hex characters) for log lines.
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }

    /// Parse from the hyphenated or simple hex form.
    pub fn parse_str(s: &str) -> Result<Self, TypeError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| TypeError::InvalidId(format!("{s}: {e}")))
    }
}

impl fmt::Debug for InventoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InventoryId({})", self.short())
    }
}

impl fmt::Display for InventoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for InventoryId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl From<Uuid> for InventoryId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<InventoryId> for Uuid {
    fn from(id: InventoryId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_is_all_zeros() {
        let nil = InventoryId::nil();
        assert!(nil.is_nil());
        assert_eq!(nil.as_bytes(), &[0u8; 16]);
        assert_eq!(InventoryId::default(), nil);
    }

    #[test]
    fn random_ids_are_unique_and_not_nil() {
        let a = InventoryId::random();
        let b = InventoryId::random();
        assert_ne!(a, b);
        assert!(!a.is_nil());
    }

    #[test]
    fn display_is_hyphenated() {
        let id = InventoryId::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        assert_eq!(id.to_string(), "01234567-89ab-cdef-0123-456789abcdef");
        assert_eq!(id.short(), "01234567");
    }

    #[test]
    fn parse_accepts_both_forms() {
        let id = InventoryId::random();
        let hyphenated: InventoryId = id.to_string().parse().unwrap();
        let simple = InventoryId::parse_str(&id.to_string().replace('-', "")).unwrap();
        assert_eq!(id, hyphenated);
        assert_eq!(id, simple);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = InventoryId::parse_str("not-a-uuid").unwrap_err();
        assert!(matches!(err, TypeError::InvalidId(_)));
    }

    #[test]
    fn serde_is_plain_string() {
        let id = InventoryId::from_u128(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000007\"");
        let parsed: InventoryId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
