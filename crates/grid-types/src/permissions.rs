use std::fmt;

use serde::{Deserialize, Serialize};

/// A 32-bit permission bit set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMask(pub u32);

impl PermissionMask {
    pub const NONE: Self = Self(0);
    pub const TRANSFER: Self = Self(1 << 13);
    pub const MODIFY: Self = Self(1 << 14);
    pub const COPY: Self = Self(1 << 15);
    pub const MOVE: Self = Self(1 << 19);
    pub const ALL: Self = Self(0x7FFF_FFFF);

    /// The raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two masks.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl fmt::Debug for PermissionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PermissionMask({:08x})", self.0)
    }
}

impl fmt::LowerHex for PermissionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl std::ops::BitOr for PermissionMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// The five permission masks carried by every inventory item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Permissions {
    pub base_mask: PermissionMask,
    pub owner_mask: PermissionMask,
    pub group_mask: PermissionMask,
    pub everyone_mask: PermissionMask,
    pub next_owner_mask: PermissionMask,
}

impl Permissions {
    /// No permissions in any mask.
    pub const NONE: Self = Self::new(0, 0, 0, 0, 0);

    /// Full permissions in every mask.
    pub const FULL: Self = Self {
        base_mask: PermissionMask::ALL,
        owner_mask: PermissionMask::ALL,
        group_mask: PermissionMask::ALL,
        everyone_mask: PermissionMask::ALL,
        next_owner_mask: PermissionMask::ALL,
    };

    pub const fn new(base: u32, owner: u32, group: u32, everyone: u32, next_owner: u32) -> Self {
        Self {
            base_mask: PermissionMask(base),
            owner_mask: PermissionMask(owner),
            group_mask: PermissionMask(group),
            everyone_mask: PermissionMask(everyone),
            next_owner_mask: PermissionMask(next_owner),
        }
    }
}
