//! Inbound update messages and outbound change notifications.

use grid_types::{FolderRecord, InventoryId, InventoryRecord, ItemRecord};
use serde::{Deserialize, Serialize};

/// An update delivered by the transport: "item updated" or "folder updated".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryUpdate {
    Item(ItemRecord),
    Folder(FolderRecord),
}

impl InventoryUpdate {
    pub fn id(&self) -> InventoryId {
        match self {
            Self::Item(r) => r.id,
            Self::Folder(r) => r.id,
        }
    }

    pub fn into_record(self) -> InventoryRecord {
        match self {
            Self::Item(r) => InventoryRecord::Item(r),
            Self::Folder(r) => InventoryRecord::Folder(r),
        }
    }
}

impl From<ItemRecord> for InventoryUpdate {
    fn from(record: ItemRecord) -> Self {
        Self::Item(record)
    }
}

impl From<FolderRecord> for InventoryUpdate {
    fn from(record: FolderRecord) -> Self {
        Self::Folder(record)
    }
}

impl From<InventoryRecord> for InventoryUpdate {
    fn from(record: InventoryRecord) -> Self {
        match record {
            InventoryRecord::Item(r) => Self::Item(r),
            InventoryRecord::Folder(r) => Self::Folder(r),
        }
    }
}

/// A change to the local mirror, broadcast to subscribers after the
/// mutation that caused it has completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryEvent {
    /// A node was stored for the first time.
    Added(InventoryId),
    /// A stored node's record or linkage changed.
    Updated(InventoryId),
    /// A node was removed (directly or as a descendant of a removed folder).
    Removed(InventoryId),
}

impl InventoryEvent {
    pub fn id(&self) -> InventoryId {
        match self {
            Self::Added(id) | Self::Updated(id) | Self::Removed(id) => *id,
        }
    }
}

impl std::fmt::Display for InventoryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added(id) => write!(f, "added {}", id.short()),
            Self::Updated(id) => write!(f, "updated {}", id.short()),
            Self::Removed(id) => write!(f, "removed {}", id.short()),
        }
    }
}
