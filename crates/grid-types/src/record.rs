//! Raw item and folder records as the server describes them.
//!
//! Records carry no tree linkage. They are plain values: equality is
//! field-by-field and cloning is cheap enough for per-update use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codes::{AssetType, InventoryType, SaleType};
use crate::id::InventoryId;
use crate::permissions::Permissions;

/// The server's view of one inventory item.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemRecord {
    pub id: InventoryId,
    pub parent_id: InventoryId,
    pub owner_id: InventoryId,
    pub name: String,
    pub description: String,
    pub creator_id: InventoryId,
    pub group_id: InventoryId,
    pub group_owned: bool,
    pub asset_id: InventoryId,
    pub asset_type: AssetType,
    pub inventory_type: InventoryType,
    pub permissions: Permissions,
    pub sale_type: SaleType,
    pub sale_price: i32,
    pub flags: u32,
    pub creation_date: DateTime<Utc>,
}

impl ItemRecord {
    /// An otherwise-empty record for `id`.
    pub fn new(id: InventoryId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Builder-style helper used heavily by fixtures.
    pub fn with_parent(mut self, parent_id: InventoryId) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_owner(mut self, owner_id: InventoryId) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// The server's view of one inventory folder ("category").
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderRecord {
    pub id: InventoryId,
    pub parent_id: InventoryId,
    pub owner_id: InventoryId,
    pub name: String,
    /// The type of item this folder conventionally holds.
    pub preferred_type: AssetType,
    pub version: i32,
    /// Volatile statistic reported by the server. Not part of the text form.
    pub descendent_count: i32,
}

impl FolderRecord {
    pub fn new(id: InventoryId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: InventoryId) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_owner(mut self, owner_id: InventoryId) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Either kind of record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InventoryRecord {
    Item(ItemRecord),
    Folder(FolderRecord),
}

impl InventoryRecord {
    pub fn id(&self) -> InventoryId {
        match self {
            Self::Item(r) => r.id,
            Self::Folder(r) => r.id,
        }
    }

    pub fn parent_id(&self) -> InventoryId {
        match self {
            Self::Item(r) => r.parent_id,
            Self::Folder(r) => r.parent_id,
        }
    }

    pub fn owner_id(&self) -> InventoryId {
        match self {
            Self::Item(r) => r.owner_id,
            Self::Folder(r) => r.owner_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Item(r) => &r.name,
            Self::Folder(r) => &r.name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }
}

impl From<ItemRecord> for InventoryRecord {
    fn from(record: ItemRecord) -> Self {
        Self::Item(record)
    }
}

impl From<FolderRecord> for InventoryRecord {
    fn from(record: FolderRecord) -> Self {
        Self::Folder(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_structural() {
        let id = InventoryId::random();
        let a = ItemRecord::new(id).with_name("Tilly");
        let mut b = a.clone();
        assert_eq!(a, b);
        b.flags = 1;
        assert_ne!(a, b);
    }

    #[test]
    fn folder_equality_includes_descendent_count() {
        let f = FolderRecord::new(InventoryId::random());
        let mut g = f.clone();
        g.descendent_count = 3;
        assert_ne!(f, g);
    }

    #[test]
    fn record_projections() {
        let owner = InventoryId::random();
        let parent = InventoryId::random();
        let folder = FolderRecord::new(InventoryId::random())
            .with_parent(parent)
            .with_owner(owner)
            .with_name("Objects");
        let rec = InventoryRecord::from(folder.clone());
        assert_eq!(rec.id(), folder.id);
        assert_eq!(rec.parent_id(), parent);
        assert_eq!(rec.owner_id(), owner);
        assert_eq!(rec.name(), "Objects");
        assert!(rec.is_folder());
    }

    #[test]
    fn serde_tags_record_kind() {
        let rec = InventoryRecord::from(ItemRecord::new(InventoryId::from_u128(1)));
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["kind"], "item");
        let back: InventoryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
    }
}
