//! Inventory manifests: a skeleton plus any items known up front.

use std::path::Path;

use anyhow::Context;
use grid_inventory::{Inventory, InventorySkeleton};
use grid_types::{FolderRecord, InventoryId, ItemRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub owner: InventoryId,
    pub root: InventoryId,
    #[serde(default)]
    pub folders: Vec<FolderRecord>,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

/// A store built from a manifest.
pub struct Loaded {
    pub inventory: Inventory,
    /// Items the store refused (foreign owner).
    pub rejected: usize,
}

impl Manifest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing manifest {}", path.display()))
    }

    pub fn build(self) -> anyhow::Result<Loaded> {
        let skeleton = InventorySkeleton::new(self.root, self.folders);
        let inventory = Inventory::new(self.owner, skeleton)?;
        let mut rejected = 0;
        for item in self.items {
            if inventory.manage(item).is_none() {
                rejected += 1;
            }
        }
        debug!(nodes = inventory.len(), rejected, "manifest loaded");
        Ok(Loaded { inventory, rejected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn manifest() -> Manifest {
        let owner = InventoryId::random();
        let root = InventoryId::random();
        let objects = FolderRecord::new(InventoryId::random())
            .with_parent(root)
            .with_owner(owner)
            .with_name("Objects");
        let mut foreign = ItemRecord::new(InventoryId::random())
            .with_parent(objects.id)
            .with_name("Foreign");
        foreign.owner_id = InventoryId::random();
        Manifest {
            owner,
            root,
            items: vec![
                ItemRecord::new(InventoryId::random())
                    .with_parent(objects.id)
                    .with_owner(owner)
                    .with_name("Tilly"),
                foreign,
            ],
            folders: vec![
                objects,
                FolderRecord::new(root).with_owner(owner).with_name("My Inventory"),
            ],
        }
    }

    #[test]
    fn build_links_and_counts_rejections() {
        let loaded = manifest().build().unwrap();
        assert_eq!(loaded.rejected, 1);
        assert_eq!(loaded.inventory.len(), 3);
        assert_eq!(loaded.inventory.path_resolve_str("Objects/Tilly").len(), 1);
    }

    #[test]
    fn load_reads_sparse_json() {
        let m = manifest();
        let json = serde_json::json!({
            "owner": m.owner,
            "root": m.root,
            "folders": [{ "id": m.root, "owner_id": m.owner, "name": "My Inventory" }],
        });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{json}").unwrap();
        let loaded = Manifest::load(file.path()).unwrap();
        assert!(loaded.items.is_empty());
        assert_eq!(loaded.folders[0].name, "My Inventory");
        assert_eq!(loaded.build().unwrap().inventory.len(), 1);
    }

    #[test]
    fn missing_root_is_an_error() {
        let mut m = manifest();
        m.folders.retain(|f| f.id != m.root);
        assert!(m.build().is_err());
    }
}
