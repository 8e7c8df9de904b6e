use grid_types::{FolderRecord, InventoryId};
use serde::{Deserialize, Serialize};

/// Bootstrap manifest received at login: the known folders and which of
/// them is the inventory root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySkeleton {
    pub root: InventoryId,
    #[serde(default)]
    pub folders: Vec<FolderRecord>,
}

impl InventorySkeleton {
    pub fn new(root: InventoryId, folders: Vec<FolderRecord>) -> Self {
        Self { root, folders }
    }

    /// A skeleton holding only a root folder named `name`.
    pub fn with_root(owner: InventoryId, root: InventoryId, name: impl Into<String>) -> Self {
        let folder = FolderRecord::new(root).with_owner(owner).with_name(name);
        Self::new(root, vec![folder])
    }
}
