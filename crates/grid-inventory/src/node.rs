//! Tree nodes wrapping raw records.
//!
//! A [`Node`] is a record plus its resolved linkage: the parent folder it is
//! currently linked under (if any) and, for folders, the ordered list of
//! linked children. Linkage is stored as identifiers into the owning arena,
//! never as owning pointers.

use grid_types::{FolderRecord, InventoryId, InventoryRecord, ItemRecord};
use serde::{Deserialize, Serialize};

/// The two node variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Item(ItemRecord),
    Folder {
        record: FolderRecord,
        /// Linked children in insertion order.
        contents: Vec<InventoryId>,
    },
}

/// A tracked item or folder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    kind: NodeKind,
    /// Resolved parent. `None` means the record's parent id does not map to
    /// a tracked folder, or this node is the root.
    parent: Option<InventoryId>,
    /// Bumped whenever this node's record changes or, for folders, whenever
    /// the set of linked children changes.
    revision: u64,
}

impl Node {
    pub(crate) fn new(record: InventoryRecord) -> Self {
        let kind = match record {
            InventoryRecord::Item(item) => NodeKind::Item(item),
            InventoryRecord::Folder(folder) => NodeKind::Folder {
                record: folder,
                contents: Vec::new(),
            },
        };
        Self {
            kind,
            parent: None,
            revision: 0,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn id(&self) -> InventoryId {
        match &self.kind {
            NodeKind::Item(r) => r.id,
            NodeKind::Folder { record, .. } => record.id,
        }
    }

    /// The parent id as recorded by the server (or last local move).
    pub fn parent_id(&self) -> InventoryId {
        match &self.kind {
            NodeKind::Item(r) => r.parent_id,
            NodeKind::Folder { record, .. } => record.parent_id,
        }
    }

    pub fn owner_id(&self) -> InventoryId {
        match &self.kind {
            NodeKind::Item(r) => r.owner_id,
            NodeKind::Folder { record, .. } => record.owner_id,
        }
    }

    pub fn name(&self) -> &str {
        match &self.kind {
            NodeKind::Item(r) => &r.name,
            NodeKind::Folder { record, .. } => &record.name,
        }
    }

    /// The folder this node is currently linked under.
    pub fn parent(&self) -> Option<InventoryId> {
        self.parent
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    pub fn is_item(&self) -> bool {
        matches!(self.kind, NodeKind::Item(_))
    }

    /// Linked children. Always empty for items.
    pub fn contents(&self) -> &[InventoryId] {
        match &self.kind {
            NodeKind::Item(_) => &[],
            NodeKind::Folder { contents, .. } => contents,
        }
    }

    pub fn item(&self) -> Option<&ItemRecord> {
        match &self.kind {
            NodeKind::Item(r) => Some(r),
            NodeKind::Folder { .. } => None,
        }
    }

    pub fn folder(&self) -> Option<&FolderRecord> {
        match &self.kind {
            NodeKind::Item(_) => None,
            NodeKind::Folder { record, .. } => Some(record),
        }
    }

    /// A copy of the wrapped record.
    pub fn record(&self) -> InventoryRecord {
        match &self.kind {
            NodeKind::Item(r) => InventoryRecord::Item(r.clone()),
            NodeKind::Folder { record, .. } => InventoryRecord::Folder(record.clone()),
        }
    }

    // ---------------------------------------------------------------
    // Crate-internal mutation (linkage is owned by the state)
    // ---------------------------------------------------------------

    /// Returns `true` if `record` is the same variant as this node.
    pub(crate) fn same_kind(&self, record: &InventoryRecord) -> bool {
        self.is_folder() == record.is_folder()
    }

    /// Replace the wrapped record in place, keeping linkage. Returns `true`
    /// if any field changed. The caller guarantees the variant matches.
    pub(crate) fn replace_record(&mut self, record: InventoryRecord) -> bool {
        match (&mut self.kind, record) {
            (NodeKind::Item(current), InventoryRecord::Item(new)) => {
                let changed = *current != new;
                *current = new;
                changed
            }
            (NodeKind::Folder { record: current, .. }, InventoryRecord::Folder(new)) => {
                let changed = *current != new;
                *current = new;
                changed
            }
            _ => false,
        }
    }

    pub(crate) fn set_parent_id(&mut self, parent_id: InventoryId) {
        match &mut self.kind {
            NodeKind::Item(r) => r.parent_id = parent_id,
            NodeKind::Folder { record, .. } => record.parent_id = parent_id,
        }
    }

    pub(crate) fn set_name(&mut self, name: String) -> bool {
        let slot = match &mut self.kind {
            NodeKind::Item(r) => &mut r.name,
            NodeKind::Folder { record, .. } => &mut record.name,
        };
        if *slot == name {
            return false;
        }
        *slot = name;
        true
    }

    pub(crate) fn set_parent(&mut self, parent: Option<InventoryId>) {
        self.parent = parent;
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    pub(crate) fn push_child(&mut self, child: InventoryId) {
        if let NodeKind::Folder { contents, .. } = &mut self.kind {
            if !contents.contains(&child) {
                contents.push(child);
            }
        }
    }

    pub(crate) fn remove_child(&mut self, child: InventoryId) -> bool {
        match &mut self.kind {
            NodeKind::Folder { contents, .. } => {
                let before = contents.len();
                contents.retain(|c| *c != child);
                contents.len() != before
            }
            NodeKind::Item(_) => false,
        }
    }
}
