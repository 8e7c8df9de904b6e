//! The inventory arena and its linkage algorithm.
//!
//! [`InventoryState`] owns every tracked [`Node`] in an identifier-keyed map.
//! Parent/child linkage is expressed purely as identifiers: a node's resolved
//! `parent` and a folder's `contents`. Nodes whose parent is not yet tracked
//! are indexed by the parent id they are waiting for, so the folder adopts
//! them the moment it is admitted.
//!
//! # Invariants
//!
//! - Every stored node is owned by `owner`.
//! - `node.parent == Some(f)` iff `node` appears exactly once in `f.contents`.
//! - An unlinked node (other than the root) with a non-nil parent id appears
//!   exactly once in `pending[parent_id]`.
//! - The root is never linked under another folder.
//! - Following `parent` links never revisits a node.
//!
//! This type is not synchronized; [`crate::Inventory`] wraps it in a mutex.

use std::collections::HashMap;

use grid_types::{InventoryId, InventoryRecord};
use tracing::{debug, trace, warn};

use crate::error::{InventoryError, InventoryResult};
use crate::event::InventoryEvent;
use crate::node::Node;

/// Where a record entered the store from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Explicit `manage` call: unknown parents create tracked orphans.
    Local,
    /// Transport update: unknown parents drop the record.
    Remote,
}

/// Outcome of offering a record to the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Admission {
    Added,
    Updated,
    RejectedOwner,
    RejectedKind,
    DroppedUnresolvedParent,
}

impl Admission {
    pub(crate) fn is_stored(self) -> bool {
        matches!(self, Self::Added | Self::Updated)
    }
}

#[derive(Debug)]
pub(crate) struct InventoryState {
    owner: InventoryId,
    root: InventoryId,
    nodes: HashMap<InventoryId, Node>,
    /// Orphans keyed by the parent id they are waiting for.
    pending: HashMap<InventoryId, Vec<InventoryId>>,
    /// Events produced by the current mutation, drained by the store.
    outbox: Vec<InventoryEvent>,
}

impl InventoryState {
    pub(crate) fn new(owner: InventoryId, root: InventoryId) -> Self {
        Self {
            owner,
            root,
            nodes: HashMap::new(),
            pending: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    pub(crate) fn owner(&self) -> InventoryId {
        self.owner
    }

    pub(crate) fn root(&self) -> InventoryId {
        self.root
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn get(&self, id: &InventoryId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn contains(&self, id: &InventoryId) -> bool {
        self.nodes.contains_key(id)
    }

    pub(crate) fn is_folder(&self, id: &InventoryId) -> bool {
        self.nodes.get(id).is_some_and(Node::is_folder)
    }

    /// Linked children of `id`; empty for items and unknown ids.
    pub(crate) fn children(&self, id: &InventoryId) -> &[InventoryId] {
        self.nodes.get(id).map(Node::contents).unwrap_or_default()
    }

    pub(crate) fn take_events(&mut self) -> Vec<InventoryEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ---------------------------------------------------------------
    // Admission (manage / apply_update)
    // ---------------------------------------------------------------

    /// Offer a record to the store. Both the local and the remote path land
    /// here; they differ only in how an unknown parent is handled for a
    /// previously unseen identifier.
    pub(crate) fn admit(&mut self, record: InventoryRecord, origin: Origin) -> Admission {
        let id = record.id();

        if record.owner_id() != self.owner {
            trace!(
                id = %id.short(),
                owner = %record.owner_id().short(),
                ?origin,
                "rejected record not owned by this inventory"
            );
            return Admission::RejectedOwner;
        }

        if let Some(node) = self.nodes.get_mut(&id) {
            if !node.same_kind(&record) {
                warn!(id = %id.short(), ?origin, "rejected record that changes node kind");
                return Admission::RejectedKind;
            }
            let old_parent_id = node.parent_id();
            let changed = node.replace_record(record);
            if changed {
                node.touch();
            }
            let relinked = self.relink(id, old_parent_id);
            if changed {
                if let Some(parent) = self.nodes.get(&id).and_then(Node::parent) {
                    self.touch(parent);
                }
            }
            if changed || relinked {
                self.outbox.push(InventoryEvent::Updated(id));
            }
            debug!(id = %id.short(), ?origin, changed, relinked, "updated node");
            return Admission::Updated;
        }

        if origin == Origin::Remote && !self.is_folder(&record.parent_id()) {
            debug!(
                id = %id.short(),
                parent = %record.parent_id().short(),
                "dropped update for unknown parent"
            );
            return Admission::DroppedUnresolvedParent;
        }

        let is_folder = record.is_folder();
        self.nodes.insert(id, Node::new(record));
        self.attach(id);
        self.outbox.push(InventoryEvent::Added(id));
        if is_folder {
            self.adopt(id);
        }
        debug!(id = %id.short(), ?origin, is_folder, "added node");
        Admission::Added
    }

    // ---------------------------------------------------------------
    // Structural commands
    // ---------------------------------------------------------------

    pub(crate) fn move_node(&mut self, id: InventoryId, new_parent: InventoryId) -> InventoryResult<()> {
        if id == self.root {
            return Err(InventoryError::RootMove);
        }
        let old_parent_id = self
            .nodes
            .get(&id)
            .map(Node::parent_id)
            .ok_or(InventoryError::NotFound(id))?;
        match self.nodes.get(&new_parent) {
            None => return Err(InventoryError::NotFound(new_parent)),
            Some(node) if !node.is_folder() => return Err(InventoryError::NotAFolder(new_parent)),
            Some(_) => {}
        }
        if self.is_ancestor_or_self(id, new_parent) {
            return Err(InventoryError::WouldCycle {
                node: id,
                target: new_parent,
            });
        }

        if let Some(node) = self.nodes.get_mut(&id) {
            if old_parent_id == new_parent && node.parent() == Some(new_parent) {
                return Ok(());
            }
            node.set_parent_id(new_parent);
            node.touch();
        }
        self.relink(id, old_parent_id);
        self.outbox.push(InventoryEvent::Updated(id));
        debug!(id = %id.short(), to = %new_parent.short(), "moved node");
        Ok(())
    }

    pub(crate) fn rename(&mut self, id: InventoryId, name: String) -> InventoryResult<()> {
        let node = self.nodes.get_mut(&id).ok_or(InventoryError::NotFound(id))?;
        if !node.set_name(name) {
            return Ok(());
        }
        node.touch();
        if let Some(parent) = node.parent() {
            self.touch(parent);
        }
        self.outbox.push(InventoryEvent::Updated(id));
        debug!(id = %id.short(), "renamed node");
        Ok(())
    }

    /// Remove `id` and, depth-first, everything linked beneath it.
    /// Returns the removed identifiers in removal order.
    pub(crate) fn remove(&mut self, id: InventoryId) -> InventoryResult<Vec<InventoryId>> {
        if id == self.root {
            return Err(InventoryError::RootRemoval);
        }
        let parent_id = self
            .nodes
            .get(&id)
            .map(Node::parent_id)
            .ok_or(InventoryError::NotFound(id))?;

        self.detach(id, parent_id);
        let mut removed = Vec::new();
        self.remove_subtree(id, &mut removed);
        debug!(id = %id.short(), count = removed.len(), "removed subtree");
        Ok(removed)
    }

    fn remove_subtree(&mut self, id: InventoryId, removed: &mut Vec<InventoryId>) {
        let children = self.children(&id).to_vec();
        for child in children {
            self.remove_subtree(child, removed);
        }
        if self.nodes.remove(&id).is_some() {
            self.outbox.push(InventoryEvent::Removed(id));
            removed.push(id);
        }
    }

    // ---------------------------------------------------------------
    // Linkage
    // ---------------------------------------------------------------

    /// The folder `id` should be linked under according to its record, or
    /// `None` if that parent is not a tracked folder (or linking would
    /// create a cycle).
    fn resolve_parent(&self, id: InventoryId) -> Option<InventoryId> {
        if id == self.root {
            return None;
        }
        let parent_id = self.nodes.get(&id)?.parent_id();
        if parent_id.is_nil() || !self.is_folder(&parent_id) {
            return None;
        }
        if self.is_ancestor_or_self(id, parent_id) {
            warn!(id = %id.short(), parent = %parent_id.short(), "refusing cyclic parent link");
            return None;
        }
        Some(parent_id)
    }

    /// Recompute linkage after the record's parent id may have changed from
    /// `old_parent_id`. Returns `true` if the resolved parent changed.
    fn relink(&mut self, id: InventoryId, old_parent_id: InventoryId) -> bool {
        let current = self.nodes.get(&id).and_then(Node::parent);
        let target = self.resolve_parent(id);
        if current.is_some() && current == target {
            return false;
        }
        self.detach(id, old_parent_id);
        self.attach(id);
        let changed = current != self.nodes.get(&id).and_then(Node::parent);
        if changed {
            self.retry_blocked();
        }
        changed
    }

    /// Unlink `id` from its resolved parent, or from the orphan index entry
    /// for `parent_id` if it is unlinked.
    fn detach(&mut self, id: InventoryId, parent_id: InventoryId) {
        let current = self.nodes.get(&id).and_then(Node::parent);
        match current {
            Some(parent) => {
                if let Some(folder) = self.nodes.get_mut(&parent) {
                    folder.remove_child(id);
                    folder.touch();
                }
            }
            None => {
                if let Some(waiting) = self.pending.get_mut(&parent_id) {
                    waiting.retain(|w| *w != id);
                    if waiting.is_empty() {
                        self.pending.remove(&parent_id);
                    }
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.set_parent(None);
        }
    }

    /// Link an unlinked node under its record's parent if possible,
    /// otherwise file it as an orphan.
    fn attach(&mut self, id: InventoryId) {
        let Some(parent_id) = self.nodes.get(&id).map(Node::parent_id) else {
            return;
        };
        match self.resolve_parent(id) {
            Some(parent) => {
                if let Some(folder) = self.nodes.get_mut(&parent) {
                    folder.push_child(id);
                    folder.touch();
                }
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.set_parent(Some(parent));
                }
            }
            None => {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.set_parent(None);
                }
                if id != self.root && !parent_id.is_nil() {
                    let waiting = self.pending.entry(parent_id).or_default();
                    if !waiting.contains(&id) {
                        waiting.push(id);
                    }
                    trace!(id = %id.short(), parent = %parent_id.short(), "node waiting for parent");
                }
            }
        }
    }

    /// Link every orphan waiting for `folder`.
    fn adopt(&mut self, folder: InventoryId) {
        let Some(waiting) = self.pending.remove(&folder) else {
            return;
        };
        let waited = waiting.len();
        let mut linked = 0usize;
        for orphan in waiting {
            if self.nodes.contains_key(&orphan) {
                self.attach(orphan);
                if self.nodes.get(&orphan).and_then(Node::parent) == Some(folder) {
                    self.outbox.push(InventoryEvent::Updated(orphan));
                    linked += 1;
                }
            }
        }
        debug!(folder = %folder.short(), waited, linked, "adopted waiting nodes");
    }

    /// Re-offer nodes that wait on a tracked folder. Only the cycle check
    /// leaves them there, and a linkage change may have cleared the cycle.
    fn retry_blocked(&mut self) {
        let blocked: Vec<InventoryId> = self
            .pending
            .keys()
            .filter(|parent| self.is_folder(parent))
            .copied()
            .collect();
        for folder in blocked {
            self.adopt(folder);
        }
    }

    /// Returns `true` if `ancestor` is `node` or appears on `node`'s chain
    /// of resolved parents.
    fn is_ancestor_or_self(&self, ancestor: InventoryId, node: InventoryId) -> bool {
        let mut cursor = Some(node);
        let mut steps = 0usize;
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            cursor = self.nodes.get(&current).and_then(Node::parent);
        }
        false
    }

    fn touch(&mut self, id: InventoryId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.touch();
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_for(&self, parent: &InventoryId) -> &[InventoryId] {
        self.pending.get(parent).map(Vec::as_slice).unwrap_or_default()
    }

    /// Check the linkage invariants. Used by tests.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        for (id, node) in &self.nodes {
            assert_eq!(node.owner_id(), self.owner, "foreign owner stored: {id}");
            match node.parent() {
                Some(parent) => {
                    let folder = self.nodes.get(&parent).expect("linked to untracked parent");
                    let hits = folder.contents().iter().filter(|c| *c == id).count();
                    assert_eq!(hits, 1, "node {id} linked but not listed once in {parent}");
                    assert_eq!(node.parent_id(), parent, "resolved parent disagrees with record");
                }
                None if *id != self.root && !node.parent_id().is_nil() => {
                    let hits = self.pending_for(&node.parent_id()).iter().filter(|w| *w == id).count();
                    assert_eq!(hits, 1, "orphan {id} not indexed once");
                }
                None => {}
            }
            for child in node.contents() {
                let c = self.nodes.get(child).expect("contents lists untracked node");
                assert_eq!(c.parent(), Some(*id), "child {child} does not point back");
            }
        }
        if let Some(root) = self.nodes.get(&self.root) {
            assert!(root.parent().is_none(), "root is linked");
        }
    }
}
