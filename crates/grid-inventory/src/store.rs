//! The shared, lock-protected inventory store.
//!
//! [`Inventory`] is a cheap-to-clone handle around one [`InventoryState`]
//! guarded by a single mutex. Every mutation runs to completion under the
//! lock, then publishes its events on a broadcast channel and wakes any
//! thread blocked in [`Inventory::wait_for_folder_change`] or
//! [`Inventory::wait_for_folder_contents`].
//!
//! [`NodeRef`] is a live view of one tracked node: each accessor takes the
//! lock and reads the current state, so a handle obtained before an update
//! observes the update.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use grid_types::{FolderRecord, InventoryId, InventoryRecord, ItemRecord};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::{InventoryError, InventoryResult};
use crate::event::{InventoryEvent, InventoryUpdate};
use crate::node::Node;
use crate::path;
use crate::skeleton::InventorySkeleton;
use crate::state::{InventoryState, Origin};

/// Capacity of the change-event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// A broadcast receiver for inventory change events.
pub type EventStream = broadcast::Receiver<InventoryEvent>;

struct Shared {
    state: Mutex<InventoryState>,
    changed: Condvar,
    events: broadcast::Sender<InventoryEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, InventoryState> {
        // Every mutation leaves the state consistent before it can panic
        // out, so a poisoned lock still guards valid data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a mutation under the lock, then publish what it produced.
    fn mutate<T>(&self, f: impl FnOnce(&mut InventoryState) -> T) -> T {
        let (out, events) = {
            let mut state = self.lock();
            let out = f(&mut state);
            (out, state.take_events())
        };
        if !events.is_empty() {
            for event in events {
                // No receivers is fine.
                let _ = self.events.send(event);
            }
            self.changed.notify_all();
        }
        out
    }
}

/// The local mirror of one owner's inventory.
#[derive(Clone)]
pub struct Inventory {
    shared: Arc<Shared>,
}

impl Inventory {
    /// Build a store for `owner`, seeded from `skeleton`.
    ///
    /// Every skeleton folder goes through the ownership-checked `manage`
    /// path. Fails if the designated root was not admitted as a folder.
    pub fn new(owner: InventoryId, skeleton: InventorySkeleton) -> InventoryResult<Self> {
        if owner.is_nil() {
            warn!("inventory owner is the nil identifier");
        }
        let root = skeleton.root;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let inventory = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(InventoryState::new(owner, root)),
                changed: Condvar::new(),
                events,
            }),
        };

        let offered = skeleton.folders.len();
        for folder in skeleton.folders {
            inventory.manage_folder(folder);
        }
        let (tracked, root_ok) = {
            let state = inventory.shared.lock();
            (state.len(), state.is_folder(&root))
        };
        if !root_ok {
            return Err(InventoryError::RootNotManaged(root));
        }
        info!(
            owner = %owner.short(),
            root = %root.short(),
            offered,
            tracked,
            "inventory store ready"
        );
        Ok(inventory)
    }

    pub fn owner(&self) -> InventoryId {
        self.shared.lock().owner()
    }

    pub fn root_id(&self) -> InventoryId {
        self.shared.lock().root()
    }

    /// Handle to the root folder.
    pub fn root(&self) -> NodeRef {
        self.node_ref(self.root_id())
    }

    /// Number of tracked nodes, orphans included.
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: InventoryId) -> bool {
        self.shared.lock().contains(&id)
    }

    pub fn lookup(&self, id: InventoryId) -> Option<NodeRef> {
        self.contains(id).then(|| self.node_ref(id))
    }

    /// Store a locally originated record.
    ///
    /// Returns `None` if the record is not owned by this inventory (or would
    /// change an existing node's kind). A record whose parent is not yet
    /// tracked is stored unlinked and linked once the parent arrives.
    pub fn manage(&self, record: impl Into<InventoryRecord>) -> Option<NodeRef> {
        let record = record.into();
        let id = record.id();
        let admission = self.shared.mutate(|state| state.admit(record, Origin::Local));
        admission.is_stored().then(|| self.node_ref(id))
    }

    pub fn manage_item(&self, record: ItemRecord) -> Option<NodeRef> {
        self.manage(record)
    }

    pub fn manage_folder(&self, record: FolderRecord) -> Option<NodeRef> {
        self.manage(record)
    }

    /// Apply an update delivered by the transport. Idempotent.
    ///
    /// Foreign-owned records are ignored. A previously unseen record whose
    /// parent is not a tracked folder is dropped; a redelivery after the
    /// parent arrives will succeed.
    pub fn apply_update(&self, update: impl Into<InventoryUpdate>) {
        let record = update.into().into_record();
        self.shared.mutate(|state| state.admit(record, Origin::Remote));
    }

    pub fn apply_item_update(&self, record: ItemRecord) {
        self.apply_update(record);
    }

    pub fn apply_folder_update(&self, record: FolderRecord) {
        self.apply_update(record);
    }

    /// Move `id` under the folder `new_parent`, locally.
    pub fn move_node(&self, id: InventoryId, new_parent: InventoryId) -> InventoryResult<()> {
        self.shared.mutate(|state| state.move_node(id, new_parent))
    }

    /// Rename `id`, locally.
    pub fn rename(&self, id: InventoryId, name: impl Into<String>) -> InventoryResult<()> {
        let name = name.into();
        self.shared.mutate(|state| state.rename(id, name))
    }

    /// Remove `id` and everything beneath it. Returns the removed ids.
    pub fn remove(&self, id: InventoryId) -> InventoryResult<Vec<InventoryId>> {
        self.shared.mutate(|state| state.remove(id))
    }

    /// All nodes matching the name path from the root.
    pub fn path_resolve<S: AsRef<str>>(&self, segments: &[S]) -> Vec<NodeRef> {
        let ids = path::resolve(&self.shared.lock(), segments);
        self.refs(ids)
    }

    /// Like [`path_resolve`](Self::path_resolve) for a `/`-separated path.
    pub fn path_resolve_str(&self, path: &str) -> Vec<NodeRef> {
        self.path_resolve(&path::split_path(path))
    }

    /// Linked children of a folder.
    pub fn contents_of(&self, folder: InventoryId) -> InventoryResult<Vec<NodeRef>> {
        let ids = {
            let state = self.shared.lock();
            let node = state.get(&folder).ok_or(InventoryError::NotFound(folder))?;
            if !node.is_folder() {
                return Err(InventoryError::NotAFolder(folder));
            }
            node.contents().to_vec()
        };
        Ok(self.refs(ids))
    }

    /// Every node linked beneath `folder`, depth-first pre-order.
    pub fn descendants(&self, folder: InventoryId) -> InventoryResult<Vec<NodeRef>> {
        let ids = {
            let state = self.shared.lock();
            if !state.contains(&folder) {
                return Err(InventoryError::NotFound(folder));
            }
            let mut out = Vec::new();
            let mut stack: Vec<InventoryId> = state.children(&folder).iter().rev().copied().collect();
            while let Some(id) = stack.pop() {
                out.push(id);
                stack.extend(state.children(&id).iter().rev().copied());
            }
            out
        };
        Ok(self.refs(ids))
    }

    /// Receive every change event published after this call.
    pub fn subscribe(&self) -> EventStream {
        self.shared.events.subscribe()
    }

    /// Current revision of a node, bumped on record changes and, for
    /// folders, on changes to the linked children.
    pub fn revision(&self, id: InventoryId) -> Option<u64> {
        self.shared.lock().get(&id).map(Node::revision)
    }

    /// Block until `folder`'s revision exceeds `since` or `timeout` elapses.
    ///
    /// Returns `true` if a change was observed. A folder that disappears
    /// while waiting counts as changed.
    pub fn wait_for_folder_change(&self, folder: InventoryId, since: u64, timeout: Duration) -> bool {
        self.wait_until(folder, since, timeout, |_| true)
    }

    /// Block until `folder` has changed since `since` and links at least as
    /// many children as its record's `descendent_count`, or `timeout`
    /// elapses.
    ///
    /// The count is re-checked on every change to the folder, so a partial
    /// delivery keeps waiting. A folder that disappears counts as complete.
    pub fn wait_for_folder_contents(&self, folder: InventoryId, since: u64, timeout: Duration) -> bool {
        self.wait_until(folder, since, timeout, |node| {
            let expected = node
                .folder()
                .map_or(0, |f| usize::try_from(f.descendent_count).unwrap_or(0));
            node.contents().len() >= expected
        })
    }

    fn wait_until(
        &self,
        folder: InventoryId,
        since: u64,
        timeout: Duration,
        done: impl Fn(&Node) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        loop {
            match state.get(&folder) {
                None => return true,
                Some(node) if node.revision() > since && done(node) => return true,
                Some(_) => {}
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .shared
                .changed
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    fn node_ref(&self, id: InventoryId) -> NodeRef {
        NodeRef {
            id,
            shared: Arc::clone(&self.shared),
        }
    }

    fn refs(&self, ids: Vec<InventoryId>) -> Vec<NodeRef> {
        let state = self.shared.lock();
        ids.into_iter()
            .filter(|id| state.contains(id))
            .map(|id| self.node_ref(id))
            .collect()
    }
}

impl fmt::Debug for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Inventory")
            .field("owner", &state.owner())
            .field("root", &state.root())
            .field("nodes", &state.len())
            .finish()
    }
}

/// A live handle to one node in an [`Inventory`].
///
/// Accessors return `None` (or empty, or `false`) once the node has been
/// removed. The kind is read live too, so a handle follows an identifier
/// that is removed and re-added as the other kind.
#[derive(Clone)]
pub struct NodeRef {
    id: InventoryId,
    shared: Arc<Shared>,
}

impl NodeRef {
    pub fn id(&self) -> InventoryId {
        self.id
    }

    pub fn is_folder(&self) -> bool {
        self.with_node(Node::is_folder).unwrap_or(false)
    }

    pub fn is_item(&self) -> bool {
        self.with_node(Node::is_item).unwrap_or(false)
    }

    /// Whether the node is still stored.
    pub fn is_tracked(&self) -> bool {
        self.shared.lock().contains(&self.id)
    }

    /// A copy of the node as it is now.
    pub fn snapshot(&self) -> Option<Node> {
        self.shared.lock().get(&self.id).cloned()
    }

    pub fn record(&self) -> Option<InventoryRecord> {
        self.with_node(Node::record)
    }

    pub fn name(&self) -> Option<String> {
        self.with_node(|n| n.name().to_owned())
    }

    pub fn parent_id(&self) -> Option<InventoryId> {
        self.with_node(Node::parent_id)
    }

    pub fn owner_id(&self) -> Option<InventoryId> {
        self.with_node(Node::owner_id)
    }

    pub fn revision(&self) -> Option<u64> {
        self.with_node(Node::revision)
    }

    /// The folder this node is linked under, if any.
    pub fn parent(&self) -> Option<NodeRef> {
        let parent = self.with_node(Node::parent)??;
        Some(NodeRef {
            id: parent,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Linked children; empty for items.
    pub fn contents(&self) -> Vec<NodeRef> {
        let state = self.shared.lock();
        state
            .children(&self.id)
            .iter()
            .filter(|id| state.contains(id))
            .map(|id| NodeRef {
                id: *id,
                shared: Arc::clone(&self.shared),
            })
            .collect()
    }

    pub fn item(&self) -> Option<ItemRecord> {
        self.with_node(|n| n.item().cloned()).flatten()
    }

    pub fn folder(&self) -> Option<FolderRecord> {
        self.with_node(|n| n.folder().cloned()).flatten()
    }

    pub fn move_to(&self, new_parent: &NodeRef) -> InventoryResult<()> {
        self.shared.mutate(|state| state.move_node(self.id, new_parent.id))
    }

    pub fn rename(&self, name: impl Into<String>) -> InventoryResult<()> {
        let name = name.into();
        self.shared.mutate(|state| state.rename(self.id, name))
    }

    pub fn remove(&self) -> InventoryResult<Vec<InventoryId>> {
        self.shared.mutate(|state| state.remove(self.id))
    }

    fn with_node<T>(&self, f: impl FnOnce(&Node) -> T) -> Option<T> {
        self.shared.lock().get(&self.id).map(f)
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for NodeRef {}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn store() -> (Inventory, InventoryId) {
        let owner = InventoryId::random();
        let root = InventoryId::random();
        let inv = Inventory::new(owner, InventorySkeleton::with_root(owner, root, "My Inventory")).unwrap();
        (inv, owner)
    }

    #[test]
    fn bootstrap_requires_root() {
        let owner = InventoryId::random();
        let root = InventoryId::random();
        let foreign = InventorySkeleton::with_root(InventoryId::random(), root, "Theirs");
        assert_eq!(
            Inventory::new(owner, foreign).unwrap_err(),
            InventoryError::RootNotManaged(root)
        );
        assert!(Inventory::new(owner, InventorySkeleton::new(root, Vec::new())).is_err());
    }

    #[test]
    fn node_ref_is_live() {
        let (inv, owner) = store();
        let item = ItemRecord::new(InventoryId::random())
            .with_parent(inv.root_id())
            .with_owner(owner)
            .with_name("Before");
        let handle = inv.manage(item.clone()).unwrap();
        inv.apply_update(item.with_name("After"));
        assert_eq!(handle.name().as_deref(), Some("After"));
        assert_eq!(handle.parent(), Some(inv.root()));
        handle.remove().unwrap();
        assert!(!handle.is_tracked());
        assert_eq!(handle.name(), None);
    }

    #[test]
    fn events_follow_mutations() {
        let (inv, owner) = store();
        let mut events = inv.subscribe();
        let folder = FolderRecord::new(InventoryId::random())
            .with_parent(inv.root_id())
            .with_owner(owner)
            .with_name("Objects");
        let handle = inv.manage(folder.clone()).unwrap();
        handle.rename("Stuff").unwrap();
        handle.remove().unwrap();
        assert_eq!(events.try_recv().unwrap(), InventoryEvent::Added(folder.id));
        assert_eq!(events.try_recv().unwrap(), InventoryEvent::Updated(folder.id));
        assert_eq!(events.try_recv().unwrap(), InventoryEvent::Removed(folder.id));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn wait_times_out_without_change() {
        let (inv, _) = store();
        let root = inv.root_id();
        let since = inv.revision(root).unwrap();
        assert!(!inv.wait_for_folder_change(root, since, Duration::from_millis(20)));
    }

    #[test]
    fn wait_wakes_on_child_update() {
        let (inv, owner) = store();
        let root = inv.root_id();
        let since = inv.revision(root).unwrap();
        let writer = inv.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.apply_update(
                ItemRecord::new(InventoryId::random())
                    .with_parent(root)
                    .with_owner(owner)
                    .with_name("Arrived"),
            );
        });
        assert!(inv.wait_for_folder_change(root, since, Duration::from_secs(5)));
        handle.join().unwrap();
        assert_eq!(inv.root().contents().len(), 1);
    }

    #[test]
    fn descendants_are_preorder() {
        let (inv, owner) = store();
        let root = inv.root_id();
        let a = FolderRecord::new(InventoryId::random()).with_parent(root).with_owner(owner).with_name("a");
        let b = ItemRecord::new(InventoryId::random()).with_parent(a.id).with_owner(owner).with_name("b");
        let c = ItemRecord::new(InventoryId::random()).with_parent(root).with_owner(owner).with_name("c");
        inv.manage(a.clone());
        inv.manage(b.clone());
        inv.manage(c.clone());
        let ids: Vec<_> = inv.descendants(root).unwrap().iter().map(NodeRef::id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
        assert_eq!(inv.contents_of(b.id).unwrap_err(), InventoryError::NotAFolder(b.id));
    }

    fn counted_folder(inv: &Inventory, owner: InventoryId, count: i32) -> FolderRecord {
        let mut folder = FolderRecord::new(InventoryId::random())
            .with_parent(inv.root_id())
            .with_owner(owner)
            .with_name("Counted");
        folder.descendent_count = count;
        inv.manage(folder.clone()).unwrap();
        folder
    }

    fn child(owner: InventoryId, folder: InventoryId, name: &str) -> ItemRecord {
        ItemRecord::new(InventoryId::random())
            .with_parent(folder)
            .with_owner(owner)
            .with_name(name)
    }

    #[test]
    fn contents_wait_ignores_partial_delivery() {
        let (inv, owner) = store();
        let folder = counted_folder(&inv, owner, 3);
        let since = inv.revision(folder.id).unwrap();
        let writer = inv.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            writer.apply_update(child(owner, folder.id, "only one"));
        });
        assert!(!inv.wait_for_folder_contents(folder.id, since, Duration::from_millis(200)));
        handle.join().unwrap();
        assert_eq!(inv.contents_of(folder.id).unwrap().len(), 1);
    }

    #[test]
    fn contents_wait_completes_on_full_delivery() {
        let (inv, owner) = store();
        let folder = counted_folder(&inv, owner, 2);
        let since = inv.revision(folder.id).unwrap();
        let writer = inv.clone();
        let handle = thread::spawn(move || {
            for name in ["first", "second"] {
                thread::sleep(Duration::from_millis(10));
                writer.apply_update(child(owner, folder.id, name));
            }
        });
        assert!(inv.wait_for_folder_contents(folder.id, since, Duration::from_secs(5)));
        handle.join().unwrap();
        assert_eq!(inv.contents_of(folder.id).unwrap().len(), 2);
    }

    #[test]
    fn contents_wait_needs_a_change() {
        let (inv, owner) = store();
        let folder = counted_folder(&inv, owner, 0);
        let since = inv.revision(folder.id).unwrap();
        assert!(!inv.wait_for_folder_contents(folder.id, since, Duration::from_millis(20)));
    }

    #[test]
    fn handle_kind_follows_reused_id() {
        let (inv, owner) = store();
        let item = child(owner, inv.root_id(), "Shape-shifter");
        let old = inv.manage(item.clone()).unwrap();
        assert!(old.is_item());
        old.remove().unwrap();
        assert!(!old.is_item());
        assert!(!old.is_folder());

        let folder = FolderRecord::new(item.id)
            .with_parent(inv.root_id())
            .with_owner(owner)
            .with_name("Now a folder");
        let fresh = inv.manage(folder).unwrap();
        assert_eq!(old, fresh);
        assert!(old.is_folder());
        assert!(!old.is_item());
    }
}
