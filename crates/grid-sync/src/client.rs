//! The client that ties a store to a transport.

use std::sync::Arc;
use std::time::Duration;

use grid_inventory::{Inventory, InventoryError, InventoryUpdate};
use grid_types::InventoryId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::InventoryTransport;

/// Sending half of the inbound update channel.
pub type UpdateSender = mpsc::Sender<InventoryUpdate>;

/// Receiving half of the inbound update channel.
pub type UpdateReceiver = mpsc::Receiver<InventoryUpdate>;

/// Routes inbound updates into an [`Inventory`] and turns structural
/// commands into remote requests.
#[derive(Clone)]
pub struct InventoryClient {
    inventory: Inventory,
    transport: Arc<dyn InventoryTransport>,
    config: SyncConfig,
}

impl InventoryClient {
    pub fn new(inventory: Inventory, transport: Arc<dyn InventoryTransport>, config: SyncConfig) -> Self {
        Self {
            inventory,
            transport,
            config,
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Apply one inbound update.
    pub fn handle_update(&self, update: impl Into<InventoryUpdate>) {
        self.inventory.apply_update(update);
    }

    /// A bounded update channel sized from the configuration.
    pub fn update_channel(&self) -> (UpdateSender, UpdateReceiver) {
        mpsc::channel(self.config.update_channel_capacity.max(1))
    }

    /// Drain `updates` into the store on a tokio task until every sender is
    /// dropped. The task yields the number of updates applied.
    pub fn spawn_update_pump(&self, mut updates: UpdateReceiver) -> JoinHandle<usize> {
        let inventory = self.inventory.clone();
        tokio::spawn(async move {
            let mut applied = 0usize;
            while let Some(update) = updates.recv().await {
                debug!(id = %update.id().short(), "pumping update");
                inventory.apply_update(update);
                applied += 1;
            }
            info!(applied, "update channel closed");
            applied
        })
    }

    /// Move `node` under `new_parent` and ask the server to do the same.
    ///
    /// Local validation errors are returned before anything is sent.
    pub async fn move_node(&self, node: InventoryId, new_parent: InventoryId) -> SyncResult<()> {
        if self.config.optimistic_local_mutation {
            self.inventory.move_node(node, new_parent)?;
        } else {
            self.check_movable(node, new_parent)?;
        }
        self.transport.request_move(node, new_parent).await
    }

    /// Rename `node` and ask the server to do the same.
    pub async fn rename(&self, node: InventoryId, name: impl Into<String>) -> SyncResult<()> {
        let name = name.into();
        if self.config.optimistic_local_mutation {
            self.inventory.rename(node, name.clone())?;
        } else {
            self.check_tracked(node)?;
        }
        self.transport.request_rename(node, &name).await
    }

    /// Remove `node` (and its subtree) and ask the server to delete it.
    pub async fn remove(&self, node: InventoryId) -> SyncResult<()> {
        if self.config.optimistic_local_mutation {
            self.inventory.remove(node)?;
        } else {
            if node == self.inventory.root_id() {
                return Err(InventoryError::RootRemoval.into());
            }
            self.check_tracked(node)?;
        }
        self.transport.request_delete(node).await
    }

    /// Request a folder's contents and wait until they have arrived.
    ///
    /// The folder counts as fetched once it has changed and links at least
    /// `descendent_count` children. Returns `Ok(false)` if `timeout` elapses
    /// first; the store is left as it is either way.
    pub async fn fetch_folder(&self, folder: InventoryId, timeout: Duration) -> SyncResult<bool> {
        let node = self
            .inventory
            .lookup(folder)
            .ok_or(SyncError::UnknownFolder(folder))?;
        if !node.is_folder() {
            return Err(InventoryError::NotAFolder(folder).into());
        }
        let since = node.revision().ok_or(SyncError::UnknownFolder(folder))?;

        self.transport
            .request_folder_contents(folder, self.inventory.owner())
            .await?;

        let inventory = self.inventory.clone();
        let complete =
            tokio::task::spawn_blocking(move || inventory.wait_for_folder_contents(folder, since, timeout)).await?;
        if complete {
            debug!(folder = %folder.short(), "folder contents arrived");
        } else {
            let linked = self.inventory.contents_of(folder).map_or(0, |c| c.len());
            warn!(folder = %folder.short(), ?timeout, linked, "timed out waiting for folder contents");
        }
        Ok(complete)
    }

    /// [`fetch_folder`](Self::fetch_folder) with the configured timeout.
    pub async fn refresh_folder(&self, folder: InventoryId) -> SyncResult<bool> {
        self.fetch_folder(folder, self.config.fetch_timeout()).await
    }

    fn check_tracked(&self, node: InventoryId) -> SyncResult<()> {
        if self.inventory.contains(node) {
            Ok(())
        } else {
            Err(InventoryError::NotFound(node).into())
        }
    }

    fn check_movable(&self, node: InventoryId, new_parent: InventoryId) -> SyncResult<()> {
        if node == self.inventory.root_id() {
            return Err(InventoryError::RootMove.into());
        }
        self.check_tracked(node)?;
        match self.inventory.lookup(new_parent) {
            None => Err(InventoryError::NotFound(new_parent).into()),
            Some(target) if !target.is_folder() => Err(InventoryError::NotAFolder(new_parent).into()),
            Some(_) => Ok(()),
        }
    }
}

impl std::fmt::Debug for InventoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryClient")
            .field("inventory", &self.inventory)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{RecordingTransport, RemoteRequest};
    use grid_inventory::InventorySkeleton;
    use grid_types::{FolderRecord, ItemRecord};

    struct Fixture {
        client: InventoryClient,
        transport: Arc<RecordingTransport>,
        owner: InventoryId,
        root: InventoryId,
    }

    fn fixture(config: SyncConfig) -> Fixture {
        let owner = InventoryId::random();
        let root = InventoryId::random();
        let inventory = Inventory::new(owner, InventorySkeleton::with_root(owner, root, "My Inventory")).unwrap();
        let transport = Arc::new(RecordingTransport::new());
        let client = InventoryClient::new(inventory, transport.clone(), config);
        Fixture {
            client,
            transport,
            owner,
            root,
        }
    }

    impl Fixture {
        fn folder(&self, name: &str) -> FolderRecord {
            FolderRecord::new(InventoryId::random())
                .with_parent(self.root)
                .with_owner(self.owner)
                .with_name(name)
        }

        fn item(&self, parent: InventoryId, name: &str) -> ItemRecord {
            ItemRecord::new(InventoryId::random())
                .with_parent(parent)
                .with_owner(self.owner)
                .with_name(name)
        }
    }

    // ---- Test 1: Optimistic move changes the mirror and sends a request ----
    #[tokio::test]
    async fn optimistic_move() {
        let fx = fixture(SyncConfig::default());
        let folder = fx.folder("Dest");
        let item = fx.item(fx.root, "Thing");
        fx.client.inventory().manage(folder.clone()).unwrap();
        fx.client.inventory().manage(item.clone()).unwrap();

        fx.client.move_node(item.id, folder.id).await.unwrap();
        let node = fx.client.inventory().lookup(item.id).unwrap();
        assert_eq!(node.parent_id(), Some(folder.id));
        assert_eq!(
            fx.transport.requests(),
            vec![RemoteRequest::Move {
                node: item.id,
                new_parent: folder.id
            }]
        );
    }

    // ---- Test 2: Server-authoritative mode leaves the mirror alone ----
    #[tokio::test]
    async fn deferred_rename_and_remove() {
        let fx = fixture(SyncConfig::server_authoritative());
        let item = fx.item(fx.root, "Keep");
        fx.client.inventory().manage(item.clone()).unwrap();

        fx.client.rename(item.id, "Changed").await.unwrap();
        fx.client.remove(item.id).await.unwrap();
        let node = fx.client.inventory().lookup(item.id).unwrap();
        assert_eq!(node.name().as_deref(), Some("Keep"));
        assert_eq!(fx.transport.requests().len(), 2);
    }

    // ---- Test 3: Invalid commands never reach the transport ----
    #[tokio::test]
    async fn invalid_commands_send_nothing() {
        for config in [SyncConfig::default(), SyncConfig::server_authoritative()] {
            let fx = fixture(config);
            let ghost = InventoryId::random();
            assert!(matches!(
                fx.client.remove(fx.root).await,
                Err(SyncError::Inventory(InventoryError::RootRemoval))
            ));
            assert!(matches!(
                fx.client.rename(ghost, "x").await,
                Err(SyncError::Inventory(InventoryError::NotFound(id))) if id == ghost
            ));
            assert!(matches!(
                fx.client.move_node(fx.root, fx.root).await,
                Err(SyncError::Inventory(InventoryError::RootMove))
            ));
            assert!(fx.transport.requests().is_empty());
        }
    }

    // ---- Test 4: Fetch returns true once contents arrive ----
    #[tokio::test]
    async fn fetch_wakes_on_update() {
        let fx = fixture(SyncConfig::default());
        let folder = fx.folder("Remote");
        fx.client.inventory().manage(folder.clone()).unwrap();

        let (tx, rx) = fx.client.update_channel();
        let pump = fx.client.spawn_update_pump(rx);
        let item = fx.item(folder.id, "Delivered");
        let sender = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(item.into()).await.unwrap();
        });

        let changed = fx.client.fetch_folder(folder.id, Duration::from_secs(5)).await.unwrap();
        assert!(changed);
        sender.await.unwrap();
        assert_eq!(pump.await.unwrap(), 1);
        assert_eq!(
            fx.transport.requests(),
            vec![RemoteRequest::FolderContents {
                folder: folder.id,
                owner: fx.owner
            }]
        );
    }

    // ---- Test 5: Fetch times out without touching the store ----
    #[tokio::test]
    async fn fetch_times_out() {
        let fx = fixture(SyncConfig::default());
        let before = fx.client.inventory().len();
        let changed = fx
            .client
            .fetch_folder(fx.root, Duration::from_millis(20))
            .await
            .unwrap();
        assert!(!changed);
        assert_eq!(fx.client.inventory().len(), before);
    }

    // ---- Test 6: Fetch of unknown or non-folder nodes fails ----
    #[tokio::test]
    async fn fetch_requires_folder() {
        let fx = fixture(SyncConfig::default());
        let ghost = InventoryId::random();
        assert!(matches!(
            fx.client.fetch_folder(ghost, Duration::from_millis(1)).await,
            Err(SyncError::UnknownFolder(id)) if id == ghost
        ));
        let item = fx.item(fx.root, "Leaf");
        fx.client.inventory().manage(item.clone()).unwrap();
        assert!(matches!(
            fx.client.fetch_folder(item.id, Duration::from_millis(1)).await,
            Err(SyncError::Inventory(InventoryError::NotAFolder(_)))
        ));
        assert!(fx.transport.requests().is_empty());
    }

    // ---- Test 7: Fetch keeps waiting until every descendant is linked ----
    #[tokio::test]
    async fn fetch_waits_for_descendent_count() {
        let fx = fixture(SyncConfig::default());
        let mut folder = fx.folder("Partial");
        folder.descendent_count = 3;
        fx.client.inventory().manage(folder.clone()).unwrap();

        let (tx, rx) = fx.client.update_channel();
        let pump = fx.client.spawn_update_pump(rx);
        let item = fx.item(folder.id, "One of three");
        let sender = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(item.into()).await.unwrap();
        });

        let complete = fx
            .client
            .fetch_folder(folder.id, Duration::from_millis(300))
            .await
            .unwrap();
        assert!(!complete);
        sender.await.unwrap();
        assert_eq!(pump.await.unwrap(), 1);
        assert_eq!(fx.client.inventory().contents_of(folder.id).unwrap().len(), 1);
    }

    // ---- Test 8: Fetch completes when the reply carries the full count ----
    #[tokio::test]
    async fn fetch_completes_with_counted_reply() {
        let fx = fixture(SyncConfig::default());
        let folder = fx.folder("Counted");
        fx.client.inventory().manage(folder.clone()).unwrap();

        let mut counted = folder.clone();
        counted.descendent_count = 2;
        let replies: Vec<InventoryUpdate> = vec![
            counted.into(),
            fx.item(folder.id, "a").into(),
            fx.item(folder.id, "b").into(),
        ];
        let (tx, rx) = fx.client.update_channel();
        let pump = fx.client.spawn_update_pump(rx);
        let sender = tokio::spawn(async move {
            for update in replies {
                tokio::time::sleep(Duration::from_millis(10)).await;
                tx.send(update).await.unwrap();
            }
        });

        let complete = fx.client.fetch_folder(folder.id, Duration::from_secs(5)).await.unwrap();
        assert!(complete);
        sender.await.unwrap();
        assert_eq!(pump.await.unwrap(), 3);
        assert_eq!(fx.client.inventory().contents_of(folder.id).unwrap().len(), 2);
    }

    // ---- Test 9: Transport failures surface after the local change ----
    #[tokio::test]
    async fn transport_failure_is_returned() {
        let fx = fixture(SyncConfig::default());
        let item = fx.item(fx.root, "Old");
        fx.client.inventory().manage(item.clone()).unwrap();
        fx.transport.set_failure(Some("offline".into()));

        let err = fx.client.rename(item.id, "New").await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
        let node = fx.client.inventory().lookup(item.id).unwrap();
        assert_eq!(node.name().as_deref(), Some("New"));
    }
}
