//! Outbound side of the transport seam.

use std::sync::Mutex;

use async_trait::async_trait;
use grid_types::InventoryId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Fire-and-forget requests to the server that owns the inventory.
///
/// Implementations only report failures to hand a request off. The effect of
/// a request reaches the local mirror later, as an inbound update.
#[async_trait]
pub trait InventoryTransport: Send + Sync {
    async fn request_folder_contents(&self, folder: InventoryId, owner: InventoryId) -> SyncResult<()>;
    async fn request_move(&self, node: InventoryId, new_parent: InventoryId) -> SyncResult<()>;
    async fn request_rename(&self, node: InventoryId, name: &str) -> SyncResult<()>;
    async fn request_delete(&self, node: InventoryId) -> SyncResult<()>;
}

/// One outbound request, as captured by [`RecordingTransport`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteRequest {
    FolderContents { folder: InventoryId, owner: InventoryId },
    Move { node: InventoryId, new_parent: InventoryId },
    Rename { node: InventoryId, name: String },
    Delete { node: InventoryId },
}

/// A transport that keeps every request in memory.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<RemoteRequest>>,
    failure: Mutex<Option<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent request fail with `reason`, or succeed again
    /// with `None`.
    pub fn set_failure(&self, reason: Option<String>) {
        *self.failure.lock().expect("transport lock poisoned") = reason;
    }

    /// Requests recorded so far.
    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.requests.lock().expect("transport lock poisoned").clone()
    }

    /// Drain the recorded requests.
    pub fn take_requests(&self) -> Vec<RemoteRequest> {
        std::mem::take(&mut *self.requests.lock().expect("transport lock poisoned"))
    }

    fn record(&self, request: RemoteRequest) -> SyncResult<()> {
        if let Some(reason) = self.failure.lock().expect("transport lock poisoned").clone() {
            return Err(SyncError::Transport(reason));
        }
        debug!(?request, "recorded remote request");
        self.requests.lock().expect("transport lock poisoned").push(request);
        Ok(())
    }
}

#[async_trait]
impl InventoryTransport for RecordingTransport {
    async fn request_folder_contents(&self, folder: InventoryId, owner: InventoryId) -> SyncResult<()> {
        self.record(RemoteRequest::FolderContents { folder, owner })
    }

    async fn request_move(&self, node: InventoryId, new_parent: InventoryId) -> SyncResult<()> {
        self.record(RemoteRequest::Move { node, new_parent })
    }

    async fn request_rename(&self, node: InventoryId, name: &str) -> SyncResult<()> {
        self.record(RemoteRequest::Rename {
            node,
            name: name.to_owned(),
        })
    }

    async fn request_delete(&self, node: InventoryId) -> SyncResult<()> {
        self.record(RemoteRequest::Delete { node })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_in_order() {
        let transport = RecordingTransport::new();
        let a = InventoryId::random();
        let b = InventoryId::random();
        transport.request_move(a, b).await.unwrap();
        transport.request_rename(a, "New").await.unwrap();
        transport.request_delete(b).await.unwrap();
        assert_eq!(
            transport.take_requests(),
            vec![
                RemoteRequest::Move { node: a, new_parent: b },
                RemoteRequest::Rename { node: a, name: "New".into() },
                RemoteRequest::Delete { node: b },
            ]
        );
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn injected_failure_is_reported() {
        let transport = RecordingTransport::new();
        transport.set_failure(Some("link down".into()));
        let err = transport.request_delete(InventoryId::random()).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(ref r) if r == "link down"));
        assert!(transport.requests().is_empty());

        transport.set_failure(None);
        transport.request_delete(InventoryId::random()).await.unwrap();
        assert_eq!(transport.requests().len(), 1);
    }
}
