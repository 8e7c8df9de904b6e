use grid_inventory::InventoryError;
use grid_types::InventoryId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("update channel closed")]
    ChannelClosed,

    #[error("cannot fetch contents of unknown folder {0}")]
    UnknownFolder(InventoryId),

    #[error("wait task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type SyncResult<T> = Result<T, SyncError>;
