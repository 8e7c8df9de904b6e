//! Error types for inventory structural commands.

use grid_types::InventoryId;

/// Errors returned by caller-initiated structural commands.
///
/// Ownership rejections and inbound updates with an unknown parent are not
/// errors; they are dropped silently by the store.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InventoryError {
    /// The node is not (or no longer) tracked by the store.
    #[error("node not found in inventory: {0}")]
    NotFound(InventoryId),

    /// The designated root folder cannot be removed.
    #[error("the root folder cannot be removed")]
    RootRemoval,

    /// The designated root folder cannot be moved.
    #[error("the root folder cannot be moved")]
    RootMove,

    /// A folder was required but the node is an item.
    #[error("not a folder: {0}")]
    NotAFolder(InventoryId),

    /// Moving `node` under `target` would place a folder inside itself.
    #[error("moving {node} into {target} would create a cycle")]
    WouldCycle {
        node: InventoryId,
        target: InventoryId,
    },

    /// The skeleton's root folder was not admitted during bootstrap.
    #[error("root folder {0} was not admitted from the skeleton")]
    RootNotManaged(InventoryId),
}

/// Convenience alias for inventory results.
pub type InventoryResult<T> = Result<T, InventoryError>;
