//! Local mirror of a remote, server-authoritative inventory tree.
//!
//! The store tracks one owner's folders and items, keyed by identifier, and
//! keeps a navigable parent/child tree consistent while updates arrive out
//! of order from a transport.
//!
//! # Architecture
//!
//! - **Arena**: every node lives in one identifier-keyed map. Parent and
//!   child links are identifiers into that map, so there are no reference
//!   cycles and removal is a map delete.
//! - **Two admission paths**: [`Inventory::manage`] accepts locally
//!   originated records and keeps orphans until their parent arrives;
//!   [`Inventory::apply_update`] drops inbound records whose parent is not
//!   yet known and relies on redelivery to heal.
//! - **Ownership**: records owned by anyone other than the local owner are
//!   never stored or applied.
//! - **One lock**: all mutations and linkage reads go through a single
//!   mutex. Mutations publish [`InventoryEvent`]s afterwards and wake
//!   waiters on a condition variable.
//!
//! # Modules
//!
//! - [`error`]: structural command errors
//! - [`node`]: the [`Node`] type and its two variants
//! - [`event`]: inbound [`InventoryUpdate`]s and outbound [`InventoryEvent`]s
//! - [`skeleton`]: the login-time bootstrap manifest
//! - [`store`]: [`Inventory`] and the live [`NodeRef`] handle
//! - [`path`]: name-path helpers

pub mod error;
pub mod event;
pub mod node;
pub mod path;
pub mod skeleton;
pub mod store;

mod state;

pub use error::{InventoryError, InventoryResult};
pub use event::{InventoryEvent, InventoryUpdate};
pub use node::{Node, NodeKind};
pub use path::split_path;
pub use skeleton::InventorySkeleton;
pub use store::{EventStream, Inventory, NodeRef, EVENT_CHANNEL_CAPACITY};
