//! Foundation types for the grid inventory client.
//!
//! This crate holds the plain data the server sends about inventory: the
//! identifiers, type codes and permission masks, and the two raw record
//! shapes ([`ItemRecord`], [`FolderRecord`]). Records carry no tree linkage;
//! `grid-inventory` wraps them in live nodes.
//!
//! # Key Types
//!
//! - [`InventoryId`]: 128-bit identifier with a nil sentinel
//! - [`AssetType`], [`InventoryType`], [`SaleType`]: wire codes with legacy text names
//! - [`Permissions`]: the five permission masks of an item
//! - [`ItemRecord`], [`FolderRecord`], [`InventoryRecord`]: raw records
//!
//! Both record types implement `Display`/`FromStr` using the grid's
//! brace-delimited text block format (see [`text`]).

pub mod codes;
pub mod error;
pub mod id;
pub mod permissions;
pub mod record;
pub mod text;

pub use codes::{AssetType, InventoryType, SaleType};
pub use error::TypeError;
pub use id::InventoryId;
pub use permissions::{PermissionMask, Permissions};
pub use record::{FolderRecord, InventoryRecord, ItemRecord};
pub use text::parse_records;
