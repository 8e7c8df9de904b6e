//! Transport seam for the grid inventory mirror.
//!
//! The store in `grid-inventory` knows nothing about the network. This crate
//! connects it to one:
//!
//! - inbound updates flow through [`InventoryClient::handle_update`] or an
//!   update channel drained by [`InventoryClient::spawn_update_pump`];
//! - structural commands become [`InventoryTransport`] requests, optionally
//!   applied to the mirror first;
//! - [`InventoryClient::fetch_folder`] requests a folder's contents and
//!   waits, with a timeout, for them to arrive.

pub mod client;
pub mod config;
pub mod error;
pub mod transport;

pub use client::{InventoryClient, UpdateReceiver, UpdateSender};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use transport::{InventoryTransport, RecordingTransport, RemoteRequest};
