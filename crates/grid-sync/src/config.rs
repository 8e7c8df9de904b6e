use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for an [`InventoryClient`](crate::InventoryClient).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How long `fetch_folder` waits for the folder to change, in seconds.
    pub fetch_timeout_secs: u64,
    /// When `true`, move/rename/remove update the local mirror before the
    /// remote request is sent. When `false`, only the request is sent and
    /// the mirror changes when the server's update arrives.
    pub optimistic_local_mutation: bool,
    /// Buffer size of the inbound update channel.
    pub update_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            optimistic_local_mutation: true,
            update_channel_capacity: 1024,
        }
    }
}

impl SyncConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// A configuration that never touches the mirror ahead of the server.
    pub fn server_authoritative() -> Self {
        Self {
            optimistic_local_mutation: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert!(config.optimistic_local_mutation);
        assert_eq!(config.update_channel_capacity, 1024);
        assert!(!SyncConfig::server_authoritative().optimistic_local_mutation);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: SyncConfig = toml::from_str("fetch_timeout_secs = 5\n").unwrap();
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
        assert!(config.optimistic_local_mutation);
        assert_eq!(config.update_channel_capacity, 1024);
    }

    #[test]
    fn toml_round_trip() {
        let config = SyncConfig {
            fetch_timeout_secs: 12,
            optimistic_local_mutation: false,
            update_channel_capacity: 16,
        };
        let text = toml::to_string(&config).unwrap();
        assert_eq!(toml::from_str::<SyncConfig>(&text).unwrap(), config);
    }
}
