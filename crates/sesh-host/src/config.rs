//! Host settings that sit outside the coordinator's own configuration.

use std::time::Duration;

/// Default loopback completion latency in milliseconds
pub const DEFAULT_LOOPBACK_LATENCY_MS: u64 = 150;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub player_name: String,
    /// Remote players whose sessions are seeded into the loopback registry
    pub demo_peers: Vec<String>,
    pub loopback_latency: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            player_name: "Player".to_string(),
            demo_peers: vec!["alice".to_string(), "bob".to_string()],
            loopback_latency: Duration::from_millis(DEFAULT_LOOPBACK_LATENCY_MS),
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let player_name = lookup("STEAMSESH_PLAYER_NAME")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.player_name);
        let demo_peers = lookup("STEAMSESH_DEMO_PEERS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|peer| !peer.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.demo_peers);
        let loopback_latency = lookup("STEAMSESH_LOOPBACK_LATENCY_MS")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.loopback_latency);

        Self {
            player_name,
            demo_peers,
            loopback_latency,
        }
    }
}
