//! Gateway configuration

use serde::{Deserialize, Serialize};

/// Gateway server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Owner ID (hex) attached to uploads made without a bearer token.
    /// When unset, an owner is derived from the gateway's own identity.
    pub default_owner: Option<String>,
    /// Attach a `Timestamp` attribute to uploads that lack one
    pub default_timestamp: bool,
    /// Deflate zip entries instead of storing them
    pub zip_compression: bool,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// Enable CORS
    pub cors_enabled: bool,
    /// CORS allowed origins, `*` for any
    pub cors_origins: Vec<String>,
    /// Development network settings
    pub dev_network: DevNetworkConfig,
}

/// Parameters of the in-memory development network
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DevNetworkConfig {
    /// Epoch the network starts at
    pub initial_epoch: u64,
    /// Milliseconds per sidechain block
    pub ms_per_block: i64,
    /// Epoch length in blocks
    pub epoch_duration: u64,
    /// Container IDs (hex) created at startup
    pub containers: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8082,
            default_owner: None,
            default_timestamp: false,
            zip_compression: false,
            max_body_size: 5 * 1024 * 1024 * 1024, // 5 GB
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
            dev_network: DevNetworkConfig::default(),
        }
    }
}

impl Default for DevNetworkConfig {
    fn default() -> Self {
        Self {
            initial_epoch: 0,
            ms_per_block: 1000,
            epoch_duration: 240,
            containers: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"port": 9000, "dev_network": {"epoch_duration": 10}}"#)
                .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.dev_network.epoch_duration, 10);
        assert_eq!(config.dev_network.ms_per_block, 1000);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    }
}
