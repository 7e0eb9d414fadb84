//! Application state

use crate::config::GatewayConfig;
use anyhow::Context;
use blake3::Hasher;
use neogate_core::{ContainerId, OwnerId};
use neogate_network::{MemoryNetwork, NeoFs};
use std::sync::Arc;
use tracing::{info, warn};

/// Owner used for anonymous uploads when none is configured, derived from
/// the gateway's own identity
pub fn gateway_owner_id(identity: &str) -> OwnerId {
    let mut hasher = Hasher::new();
    hasher.update(b"neogate:owner:"); // Domain separation
    hasher.update(identity.as_bytes());
    let hash = hasher.finalize();
    let mut script_hash = [0u8; 20];
    script_hash.copy_from_slice(&hash.as_bytes()[..20]);
    OwnerId::from_script_hash(script_hash)
}

/// Application state shared across handlers
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// Storage network client
    pub network: Arc<dyn NeoFs>,
    /// Owner of objects uploaded without a bearer token
    pub default_owner: OwnerId,
}

impl AppState {
    /// Create state backed by an in-memory development network
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let dev = &config.dev_network;
        let network = MemoryNetwork::with_parameters(
            dev.initial_epoch,
            dev.ms_per_block,
            Some(dev.epoch_duration),
        );

        for raw in &dev.containers {
            let id: ContainerId = raw
                .parse()
                .with_context(|| format!("dev network container {raw:?}"))?;
            network.register_container(id);
            info!(container = %id, "Container available");
        }

        warn!("⚠ Storage network: In-memory (NOT persistent - for development only)");

        Self::with_network(config, Arc::new(network))
    }

    /// Create state around an existing network client
    pub fn with_network(config: GatewayConfig, network: Arc<dyn NeoFs>) -> anyhow::Result<Self> {
        let default_owner = match &config.default_owner {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("default owner {raw:?}"))?,
            None => gateway_owner_id(&config.bind_addr()),
        };
        info!(owner = %default_owner, "Default owner");

        Ok(Self {
            config,
            network,
            default_owner,
        })
    }
}
