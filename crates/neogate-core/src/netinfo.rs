//! Network information snapshot used for epoch arithmetic

use serde::{Deserialize, Serialize};

/// Network configuration key holding the epoch length in blocks
pub const EPOCH_DURATION_PARAMETER: &str = "EpochDuration";

/// Raw network configuration parameter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParameter {
    pub key: String,
    pub value: Vec<u8>,
}

impl NetworkParameter {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parameter holding a little-endian u64
    pub fn from_u64(key: impl Into<String>, value: u64) -> Self {
        Self::new(key, value.to_le_bytes().to_vec())
    }
}

/// Snapshot of the network state, fetched fresh for every expiration
/// computation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Current epoch number
    pub current_epoch: u64,
    /// Milliseconds per sidechain block
    pub ms_per_block: i64,
    /// Network configuration parameters
    pub parameters: Vec<NetworkParameter>,
}

impl NetworkInfo {
    /// Look up a raw configuration parameter
    pub fn parameter(&self, key: &str) -> Option<&[u8]> {
        self.parameters
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_slice())
    }

    /// Epoch length parameter, zero when the network does not report it.
    ///
    /// Values shorter than eight bytes are zero-extended; longer values are
    /// truncated to their first eight bytes.
    pub fn epoch_duration(&self) -> u64 {
        self.parameter(EPOCH_DURATION_PARAMETER)
            .map(|raw| {
                let mut data = [0u8; 8];
                let n = raw.len().min(8);
                data[..n].copy_from_slice(&raw[..n]);
                u64::from_le_bytes(data)
            })
            .unwrap_or(0)
    }
}
