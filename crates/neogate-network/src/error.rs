//! Error types for the neogate-network crate

use neogate_core::{Address, ContainerId};
use thiserror::Error;

/// Result type alias using `NetworkError`
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors reported by a storage network client
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Container does not exist
    #[error("can't fetch container info: container {0} not found")]
    ContainerNotFound(ContainerId),

    /// Object does not exist in the container
    #[error("object {0} not found")]
    ObjectNotFound(Address),

    /// Network unreachable or connection dropped
    #[error("connection error: {0}")]
    Connection(String),

    /// Reading the payload supplied by the caller failed
    #[error("payload read error: {0}")]
    Payload(#[source] std::io::Error),

    /// Any other failure reported by the network
    #[error("{0}")]
    Other(String),
}

impl NetworkError {
    /// Whether the failure means the requested object or container is absent.
    ///
    /// Clients that only surface status text are recognized by the message
    /// patterns the network uses for missing entities.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ContainerNotFound(_) | Self::ObjectNotFound(_) => true,
            Self::Other(message) => {
                message.contains("not found") || message.contains("can't fetch container info")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neogate_core::ObjectId;

    #[test]
    fn test_not_found_classification() {
        let cid = ContainerId::from_bytes([1u8; 32]);
        let address = Address::new(cid, ObjectId::from_bytes([2u8; 32]));

        assert!(NetworkError::ContainerNotFound(cid).is_not_found());
        assert!(NetworkError::ObjectNotFound(address).is_not_found());
        assert!(NetworkError::Other("status: code = 2049 message = object not found".into()).is_not_found());
        assert!(NetworkError::Other("can't fetch container info: timeout".into()).is_not_found());
        assert!(!NetworkError::Other("access denied".into()).is_not_found());
        assert!(!NetworkError::Connection("reset by peer".into()).is_not_found());
    }
}
