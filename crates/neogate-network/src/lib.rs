//! # Neogate Network
//!
//! Boundary between the HTTP gateway and the object storage network.
//!
//! This crate provides:
//! - **NeoFs trait**: The operations the gateway needs from a network client
//! - **Object types**: Headers, drafts and payload streams crossing the boundary
//! - **MemoryNetwork**: A self-contained network for development and tests
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Gateway               │
//! ├─────────────────────────────────────────┤
//! │              NeoFs Trait                │
//! ├────────────────────┬────────────────────┤
//! │   Network client   │   MemoryNetwork    │
//! └────────────────────┴────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use neogate_network::{MemoryNetwork, NeoFs, CallAuth};
//!
//! let network = MemoryNetwork::new();
//! let container = network.create_container();
//! let info = network.network_info(&CallAuth::anonymous()).await?;
//! ```

pub mod error;
pub mod memory;

pub use error::{NetworkError, Result};
pub use memory::MemoryNetwork;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use neogate_core::attribute::{ATTRIBUTE_FILE_NAME, Attribute};
use neogate_core::{Address, BearerToken, ContainerId, NetworkInfo, ObjectId, OwnerId};

/// Streamed object payload
pub type PayloadStream<'a> = BoxStream<'a, std::io::Result<Bytes>>;

/// Authentication context of a single network call
#[derive(Clone, Debug, Default)]
pub struct CallAuth {
    /// Bearer token forwarded with the call, if the request carried one
    pub bearer: Option<BearerToken>,
}

impl CallAuth {
    /// Calls made with the gateway's own key
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_bearer(bearer: Option<BearerToken>) -> Self {
        Self { bearer }
    }
}

/// Object metadata without the payload
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectHeader {
    pub id: ObjectId,
    pub container: ContainerId,
    pub owner: OwnerId,
    /// Attributes in the order they were attached
    pub attributes: Vec<Attribute>,
    pub payload_size: u64,
}

impl ObjectHeader {
    pub fn address(&self) -> Address {
        Address::new(self.container, self.id)
    }

    /// First attribute value with the given key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }

    pub fn filename(&self) -> Option<&str> {
        self.attribute(ATTRIBUTE_FILE_NAME)
    }
}

/// Object ready to be submitted, minus its payload
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDraft {
    pub container: ContainerId,
    pub owner: OwnerId,
    pub attributes: Vec<Attribute>,
}

/// Object fetched with its payload
pub struct ObjectRead {
    pub header: ObjectHeader,
    pub payload: PayloadStream<'static>,
}

/// How a search filter compares attribute values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchType {
    StringEqual,
    CommonPrefix,
}

/// Attribute condition of an object search
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchFilter {
    pub key: String,
    pub value: String,
    pub match_type: MatchType,
}

impl SearchFilter {
    pub fn equal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            match_type: MatchType::StringEqual,
        }
    }

    pub fn prefix(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            match_type: MatchType::CommonPrefix,
        }
    }

    /// Whether the attribute list satisfies this filter
    pub fn matches(&self, attributes: &[Attribute]) -> bool {
        attributes.iter().any(|attr| {
            attr.key == self.key
                && match self.match_type {
                    MatchType::StringEqual => attr.value == self.value,
                    MatchType::CommonPrefix => attr.value.starts_with(&self.value),
                }
        })
    }
}

/// Operations the gateway performs against the storage network.
///
/// Implementations must be safe for concurrent use by many requests.
#[async_trait]
pub trait NeoFs: Send + Sync {
    /// Fresh snapshot of epoch and network parameters
    async fn network_info(&self, auth: &CallAuth) -> Result<NetworkInfo>;

    /// IDs of objects in the container matching every filter, in network order
    async fn search_objects(
        &self,
        container: ContainerId,
        filters: &[SearchFilter],
        auth: &CallAuth,
    ) -> Result<Vec<ObjectId>>;

    /// Object metadata only
    async fn head_object(&self, address: Address, auth: &CallAuth) -> Result<ObjectHeader>;

    /// Object metadata and a payload stream
    async fn get_object(&self, address: Address, auth: &CallAuth) -> Result<ObjectRead>;

    /// Store an object, consuming the payload stream
    async fn put_object<'a>(
        &self,
        draft: ObjectDraft,
        payload: PayloadStream<'a>,
        auth: &CallAuth,
    ) -> Result<ObjectId>;
}
