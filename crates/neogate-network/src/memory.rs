//! In-memory storage network for development and testing

use crate::{
    CallAuth, NeoFs, NetworkError, ObjectDraft, ObjectHeader, ObjectRead, PayloadStream, Result,
    SearchFilter,
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use futures::StreamExt;
use neogate_core::netinfo::EPOCH_DURATION_PARAMETER;
use neogate_core::{Address, ContainerId, NetworkInfo, NetworkParameter, ObjectId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Default size of payload chunks yielded by `get_object` (64 KB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default milliseconds per block
pub const DEFAULT_MS_PER_BLOCK: i64 = 1000;

/// Default epoch length in blocks
pub const DEFAULT_EPOCH_DURATION: u64 = 240;

#[derive(Clone)]
struct StoredObject {
    header: ObjectHeader,
    payload: Bytes,
}

struct Inner {
    containers: DashMap<ContainerId, Vec<StoredObject>>,
    epoch: AtomicU64,
    sequence: AtomicU64,
    ms_per_block: i64,
    epoch_duration: Option<u64>,
    chunk_size: usize,
}

/// A storage network held entirely in memory.
///
/// Containers keep objects in insertion order, so searches return results
/// in the order objects were stored.
#[derive(Clone)]
pub struct MemoryNetwork {
    inner: Arc<Inner>,
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNetwork {
    /// Create an empty network at epoch 0 with default parameters
    pub fn new() -> Self {
        Self::with_parameters(0, DEFAULT_MS_PER_BLOCK, Some(DEFAULT_EPOCH_DURATION))
    }

    /// Create an empty network. A `None` epoch duration leaves the
    /// parameter out of network info entirely.
    pub fn with_parameters(epoch: u64, ms_per_block: i64, epoch_duration: Option<u64>) -> Self {
        Self {
            inner: Arc::new(Inner {
                containers: DashMap::new(),
                epoch: AtomicU64::new(epoch),
                sequence: AtomicU64::new(0),
                ms_per_block,
                epoch_duration,
                chunk_size: DEFAULT_CHUNK_SIZE,
            }),
        }
    }

    /// Override the payload chunk size used when streaming objects out
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.chunk_size = chunk_size.max(1);
        }
        self
    }

    /// Create a container with a fresh ID
    pub fn create_container(&self) -> ContainerId {
        let seq = self.inner.sequence.fetch_add(1, Ordering::SeqCst);
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"container");
        hasher.update(&seq.to_le_bytes());
        let id = ContainerId::from_bytes(*hasher.finalize().as_bytes());
        self.register_container(id);
        id
    }

    /// Make a container with a known ID available. No-op if it exists.
    pub fn register_container(&self, id: ContainerId) {
        self.inner.containers.entry(id).or_default();
        debug!(container = %id, "Container registered");
    }

    /// Advance or rewind the current epoch
    pub fn set_epoch(&self, epoch: u64) {
        self.inner.epoch.store(epoch, Ordering::SeqCst);
    }

    pub fn current_epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    /// Number of objects stored in the container
    pub fn object_count(&self, container: &ContainerId) -> usize {
        self.inner
            .containers
            .get(container)
            .map(|objects| objects.len())
            .unwrap_or(0)
    }

    fn find(&self, address: Address) -> Result<StoredObject> {
        let objects = self
            .inner
            .containers
            .get(&address.container)
            .ok_or(NetworkError::ContainerNotFound(address.container))?;

        objects
            .iter()
            .find(|obj| obj.header.id == address.object)
            .cloned()
            .ok_or(NetworkError::ObjectNotFound(address))
    }

    fn object_id(&self, draft: &ObjectDraft, payload: &[u8]) -> ObjectId {
        let seq = self.inner.sequence.fetch_add(1, Ordering::SeqCst);
        let mut hasher = blake3::Hasher::new();
        hasher.update(draft.container.as_bytes());
        hasher.update(draft.owner.as_bytes());
        hasher.update(&seq.to_le_bytes());
        for attr in &draft.attributes {
            hasher.update(attr.key.as_bytes());
            hasher.update(&[0]);
            hasher.update(attr.value.as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(payload);
        ObjectId::from_bytes(*hasher.finalize().as_bytes())
    }
}

#[async_trait]
impl NeoFs for MemoryNetwork {
    async fn network_info(&self, _auth: &CallAuth) -> Result<NetworkInfo> {
        let parameters = self
            .inner
            .epoch_duration
            .map(|d| vec![NetworkParameter::from_u64(EPOCH_DURATION_PARAMETER, d)])
            .unwrap_or_default();

        Ok(NetworkInfo {
            current_epoch: self.current_epoch(),
            ms_per_block: self.inner.ms_per_block,
            parameters,
        })
    }

    async fn search_objects(
        &self,
        container: ContainerId,
        filters: &[SearchFilter],
        _auth: &CallAuth,
    ) -> Result<Vec<ObjectId>> {
        let objects = self
            .inner
            .containers
            .get(&container)
            .ok_or(NetworkError::ContainerNotFound(container))?;

        Ok(objects
            .iter()
            .filter(|obj| filters.iter().all(|f| f.matches(&obj.header.attributes)))
            .map(|obj| obj.header.id)
            .collect())
    }

    async fn head_object(&self, address: Address, _auth: &CallAuth) -> Result<ObjectHeader> {
        self.find(address).map(|obj| obj.header)
    }

    async fn get_object(&self, address: Address, _auth: &CallAuth) -> Result<ObjectRead> {
        let obj = self.find(address)?;
        let chunk_size = self.inner.chunk_size;

        let payload = obj.payload;
        let chunks: Vec<std::io::Result<Bytes>> = (0..payload.len())
            .step_by(chunk_size)
            .map(|start| Ok(payload.slice(start..(start + chunk_size).min(payload.len()))))
            .collect();

        Ok(ObjectRead {
            header: obj.header,
            payload: futures::stream::iter(chunks).boxed(),
        })
    }

    async fn put_object<'a>(
        &self,
        draft: ObjectDraft,
        mut payload: PayloadStream<'a>,
        _auth: &CallAuth,
    ) -> Result<ObjectId> {
        if !self.inner.containers.contains_key(&draft.container) {
            return Err(NetworkError::ContainerNotFound(draft.container));
        }

        let mut buf = BytesMut::new();
        while let Some(chunk) = payload.next().await {
            buf.extend_from_slice(&chunk.map_err(NetworkError::Payload)?);
        }
        let payload = buf.freeze();

        let id = self.object_id(&draft, &payload);
        let header = ObjectHeader {
            id,
            container: draft.container,
            owner: draft.owner,
            attributes: draft.attributes,
            payload_size: payload.len() as u64,
        };

        // container may have been dropped while the payload was read
        let mut objects = self
            .inner
            .containers
            .get_mut(&header.container)
            .ok_or(NetworkError::ContainerNotFound(header.container))?;
        objects.push(StoredObject { header, payload });

        debug!(object = %id, "Object stored");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchType;
    use neogate_core::{Attribute, OwnerId};

    fn draft(container: ContainerId, attributes: Vec<Attribute>) -> ObjectDraft {
        ObjectDraft {
            container,
            owner: OwnerId::from_script_hash([5u8; 20]),
            attributes,
        }
    }

    fn payload(data: &'static [u8]) -> PayloadStream<'static> {
        futures::stream::iter(vec![Ok(Bytes::from_static(data))]).boxed()
    }

    async fn collect(mut stream: PayloadStream<'static>) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let network = MemoryNetwork::new();
        let cid = network.create_container();
        let auth = CallAuth::anonymous();

        let id = network
            .put_object(
                draft(cid, vec![Attribute::new("FileName", "hello.txt")]),
                payload(b"Hello, World!"),
                &auth,
            )
            .await
            .unwrap();

        let read = network.get_object(Address::new(cid, id), &auth).await.unwrap();
        assert_eq!(read.header.filename(), Some("hello.txt"));
        assert_eq!(read.header.payload_size, 13);
        assert_eq!(collect(read.payload).await, b"Hello, World!");
    }

    #[tokio::test]
    async fn test_payload_streamed_in_chunks() {
        let network = MemoryNetwork::new().with_chunk_size(4);
        let cid = network.create_container();
        let auth = CallAuth::anonymous();

        let id = network
            .put_object(draft(cid, vec![]), payload(b"0123456789"), &auth)
            .await
            .unwrap();

        let read = network.get_object(Address::new(cid, id), &auth).await.unwrap();
        let chunks: Vec<_> = read.payload.collect().await;
        assert_eq!(chunks.len(), 3);
    }

    #[tokio::test]
    async fn test_identical_uploads_get_distinct_ids() {
        let network = MemoryNetwork::new();
        let cid = network.create_container();
        let auth = CallAuth::anonymous();

        let a = network.put_object(draft(cid, vec![]), payload(b"same"), &auth).await.unwrap();
        let b = network.put_object(draft(cid, vec![]), payload(b"same"), &auth).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(network.object_count(&cid), 2);
    }

    #[tokio::test]
    async fn test_search_preserves_insertion_order() {
        let network = MemoryNetwork::new();
        let cid = network.create_container();
        let auth = CallAuth::anonymous();

        let mut ids = Vec::new();
        for name in ["report1.txt", "summary.txt", "report2.csv"] {
            ids.push(
                network
                    .put_object(
                        draft(cid, vec![Attribute::new("FileName", name)]),
                        payload(b"x"),
                        &auth,
                    )
                    .await
                    .unwrap(),
            );
        }

        let found = network
            .search_objects(cid, &[SearchFilter::prefix("FileName", "report")], &auth)
            .await
            .unwrap();
        assert_eq!(found, vec![ids[0], ids[2]]);

        let exact = network
            .search_objects(
                cid,
                &[SearchFilter {
                    key: "FileName".into(),
                    value: "summary.txt".into(),
                    match_type: MatchType::StringEqual,
                }],
                &auth,
            )
            .await
            .unwrap();
        assert_eq!(exact, vec![ids[1]]);
    }

    #[tokio::test]
    async fn test_missing_entities() {
        let network = MemoryNetwork::new();
        let auth = CallAuth::anonymous();
        let unknown = ContainerId::from_bytes([9u8; 32]);

        let err = network.search_objects(unknown, &[], &auth).await.unwrap_err();
        assert!(err.is_not_found());

        let err = network
            .put_object(draft(unknown, vec![]), payload(b"x"), &auth)
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::ContainerNotFound(_)));

        let cid = network.create_container();
        let err = network
            .head_object(Address::new(cid, ObjectId::from_bytes([1u8; 32])), &auth)
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::ObjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_payload_error_aborts_put() {
        let network = MemoryNetwork::new();
        let cid = network.create_container();
        let broken: PayloadStream<'static> = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("client went away")),
        ])
        .boxed();

        let err = network
            .put_object(draft(cid, vec![]), broken, &CallAuth::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::Payload(_)));
        assert_eq!(network.object_count(&cid), 0);
    }

    #[tokio::test]
    async fn test_network_info() {
        let network = MemoryNetwork::with_parameters(10, 500, Some(120));
        network.set_epoch(12);
        let info = network.network_info(&CallAuth::anonymous()).await.unwrap();
        assert_eq!(info.current_epoch, 12);
        assert_eq!(info.ms_per_block, 500);
        assert_eq!(info.epoch_duration(), 120);

        let bare = MemoryNetwork::with_parameters(0, 500, None);
        let info = bare.network_info(&CallAuth::anonymous()).await.unwrap();
        assert!(info.parameters.is_empty());
    }
}
