//! Zip archive of every object matching a filename prefix
//!
//! The response starts as soon as selection succeeds. Entries are then
//! fetched and written one at a time by a producer task that feeds the
//! response body through a bounded channel. Once the body has started, a
//! failure can only abort the transfer.

use crate::auth::resolve_bearer_token;
use crate::selection::select_all;
use crate::{ApiError, AppState};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{
        HeaderMap, HeaderValue,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::Response,
};
use bytes::Bytes;
use chrono::{Datelike, Timelike, Utc};
use futures::StreamExt;
use neogate_core::{Address, ContainerId, ObjectId, Selector};
use neogate_network::{CallAuth, NeoFs, NetworkError};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive chunks buffered ahead of the client
const ARCHIVE_CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, Error)]
enum ArchiveError {
    #[error("fetch {address}: {source}")]
    Fetch {
        address: Address,
        #[source]
        source: NetworkError,
    },

    #[error("read payload of {address}: {source}")]
    Payload {
        address: Address,
        #[source]
        source: io::Error,
    },

    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("zip write: {0}")]
    Write(#[from] io::Error),

    #[error("client went away")]
    Disconnected,
}

/// GET /zip/{cid}/{prefix}
pub async fn download_zip(
    State(state): State<Arc<AppState>>,
    Path((cid, prefix)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let container: ContainerId = cid.parse()?;
    let auth = CallAuth::with_bearer(resolve_bearer_token(&headers)?);
    let selector = Selector::by_filename_prefix(prefix)?;

    let ids = select_all(state.network.as_ref(), container, &selector, &auth).await?;
    info!(container = %container, selector = %selector, objects = ids.len(), "Streaming archive");

    let method = if state.config.zip_compression {
        CompressionMethod::Deflated
    } else {
        CompressionMethod::Stored
    };

    let (tx, rx) = mpsc::channel(ARCHIVE_CHANNEL_CAPACITY);
    tokio::spawn(produce_archive(
        Arc::clone(&state.network),
        container,
        ids,
        auth,
        method,
        tx,
    ));

    let body = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });

    let mut response = Response::new(Body::from_stream(body));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"archive.zip\""),
    );
    Ok(response)
}

/// Run the archive writer until it completes or the client disconnects
async fn produce_archive(
    network: Arc<dyn NeoFs>,
    container: ContainerId,
    ids: Vec<ObjectId>,
    auth: CallAuth,
    method: CompressionMethod,
    tx: mpsc::Sender<io::Result<Bytes>>,
) {
    let result = tokio::select! {
        result = write_archive(network.as_ref(), container, &ids, &auth, method, &tx) => result,
        _ = tx.closed() => Err(ArchiveError::Disconnected),
    };

    match result {
        Ok(()) => debug!(container = %container, entries = ids.len(), "Archive complete"),
        Err(ArchiveError::Disconnected) => {
            warn!(container = %container, "Archive aborted, client went away");
        }
        Err(e) => {
            error!(container = %container, error = %e, "Couldn't stream files");
            // surfaces as a broken transfer, the status line is already sent
            let _ = tx.send(Err(io::Error::other(e.to_string()))).await;
        }
    }
}

/// Shared buffer the zip writer appends to; drained after every write
#[derive(Clone, Default)]
struct ChunkSink(Arc<Mutex<Vec<u8>>>);

impl ChunkSink {
    fn take(&self) -> Bytes {
        Bytes::from(std::mem::take(&mut *self.0.lock()))
    }
}

impl Write for ChunkSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

async fn forward(sink: &ChunkSink, tx: &mpsc::Sender<io::Result<Bytes>>) -> Result<(), ArchiveError> {
    let chunk = sink.take();
    if chunk.is_empty() {
        return Ok(());
    }
    tx.send(Ok(chunk)).await.map_err(|_| ArchiveError::Disconnected)
}

fn entry_options(method: CompressionMethod, payload_size: u64) -> SimpleFileOptions {
    let now = Utc::now();
    let modified = zip::DateTime::from_date_and_time(
        now.year().clamp(1980, 2107) as u16,
        now.month() as u8,
        now.day() as u8,
        now.hour() as u8,
        now.minute() as u8,
        now.second() as u8,
    )
    .unwrap_or_default();

    SimpleFileOptions::default()
        .compression_method(method)
        .last_modified_time(modified)
        .large_file(payload_size >= u64::from(u32::MAX))
}

async fn write_archive(
    network: &dyn NeoFs,
    container: ContainerId,
    ids: &[ObjectId],
    auth: &CallAuth,
    method: CompressionMethod,
    tx: &mpsc::Sender<io::Result<Bytes>>,
) -> Result<(), ArchiveError> {
    let sink = ChunkSink::default();
    let mut zip = ZipWriter::new_stream(sink.clone());

    for id in ids {
        let address = Address::new(container, *id);
        // the payload stream is live once the fetch resolves
        let read = network
            .get_object(address, auth)
            .await
            .map_err(|source| ArchiveError::Fetch { address, source })?;

        let name = read.header.filename().unwrap_or_default().to_string();
        debug!(address = %address, entry = %name, "Adding archive entry");
        zip.start_file(name, entry_options(method, read.header.payload_size))?;

        let mut payload = read.payload;
        while let Some(chunk) = payload.next().await {
            let chunk = chunk.map_err(|source| ArchiveError::Payload { address, source })?;
            zip.write_all(&chunk)?;
            forward(&sink, tx).await?;
        }

        zip.flush()?;
        forward(&sink, tx).await?;
    }

    zip.finish()?;
    forward(&sink, tx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use neogate_core::{Attribute, OwnerId};
    use neogate_network::{MemoryNetwork, ObjectDraft};
    use std::io::{Cursor, Read};

    async fn store(network: &MemoryNetwork, container: ContainerId, name: &str, data: &'static [u8]) -> ObjectId {
        let draft = ObjectDraft {
            container,
            owner: OwnerId::from_script_hash([1; 20]),
            attributes: vec![Attribute::new("FileName", name)],
        };
        let payload = futures::stream::iter(vec![Ok(Bytes::from_static(data))]).boxed();
        network.put_object(draft, payload, &CallAuth::anonymous()).await.unwrap()
    }

    async fn archive_bytes(network: &MemoryNetwork, container: ContainerId, ids: &[ObjectId], method: CompressionMethod) -> Vec<u8> {
        let (tx, mut rx) = mpsc::channel::<io::Result<Bytes>>(64);
        let collector = tokio::spawn(async move {
            let mut out = Vec::new();
            while let Some(chunk) = rx.recv().await {
                out.extend_from_slice(&chunk.unwrap());
            }
            out
        });
        write_archive(network, container, ids, &CallAuth::anonymous(), method, &tx)
            .await
            .unwrap();
        drop(tx);
        collector.await.unwrap()
    }

    #[rstest::rstest]
    #[case(CompressionMethod::Stored)]
    #[case(CompressionMethod::Deflated)]
    #[tokio::test]
    async fn test_entries_in_selection_order(#[case] method: CompressionMethod) {
        let network = MemoryNetwork::new().with_chunk_size(3);
        let cid = network.create_container();
        let ids = vec![
            store(&network, cid, "b.txt", b"second file").await,
            store(&network, cid, "a.txt", b"first file").await,
        ];

        let data = archive_bytes(&network, cid, &ids, method).await;
        let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "b.txt");
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "second file");
        drop(entry);

        assert_eq!(archive.by_index(1).unwrap().name(), "a.txt");
    }

    #[tokio::test]
    async fn test_missing_object_aborts() {
        let network = MemoryNetwork::new();
        let cid = network.create_container();
        let (tx, _rx) = mpsc::channel(64);

        let err = write_archive(
            &network,
            cid,
            &[ObjectId::from_bytes([9; 32])],
            &CallAuth::anonymous(),
            CompressionMethod::Stored,
            &tx,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ArchiveError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_closed_channel_stops_writer() {
        let network = MemoryNetwork::new();
        let cid = network.create_container();
        let ids = vec![store(&network, cid, "a.txt", b"data").await];
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let err = write_archive(&network, cid, &ids, &CallAuth::anonymous(), CompressionMethod::Stored, &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Disconnected));
    }
}
