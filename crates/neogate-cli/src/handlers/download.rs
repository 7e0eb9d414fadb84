//! Single-object download handlers (GET and HEAD)

use crate::auth::resolve_bearer_token;
use crate::selection::select_one;
use crate::sniff::sniffer;
use crate::{ApiError, AppState, GatewayErrorCode};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED},
    },
    response::Response,
};
use chrono::DateTime;
use neogate_core::attribute::{
    AttributeKind, USER_ATTRIBUTE_HEADER_PREFIX, header_key_from_attribute, is_system_key,
    is_valid_header_key, is_valid_header_value,
};
use neogate_core::{Address, ContainerId, Selector};
use neogate_network::{CallAuth, NetworkError, ObjectHeader, PayloadStream};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Header carrying the object ID
pub const OBJECT_ID_HEADER: &str = "x-object-id";
/// Header carrying the owner ID
pub const OWNER_ID_HEADER: &str = "x-owner-id";
/// Header carrying the container ID
pub const CONTAINER_ID_HEADER: &str = "x-container-id";

/// Query parameters of download requests
#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    /// Serve as an attachment instead of inline
    pub download: Option<String>,
}

impl DownloadParams {
    pub fn as_attachment(&self) -> bool {
        self.download.as_deref().is_some_and(|v| {
            matches!(
                v.to_ascii_lowercase().as_str(),
                "1" | "t" | "true" | "y" | "yes" | "on"
            )
        })
    }
}

/// GET /get/{cid}/{oid}
pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Path((cid, oid)): Path<(String, String)>,
    Query(params): Query<DownloadParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let selector = Selector::by_id(&oid);
    read_object(&state, &cid, selector, &headers, &params, false).await
}

/// HEAD /get/{cid}/{oid}
pub async fn head_by_id(
    State(state): State<Arc<AppState>>,
    Path((cid, oid)): Path<(String, String)>,
    Query(params): Query<DownloadParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let selector = Selector::by_id(&oid);
    read_object(&state, &cid, selector, &headers, &params, true).await
}

/// GET /get_by_attribute/{cid}/{attr_key}/{attr_val}
pub async fn get_by_attribute(
    State(state): State<Arc<AppState>>,
    Path((cid, key, value)): Path<(String, String, String)>,
    Query(params): Query<DownloadParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let selector = Selector::by_attribute(key, value);
    read_object(&state, &cid, selector, &headers, &params, false).await
}

/// HEAD /get_by_attribute/{cid}/{attr_key}/{attr_val}
pub async fn head_by_attribute(
    State(state): State<Arc<AppState>>,
    Path((cid, key, value)): Path<(String, String, String)>,
    Query(params): Query<DownloadParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let selector = Selector::by_attribute(key, value);
    read_object(&state, &cid, selector, &headers, &params, true).await
}

/// GET /get_by_filename/{cid}/{prefix}
pub async fn get_by_filename(
    State(state): State<Arc<AppState>>,
    Path((cid, prefix)): Path<(String, String)>,
    Query(params): Query<DownloadParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let selector = Selector::by_filename_prefix(prefix);
    read_object(&state, &cid, selector, &headers, &params, false).await
}

/// HEAD /get_by_filename/{cid}/{prefix}
pub async fn head_by_filename(
    State(state): State<Arc<AppState>>,
    Path((cid, prefix)): Path<(String, String)>,
    Query(params): Query<DownloadParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let selector = Selector::by_filename_prefix(prefix);
    read_object(&state, &cid, selector, &headers, &params, true).await
}

async fn read_object(
    state: &AppState,
    raw_container: &str,
    selector: neogate_core::Result<Selector>,
    headers: &HeaderMap,
    params: &DownloadParams,
    head: bool,
) -> Result<Response, ApiError> {
    let container: ContainerId = raw_container.parse()?;
    let auth = CallAuth::with_bearer(resolve_bearer_token(headers)?);
    let selector = selector?;

    let id = select_one(state.network.as_ref(), container, &selector, &auth).await?;
    let address = Address::new(container, id);
    debug!(address = %address, selector = %selector, head, "Object selected");

    let (object, payload) = if head {
        let object = state
            .network
            .head_object(address, &auth)
            .await
            .map_err(|e| fetch_failed(address, e))?;
        (object, None)
    } else {
        let read = state
            .network
            .get_object(address, &auth)
            .await
            .map_err(|e| fetch_failed(address, e))?;
        (read.header, Some(read.payload))
    };

    let emitted = ObjectHeaders::from_object(&object, selector.is_filename_keyed(), params.as_attachment());
    let mut response_headers = emitted.headers;

    let body = match payload {
        None => {
            if let Some(content_type) = emitted.content_type {
                insert_header(&mut response_headers, CONTENT_TYPE, &content_type);
            }
            Body::empty()
        }
        Some(payload) => {
            let (content_type, payload) = match emitted.content_type {
                Some(explicit) => (explicit, payload),
                None => sniff(payload).await?,
            };
            insert_header(&mut response_headers, CONTENT_TYPE, &content_type);
            Body::from_stream(payload)
        }
    };

    info!(address = %address, size = object.payload_size, head, "Serving object");

    let mut response = Response::new(body);
    *response.headers_mut() = response_headers;
    Ok(response)
}

async fn sniff(payload: PayloadStream<'static>) -> Result<(String, PayloadStream<'static>), ApiError> {
    let (detector, signal) = sniffer(payload);
    let payload = detector.detect().await;
    let content_type = signal.wait().await.map_err(|e| {
        error!(error = %e, "Could not read object");
        ApiError::gateway(GatewayErrorCode::UpstreamFailure, e.to_string())
    })?;
    Ok((content_type.to_string(), payload))
}

fn fetch_failed(address: Address, err: NetworkError) -> ApiError {
    if err.is_not_found() {
        debug!(address = %address, error = %err, "Object not found");
    } else {
        error!(address = %address, error = %err, "Could not receive object");
    }
    ApiError::Network(err)
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

/// Response headers derived from an object's metadata
#[derive(Debug)]
pub struct ObjectHeaders {
    pub headers: HeaderMap,
    /// Value of the object's `Content-Type` attribute
    pub content_type: Option<String>,
}

impl ObjectHeaders {
    /// Map metadata to response headers. Attributes unsafe for raw header
    /// transport are dropped; owner and container IDs are left out for
    /// filename-keyed responses.
    pub fn from_object(object: &ObjectHeader, filename_keyed: bool, attachment: bool) -> Self {
        let mut headers = HeaderMap::new();
        let mut content_type = None;

        insert_header(&mut headers, CONTENT_LENGTH, &object.payload_size.to_string());

        for attr in &object.attributes {
            if !is_valid_header_key(&attr.key) || !is_valid_header_value(&attr.value) {
                debug!(key = %attr.key, "Skipping attribute unsafe for headers");
                continue;
            }

            let header_key = if is_system_key(&attr.key) {
                header_key_from_attribute(&attr.key)
            } else {
                attr.key.clone()
            };
            if let Ok(name) = HeaderName::try_from(format!("{USER_ATTRIBUTE_HEADER_PREFIX}{header_key}")) {
                insert_header(&mut headers, name, &attr.value);
            }

            match AttributeKind::of(&attr.key) {
                AttributeKind::FileName => {
                    let disposition = if attachment { "attachment" } else { "inline" };
                    insert_header(
                        &mut headers,
                        CONTENT_DISPOSITION,
                        &format!("{disposition}; filename=\"{}\"", base_name(&attr.value)),
                    );
                }
                AttributeKind::Timestamp => match attr.value.parse::<i64>() {
                    Ok(secs) => {
                        if let Some(at) = DateTime::from_timestamp(secs, 0) {
                            let formatted = at.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
                            insert_header(&mut headers, LAST_MODIFIED, &formatted);
                        }
                    }
                    Err(e) => {
                        info!(value = %attr.value, error = %e, "Couldn't parse creation date");
                    }
                },
                AttributeKind::ContentType => content_type = Some(attr.value.clone()),
                AttributeKind::ExpirationEpoch | AttributeKind::Opaque => {}
            }
        }

        insert_header(&mut headers, HeaderName::from_static(OBJECT_ID_HEADER), &object.id.to_string());
        if !filename_keyed {
            insert_header(&mut headers, HeaderName::from_static(OWNER_ID_HEADER), &object.owner.to_string());
            insert_header(
                &mut headers,
                HeaderName::from_static(CONTAINER_ID_HEADER),
                &object.container.to_string(),
            );
        }

        Self { headers, content_type }
    }
}

/// Last element of a slash-separated path
pub fn base_name(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neogate_core::{Attribute, ObjectId, OwnerId};
    use rstest::rstest;

    fn object(attributes: Vec<Attribute>) -> ObjectHeader {
        ObjectHeader {
            id: ObjectId::from_bytes([1; 32]),
            container: ContainerId::from_bytes([2; 32]),
            owner: OwnerId::from_script_hash([3; 20]),
            attributes,
            payload_size: 42,
        }
    }

    #[rstest]
    #[case("report.txt", "report.txt")]
    #[case("dir/sub/report.txt", "report.txt")]
    #[case("dir/", "dir")]
    #[case("/", "/")]
    #[case("", ".")]
    fn test_base_name(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(base_name(path), expected);
    }

    #[rstest]
    #[case(None, false)]
    #[case(Some("true"), true)]
    #[case(Some("1"), true)]
    #[case(Some("no"), false)]
    fn test_attachment_flag(#[case] raw: Option<&str>, #[case] expected: bool) {
        let params = DownloadParams {
            download: raw.map(String::from),
        };
        assert_eq!(params.as_attachment(), expected);
    }

    #[test]
    fn test_headers_for_attributes() {
        let obj = object(vec![
            Attribute::new("FileName", "docs/cat.jpg"),
            Attribute::new("Timestamp", "1700000000"),
            Attribute::new("__NEOFS__EXPIRATION_EPOCH", "100"),
            Attribute::new("Project", "alpha"),
            Attribute::new("Bad Key", "x"),
            Attribute::new("Quoted", "a\"b"),
        ]);
        let emitted = ObjectHeaders::from_object(&obj, false, false);
        let h = &emitted.headers;

        assert_eq!(h["x-attribute-filename"], "docs/cat.jpg");
        assert_eq!(h["x-attribute-neofs-expiration-epoch"], "100");
        assert_eq!(h["x-attribute-project"], "alpha");
        assert!(!h.contains_key("x-attribute-quoted"));
        assert_eq!(h[CONTENT_DISPOSITION], "inline; filename=\"cat.jpg\"");
        assert_eq!(h[LAST_MODIFIED], "Tue, 14 Nov 2023 22:13:20 GMT");
        assert_eq!(h[CONTENT_LENGTH], "42");
        assert_eq!(h[OBJECT_ID_HEADER], obj.id.to_string().as_str());
        assert_eq!(h[OWNER_ID_HEADER], obj.owner.to_string().as_str());
        assert_eq!(h[CONTAINER_ID_HEADER], obj.container.to_string().as_str());
        assert_eq!(emitted.content_type, None);
    }

    #[test]
    fn test_filename_keyed_omits_owner_and_container() {
        let obj = object(vec![Attribute::new("FileName", "a.txt")]);
        let emitted = ObjectHeaders::from_object(&obj, true, true);
        let h = &emitted.headers;

        assert!(h.contains_key(OBJECT_ID_HEADER));
        assert!(!h.contains_key(OWNER_ID_HEADER));
        assert!(!h.contains_key(CONTAINER_ID_HEADER));
        assert_eq!(h[CONTENT_DISPOSITION], "attachment; filename=\"a.txt\"");
    }

    #[test]
    fn test_explicit_content_type() {
        let obj = object(vec![
            Attribute::new("Content-Type", "application/json"),
            Attribute::new("Timestamp", "not-a-number"),
        ]);
        let emitted = ObjectHeaders::from_object(&obj, false, false);
        assert_eq!(emitted.content_type.as_deref(), Some("application/json"));
        assert!(!emitted.headers.contains_key(LAST_MODIFIED));
    }
}
