//! Object upload

use crate::auth::{resolve_bearer_token, resolve_owner};
use crate::compose::ObjectComposer;
use crate::{ApiError, AppState, GatewayErrorCode};
use axum::{
    extract::{
        Multipart, Path, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures::StreamExt;
use neogate_core::{ContainerId, ObjectId, OwnerId};
use neogate_network::CallAuth;
use serde::Serialize;
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Body returned after a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub object_id: String,
    pub container_id: String,
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::gateway(
        GatewayErrorCode::MultipartParseError,
        format!("could not read multipart body: {}", err.body_text()),
    )
}

/// File name of a part that can carry the payload
fn upload_part_filename(field: &Field<'_>) -> Option<String> {
    let name = field.name().filter(|n| !n.is_empty())?;
    let filename = field.file_name().filter(|f| !f.is_empty())?;
    debug!(field = name, filename, "Using part as payload");
    Some(filename.to_string())
}

/// PUT|POST /upload/{cid}
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path(cid): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let container: ContainerId = cid.parse()?;
    let bearer = resolve_bearer_token(&headers)?;
    let owner = resolve_owner(bearer.as_ref(), state.default_owner);
    let auth = CallAuth::with_bearer(bearer);

    let mut multipart = multipart.map_err(|e| {
        ApiError::gateway(GatewayErrorCode::MultipartParseError, e.body_text())
    })?;

    let outcome = store_first_file(&state, &mut multipart, container, owner, &auth, &headers).await;

    // whatever the outcome, leave nothing unread
    let mut skipped = 0usize;
    while let Ok(Some(_)) = multipart.next_field().await {
        skipped += 1;
    }
    if skipped > 0 {
        debug!(skipped, "Ignored extra multipart parts");
    }

    let object_id = outcome?;
    info!(container = %container, object = %object_id, owner = %owner, "Object uploaded");

    let body = serde_json::to_string_pretty(&UploadResponse {
        object_id: object_id.to_string(),
        container_id: container.to_string(),
    })
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "application/json; charset=UTF-8")],
        body,
    )
        .into_response())
}

async fn store_first_file(
    state: &AppState,
    multipart: &mut Multipart,
    container: ContainerId,
    owner: OwnerId,
    auth: &CallAuth,
    headers: &HeaderMap,
) -> Result<ObjectId, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(filename) = upload_part_filename(&field) else {
            continue;
        };

        let now = Utc::now();
        let mut composer = ObjectComposer::new(container, owner);
        composer.process_headers(headers, now)?;
        composer
            .finalize(
                state.network.as_ref(),
                auth,
                &filename,
                state.config.default_timestamp,
                now,
            )
            .await?;

        let payload = field.map(|chunk| chunk.map_err(io::Error::other)).boxed();
        return state
            .network
            .put_object(composer.into_draft(), payload, auth)
            .await
            .map_err(|e| {
                warn!(container = %container, error = %e, "Could not store object");
                ApiError::upstream(e)
            });
    }

    Err(ApiError::gateway(
        GatewayErrorCode::MultipartParseError,
        "no part with both a field name and a file name",
    ))
}
