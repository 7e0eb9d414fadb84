//! Resolving selectors into object IDs

use crate::{ApiError, GatewayErrorCode};
use neogate_core::attribute::ATTRIBUTE_FILE_NAME;
use neogate_core::{ContainerId, ObjectId, Selector};
use neogate_network::{CallAuth, NeoFs, NetworkError, SearchFilter};
use thiserror::Error;

/// Why a selector did not resolve
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("no object matches {0}")]
    NotFound(String),

    #[error("{count} objects match {selector}")]
    Ambiguous { selector: String, count: usize },

    #[error("could not search for objects: {0}")]
    SearchFailed(#[source] NetworkError),
}

impl From<SelectionError> for ApiError {
    fn from(err: SelectionError) -> Self {
        match &err {
            SelectionError::NotFound(_) => ApiError::not_found(err.to_string()),
            SelectionError::Ambiguous { .. } => {
                ApiError::gateway(GatewayErrorCode::AmbiguousSelection, err.to_string())
            }
            SelectionError::SearchFailed(_) => {
                ApiError::gateway(GatewayErrorCode::SelectionFailed, err.to_string())
            }
        }
    }
}

fn filters_for(selector: &Selector) -> Vec<SearchFilter> {
    match selector {
        Selector::ById(_) => Vec::new(),
        Selector::ByAttribute { key, value } => vec![SearchFilter::equal(key, value)],
        Selector::ByFilenamePrefix(prefix) => vec![SearchFilter::prefix(ATTRIBUTE_FILE_NAME, prefix)],
    }
}

async fn search(
    network: &dyn NeoFs,
    container: ContainerId,
    selector: &Selector,
    auth: &CallAuth,
) -> Result<Vec<ObjectId>, SelectionError> {
    network
        .search_objects(container, &filters_for(selector), auth)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                SelectionError::NotFound(e.to_string())
            } else {
                tracing::error!(container = %container, selector = %selector, error = %e, "Object search failed");
                SelectionError::SearchFailed(e)
            }
        })
}

/// Resolve a selector to exactly one object. ID selectors resolve without a
/// network call; search-based selectors fail on zero or several matches.
pub async fn select_one(
    network: &dyn NeoFs,
    container: ContainerId,
    selector: &Selector,
    auth: &CallAuth,
) -> Result<ObjectId, SelectionError> {
    if let Selector::ById(id) = selector {
        return Ok(*id);
    }

    let ids = search(network, container, selector, auth).await?;
    match ids.as_slice() {
        [] => Err(SelectionError::NotFound(selector.to_string())),
        [id] => Ok(*id),
        _ => Err(SelectionError::Ambiguous {
            selector: selector.to_string(),
            count: ids.len(),
        }),
    }
}

/// Resolve a selector to every matching object, in network order
pub async fn select_all(
    network: &dyn NeoFs,
    container: ContainerId,
    selector: &Selector,
    auth: &CallAuth,
) -> Result<Vec<ObjectId>, SelectionError> {
    if let Selector::ById(id) = selector {
        return Ok(vec![*id]);
    }

    let ids = search(network, container, selector, auth).await?;
    if ids.is_empty() {
        return Err(SelectionError::NotFound(selector.to_string()));
    }
    Ok(ids)
}
