//! Error types for the neogate-core crate

use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while interpreting request data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Container ID has the wrong syntax
    #[error("invalid container ID: {0}")]
    InvalidContainerId(String),

    /// Object ID has the wrong syntax
    #[error("invalid object ID: {0}")]
    InvalidObjectId(String),

    /// Owner ID has the wrong syntax or checksum
    #[error("invalid owner ID: {0}")]
    InvalidOwnerId(String),

    /// Selector arguments are unusable
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// Bearer token is not valid base64
    #[error("can't base64-decode bearer token: {0}")]
    TokenEncoding(String),

    /// Bearer token does not deserialize into a signed token
    #[error("can't unmarshal bearer token: {0}")]
    TokenFormat(String),

    /// Expiration header value could not be parsed
    #[error("invalid expiration header {header}: {reason}")]
    InvalidExpiration { header: String, reason: String },

    /// Expiration resolves to a moment that is not in the future
    #[error("expiration time not from the future")]
    ExpirationNotInFuture,

    /// Network info snapshot can't be used for epoch arithmetic
    #[error("invalid network info: {0}")]
    InvalidNetworkInfo(String),
}
