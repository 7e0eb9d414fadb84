//! Error types and gateway error codes

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use neogate_core::CoreError;
use neogate_network::NetworkError;
use thiserror::Error;

/// Gateway error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorCode {
    /// Malformed container or object ID, unusable attribute or prefix
    InvalidSelector,
    /// Bearer token is not base64 or not a signed token
    InvalidBearerToken,
    /// More than one object satisfies a single-object selector
    AmbiguousSelection,
    /// The search backing a selector failed
    SelectionFailed,
    NotFound,
    /// Expiration header unparseable or not in the future
    ExpirationInvalid,
    MultipartParseError,
    /// Storage network call failed
    UpstreamFailure,
    InternalError,
}

impl GatewayErrorCode {
    /// Get the error code string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSelector => "InvalidSelector",
            Self::InvalidBearerToken => "InvalidBearerToken",
            Self::AmbiguousSelection => "AmbiguousSelection",
            Self::SelectionFailed => "SelectionFailed",
            Self::NotFound => "NotFound",
            Self::ExpirationInvalid => "ExpirationInvalid",
            Self::MultipartParseError => "MultipartParseError",
            Self::UpstreamFailure => "UpstreamFailure",
            Self::InternalError => "InternalError",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidSelector
            | Self::InvalidBearerToken
            | Self::AmbiguousSelection
            | Self::ExpirationInvalid
            | Self::MultipartParseError => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::SelectionFailed | Self::UpstreamFailure => StatusCode::BAD_GATEWAY,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether callers get a generic message instead of the error detail
    fn hides_detail(&self) -> bool {
        matches!(
            self,
            Self::SelectionFailed | Self::UpstreamFailure | Self::InternalError
        )
    }
}

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{}: {message}", code.as_str())]
    Gateway {
        code: GatewayErrorCode,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl ApiError {
    /// Create a new gateway error
    pub fn gateway(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self::Gateway {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::gateway(GatewayErrorCode::NotFound, message)
    }

    /// Network failure on the write path. Only payload read errors stay
    /// client errors; anything else, not-found included, is an upstream
    /// failure.
    pub fn upstream(err: NetworkError) -> Self {
        match err {
            NetworkError::Payload(_) => Self::Network(err),
            other => Self::gateway(GatewayErrorCode::UpstreamFailure, other.to_string()),
        }
    }

    /// Get the error code
    pub fn error_code(&self) -> GatewayErrorCode {
        match self {
            Self::Gateway { code, .. } => *code,
            Self::Internal(_) => GatewayErrorCode::InternalError,
            Self::Core(e) => match e {
                CoreError::InvalidContainerId(_)
                | CoreError::InvalidObjectId(_)
                | CoreError::InvalidOwnerId(_)
                | CoreError::InvalidSelector(_) => GatewayErrorCode::InvalidSelector,
                CoreError::TokenEncoding(_) | CoreError::TokenFormat(_) => {
                    GatewayErrorCode::InvalidBearerToken
                }
                CoreError::InvalidExpiration { .. } | CoreError::ExpirationNotInFuture => {
                    GatewayErrorCode::ExpirationInvalid
                }
                CoreError::InvalidNetworkInfo(_) => GatewayErrorCode::UpstreamFailure,
            },
            Self::Network(e) if e.is_not_found() => GatewayErrorCode::NotFound,
            Self::Network(NetworkError::Payload(_)) => GatewayErrorCode::MultipartParseError,
            Self::Network(_) => GatewayErrorCode::UpstreamFailure,
        }
    }

    /// Message shown to the caller
    pub fn public_message(&self) -> String {
        let code = self.error_code();
        if code.hides_detail() {
            return match code {
                GatewayErrorCode::SelectionFailed => "could not search for objects".to_string(),
                GatewayErrorCode::UpstreamFailure => "storage network request failed".to_string(),
                _ => "internal error".to_string(),
            };
        }
        match self {
            Self::Gateway { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = code.status_code();
        let request_id = crate::middleware::current_request_id()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if code.hides_detail() {
            tracing::error!(request_id = %request_id, code = code.as_str(), error = %self, "Request failed");
        } else {
            tracing::debug!(request_id = %request_id, code = code.as_str(), error = %self, "Request rejected");
        }

        let body = serde_json::json!({
            "code": code.as_str(),
            "message": self.public_message(),
            "request_id": request_id,
        });

        // error code header matters for HEAD requests, which carry no body
        (
            status,
            [
                ("x-request-id", request_id.as_str()),
                ("x-gateway-error-code", code.as_str()),
            ],
            Json(body),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neogate_core::{Address, ContainerId, ObjectId};

    #[test]
    fn test_core_error_mapping() {
        let cases = [
            (CoreError::InvalidContainerId("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::TokenEncoding("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::ExpirationNotInFuture, StatusCode::BAD_REQUEST),
            (CoreError::InvalidNetworkInfo("x".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).error_code().status_code(), status);
        }
    }

    #[test]
    fn test_network_error_mapping() {
        let address = Address::new(
            ContainerId::from_bytes([1u8; 32]),
            ObjectId::from_bytes([2u8; 32]),
        );
        assert_eq!(
            ApiError::from(NetworkError::ObjectNotFound(address)).error_code(),
            GatewayErrorCode::NotFound
        );
        assert_eq!(
            ApiError::from(NetworkError::Connection("refused".into())).error_code(),
            GatewayErrorCode::UpstreamFailure
        );
    }

    #[test]
    fn test_upstream_detail_hidden() {
        let err = ApiError::from(NetworkError::Connection("10.0.0.7:8080 refused".into()));
        assert_eq!(err.public_message(), "storage network request failed");

        let err = ApiError::gateway(GatewayErrorCode::AmbiguousSelection, "2 objects match");
        assert_eq!(err.public_message(), "2 objects match");
    }

    #[test]
    fn test_upstream_never_not_found() {
        let missing = ContainerId::from_bytes([5u8; 32]);
        let err = ApiError::upstream(NetworkError::ContainerNotFound(missing));
        assert_eq!(err.error_code(), GatewayErrorCode::UpstreamFailure);
        assert_eq!(err.error_code().status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.public_message(), "storage network request failed");

        let err = ApiError::upstream(NetworkError::Other("object not found".into()));
        assert_eq!(err.error_code(), GatewayErrorCode::UpstreamFailure);

        let err = ApiError::upstream(NetworkError::Payload(std::io::Error::other("truncated")));
        assert_eq!(err.error_code(), GatewayErrorCode::MultipartParseError);
    }

    #[test]
    fn test_response_headers() {
        let response = ApiError::not_found("nothing here").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-gateway-error-code"], "NotFound");
        assert!(response.headers().contains_key("x-request-id"));
    }
}
