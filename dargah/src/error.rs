use thiserror::Error;

use crate::zibal::{Rejection, TransportError};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid argument `{field}`: expected {expected}, got {actual:?}")]
    InvalidArgument {
        field: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[error("{endpoint} rejected by provider (result {code}): {rejection}", code = .rejection.code())]
    Rejected {
        endpoint: &'static str,
        #[source]
        rejection: Rejection,
    },

    #[error("{endpoint} returned unrecognized result {code}: {}", .message.as_deref().unwrap_or("no message"))]
    UnrecognizedStatus {
        endpoint: &'static str,
        code: i64,
        message: Option<String>,
    },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse {
        endpoint: &'static str,
        reason: String,
    },

    #[error("Failed to encode request body: {context}: {source}")]
    JsonEncode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        context: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl GatewayError {
    pub(crate) fn invalid_argument(
        field: &'static str,
        expected: &'static str,
        actual: impl Into<String>,
    ) -> Self {
        GatewayError::InvalidArgument {
            field,
            expected,
            actual: actual.into(),
        }
    }
}
