//! Error types for the client engine.
//!
//! One enum per failure domain: [`ApiError`] is the classified taxonomy a
//! request can end with, [`TransportError`] covers faults below the engine,
//! [`OauthError`] covers the login flow, and [`ConfigError`] covers
//! construction-time validation.

use bytes::Bytes;
use thiserror::Error;

use crate::transport::TransportResponse;

/// Result alias for engine operations that can fail.
pub type ApiResult<T> = Result<T, ApiError>;

/// Classified outcome of a failed request.
///
/// Instances are never returned synchronously from `perform`; they flow to
/// failure subscriptions and the logger only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The response body was valid UTF-8 but did not decode as the
    /// requested type.
    #[error("Response was readable text but not decodable as the requested type: {raw}")]
    UnknownString {
        /// The body as text.
        raw: String,
    },

    /// The response body was neither valid UTF-8 nor decodable.
    #[error("Response bytes were not decodable ({} bytes)", .data.len())]
    UnparsableData {
        /// The raw body.
        data: Bytes,
    },

    /// The response status fell outside [200, 300).
    #[error("Request failed with status {code}")]
    InvalidStatus {
        /// HTTP status code.
        code: u16,
        /// Underlying transport fault, when one accompanied the status.
        source: Option<TransportError>,
        /// Raw response body, when present.
        body: Option<Bytes>,
        /// Lossless text form of the body, when it was UTF-8.
        body_text: Option<String>,
    },

    /// The transport failed before a status was available.
    #[error("Transport failure: {source}")]
    Other {
        /// The transport fault.
        #[from]
        source: TransportError,
    },
}

impl ApiError {
    /// Short stable identifier for telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownString { .. } => "unknown_string",
            Self::UnparsableData { .. } => "unparsable_data",
            Self::InvalidStatus { .. } => "invalid_status",
            Self::Other { .. } => "transport",
        }
    }

    /// The HTTP status code, when the failure carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::InvalidStatus { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the failure happened below the HTTP layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Other { .. })
    }

    /// Classify a response whose status fell outside the success range.
    pub(crate) fn from_status(response: &TransportResponse) -> Self {
        let body = if response.body.is_empty() {
            None
        } else {
            Some(response.body.clone())
        };
        let body_text = body
            .as_ref()
            .and_then(|bytes| std::str::from_utf8(bytes).ok().map(str::to_string));
        Self::InvalidStatus {
            code: response.status,
            source: None,
            body,
            body_text,
        }
    }

    /// Classify a success body that failed to decode as the requested type.
    pub(crate) fn from_undecodable(body: &Bytes) -> Self {
        match std::str::from_utf8(body) {
            Ok(text) => Self::UnknownString {
                raw: text.to_string(),
            },
            Err(_) => Self::UnparsableData { data: body.clone() },
        }
    }
}

/// Fault raised by an [`HttpTransport`](crate::transport::HttpTransport)
/// implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The connection could not be established or broke mid-flight.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Transport-reported detail.
        message: String,
    },

    /// The request exceeded its deadline.
    #[error("Request timed out after {seconds} seconds")]
    Timeout {
        /// The deadline that was exceeded.
        seconds: u64,
    },

    /// The response could not be read off the wire.
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// Transport-reported detail.
        message: String,
    },

    /// The transport itself could not be constructed.
    #[error("Transport setup failed: {message}")]
    Setup {
        /// Builder-reported detail.
        message: String,
    },
}

/// Fault raised by an [`AuthorizationUi`](crate::flows::AuthorizationUi)
/// implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthorizationUiError {
    /// The user dismissed the UI without authorizing.
    #[error("User cancelled authorization")]
    Cancelled,

    /// The UI could not complete the authorization round-trip.
    #[error("Authorization UI failed: {message}")]
    Failed {
        /// UI-reported detail.
        message: String,
    },
}

/// Fault raised by the OAuth login flow.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OauthError {
    /// The user dismissed the authorization UI. Carries no underlying
    /// error by definition.
    #[error("Authorization was cancelled")]
    Cancelled,

    /// The authorization UI failed before producing a callback.
    #[error("Authorization UI failed: {message}")]
    AuthorizationUi {
        /// UI-reported detail.
        message: String,
    },

    /// The callback URL carried no `code` query parameter.
    #[error("Authorization callback carried no code parameter")]
    MissingCode,

    /// The token endpoint answered with success but an empty body.
    #[error("Token endpoint returned an empty grant")]
    EmptyGrant,

    /// The token-endpoint request itself failed.
    #[error("Token exchange failed: {0}")]
    TokenExchange(#[from] ApiError),
}

impl From<AuthorizationUiError> for OauthError {
    fn from(error: AuthorizationUiError) -> Self {
        match error {
            AuthorizationUiError::Cancelled => Self::Cancelled,
            AuthorizationUiError::Failed { message } => Self::AuthorizationUi { message },
        }
    }
}

/// Construction-time validation failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The user agent string was empty.
    #[error("User agent must not be empty")]
    EmptyUserAgent,

    /// The request timeout was zero.
    #[error("Timeout must be greater than zero")]
    ZeroTimeout,

    /// No Tokio runtime handle was supplied and none was current.
    #[error("No runtime handle available; construct inside a Tokio runtime or supply one")]
    NoRuntime,

    /// The transport could not be built.
    #[error("Transport construction failed: {0}")]
    Transport(#[from] TransportError),
}
