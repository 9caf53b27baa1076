//! Error types for the OneLake SDK.

use thiserror::Error;

/// Failure reported by an [`HttpClient`](crate::HttpClient) backend before any
/// response was received.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// The backend gave up waiting.
    #[error("request timed out")]
    Timeout,

    /// No connection could be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Any other backend failure.
    #[error("HTTP backend error")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Every way a OneLake API call can fail.
#[derive(Debug, Error)]
pub enum OneLakeError {
    /// Transport failure.
    #[error("HTTP request error")]
    Http(#[from] HttpClientError),

    /// Non-success status from a strict call.
    #[error("API returned HTTP {status}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The body was not the JSON we expected.
    #[error("JSON deserialization error")]
    Json(#[from] serde_json::Error),

    /// Base URL and endpoint do not form a URL.
    #[error("invalid request URL")]
    Url(#[from] url::ParseError),

    /// The token cannot be sent as a header.
    #[error("invalid header value")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// A listing response lacked the named array.
    #[error("response has no list property `{0}`")]
    MissingListProperty(String),

    /// [`OneLakeClient::initialize`](crate::OneLakeClient::initialize) has not succeeded yet.
    #[error("API client has not been initialized")]
    NotInitialized,

    /// The connectivity check was refused.
    #[error("cannot access '{base_url}' with the given credentials")]
    NoAccess {
        /// The endpoint that refused us.
        base_url: String,
    },
}

impl OneLakeError {
    /// The HTTP status of the remote response, if this error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(_)
            | Self::Json(_)
            | Self::Url(_)
            | Self::InvalidHeader(_)
            | Self::MissingListProperty(_)
            | Self::NotInitialized
            | Self::NoAccess { .. } => None,
        }
    }

    /// Whether the remote answered 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
