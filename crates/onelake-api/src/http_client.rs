//! Transport seam between the OneLake client and an HTTP stack.

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use std::future::Future;

use crate::error::HttpClientError;

/// A bodiless request. The DFS surface is only ever read, so every call is a
/// `GET` or a `HEAD`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// `GET` or `HEAD`.
    pub method: Method,
    /// Absolute URL, already spliced and encoded.
    pub url: String,
    /// Accept and authorization headers.
    pub headers: HeaderMap,
}

/// What came back, whatever the status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status as sent by the service; not interpreted by the transport.
    pub status: StatusCode,
    /// Response headers. For `HEAD` these carry all the metadata.
    pub headers: HeaderMap,
    /// Response body; empty for `HEAD`.
    pub body: Bytes,
}

impl HttpResponse {
    /// The body decoded as UTF-8, lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// A header as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Sends requests for a [`OneLakeClient`](crate::OneLakeClient).
///
/// Implementations report transport failures only; any status, including
/// 4xx and 5xx, is a successful [`HttpResponse`].
pub trait HttpClient: Send + Sync + 'static {
    /// Send `request` and buffer the whole response.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, HttpClientError>> + Send;
}
