//! Reqwest-based HTTP client backend.

use std::time::Duration;

use bytes::Bytes;
use http::Method;
use tracing::trace;

use crate::error::HttpClientError;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};

/// Connection options for [`ReqwestClient`].
#[derive(Debug, Clone)]
pub struct ReqwestOptions {
    /// Total per-request timeout.
    pub timeout: Duration,
    /// Route every request through this proxy URL.
    pub proxy: Option<String>,
    /// Reject invalid TLS certificates. Turning this off is only meant for
    /// intercepting corporate proxies.
    pub strict_ssl: bool,
}

impl Default for ReqwestOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            proxy: None,
            strict_ssl: true,
        }
    }
}

/// An [`HttpClient`] implementation backed by [`reqwest`].
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a `ReqwestClient` honouring proxy and TLS options.
    pub fn with_options(options: &ReqwestOptions) -> Result<Self, HttpClientError> {
        let mut builder = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.strict_ssl);
        if let Some(proxy) = &options.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| HttpClientError::Other(Box::new(e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| HttpClientError::Other(Box::new(e)))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpClientError> {
        let is_head = request.method == Method::HEAD;
        let response = self
            .client
            .request(request.method, request.url.as_str())
            .headers(request.headers)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        // A HEAD answer advertises a content length it never sends.
        let body = if is_head {
            Bytes::new()
        } else {
            response.bytes().await?
        };
        trace!(%status, bytes = body.len(), "transport done");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl From<reqwest::Error> for HttpClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Other(Box::new(err))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn default_options_build_a_client() {
        assert!(ReqwestClient::with_options(&ReqwestOptions::default()).is_ok());
    }

    #[test]
    fn unparseable_proxy_is_a_backend_error() {
        let options = ReqwestOptions {
            proxy: Some("http://not a host".to_owned()),
            ..ReqwestOptions::default()
        };

        let err = ReqwestClient::with_options(&options).unwrap_err();

        assert!(matches!(err, HttpClientError::Other(_)), "{err:?}");
    }
}
