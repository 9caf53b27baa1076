//! The OneLake API client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION};
use http::{HeaderMap, HeaderValue, Method};
use parking_lot::RwLock;
use secrecy::{ExposeSecret as _, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::backends::{ReqwestClient, ReqwestOptions};
use crate::endpoint::full_url;
use crate::error::OneLakeError;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::models::{AccountListing, ApiResponse, ErrorEnvelope};
use crate::pagination::ListPages;

/// Default DFS endpoint.
pub const DEFAULT_BASE_URL: &str = "https://onelake.dfs.fabric.microsoft.com/";

/// A [`OneLakeClient`] backed by [`ReqwestClient`].
pub type OneLake = OneLakeClient<ReqwestClient>;

/// Builder for [`OneLakeClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: String,
    token: Option<SecretString>,
    http: ReqwestOptions,
}

impl ClientBuilder {
    /// Override the API base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Bearer token used for every request.
    #[must_use]
    pub fn token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = timeout;
        self
    }

    /// Route requests through a proxy.
    #[must_use]
    pub fn proxy(mut self, proxy: Option<String>) -> Self {
        self.http.proxy = proxy;
        self
    }

    /// Toggle TLS certificate validation.
    #[must_use]
    pub fn strict_ssl(mut self, strict: bool) -> Self {
        self.http.strict_ssl = strict;
        self
    }

    /// Build a client using the reqwest backend.
    pub fn build(self) -> Result<OneLake, OneLakeError> {
        let http = ReqwestClient::with_options(&self.http)?;
        self.build_with(http)
    }

    /// Build a client over any [`HttpClient`] backend.
    pub fn build_with<C: HttpClient>(self, http: C) -> Result<OneLakeClient<C>, OneLakeError> {
        let base_url = Url::parse(&self.base_url)?;
        Ok(OneLakeClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                token: RwLock::new(self.token),
                initialized: watch::Sender::new(false),
                connection_test_running: AtomicBool::new(false),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            token: None,
            http: ReqwestOptions::default(),
        }
    }
}

pub(crate) struct ClientInner<C> {
    http: C,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
    initialized: watch::Sender<bool>,
    connection_test_running: AtomicBool,
}

impl<C: HttpClient> ClientInner<C> {
    fn authorization(&self) -> Result<Option<HeaderValue>, OneLakeError> {
        let guard = self.token.read();
        let Some(token) = guard.as_ref() else {
            return Ok(None);
        };
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))?;
        value.set_sensitive(true);
        Ok(Some(value))
    }

    fn ensure_ready(&self) -> Result<(), OneLakeError> {
        if *self.initialized.borrow() || self.connection_test_running.load(Ordering::Acquire) {
            Ok(())
        } else {
            warn!("API has not been initialized, connect first");
            Err(OneLakeError::NotInitialized)
        }
    }

    /// Issue one request. Statuses are not interpreted here.
    pub(crate) async fn send(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<HttpResponse, OneLakeError> {
        self.ensure_ready()?;
        let url = full_url(&self.base_url, endpoint, params)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(auth) = self.authorization()? {
            headers.insert(AUTHORIZATION, auth);
        }

        debug!(%method, %url, "sending request");
        let response = self
            .http
            .send(HttpRequest {
                method,
                url: url.into(),
                headers,
            })
            .await?;
        debug!(status = %response.status, "received response");
        Ok(response)
    }
}

/// Handle to the OneLake DFS API.
///
/// Cloning is cheap: all clones share the same connection pool, token and
/// initialization state.
pub struct OneLakeClient<C: HttpClient> {
    inner: Arc<ClientInner<C>>,
}

impl<C: HttpClient> Clone for OneLakeClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: HttpClient> std::fmt::Debug for OneLakeClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneLakeClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl OneLake {
    /// Start configuring a reqwest-backed client.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }
}

impl<C: HttpClient> OneLakeClient<C> {
    /// The base URL every endpoint is spliced onto.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Replace the bearer token. The client must be initialized again.
    pub fn set_token(&self, token: SecretString) {
        *self.inner.token.write() = Some(token);
        self.inner.initialized.send_replace(false);
    }

    /// Whether the last connectivity check succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        *self.inner.initialized.borrow()
    }

    /// Wait up to `timeout` for the client to become initialized.
    pub async fn await_initialized(&self, timeout: Duration) -> bool {
        let mut rx = self.inner.initialized.subscribe();
        let waited = tokio::time::timeout(timeout, rx.wait_for(|ready| *ready)).await;
        matches!(waited, Ok(Ok(_)))
    }

    /// Run the connectivity check and mark the client initialized.
    ///
    /// Fails with [`OneLakeError::NoAccess`] when the account lists no file
    /// systems for the current credentials.
    #[instrument(skip(self), fields(base_url = %self.inner.base_url))]
    pub async fn initialize(&self) -> Result<(), OneLakeError> {
        self.inner.initialized.send_replace(false);
        self.inner
            .connection_test_running
            .store(true, Ordering::Release);
        let check = self
            .get::<AccountListing>("/", &[("resource", "account"), ("recursive", "false")])
            .await;
        self.inner
            .connection_test_running
            .store(false, Ordering::Release);

        let listing = check?.error_for_status()?;
        if listing.file_systems.is_empty() {
            warn!("account lists no file systems");
            return Err(OneLakeError::NoAccess {
                base_url: self.inner.base_url.to_string(),
            });
        }

        info!(file_systems = listing.file_systems.len(), "connected");
        self.inner.initialized.send_replace(true);
        Ok(())
    }

    /// `GET` an endpoint, folding non-success statuses into [`ApiResponse::Error`].
    ///
    /// An empty success body decodes from `{"value": {"status", "statusText"}}`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse<T>, OneLakeError> {
        let response = self.inner.send(Method::GET, endpoint, params).await?;
        if !response.status.is_success() {
            return Ok(ApiResponse::Error(ErrorEnvelope::from_response(&response)));
        }

        let value: Value = if response.body.is_empty() {
            json!({
                "value": {
                    "status": response.status.as_u16(),
                    "statusText": response.status.canonical_reason().unwrap_or_default(),
                }
            })
        } else {
            serde_json::from_slice(&response.body)?
        };
        Ok(ApiResponse::Success(serde_json::from_value(value)?))
    }

    /// `GET` a listing and unwrap its `list_property` array, following
    /// continuation tokens until the listing is exhausted.
    pub async fn get_list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        list_property: &str,
    ) -> Result<Vec<T>, OneLakeError> {
        self.list_pages(endpoint, params, list_property).collect().await
    }

    /// Page through a listing one response at a time.
    #[must_use]
    pub fn list_pages(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        list_property: &str,
    ) -> ListPages<C> {
        ListPages::new(Arc::clone(&self.inner), endpoint, params, list_property)
    }

    /// `HEAD` an endpoint and return its response headers.
    pub async fn head(&self, endpoint: &str) -> Result<ApiResponse<HeaderMap>, OneLakeError> {
        let response = self.inner.send(Method::HEAD, endpoint, &[]).await?;
        if response.status.is_success() {
            Ok(ApiResponse::Success(response.headers))
        } else {
            Ok(ApiResponse::Error(ErrorEnvelope::from_response(&response)))
        }
    }

    /// Download the raw body of an endpoint. Non-success statuses are raised.
    pub async fn get_bytes(&self, endpoint: &str) -> Result<Bytes, OneLakeError> {
        let response = self.inner.send(Method::GET, endpoint, &[]).await?;
        if response.status.is_success() {
            Ok(response.body)
        } else {
            Err(ErrorEnvelope::from_response(&response).into_error())
        }
    }
}
