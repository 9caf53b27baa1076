//! The remote API surface the cache consumes.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use http::HeaderMap;
use onelake_api::models::ApiResponse;
use onelake_api::{HttpClient, OneLakeClient, OneLakeError};
use serde_json::Value;

/// Authenticated access to the OneLake DFS endpoint.
///
/// Every call is made on behalf of the already-authenticated client; the
/// cache never handles credentials.
pub trait RemoteApi: Send + Sync + 'static {
    /// `GET` a listing and unwrap the named array property.
    fn get_list(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        list_property: &str,
    ) -> impl Future<Output = Result<Vec<Value>, OneLakeError>> + Send;

    /// Metadata request. Non-success statuses are folded, not raised.
    fn head(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<ApiResponse<HeaderMap>, OneLakeError>> + Send;

    /// Download raw content.
    fn get_bytes(&self, endpoint: &str) -> impl Future<Output = Result<Bytes, OneLakeError>> + Send;

    /// Whether the connectivity check has succeeded.
    fn is_initialized(&self) -> bool;

    /// Wait up to `timeout` for initialization; `false` if it never happened.
    fn await_initialized(&self, timeout: Duration) -> impl Future<Output = bool> + Send;
}

impl<C: HttpClient> RemoteApi for OneLakeClient<C> {
    fn get_list(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        list_property: &str,
    ) -> impl Future<Output = Result<Vec<Value>, OneLakeError>> + Send {
        OneLakeClient::get_list::<Value>(self, endpoint, params, list_property)
    }

    fn head(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<ApiResponse<HeaderMap>, OneLakeError>> + Send {
        OneLakeClient::head(self, endpoint)
    }

    fn get_bytes(&self, endpoint: &str) -> impl Future<Output = Result<Bytes, OneLakeError>> + Send {
        OneLakeClient::get_bytes(self, endpoint)
    }

    fn is_initialized(&self) -> bool {
        OneLakeClient::is_initialized(self)
    }

    fn await_initialized(&self, timeout: Duration) -> impl Future<Output = bool> + Send {
        OneLakeClient::await_initialized(self, timeout)
    }
}
