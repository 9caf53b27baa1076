//! Continuation-token pagination for DFS listings.

use std::sync::Arc;

use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::ClientInner;
use crate::error::OneLakeError;
use crate::http_client::HttpClient;
use crate::models::ErrorEnvelope;

/// Response header carrying the token for the next page.
pub const CONTINUATION_HEADER: &str = "x-ms-continuation";

/// Lazily fetches the pages of a listing, following continuation tokens.
///
/// Owns all its state (via `Arc`) so there are no lifetime parameters.
pub struct ListPages<C: HttpClient> {
    inner: Arc<ClientInner<C>>,
    endpoint: String,
    params: Vec<(String, String)>,
    list_property: String,
    continuation: Option<String>,
    done: bool,
}

impl<C: HttpClient> ListPages<C> {
    pub(crate) fn new(
        inner: Arc<ClientInner<C>>,
        endpoint: &str,
        params: &[(&str, &str)],
        list_property: &str,
    ) -> Self {
        Self {
            inner,
            endpoint: endpoint.to_owned(),
            params: params
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            list_property: list_property.to_owned(),
            continuation: None,
            done: false,
        }
    }

    /// Fetch the next page of raw entries.
    ///
    /// Returns `Ok(None)` when all pages have been exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>, OneLakeError> {
        if self.done {
            return Ok(None);
        }

        let mut query: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if let Some(ref token) = self.continuation {
            query.push(("continuation", token.as_str()));
        }

        let response = self.inner.send(Method::GET, &self.endpoint, &query).await?;
        if !response.status.is_success() {
            self.done = true;
            return Err(ErrorEnvelope::from_response(&response).into_error());
        }

        let next = response
            .header_str(CONTINUATION_HEADER)
            .filter(|token| !token.is_empty())
            .map(ToOwned::to_owned);

        let mut body: Value = serde_json::from_slice(&response.body)?;
        let items = match body.get_mut(&self.list_property).map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => {
                self.done = true;
                return Err(OneLakeError::MissingListProperty(self.list_property.clone()));
            }
        };

        self.done = next.is_none();
        self.continuation = next;
        Ok(Some(items))
    }

    /// Collect every remaining entry, decoded as `T`.
    pub async fn collect<T: DeserializeOwned>(mut self) -> Result<Vec<T>, OneLakeError> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            for item in page {
                all.push(serde_json::from_value(item)?);
            }
        }
        Ok(all)
    }
}
