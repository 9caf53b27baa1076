//! Rust SDK for the OneLake DFS REST surface.

mod backends;
mod client;
mod endpoint;
/// Error types.
pub mod error;
mod http_client;
/// Request and response types.
pub mod models;
mod pagination;

pub use backends::{ReqwestClient, ReqwestOptions};
pub use client::{ClientBuilder, DEFAULT_BASE_URL, OneLake, OneLakeClient};
pub use endpoint::full_url;
pub use error::{HttpClientError, OneLakeError};
pub use http_client::{HttpClient, HttpRequest, HttpResponse};
pub use pagination::{CONTINUATION_HEADER, ListPages};
