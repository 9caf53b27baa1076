#![allow(dead_code, missing_docs, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue};
use onelake_api::OneLakeError;
use onelake_api::models::{ApiResponse, ErrorEnvelope};
use onelake_fs::{CacheSettings, RemoteApi};
use serde_json::{Value, json};
use tokio::sync::watch;

/// One call the mock received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: &'static str,
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

type Canned<T> = Result<T, u16>;

/// Scripted in-memory stand-in for the OneLake client.
///
/// Listings are keyed by endpoint and the `directory` parameter. Anything not
/// scripted answers 404.
pub struct MockApi {
    lists: Mutex<HashMap<String, Canned<Vec<Value>>>>,
    heads: Mutex<HashMap<String, Canned<HeaderMap>>>,
    files: Mutex<HashMap<String, Canned<Bytes>>>,
    calls: Mutex<Vec<Call>>,
    list_count: AtomicUsize,
    head_count: AtomicUsize,
    get_count: AtomicUsize,
    ready: watch::Sender<bool>,
    delay: Mutex<Duration>,
}

fn list_key(endpoint: &str, directory: Option<&str>) -> String {
    match directory {
        Some(dir) => format!("{endpoint}?directory={dir}"),
        None => endpoint.to_owned(),
    }
}

fn api_error(status: u16) -> OneLakeError {
    OneLakeError::Api {
        status,
        body: format!("scripted {status}"),
    }
}

impl MockApi {
    /// An initialized mock.
    pub fn new() -> Self {
        let mock = Self::not_ready();
        mock.set_ready(true);
        mock
    }

    /// A mock whose connection check has not completed.
    pub fn not_ready() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            lists: Mutex::default(),
            heads: Mutex::default(),
            files: Mutex::default(),
            calls: Mutex::default(),
            list_count: AtomicUsize::new(0),
            head_count: AtomicUsize::new(0),
            get_count: AtomicUsize::new(0),
            ready,
            delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.send_replace(ready);
    }

    /// Make every call take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn with_list(self, endpoint: &str, directory: Option<&str>, entries: Vec<Value>) -> Self {
        self.lists
            .lock()
            .unwrap()
            .insert(list_key(endpoint, directory), Ok(entries));
        self
    }

    pub fn with_list_error(self, endpoint: &str, directory: Option<&str>, status: u16) -> Self {
        self.lists
            .lock()
            .unwrap()
            .insert(list_key(endpoint, directory), Err(status));
        self
    }

    pub fn with_head(self, endpoint: &str, headers: HeaderMap) -> Self {
        self.heads
            .lock()
            .unwrap()
            .insert(endpoint.to_owned(), Ok(headers));
        self
    }

    pub fn with_head_error(self, endpoint: &str, status: u16) -> Self {
        self.heads
            .lock()
            .unwrap()
            .insert(endpoint.to_owned(), Err(status));
        self
    }

    pub fn with_file(self, endpoint: &str, content: &'static [u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(endpoint.to_owned(), Ok(Bytes::from_static(content)));
        self
    }

    pub fn with_file_error(self, endpoint: &str, status: u16) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(endpoint.to_owned(), Err(status));
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_count.load(Ordering::SeqCst)
    }

    pub fn head_calls(&self) -> usize {
        self.head_count.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, endpoint: &str, params: &[(&str, &str)]) -> Duration {
        self.calls.lock().unwrap().push(Call {
            method,
            endpoint: endpoint.to_owned(),
            params: params
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        });
        *self.delay.lock().unwrap()
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

impl RemoteApi for MockApi {
    async fn get_list(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        _list_property: &str,
    ) -> Result<Vec<Value>, OneLakeError> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        let delay = self.record("GET", endpoint, params);
        let directory = params
            .iter()
            .find(|(k, _)| *k == "directory")
            .map(|(_, v)| *v);
        let canned = self
            .lists
            .lock()
            .unwrap()
            .get(&list_key(endpoint, directory))
            .cloned();
        pause(delay).await;
        match canned {
            Some(Ok(entries)) => Ok(entries),
            Some(Err(status)) => Err(api_error(status)),
            None => Err(api_error(404)),
        }
    }

    async fn head(&self, endpoint: &str) -> Result<ApiResponse<HeaderMap>, OneLakeError> {
        self.head_count.fetch_add(1, Ordering::SeqCst);
        let delay = self.record("HEAD", endpoint, &[]);
        let canned = self.heads.lock().unwrap().get(endpoint).cloned();
        pause(delay).await;
        let status = match canned {
            Some(Ok(headers)) => return Ok(ApiResponse::Success(headers)),
            Some(Err(status)) => status,
            None => 404,
        };
        Ok(ApiResponse::Error(ErrorEnvelope {
            status,
            status_text: String::new(),
            code: None,
            message: Some(format!("scripted {status}")),
        }))
    }

    async fn get_bytes(&self, endpoint: &str) -> Result<Bytes, OneLakeError> {
        self.get_count.fetch_add(1, Ordering::SeqCst);
        let delay = self.record("GET", endpoint, &[]);
        let canned = self.files.lock().unwrap().get(endpoint).cloned();
        pause(delay).await;
        match canned {
            Some(Ok(content)) => Ok(content),
            Some(Err(status)) => Err(api_error(status)),
            None => Err(api_error(404)),
        }
    }

    fn is_initialized(&self) -> bool {
        *self.ready.borrow()
    }

    async fn await_initialized(&self, timeout: Duration) -> bool {
        let mut ready = self.ready.subscribe();
        matches!(
            tokio::time::timeout(timeout, ready.wait_for(|r| *r)).await,
            Ok(Ok(_))
        )
    }
}

/// Short timings so not-ready paths finish quickly.
pub fn fast_settings() -> CacheSettings {
    CacheSettings {
        load_wait_ceiling: Duration::from_secs(5),
        init_timeout: Duration::from_millis(50),
    }
}

/// A `paths` listing entry.
pub fn path_entry(name: &str, is_directory: bool) -> Value {
    json!({
        "name": name,
        "isDirectory": if is_directory { "true" } else { "false" },
        "contentLength": "0",
        "lastModified": "Thu, 18 Jan 2024 12:57:08 GMT",
    })
}

/// A `fileSystems` listing entry.
pub fn file_system(name: &str) -> Value {
    json!({ "name": name })
}

/// Headers of a `HEAD` on a file.
pub fn file_headers(size: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ms-resource-type", HeaderValue::from_static("file"));
    headers.insert("content-length", HeaderValue::from(size));
    headers.insert(
        "last-modified",
        HeaderValue::from_static("Thu, 18 Jan 2024 12:57:08 GMT"),
    );
    headers.insert(
        "x-ms-creation-time",
        HeaderValue::from_static("Thu, 18 Jan 2024 12:57:08 GMT"),
    );
    headers
}

/// Headers of a `HEAD` on a directory.
pub fn directory_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ms-resource-type", HeaderValue::from_static("directory"));
    headers
}
