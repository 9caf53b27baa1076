//! Generic filesystem operations over `onelake:` URIs.
//!
//! [`OneLakeFs`] is what a host (an editor, a mount, the CLI) talks to. It
//! validates URIs, delegates to the [`CacheStore`], rejects every mutation,
//! and publishes change events.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace};

use crate::cache::CacheSettings;
use crate::error::FsError;
use crate::metadata::{DirEntry, Metadata};
use crate::remote::RemoteApi;
use crate::store::CacheStore;
use crate::uri::Address;

/// Events are batched and delivered once no new event arrived for this long.
pub const EVENT_DEBOUNCE: Duration = Duration::from_millis(5);

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What happened to the resource named by a [`FileChangeEvent`].
pub enum FileChangeKind {
    /// A resource appeared.
    Created,
    /// Content or children may differ; re-read it.
    Changed,
    /// A resource went away.
    Deleted,
}

/// A change the host should reflect, e.g. by re-listing a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    /// What happened.
    pub kind: FileChangeKind,
    /// The affected `onelake:` URI.
    pub uri: String,
}

/// Options of [`OneLakeFs::write_file`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Create the file if it is missing.
    pub create: bool,
    /// Replace an existing file.
    pub overwrite: bool,
}

#[derive(Default)]
struct PendingEvents {
    buffer: Vec<FileChangeEvent>,
    generation: u64,
}

/// The filesystem provider.
pub struct OneLakeFs<A: RemoteApi> {
    store: CacheStore<A>,
    events: broadcast::Sender<Vec<FileChangeEvent>>,
    pending: Arc<Mutex<PendingEvents>>,
}

impl<A: RemoteApi> OneLakeFs<A> {
    /// A provider with an empty cache over `api`.
    #[must_use]
    pub fn new(api: Arc<A>, settings: CacheSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: CacheStore::new(api, settings),
            events,
            pending: Arc::default(),
        }
    }

    /// The underlying cache.
    #[must_use]
    pub fn store(&self) -> &CacheStore<A> {
        &self.store
    }

    /// Decode `uri`, reporting malformed or rejected URIs as missing.
    fn resolve(uri: &str) -> Result<Address, FsError> {
        Address::decode(uri).map_err(|e| {
            trace!(uri, error = %e, "rejecting address");
            FsError::NotFound(uri.to_owned())
        })
    }

    /// Metadata of `uri`. Invalid URIs are reported as not found.
    #[instrument(skip(self))]
    pub async fn stat(&self, uri: &str) -> Result<Metadata, FsError> {
        let address = Self::resolve(uri)?;
        self.store.stat(&address).await
    }

    /// Children of `uri`, in the order the remote returned them.
    #[instrument(skip(self))]
    pub async fn read_directory(&self, uri: &str) -> Result<Vec<DirEntry>, FsError> {
        let address = Self::resolve(uri)?;
        self.store.list(&address).await
    }

    /// Content of the file at `uri`.
    #[instrument(skip(self))]
    pub async fn read_file(&self, uri: &str) -> Result<Bytes, FsError> {
        let address = Self::resolve(uri)?;
        self.store.read(&address).await
    }

    /// Always fails with [`FsError::ReadOnlyViolation`].
    #[instrument(skip(self, content), fields(len = content.len()))]
    pub fn write_file(&self, uri: &str, content: &[u8], options: WriteOptions) -> Result<(), FsError> {
        match Address::decode(uri) {
            Ok(address) => self.store.write(&address, content),
            Err(_) => Err(FsError::ReadOnlyViolation(uri.to_owned())),
        }
    }

    /// Always fails with [`FsError::ReadOnlyViolation`].
    pub fn create_directory(&self, uri: &str) -> Result<(), FsError> {
        debug!(uri, "create_directory rejected");
        Err(FsError::ReadOnlyViolation(uri.to_owned()))
    }

    /// Always fails with [`FsError::ReadOnlyViolation`].
    pub fn delete(&self, uri: &str, recursive: bool) -> Result<(), FsError> {
        debug!(uri, recursive, "delete rejected");
        Err(FsError::ReadOnlyViolation(uri.to_owned()))
    }

    /// Always fails with [`FsError::ReadOnlyViolation`].
    pub fn rename(&self, from: &str, to: &str, overwrite: bool) -> Result<(), FsError> {
        debug!(from, to, overwrite, "rename rejected");
        Err(FsError::ReadOnlyViolation(from.to_owned()))
    }

    /// Always fails with [`FsError::ReadOnlyViolation`].
    pub fn copy(&self, from: &str, to: &str, overwrite: bool) -> Result<(), FsError> {
        debug!(from, to, overwrite, "copy rejected");
        Err(FsError::ReadOnlyViolation(to.to_owned()))
    }

    /// Subscribe to batches of change events.
    #[must_use]
    pub fn watch(&self) -> broadcast::Receiver<Vec<FileChangeEvent>> {
        self.events.subscribe()
    }

    /// Drop the cached subtree under `uri` and tell watchers it changed.
    ///
    /// Returns the number of nodes dropped.
    #[instrument(skip(self))]
    pub fn invalidate_and_notify(&self, uri: &str) -> Result<usize, FsError> {
        let address = Self::resolve(uri)?;
        let removed = self.store.invalidate(&address);
        self.fire_soon(FileChangeEvent {
            kind: FileChangeKind::Changed,
            uri: address.to_string(),
        });
        Ok(removed)
    }

    /// Drop the whole cache, e.g. after re-authentication.
    pub fn reset(&self) {
        self.store.reset();
    }

    /// Buffer `event` and flush the buffer once no further event arrived
    /// within [`EVENT_DEBOUNCE`]. Outside a Tokio runtime the buffer is
    /// flushed immediately.
    fn fire_soon(&self, event: FileChangeEvent) {
        let generation = {
            let mut pending = self.pending.lock();
            pending.buffer.push(event);
            pending.generation += 1;
            pending.generation
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            flush(&self.pending, &self.events, generation);
            return;
        };
        let pending = Arc::clone(&self.pending);
        let events = self.events.clone();
        handle.spawn(async move {
            tokio::time::sleep(EVENT_DEBOUNCE).await;
            flush(&pending, &events, generation);
        });
    }
}

/// Deliver the buffered events if no newer event restarted the debounce.
fn flush(
    pending: &Mutex<PendingEvents>,
    events: &broadcast::Sender<Vec<FileChangeEvent>>,
    generation: u64,
) {
    let batch = {
        let mut pending = pending.lock();
        if pending.generation != generation {
            return;
        }
        std::mem::take(&mut pending.buffer)
    };
    if !batch.is_empty() {
        // No subscribers is fine.
        let _ = events.send(batch);
    }
}
