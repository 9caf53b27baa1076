//! Cached nodes, one per address.
//!
//! Every node carries the same lazily loaded state: its stats, its children
//! and, for items and paths, its content. What differs per hierarchy level is
//! only how that state is fetched, which lives in the [`root`], [`workspace`]
//! and [`item`] modules.

mod item;
mod root;
mod workspace;

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{trace, warn};

use crate::cache::{CacheSettings, LoadCell, LoadState};
use crate::error::FsError;
use crate::metadata::{DirEntry, Metadata};
use crate::remote::RemoteApi;
use crate::uri::{Address, HierarchyLevel};

/// The level-specific behavior of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The account: lists workspaces.
    Root,
    /// A workspace: always a directory, lists items.
    Workspace,
    /// An `item.itemType` directly below a workspace.
    Item,
    /// Anything below an item.
    Path,
}

impl From<HierarchyLevel> for NodeKind {
    fn from(level: HierarchyLevel) -> Self {
        match level {
            HierarchyLevel::Root => Self::Root,
            HierarchyLevel::Workspace => Self::Workspace,
            HierarchyLevel::Item => Self::Item,
            HierarchyLevel::Path => Self::Path,
        }
    }
}

/// Raw listing entries from the last successful children fetch.
type RawResponse = Arc<Mutex<Option<Vec<Value>>>>;

/// Lazily loaded state for one address.
///
/// Nodes are created only by the cache store and never reference their
/// parent or children; relations are recomputed from addresses.
pub struct Node {
    address: Address,
    kind: NodeKind,
    stats: LoadCell<Metadata>,
    children: LoadCell<Vec<DirEntry>>,
    content: OnceCell<Bytes>,
    raw_response: RawResponse,
}

impl Node {
    pub(crate) fn new(address: Address) -> Self {
        let kind = NodeKind::from(address.level());
        let stats = match kind {
            NodeKind::Root | NodeKind::Workspace => LoadCell::loaded(Metadata::directory()),
            NodeKind::Item | NodeKind::Path => LoadCell::default(),
        };
        Self {
            address,
            kind,
            stats,
            children: LoadCell::default(),
            content: OnceCell::new(),
            raw_response: Arc::default(),
        }
    }

    /// The address this node caches.
    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Which fetch semantics apply.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Load state of the stats.
    #[must_use]
    pub fn stats_state(&self) -> LoadState {
        self.stats.state()
    }

    /// Load state of the children.
    #[must_use]
    pub fn children_state(&self) -> LoadState {
        self.children.state()
    }

    /// The raw entries of the last listing, kept for diagnostics.
    #[must_use]
    pub fn raw_api_response(&self) -> Option<Vec<Value>> {
        self.raw_response.lock().clone()
    }

    /// Load stats if needed.
    ///
    /// `Ok(None)` means nothing is materialized: the remote client never
    /// became ready, or another caller's fetch failed or outlived the wait
    /// ceiling.
    pub(crate) async fn ensure_stats<A: RemoteApi>(
        &self,
        api: &Arc<A>,
        settings: CacheSettings,
    ) -> Result<Option<Metadata>, FsError> {
        if self.stats.state() != LoadState::Loaded && !wait_ready(api.as_ref(), settings).await {
            warn!(key = self.address.cache_key(), "remote not ready, stats left unloaded");
            return Ok(None);
        }

        let api = Arc::clone(api);
        let address = self.address.clone();
        let kind = self.kind;
        let stats = self
            .stats
            .get_or_load(settings.load_wait_ceiling, move || async move {
                match kind {
                    NodeKind::Root | NodeKind::Workspace => Ok(Metadata::directory()),
                    NodeKind::Item | NodeKind::Path => item::fetch_stats(api.as_ref(), &address).await,
                }
            })
            .await?;
        trace!(key = self.address.cache_key(), loaded = stats.is_some(), "stats");
        Ok(stats)
    }

    /// Load children if needed. `Ok(None)` as for [`Node::ensure_stats`].
    pub(crate) async fn ensure_children<A: RemoteApi>(
        &self,
        api: &Arc<A>,
        settings: CacheSettings,
    ) -> Result<Option<Vec<DirEntry>>, FsError> {
        if self.children.state() != LoadState::Loaded && !wait_ready(api.as_ref(), settings).await {
            warn!(key = self.address.cache_key(), "remote not ready, children left unloaded");
            return Ok(None);
        }

        let api = Arc::clone(api);
        let address = self.address.clone();
        let kind = self.kind;
        let raw_slot = Arc::clone(&self.raw_response);
        let children = self
            .children
            .get_or_load(settings.load_wait_ceiling, move || async move {
                let (entries, raw) = match kind {
                    NodeKind::Root => root::fetch_children(api.as_ref()).await?,
                    NodeKind::Workspace => workspace::fetch_children(api.as_ref(), &address).await?,
                    NodeKind::Item | NodeKind::Path => {
                        item::fetch_children(api.as_ref(), &address).await?
                    }
                };
                *raw_slot.lock() = Some(raw);
                Ok::<_, FsError>(entries)
            })
            .await?;
        trace!(
            key = self.address.cache_key(),
            count = children.as_ref().map(Vec::len),
            "children"
        );
        Ok(children)
    }

    /// Read the node's content, downloading it once.
    ///
    /// Failures are not cached. Concurrent readers share one download.
    pub(crate) async fn read_content<A: RemoteApi>(
        &self,
        api: &Arc<A>,
        settings: CacheSettings,
    ) -> Result<Bytes, FsError> {
        match self.kind {
            NodeKind::Root | NodeKind::Workspace => {
                return Err(FsError::UnsupportedOperation(self.address.to_string()));
            }
            NodeKind::Item | NodeKind::Path => {}
        }
        if let Some(content) = self.content.get() {
            return Ok(content.clone());
        }
        if !wait_ready(api.as_ref(), settings).await {
            return Err(FsError::NotReady);
        }

        let content = self
            .content
            .get_or_try_init(|| item::fetch_content(api.as_ref(), &self.address))
            .await?;
        Ok(content.clone())
    }

    /// Writes are rejected on every kind of node.
    pub(crate) fn write(&self, _content: &[u8]) -> Result<(), FsError> {
        Err(FsError::ReadOnlyViolation(self.address.to_string()))
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("key", &self.address.cache_key())
            .field("kind", &self.kind)
            .field("stats", &self.stats.state())
            .field("children", &self.children.state())
            .field("content_cached", &self.content.initialized())
            .finish()
    }
}

async fn wait_ready<A: RemoteApi>(api: &A, settings: CacheSettings) -> bool {
    api.is_initialized() || api.await_initialized(settings.init_timeout).await
}

/// Map a remote failure for `address`, turning 404 into [`FsError::NotFound`].
fn remote_error(address: &Address, err: onelake_api::OneLakeError) -> FsError {
    if err.is_not_found() {
        FsError::NotFound(address.to_string())
    } else {
        FsError::Remote(err)
    }
}
