//! Process-wide mapping from cache key to node.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, instrument};

use crate::cache::CacheSettings;
use crate::error::FsError;
use crate::metadata::{DirEntry, Metadata};
use crate::node::Node;
use crate::remote::RemoteApi;
use crate::uri::Address;

/// Owner of every [`Node`].
///
/// Nodes are created lazily on first access and live until they are
/// invalidated or the store is reset; nothing is evicted under memory
/// pressure.
pub struct CacheStore<A: RemoteApi> {
    api: Arc<A>,
    settings: CacheSettings,
    nodes: scc::HashMap<String, Arc<Node>>,
}

impl<A: RemoteApi> CacheStore<A> {
    /// An empty store over `api`.
    #[must_use]
    pub fn new(api: Arc<A>, settings: CacheSettings) -> Self {
        Self {
            api,
            settings,
            nodes: scc::HashMap::new(),
        }
    }

    /// The remote every node fetches from.
    #[must_use]
    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// Timing applied to every load.
    #[must_use]
    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    /// The node for `address`, created on first use.
    ///
    /// This is the only place nodes are constructed.
    pub fn get_or_create(&self, address: &Address) -> Arc<Node> {
        if let Some(node) = self.get(address) {
            return node;
        }
        match self.nodes.entry_sync(address.cache_key().to_owned()) {
            scc::hash_map::Entry::Occupied(occ) => Arc::clone(occ.get()),
            scc::hash_map::Entry::Vacant(vac) => {
                debug!(key = address.cache_key(), "creating node");
                let node = Arc::new(Node::new(address.clone()));
                vac.insert_entry(Arc::clone(&node));
                node
            }
        }
    }

    /// The node for `address`, if one is cached. Never creates.
    #[must_use]
    pub fn get(&self, address: &Address) -> Option<Arc<Node>> {
        self.nodes
            .read_sync(address.cache_key(), |_, node| Arc::clone(node))
    }

    /// The cached node of `address`'s parent, looked up by recomputing the
    /// parent address.
    #[must_use]
    pub fn parent_of(&self, address: &Address) -> Option<Arc<Node>> {
        self.get(&address.parent()?)
    }

    /// Whether a node is cached for `address`.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.nodes.contains_sync(address.cache_key())
    }

    /// Number of cached nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stats of `address`. Fails with [`FsError::NotFound`] when nothing
    /// could be materialized.
    #[instrument(skip(self), fields(key = address.cache_key()))]
    pub async fn stat(&self, address: &Address) -> Result<Metadata, FsError> {
        let node = self.get_or_create(address);
        node.ensure_stats(&self.api, self.settings)
            .await?
            .ok_or_else(|| FsError::NotFound(address.to_string()))
    }

    /// Children of `address` in the order the remote returned them. Empty
    /// when nothing could be materialized.
    #[instrument(skip(self), fields(key = address.cache_key()))]
    pub async fn list(&self, address: &Address) -> Result<Vec<DirEntry>, FsError> {
        let node = self.get_or_create(address);
        Ok(node
            .ensure_children(&self.api, self.settings)
            .await?
            .unwrap_or_default())
    }

    /// Content of `address`. Callers are expected to have checked that it is
    /// a file.
    #[instrument(skip(self), fields(key = address.cache_key()))]
    pub async fn read(&self, address: &Address) -> Result<Bytes, FsError> {
        let node = self.get_or_create(address);
        node.read_content(&self.api, self.settings).await
    }

    /// Always fails: the remote store is read-only.
    pub fn write(&self, address: &Address, content: &[u8]) -> Result<(), FsError> {
        match self.get(address) {
            Some(node) => node.write(content),
            None => Err(FsError::ReadOnlyViolation(address.to_string())),
        }
    }

    /// Drop every node whose cache key starts with `address`'s key.
    ///
    /// This is a plain string prefix scan over all keys, so invalidating
    /// `onelake:/ws1` also drops `onelake:/ws10`. Returns the number of
    /// nodes removed.
    #[instrument(skip(self), fields(key = address.cache_key()))]
    pub fn invalidate(&self, address: &Address) -> usize {
        let prefix = address.cache_key();
        let before = self.nodes.len();
        self.nodes.retain_sync(|key, _| !key.starts_with(prefix));
        let removed = before.saturating_sub(self.nodes.len());
        debug!(removed, "invalidated");
        removed
    }

    /// Drop every node.
    pub fn reset(&self) {
        self.nodes.clear_sync();
        debug!("cache reset");
    }
}
