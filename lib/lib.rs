//! onelake-fs: browse a OneLake account as a read-only virtual filesystem.
//!
//! URIs of the form `onelake://<workspace>/<item>.<itemType>/<path...>` are
//! decoded into [`Address`]es, resolved to lazily loaded [`node::Node`]s kept
//! in a [`CacheStore`], and served through [`OneLakeFs`].

/// Caching primitives.
pub mod cache;
/// Error taxonomy.
pub mod error;
/// File and directory metadata.
pub mod metadata;
/// Per-address cached nodes.
pub mod node;
/// The host-facing filesystem.
pub mod provider;
/// The remote API seam.
pub mod remote;
/// The node cache.
pub mod store;
/// `onelake:` URI decoding.
pub mod uri;

pub use cache::CacheSettings;
pub use error::FsError;
pub use metadata::{DirEntry, EntryKind, Metadata};
pub use provider::{FileChangeEvent, FileChangeKind, OneLakeFs, WriteOptions};
pub use remote::RemoteApi;
pub use store::CacheStore;
pub use uri::{Address, HierarchyLevel};
