//! Items and the paths below them.

use bytes::Bytes;
use onelake_api::models::{ApiResponse, PathEntry};
use serde_json::Value;
use tracing::{debug, warn};

use super::remote_error;
use crate::error::FsError;
use crate::metadata::{DirEntry, Metadata};
use crate::remote::RemoteApi;
use crate::uri::{Address, HierarchyLevel};

/// Stat an item or path with `HEAD`.
///
/// Some tenants reject `HEAD` on items themselves. An item directly below
/// its workspace whose `HEAD` fails is therefore assumed to be a directory.
/// This is a heuristic: a genuine error on such an item is masked. Deeper
/// paths propagate the failure.
pub(super) async fn fetch_stats<A: RemoteApi>(
    api: &A,
    address: &Address,
) -> Result<Metadata, FsError> {
    let response = api.head(&address.api_path()).await;
    match response {
        Ok(ApiResponse::Success(headers)) => Ok(Metadata::from_headers(&headers)),
        failed if address.level() == HierarchyLevel::Item => {
            warn!(
                key = address.cache_key(),
                error = ?failed,
                "item HEAD failed, assuming directory"
            );
            Ok(Metadata::directory())
        }
        Ok(ApiResponse::Error(envelope)) => Err(remote_error(address, envelope.into_error())),
        Err(e) => Err(remote_error(address, e)),
    }
}

/// List the direct children of an item, or of a directory below one.
pub(super) async fn fetch_children<A: RemoteApi>(
    api: &A,
    address: &Address,
) -> Result<(Vec<DirEntry>, Vec<Value>), FsError> {
    let (Some(workspace), Some(item)) = (address.workspace(), address.item_segment()) else {
        return Err(FsError::InvalidAddress(address.to_string()));
    };
    let endpoint = format!("/{workspace}/{item}");
    let sub_path = address.sub_path();

    let mut params = vec![("resource", "filesystem"), ("recursive", "false")];
    if let Some(dir) = sub_path.as_deref() {
        params.push(("directory", dir));
    }
    debug!(%endpoint, directory = sub_path.as_deref(), "listing");

    let raw = api
        .get_list(&endpoint, &params, "paths")
        .await
        .map_err(|e| remote_error(address, e))?;
    let entries = entries_from_listing(&raw)?;
    Ok((entries, raw))
}

/// Download the content of an item or path.
pub(super) async fn fetch_content<A: RemoteApi>(
    api: &A,
    address: &Address,
) -> Result<Bytes, FsError> {
    api.get_bytes(&address.api_path())
        .await
        .map_err(|e| remote_error(address, e))
}

/// Decode a `paths` listing; each entry is named by its last segment.
pub(super) fn entries_from_listing(raw: &[Value]) -> Result<Vec<DirEntry>, FsError> {
    raw.iter()
        .map(|value| {
            let entry: PathEntry = serde::Deserialize::deserialize(value)?;
            Ok(DirEntry::from(&entry))
        })
        .collect::<Result<_, serde_json::Error>>()
        .map_err(|e| FsError::Remote(e.into()))
}
