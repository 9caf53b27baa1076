//! Workspaces: always directories, listing their items.

use serde_json::Value;

use super::item::entries_from_listing;
use crate::error::FsError;
use crate::metadata::DirEntry;
use crate::remote::RemoteApi;
use crate::uri::Address;

pub(super) async fn fetch_children<A: RemoteApi>(
    api: &A,
    address: &Address,
) -> Result<(Vec<DirEntry>, Vec<Value>), FsError> {
    let raw = api
        .get_list(
            &address.api_path(),
            &[("resource", "filesystem"), ("recursive", "false")],
            "paths",
        )
        .await
        .map_err(|e| super::remote_error(address, e))?;
    let entries = entries_from_listing(&raw)?;
    Ok((entries, raw))
}
