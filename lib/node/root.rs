//! The account root: a directory of workspaces.

use onelake_api::models::FileSystem;
use serde::Deserialize as _;
use serde_json::Value;

use crate::error::FsError;
use crate::metadata::{DirEntry, EntryKind};
use crate::remote::RemoteApi;

const ACCOUNT_PARAMS: &[(&str, &str)] = &[("resource", "account")];

/// List the account's file systems; each one is a workspace directory.
pub(super) async fn fetch_children<A: RemoteApi>(
    api: &A,
) -> Result<(Vec<DirEntry>, Vec<Value>), FsError> {
    let raw = api.get_list("/", ACCOUNT_PARAMS, "fileSystems").await?;
    let entries = raw
        .iter()
        .map(|value| {
            let fs = FileSystem::deserialize(value)?;
            Ok(DirEntry::new(fs.name, EntryKind::Directory))
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()
        .map_err(onelake_api::OneLakeError::from)?;
    Ok((entries, raw))
}
