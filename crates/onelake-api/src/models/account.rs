//! Account-level response types.

use serde::Deserialize;

/// One file system (workspace) visible to the account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileSystem {
    /// Workspace name.
    pub name: String,
}

/// Response body of `GET /?resource=account`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountListing {
    /// File systems the caller may access. Absent means none.
    #[serde(default)]
    pub file_systems: Vec<FileSystem>,
}
