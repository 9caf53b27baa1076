//! Entry metadata as the host sees it.

use std::time::SystemTime;

use chrono::DateTime;
use http::HeaderMap;
use onelake_api::models::PathEntry;

/// Response headers of a metadata request.
const RESOURCE_TYPE: &str = "x-ms-resource-type";
const CREATION_TIME: &str = "x-ms-creation-time";
const LAST_MODIFIED: &str = "last-modified";
const CONTENT_LENGTH: &str = "content-length";

/// File or directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file with content.
    File,
    /// Anything that can be listed.
    Directory,
}

impl EntryKind {
    /// Whether this is [`EntryKind::Directory`].
    #[must_use]
    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}

/// Stats of one node. Timestamps and size are absent when the remote does not
/// report them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// File or directory.
    pub kind: EntryKind,
    /// From `x-ms-creation-time`.
    pub created: Option<SystemTime>,
    /// From `last-modified`.
    pub modified: Option<SystemTime>,
    /// Content length in bytes.
    pub size: Option<u64>,
}

impl Metadata {
    /// A synthesized directory with no timestamps.
    #[must_use]
    pub fn directory() -> Self {
        Self {
            kind: EntryKind::Directory,
            created: None,
            modified: None,
            size: None,
        }
    }

    /// Map the headers of a `HEAD` response.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        let kind = if header(RESOURCE_TYPE) == Some("directory") {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Self {
            kind,
            created: header(CREATION_TIME).and_then(parse_http_date),
            modified: header(LAST_MODIFIED).and_then(parse_http_date),
            size: header(CONTENT_LENGTH).and_then(|v| v.trim().parse().ok()),
        }
    }
}

/// Parse an RFC 1123 timestamp such as `Thu, 18 Jan 2024 12:57:08 GMT`.
fn parse_http_date(value: &str) -> Option<SystemTime> {
    DateTime::parse_from_rfc2822(value).ok().map(SystemTime::from)
}

/// One child of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name within the listed directory, without any `/`.
    pub name: String,
    /// File or directory.
    pub kind: EntryKind,
}

impl DirEntry {
    /// An entry named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

impl From<&PathEntry> for DirEntry {
    fn from(entry: &PathEntry) -> Self {
        let kind = if entry.is_directory {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Self::new(entry.file_name(), kind)
    }
}
