//! Decoding of `onelake:` URIs into hierarchy addresses.
//!
//! A URI's path segments are, in order, `workspace`, `item.itemType` and any
//! number of sub-path segments. The authority is treated as the first
//! segment, so `onelake://ws1/lake.Lakehouse` and `onelake:/ws1/lake.Lakehouse`
//! name the same node.

use std::borrow::Cow;
use std::fmt;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::error::FsError;

/// URI scheme served by this filesystem.
pub const SCHEME: &str = "onelake";

/// Bytes escaped when a segment is rendered back into a URI.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Depth of an address in the workspace → item → path hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HierarchyLevel {
    /// No segments: the account.
    Root,
    /// One segment.
    Workspace,
    /// Two segments: `item.itemType`.
    Item,
    /// Three or more segments.
    Path,
}

impl HierarchyLevel {
    fn from_depth(depth: usize) -> Self {
        match depth {
            0 => Self::Root,
            1 => Self::Workspace,
            2 => Self::Item,
            _ => Self::Path,
        }
    }
}

/// A decoded, immutable OneLake address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    level: HierarchyLevel,
    segments: Vec<String>,
    item: Option<String>,
    item_type: Option<String>,
    cache_key: String,
}

impl Address {
    /// Decode `uri`.
    ///
    /// Segments are percent-decoded, so `onelake://My%20Workspace` and
    /// `onelake://My Workspace` are the same address.
    ///
    /// Fails with [`FsError::InvalidAddress`] when the scheme is not
    /// `onelake`, when the first segment starts with `.` (hosts look for
    /// dotfiles at the root), when any segment is `.` or `..`, or when a
    /// segment decodes to invalid UTF-8 or contains `/`.
    pub fn decode(uri: &str) -> Result<Self, FsError> {
        let invalid = || FsError::InvalidAddress(uri.to_owned());

        let (scheme, rest) = uri.split_once(':').ok_or_else(invalid)?;
        if !scheme.eq_ignore_ascii_case(SCHEME) {
            return Err(invalid());
        }
        let path = rest.split(['?', '#']).next().unwrap_or_default();

        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8().map(Cow::into_owned))
            .collect::<Result<Vec<String>, _>>()
            .map_err(|_| invalid())?;

        if segments.first().is_some_and(|s| s.starts_with('.'))
            || segments
                .iter()
                .any(|s| s == "." || s == ".." || s.contains('/'))
        {
            return Err(invalid());
        }

        Ok(Self::from_segments(segments))
    }

    /// The root address, `onelake:/`.
    #[must_use]
    pub fn root() -> Self {
        Self::from_segments(Vec::new())
    }

    fn from_segments(segments: Vec<String>) -> Self {
        let level = HierarchyLevel::from_depth(segments.len());
        let (item, item_type) = match segments.get(1) {
            Some(seg) => match seg.rsplit_once('.') {
                Some((item, kind)) => (Some(item.to_owned()), Some(kind.to_owned())),
                None => (Some(seg.clone()), None),
            },
            None => (None, None),
        };
        let cache_key = format!("{SCHEME}:/{}", segments.join("/"));
        Self {
            level,
            segments,
            item,
            item_type,
            cache_key,
        }
    }

    /// Depth of this address in the hierarchy.
    #[must_use]
    pub fn level(&self) -> HierarchyLevel {
        self.level
    }

    /// Workspace name, present from [`HierarchyLevel::Workspace`] down.
    #[must_use]
    pub fn workspace(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Item name without its type suffix, present from [`HierarchyLevel::Item`] down.
    #[must_use]
    pub fn item(&self) -> Option<&str> {
        self.item.as_deref()
    }

    /// Item type (`Lakehouse`, `Warehouse`, ...), when the item segment has one.
    #[must_use]
    pub fn item_type(&self) -> Option<&str> {
        self.item_type.as_deref()
    }

    /// The `item.itemType` segment as written.
    #[must_use]
    pub fn item_segment(&self) -> Option<&str> {
        self.segments.get(1).map(String::as_str)
    }

    /// Segments below the item joined with `/`, present at [`HierarchyLevel::Path`].
    #[must_use]
    pub fn sub_path(&self) -> Option<String> {
        (self.segments.len() > 2).then(|| self.segments[2..].join("/"))
    }

    /// Canonical key identifying this node in the cache.
    #[must_use]
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Path of this node on the remote API, before splicing onto the base URL.
    #[must_use]
    pub fn api_path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// The last segment, or `""` for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Number of path segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The enclosing address, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.segments.split_last()?;
        Some(Self::from_segments(parent.to_vec()))
    }

    /// The address of a direct child named `name`.
    pub fn child(&self, name: &str) -> Result<Self, FsError> {
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(FsError::InvalidAddress(format!("{self}/{name}")));
        }
        let mut segments = self.segments.clone();
        segments.push(name.to_owned());
        Ok(Self::from_segments(segments))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}://")?;
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", utf8_percent_encode(segment, SEGMENT))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn levels_follow_segment_count() {
        let cases = [
            ("onelake://", HierarchyLevel::Root),
            ("onelake://ws1", HierarchyLevel::Workspace),
            ("onelake://ws1/lake.Lakehouse", HierarchyLevel::Item),
            ("onelake://ws1/lake.Lakehouse/Files", HierarchyLevel::Path),
            ("onelake://ws1/lake.Lakehouse/Files/a/b.csv", HierarchyLevel::Path),
        ];
        for (uri, level) in cases {
            assert_eq!(Address::decode(uri).unwrap().level(), level, "{uri}");
        }
    }

    #[test]
    fn fields_only_populated_up_to_level() {
        let ws = Address::decode("onelake://ws1").unwrap();
        assert_eq!(ws.workspace(), Some("ws1"));
        assert_eq!(ws.item(), None);
        assert_eq!(ws.item_type(), None);
        assert_eq!(ws.sub_path(), None);

        let item = Address::decode("onelake://ws1/lake.Lakehouse").unwrap();
        assert_eq!(item.item(), Some("lake"));
        assert_eq!(item.item_type(), Some("Lakehouse"));
        assert_eq!(item.sub_path(), None);
    }

    #[test]
    fn item_splits_on_last_dot() {
        let a = Address::decode("onelake://ws/my.data.Lakehouse").unwrap();
        assert_eq!(a.item(), Some("my.data"));
        assert_eq!(a.item_type(), Some("Lakehouse"));

        let plain = Address::decode("onelake://ws/folder").unwrap();
        assert_eq!(plain.item(), Some("folder"));
        assert_eq!(plain.item_type(), None);
    }

    #[test]
    fn end_to_end_descriptor() {
        let a = Address::decode("onelake://ws1/lake.Lakehouse/folder/file.csv").unwrap();
        assert_eq!(a.level(), HierarchyLevel::Path);
        assert_eq!(a.workspace(), Some("ws1"));
        assert_eq!(a.item(), Some("lake"));
        assert_eq!(a.item_type(), Some("Lakehouse"));
        assert_eq!(a.sub_path().as_deref(), Some("folder/file.csv"));
        assert_eq!(a.api_path(), "/ws1/lake.Lakehouse/folder/file.csv");
        assert_eq!(a.name(), "file.csv");
    }

    #[test]
    fn canonical_key_collapses_slashes_and_scheme_case() {
        let a = Address::decode("onelake://ws1//lake.Lakehouse/").unwrap();
        let b = Address::decode("OneLake:/ws1/lake.Lakehouse").unwrap();
        assert_eq!(a.cache_key(), "onelake:/ws1/lake.Lakehouse");
        assert_eq!(a, b);
        assert_eq!(Address::decode("onelake://").unwrap().cache_key(), "onelake:/");
    }

    #[test]
    fn rejects_foreign_scheme_and_dot_segments() {
        for uri in [
            "file:///ws1",
            "/ws1/lake.Lakehouse",
            "onelake://.vscode",
            "onelake:/.git/config",
            "onelake://ws1/../ws2",
        ] {
            assert!(
                matches!(Address::decode(uri), Err(FsError::InvalidAddress(_))),
                "{uri} must be rejected"
            );
        }
        assert!(Address::decode("onelake://ws1/lake.Lakehouse/.hidden").is_ok());
    }

    #[test]
    fn query_and_fragment_are_ignored() {
        let a = Address::decode("onelake://ws1/lake.Lakehouse?x=1#top").unwrap();
        assert_eq!(a.cache_key(), "onelake:/ws1/lake.Lakehouse");
    }

    #[test]
    fn parent_is_recomputed_from_segments() {
        let a = Address::decode("onelake://ws1/lake.Lakehouse/folder").unwrap();
        let parent = a.parent().unwrap();
        assert_eq!(parent.level(), HierarchyLevel::Item);
        assert_eq!(parent.cache_key(), "onelake:/ws1/lake.Lakehouse");
        assert_eq!(parent.parent().unwrap().parent().unwrap(), Address::root());
        assert!(Address::root().parent().is_none());
    }

    #[test]
    fn child_appends_one_segment() {
        let ws = Address::decode("onelake://ws1").unwrap();
        let item = ws.child("lake.Lakehouse").unwrap();
        assert_eq!(item.level(), HierarchyLevel::Item);
        assert_eq!(item.to_string(), "onelake://ws1/lake.Lakehouse");
        assert!(ws.child("a/b").is_err());
    }

    #[test]
    fn reserved_characters_survive_a_round_trip() {
        let dir = Address::decode("onelake://ws1/lake.Lakehouse/Files").unwrap();
        for name in ["report#1.csv", "what?.csv", "50%.csv", "my file.csv"] {
            let child = dir.child(name).unwrap();
            let reparsed = Address::decode(&child.to_string()).unwrap();
            assert_eq!(reparsed, child, "{name}");
            assert_eq!(reparsed.name(), name);
            assert_eq!(reparsed.api_path(), format!("/ws1/lake.Lakehouse/Files/{name}"));
        }
        assert_eq!(
            dir.child("report#1.csv").unwrap().to_string(),
            "onelake://ws1/lake.Lakehouse/Files/report%231.csv"
        );
    }

    #[test]
    fn encoded_and_plain_forms_share_a_key() {
        let encoded = Address::decode("onelake://My%20Workspace/lake.Lakehouse").unwrap();
        let plain = Address::decode("onelake://My Workspace/lake.Lakehouse").unwrap();
        assert_eq!(encoded.cache_key(), plain.cache_key());
        assert_eq!(encoded.workspace(), Some("My Workspace"));
        assert_eq!(encoded.api_path(), "/My Workspace/lake.Lakehouse");
        assert_eq!(encoded.to_string(), "onelake://My%20Workspace/lake.Lakehouse");
    }

    #[test]
    fn encoded_separators_and_dots_are_rejected() {
        for uri in [
            "onelake://ws1/lake.Lakehouse/a%2Fb",
            "onelake://ws1/%2E%2E/ws2",
            "onelake://%2Evscode",
            "onelake://ws1/%FF",
        ] {
            assert!(
                matches!(Address::decode(uri), Err(FsError::InvalidAddress(_))),
                "{uri} must be rejected"
            );
        }
    }
}
