//! Path listing response types.

use serde::{Deserialize, Deserializer, de};

/// One entry of a `resource=filesystem` listing.
///
/// The DFS endpoint encodes booleans and numbers as JSON strings; both the
/// string and the native encodings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntry {
    /// Full name relative to the listed file system, `/`-separated.
    pub name: String,
    /// Whether the entry is a directory.
    #[serde(default, deserialize_with = "bool_or_string")]
    pub is_directory: bool,
    /// Size in bytes.
    #[serde(default, deserialize_with = "u64_or_string")]
    pub content_length: Option<u64>,
    /// RFC 1123 modification timestamp.
    #[serde(default)]
    pub last_modified: Option<String>,
    /// Entity tag.
    #[serde(default)]
    pub etag: Option<String>,
}

impl PathEntry {
    /// The last `/` segment of [`PathEntry::name`].
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flex<T> {
    Native(T),
    Text(String),
}

fn bool_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Flex::<bool>::deserialize(deserializer)? {
        Flex::Native(b) => Ok(b),
        Flex::Text(s) => Ok(s.eq_ignore_ascii_case("true")),
    }
}

fn u64_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<Flex<u64>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Flex::Native(n)) => Ok(Some(n)),
        Some(Flex::Text(s)) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_string_encoded_fields() {
        let entry: PathEntry = serde_json::from_value(json!({
            "name": "lake.Lakehouse/Files/a.csv",
            "isDirectory": "false",
            "contentLength": "42",
            "lastModified": "Thu, 18 Jan 2024 12:57:08 GMT",
        }))
        .unwrap();
        assert!(!entry.is_directory);
        assert_eq!(entry.content_length, Some(42));
        assert_eq!(entry.file_name(), "a.csv");
    }

    #[test]
    fn accepts_native_fields_and_missing_flags() {
        let dir: PathEntry =
            serde_json::from_value(json!({"name": "Files", "isDirectory": true, "contentLength": 0}))
                .unwrap();
        assert!(dir.is_directory);
        assert_eq!(dir.content_length, Some(0));

        let bare: PathEntry = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert!(!bare.is_directory, "missing isDirectory means a file");
        assert_eq!(bare.content_length, None);
    }
}
