//! Stored file references.

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::malformed;

const KIND: &str = "File";

/// A file previously uploaded to the backend, referenced by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct File {
    name: String,
    url: Option<String>,
}

impl File {
    /// Reference an uploaded file by its server-assigned name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Download URL; only present on values read from the server.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl Serialize for File {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.url.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("__type", KIND)?;
        map.serialize_entry("name", &self.name)?;
        if let Some(ref url) = self.url {
            map.serialize_entry("url", url)?;
        }
        map.end()
    }
}

struct FileVisitor;

impl<'de> Visitor<'de> for FileVisitor {
    type Value = File;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a tagged File object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<File, A::Error> {
        let mut tag: Option<String> = None;
        let mut name: Option<String> = None;
        let mut url: Option<String> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "__type" => tag = Some(map.next_value()?),
                "name" => name = Some(map.next_value()?),
                "url" => url = map.next_value()?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        match tag.as_deref() {
            Some(KIND) => {}
            Some(other) => return Err(malformed(KIND, format!("unexpected __type '{other}'"))),
            None => return Err(malformed(KIND, "missing __type")),
        }

        Ok(File {
            name: name.ok_or_else(|| malformed(KIND, "missing name"))?,
            url,
        })
    }
}

impl<'de> Deserialize<'de> for File {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FileVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;
    use serde_json::json;

    #[test]
    fn decodes_with_url() {
        let file: File = decode(json!({
            "__type": "File",
            "name": "tfss-profile.png",
            "url": "http://files.example.com/tfss-profile.png"
        }))
        .unwrap();
        assert_eq!(file.name(), "tfss-profile.png");
        assert!(file.url().is_some());
    }

    #[test]
    fn new_file_encodes_name_only() {
        assert_eq!(
            serde_json::to_value(File::new("a.png")).unwrap(),
            json!({ "__type": "File", "name": "a.png" })
        );
    }
}
