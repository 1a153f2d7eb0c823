// Wire and domain types for objects stored in the remote folder.

use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;
use std::path::Path;

/// One object as reported by the backend at enumeration time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Absent for objects the backend does not size (native documents,
    /// shortcuts, folders).
    #[serde(default, deserialize_with = "size_from_wire")]
    pub size: Option<u64>,
}

impl RemoteObject {
    /// Extension of the object name including the leading dot, or an
    /// empty string.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default()
    }
}

/// Metadata sent when creating an object.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewObject {
    pub name: String,
    pub parents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Object content handed to the backend for upload.
pub struct Media {
    pub reader: Box<dyn Read + Send>,
    pub len: u64,
    pub mime_type: String,
}

// Drive encodes int64 fields as JSON strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireSize {
    Text(String),
    Number(u64),
}

fn size_from_wire<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<WireSize>::deserialize(deserializer)? {
        None => Ok(None),
        Some(WireSize::Number(n)) => Ok(Some(n)),
        Some(WireSize::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
