use serde_derive::Deserialize;
use serde_derive::Serialize;

/// A binary image payload paired with its MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageBlob {
    pub fn new(bytes: Vec<u8>, mime_type: &str) -> ImageBlob {
        return ImageBlob {
            bytes,
            mime_type: mime_type.to_string(),
        };
    }
}

/// A pending user-supplied reference image. Transient: created on file
/// selection, discarded when replaced or when the mode changes.
#[derive(Clone, Debug)]
pub struct ImageFile {
    pub blob: ImageBlob,
    pub preview_url: String,
}

/// A completed generation. Immutable once created.
#[derive(Clone, Debug)]
pub struct GeneratedImage {
    pub id: String,
    pub url: String,
    pub blob: ImageBlob,
    pub prompt: String,
}

impl GeneratedImage {
    /// Time-derived identifier, also used for deterministic export file
    /// names.
    pub fn create_id() -> String {
        return chrono::Utc::now().timestamp_millis().to_string();
    }
}

/// The on-disk projection of a [`GeneratedImage`]. The base64 payload must
/// round-trip byte for byte.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub id: String,
    pub prompt: String,
    pub base64: String,
    pub mime_type: String,
}
