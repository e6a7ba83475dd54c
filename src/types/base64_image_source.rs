use base64::Engine;
use serde::{Deserialize, Serialize};

/// Represents a base64-encoded image source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Base64ImageSource {
    /// The source type (always "base64" for this struct)
    #[serde(default = "default_type")]
    pub r#type: String,

    /// The MIME type of the image, e.g. "image/png".
    pub media_type: String,

    /// The base64-encoded data of the image
    pub data: String,
}

fn default_type() -> String {
    "base64".to_string()
}

impl Base64ImageSource {
    /// Create a new Base64ImageSource from an already-encoded string
    pub fn new(data: String, media_type: String) -> Self {
        Self {
            r#type: default_type(),
            media_type,
            data,
        }
    }

    /// Encode raw image bytes.
    pub fn encode(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(
            base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type.into(),
        )
    }

    /// Decode the image back to raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }
}
