use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;

use crate::domain::DomainError;

/// Opaque payload produced by a generation backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    data: Bytes,
    content_type: String,
}

impl Artifact {
    pub fn new(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
        }
    }

    /// Decode a base64 payload, as returned by `b64_json` style APIs
    pub fn from_base64(encoded: &str, content_type: impl Into<String>) -> Result<Self, DomainError> {
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| DomainError::internal(format!("Invalid base64 artifact: {}", e)))?;

        Ok(Self::new(data, content_type))
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn into_parts(self) -> (Bytes, String) {
        (self.data, self.content_type)
    }
}
