//! Compiled policy artifact.
//!
//! Layout (format 1): a UTF-8 JSON object
//! `{"data": {..}, "format": 1, "modules": [{"path", "source"}..], "query": ".."}`.
//! Object keys are emitted in a fixed order and modules are sorted by path, so
//! identical inputs always encode to identical bytes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{OpaLinkError, Result};
use crate::loader::SourceSet;

/// Current artifact format version.
pub const ARTIFACT_FORMAT: u32 = 1;

/// Immutable compiled policy bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    bytes: Bytes,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ArtifactDoc {
    pub data: serde_json::Map<String, serde_json::Value>,
    pub format: u32,
    pub modules: Vec<ArtifactModule>,
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ArtifactModule {
    pub path: String,
    pub source: String,
}

impl Artifact {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self { bytes: bytes.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn encode(query: &str, sources: &SourceSet) -> Result<Self> {
        let doc = ArtifactDoc {
            data: sources.data().clone(),
            format: ARTIFACT_FORMAT,
            modules: sources
                .modules()
                .map(|(path, source)| ArtifactModule {
                    path: path.to_string(),
                    source: source.to_string(),
                })
                .collect(),
            query: query.to_string(),
        };
        let bytes = serde_json::to_vec(&doc)
            .map_err(|e| OpaLinkError::Compile(format!("artifact encode failed: {e}")))?;
        Ok(Self::from_bytes(bytes))
    }

    pub(crate) fn decode(&self) -> Result<ArtifactDoc> {
        let doc: ArtifactDoc = serde_json::from_slice(&self.bytes)
            .map_err(|e| OpaLinkError::Compile(format!("invalid artifact: {e}")))?;
        if doc.format != ARTIFACT_FORMAT {
            return Err(OpaLinkError::UnsupportedVersion(doc.format));
        }
        Ok(doc)
    }
}
