//! Chunk header frames for the upload sub-protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-file constants plus per-chunk position, sent as a text frame
/// immediately before the chunk's binary payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHeader {
    pub file: ChunkFile,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Value>,

    /// Nominal chunk size for the whole transfer.
    #[serde(rename = "chunkSize")]
    pub chunk_size: u64,
}

/// File identification and chunk position.
///
/// `start` and `sequence` vary per chunk; everything else is constant
/// across one file's chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkFile {
    /// This chunk's actual size (the final chunk may be short).
    #[serde(rename = "chunkSize")]
    pub chunk_size: u64,

    /// Total file size in bytes.
    pub size: u64,

    /// File name (no directory components).
    pub name: String,

    /// Document node the file was attached to.
    pub source: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Byte offset of this chunk.
    pub start: u64,

    /// 0-based chunk index, incremented by one per chunk.
    pub sequence: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_wire_field_names() {
        let header = ChunkHeader {
            file: ChunkFile {
                chunk_size: 512,
                size: 1536,
                name: "report.pdf".to_string(),
                source: "picker".to_string(),
                kind: Some("binary".to_string()),
                start: 1024,
                sequence: 2,
            },
            reader: None,
            update: None,
            progress: None,
            chunk_size: 512,
        };

        let json = serde_json::to_string(&header).unwrap();
        assert!(json.contains(r#""chunkSize":512"#));
        assert!(json.contains(r#""type":"binary""#));
        assert!(json.contains(r#""sequence":2"#));
        assert!(json.contains(r#""start":1024"#));
        // camelCase only on the wire, no snake_case leakage
        assert!(!json.contains("chunk_size"));
    }
}
