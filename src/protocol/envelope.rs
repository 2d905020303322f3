//! Message envelopes: inbound parsing and outbound construction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{EnvelopeError, SkipReason, percent_decode};

// =============================================================================
// Dotted Paths
// =============================================================================

/// A dot-separated directive key, split into its addressing segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DottedPath {
    /// Node name (first segment).
    pub node: String,
    /// Attribute name (second segment).
    pub attr: String,
    /// Optional third segment (style property or tree target id).
    pub extra: Option<String>,
}

impl DottedPath {
    /// Split into exactly two segments. `None` on any other count.
    pub fn two(path: &str) -> Option<Self> {
        let mut parts = path.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(node), Some(attr), None) => Some(Self {
                node: node.to_string(),
                attr: attr.to_string(),
                extra: None,
            }),
            _ => None,
        }
    }

    /// Split into at least two segments; the third, when present, lands
    /// in `extra`. Segments past the third are ignored, as in the
    /// reference protocol.
    pub fn at_least_two(path: &str) -> Option<Self> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.len() < 2 {
            return None;
        }
        Some(Self {
            node: parts[0].to_string(),
            attr: parts[1].to_string(),
            extra: parts.get(2).map(|s| (*s).to_string()),
        })
    }
}

// =============================================================================
// Inbound Envelope
// =============================================================================

/// Wire shape of an inbound message. Field order in the maps is the
/// peer's insertion order (`serde_json` is built with `preserve_order`).
#[derive(Debug, Default, Deserialize)]
struct RawInbound {
    #[serde(default, rename = "updateValue")]
    update_value: Option<Map<String, Value>>,

    #[serde(default)]
    update: Option<Map<String, Value>>,

    #[serde(default)]
    files: Option<Vec<FileRequest>>,

    #[serde(default, rename = "chunkSize")]
    chunk_size: Option<u64>,

    #[serde(default)]
    reader: Option<Value>,
}

/// One file-transfer descriptor inside a `files` directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRequest {
    /// Name of the document node holding the local file selection.
    pub source: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Pass-through update directive echoed in every chunk header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Value>,

    /// Pass-through progress directive echoed in every chunk header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Value>,
}

/// One typed inbound directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Copy an attribute value from one node to another
    /// (`updateValue` entry).
    ValueTransfer {
        key: String,
        dest: DottedPath,
        src: DottedPath,
    },

    /// Write peer-computed content into the document (`update` entry).
    /// Covers attribute sets, style sets, content replacement and tree
    /// fragment insertion; which one applies depends on document state
    /// at dispatch time.
    ContentUpdate {
        key: String,
        target: DottedPath,
        value: String,
    },

    /// Start reading local files back to the peer (`files` entry).
    FileTrigger {
        files: Vec<FileRequest>,
        chunk_size: Option<u64>,
        reader: Option<Value>,
    },
}

/// A directive rejected at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub key: String,
    pub reason: SkipReason,
}

/// An inbound envelope reduced to typed directives, in application
/// order: value transfers, then content updates, then the file trigger.
#[derive(Debug, Default)]
pub struct ParsedEnvelope {
    pub directives: Vec<Directive>,
    pub rejected: Vec<Rejected>,
}

/// Parse an inbound text frame.
///
/// A frame that does not parse as the envelope structure fails as a
/// whole ([`EnvelopeError`]); individually malformed entries are
/// recorded in `rejected` without affecting their siblings.
pub fn parse_inbound(text: &str) -> Result<ParsedEnvelope, EnvelopeError> {
    let raw: RawInbound = serde_json::from_str(text)?;
    let mut parsed = ParsedEnvelope::default();

    for (key, value) in raw.update_value.unwrap_or_default() {
        let Some(dest) = DottedPath::two(&key) else {
            parsed.reject(&key, SkipReason::MalformedKey);
            continue;
        };
        let Some(value) = value.as_str() else {
            parsed.reject(&key, SkipReason::MalformedValue);
            continue;
        };
        let Some(src) = DottedPath::two(&percent_decode(value)) else {
            parsed.reject(&key, SkipReason::MalformedValue);
            continue;
        };
        parsed.directives.push(Directive::ValueTransfer { key, dest, src });
    }

    for (key, value) in raw.update.unwrap_or_default() {
        let Some(target) = DottedPath::at_least_two(&key) else {
            parsed.reject(&key, SkipReason::MalformedKey);
            continue;
        };
        let Some(value) = value.as_str() else {
            parsed.reject(&key, SkipReason::MalformedValue);
            continue;
        };
        let value = percent_decode(value);
        parsed.directives.push(Directive::ContentUpdate { key, target, value });
    }

    if let Some(files) = raw.files {
        parsed.directives.push(Directive::FileTrigger {
            files,
            chunk_size: raw.chunk_size,
            reader: raw.reader,
        });
    }

    Ok(parsed)
}

impl ParsedEnvelope {
    fn reject(&mut self, key: &str, reason: SkipReason) {
        self.rejected.push(Rejected {
            key: key.to_string(),
            reason,
        });
    }
}

// =============================================================================
// Outbound Envelope
// =============================================================================

/// Reserved slot for the peer's reply to a file request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnSlot {
    pub code: i32,
    pub values: Vec<Value>,
}

/// Outbound message built per interaction event.
///
/// `callback`, `update` and `updateValue` come from the node's
/// declarative descriptor; callback arguments are resolved in place
/// before send.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Map<String, Value>>,

    #[serde(default, rename = "updateValue", skip_serializing_if = "Option::is_none")]
    pub update_value: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileRequest>>,

    #[serde(default, rename = "chunkSize", skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u64>,

    #[serde(default, rename = "return", skip_serializing_if = "Option::is_none")]
    pub ret: Option<ReturnSlot>,
}

impl OutboundEnvelope {
    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }
}

// =============================================================================
// Handshake
// =============================================================================

/// First frame after connection open: current document location plus
/// process-supplied arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handshake {
    pub path: String,
    pub args: String,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_transfer_parsing_preserves_order() {
        let parsed = parse_inbound(
            r#"{"updateValue": {"b.src": "s.val", "a.dst": "s.val"}}"#,
        )
        .unwrap();
        let keys: Vec<&str> = parsed
            .directives
            .iter()
            .filter_map(|d| match d {
                Directive::ValueTransfer { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(keys, ["b.src", "a.dst"]);
    }

    #[test]
    fn test_malformed_entries_rejected_not_fatal() {
        let parsed = parse_inbound(
            r#"{"updateValue": {"toofew": "s.val", "ok.attr": "s.val", "x.y": "three.part.path"}}"#,
        )
        .unwrap();
        assert_eq!(parsed.directives.len(), 1);
        assert_eq!(parsed.rejected.len(), 2);
        assert_eq!(parsed.rejected[0].reason, SkipReason::MalformedKey);
        assert_eq!(parsed.rejected[1].reason, SkipReason::MalformedValue);
    }

    #[test]
    fn test_update_values_percent_decoded() {
        let parsed =
            parse_inbound(r#"{"update": {"row.content": "a%20%3Cb%3E"}}"#).unwrap();
        match &parsed.directives[0] {
            Directive::ContentUpdate { value, .. } => assert_eq!(value, "a <b>"),
            other => panic!("unexpected directive: {other:?}"),
        }
    }

    #[test]
    fn test_update_key_style_segment() {
        let parsed = parse_inbound(r#"{"update": {"box.style.color": "red"}}"#).unwrap();
        match &parsed.directives[0] {
            Directive::ContentUpdate { target, .. } => {
                assert_eq!(target.attr, "style");
                assert_eq!(target.extra.as_deref(), Some("color"));
            }
            other => panic!("unexpected directive: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_envelope_is_fatal() {
        assert!(parse_inbound("not json at all").is_err());
    }

    #[test]
    fn test_files_become_single_trigger() {
        let parsed = parse_inbound(
            r#"{"chunkSize": 1024, "files": [{"source": "picker", "type": "binary"}]}"#,
        )
        .unwrap();
        assert_eq!(
            parsed.directives[0],
            Directive::FileTrigger {
                files: vec![FileRequest {
                    source: "picker".to_string(),
                    kind: Some("binary".to_string()),
                    update: None,
                    progress: None,
                }],
                chunk_size: Some(1024),
                reader: None,
            }
        );
    }

    #[test]
    fn test_outbound_skips_empty_fields() {
        let envelope = OutboundEnvelope {
            name: Some("button1".to_string()),
            ..Default::default()
        };
        assert_eq!(envelope.to_json().unwrap(), r#"{"name":"button1"}"#);
    }
}
