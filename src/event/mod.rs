//! Outbound event encoding.
//!
//! A node carries its interaction contract as a percent-encoded JSON
//! descriptor attribute. Encoding parses that descriptor into a working
//! envelope, resolves callback arguments against the live document, and
//! decides whether the interaction needs a server round-trip at all.

use serde_json::Value;

use crate::address;
use crate::config::SyncConfig;
use crate::document::{Document, NodeId};
use crate::protocol::{EnvelopeError, OutboundEnvelope, ReturnSlot, percent_decode};
use crate::tree;

/// Result of encoding one interaction.
#[derive(Debug, Default)]
pub struct Encoded {
    /// `None` means the interaction was local-only: do not transmit.
    pub envelope: Option<OutboundEnvelope>,
    /// Tree rows swallow the originating UI event.
    pub stop_propagation: bool,
}

/// Encode an interaction event on `source` into an outbound envelope.
///
/// Nodes without a descriptor attribute produce nothing. A descriptor
/// that does not parse is an error the caller reports; it is never sent
/// half-resolved.
pub fn encode(
    doc: &mut dyn Document,
    source: NodeId,
    config: &SyncConfig,
) -> Result<Encoded, EnvelopeError> {
    let Some(descriptor) = doc.attr(source, &config.event.descriptor_attr) else {
        return Ok(Encoded::default());
    };
    let mut envelope: OutboundEnvelope = serde_json::from_str(&percent_decode(descriptor))?;
    envelope.name = doc.node_name(source).map(str::to_string);

    let mut post = false;

    if envelope.files.is_some() {
        // Reserve the reply slot and announce our chunk size
        envelope.ret = Some(ReturnSlot {
            code: 0,
            values: Vec::new(),
        });
        envelope.chunk_size = Some(config.upload.chunk_size);
        post = true;
    }

    if let Some(callback) = &mut envelope.callback {
        post = true;
        for args in callback.values_mut() {
            let Value::Array(args) = args else { continue };
            for arg in args.iter_mut() {
                resolve_argument(doc, source, arg);
            }
        }
    }

    if let Some(update_value) = &envelope.update_value {
        // Source references are probed read-only; the destination side
        // is interpreted by the peer. Failures are tolerated silently.
        for key in update_value.keys() {
            if let Ok(addr) = address::resolve(doc, key) {
                let _ = doc.attr(addr.node, &addr.attr);
            }
        }
    }

    if envelope.update.is_some() {
        post = true;
    }

    let mut stop_propagation = false;
    if doc.attr(source, "class") == Some(config.tree.marker_class.as_str()) {
        // Tree rows own the post decision: expanding needs the peer,
        // collapsing is local
        post = tree::toggle(doc, source, &config.tree) == tree::ToggleOutcome::Post;
        stop_propagation = true;
    }

    Ok(Encoded {
        envelope: post.then_some(envelope),
        stop_propagation,
    })
}

/// Resolve one callback argument in place.
///
/// Dotted string arguments are references: `this.<attr>` reads the
/// source node, `<node>.<name>` prefers a live property read and falls
/// back to an attribute. Literals pass through untouched.
fn resolve_argument(doc: &dyn Document, source: NodeId, arg: &mut Value) {
    let Value::String(text) = arg else { return };
    let Some((head, tail)) = text.split_once('.') else {
        return;
    };
    // Only the first two segments address anything
    let tail = tail.split('.').next().unwrap_or(tail);

    if head == "this" {
        *arg = doc
            .attr(source, tail)
            .map_or(Value::Null, |v| Value::String(v.to_string()));
        return;
    }

    let Some(node) = doc.find_by_name(head) else {
        // Unknown node: keep the literal untouched
        return;
    };
    *arg = doc
        .property(node, tail)
        .or_else(|| doc.attr(node, tail).map(str::to_string))
        .map_or(Value::Null, Value::String);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MemDocument, MemNode};

    /// Percent-encode just enough for descriptor attributes in tests.
    fn encode_descriptor(json: &str) -> String {
        json.replace('"', "%22").replace(' ', "%20")
    }

    fn with_descriptor(name: &str, descriptor: &str) -> (MemDocument, NodeId) {
        let mut doc = MemDocument::new();
        let node = doc.push(MemNode {
            name: Some(name.to_string()),
            ..Default::default()
        });
        doc.set_attr(node, "data-event", &encode_descriptor(descriptor));
        (doc, node)
    }

    #[test]
    fn test_no_descriptor_no_envelope() {
        let mut doc = MemDocument::new();
        let node = doc.push(MemNode::default());
        let encoded = encode(&mut doc, node, &SyncConfig::default()).unwrap();
        assert!(encoded.envelope.is_none());
    }

    #[test]
    fn test_empty_descriptor_yields_none() {
        let (mut doc, node) = with_descriptor("button1", "{}");
        let encoded = encode(&mut doc, node, &SyncConfig::default()).unwrap();
        assert!(encoded.envelope.is_none());
        assert!(!encoded.stop_propagation);
    }

    #[test]
    fn test_callback_arguments_resolved() {
        let (mut doc, node) = with_descriptor(
            "button1",
            r#"{"callback": {"m": ["this.value", "other.count", "literal"]}}"#,
        );
        doc.set_attr(node, "value", "7");
        let other = doc.push(MemNode {
            name: Some("other".to_string()),
            ..Default::default()
        });
        doc.set_attr(other, "count", "3");

        let encoded = encode(&mut doc, node, &SyncConfig::default()).unwrap();
        let envelope = encoded.envelope.unwrap();

        assert_eq!(envelope.name.as_deref(), Some("button1"));
        let args = &envelope.callback.unwrap()["m"];
        assert_eq!(args, &serde_json::json!(["7", "3", "literal"]));
    }

    #[test]
    fn test_callback_prefers_live_property() {
        let (mut doc, node) =
            with_descriptor("button1", r#"{"callback": {"m": ["field.value"]}}"#);
        let field = doc.push(MemNode {
            name: Some("field".to_string()),
            ..Default::default()
        });
        doc.set_attr(field, "value", "stale");
        doc.set_property(field, "value", "live");

        let encoded = encode(&mut doc, node, &SyncConfig::default()).unwrap();
        let args = &encoded.envelope.unwrap().callback.unwrap()["m"];
        assert_eq!(args, &serde_json::json!(["live"]));
    }

    #[test]
    fn test_files_reserve_return_slot() {
        let (mut doc, node) = with_descriptor(
            "picker",
            r#"{"files": [{"source": "picker", "type": "binary"}]}"#,
        );

        let encoded = encode(&mut doc, node, &SyncConfig::default()).unwrap();
        let envelope = encoded.envelope.unwrap();

        assert_eq!(envelope.chunk_size, Some(131072));
        let ret = envelope.ret.unwrap();
        assert_eq!(ret.code, 0);
        assert!(ret.values.is_empty());
    }

    #[test]
    fn test_tree_row_owns_post_decision() {
        let config = SyncConfig::default();

        // Unset row: expanding needs the peer
        let (mut doc, node) = with_descriptor("row1", r#"{"callback": {"expand": []}}"#);
        doc.set_attr(node, "class", "tree-node");
        let encoded = encode(&mut doc, node, &config).unwrap();
        assert!(encoded.envelope.is_some());
        assert!(encoded.stop_propagation);

        // Expanded row: collapse is local-only even though a callback
        // marked the envelope postable
        doc.set_attr(node, &config.tree.state_attr, "expanded");
        let encoded = encode(&mut doc, node, &config).unwrap();
        assert!(encoded.envelope.is_none());
        assert!(encoded.stop_propagation);
    }
}
