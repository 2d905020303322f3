//! Abstract Document Model and an in-memory implementation.
//!
//! The synchronization core never owns the document: it reads and mutates
//! nodes through the narrow [`Document`] trait. [`MemDocument`] is the
//! concrete model used by the CLI (populated from an HTML file, see
//! [`load`]) and by tests.

pub mod load;

use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use std::path::PathBuf;

/// Opaque node handle, stable for the lifetime of the document.
pub type NodeId = usize;

// =============================================================================
// Document Trait
// =============================================================================

/// Narrow interface to the externally-owned document tree.
///
/// Name lookups return the *first* match in document order; names are not
/// required to be unique. Ids are unique.
pub trait Document {
    /// First node with the given `name` attribute, in document order.
    fn find_by_name(&self, name: &str) -> Option<NodeId>;

    /// Node with the given unique id.
    fn find_by_id(&self, id: &str) -> Option<NodeId>;

    /// The node's own name attribute.
    fn node_name(&self, node: NodeId) -> Option<&str>;

    /// Read an attribute value. `None` when the attribute is absent.
    fn attr(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Set an attribute value, creating the attribute if needed.
    fn set_attr(&mut self, node: NodeId, name: &str, value: &str);

    /// Set a single style property.
    fn set_style(&mut self, node: NodeId, prop: &str, value: &str);

    /// Read a single style property.
    fn style(&self, node: NodeId, prop: &str) -> Option<&str>;

    /// The node's raw content (opaque markup).
    fn content(&self, node: NodeId) -> &str;

    /// Replace the node's raw content wholesale.
    fn set_content(&mut self, node: NodeId, markup: &str);

    /// Live property read (e.g. a form field's current value). Falls
    /// outside the attribute map; `None` when the node has no such
    /// property.
    fn property(&self, node: NodeId, name: &str) -> Option<String>;

    /// Local files attached to a form-like node.
    fn files(&self, node: NodeId) -> &[PathBuf];
}

// =============================================================================
// In-Memory Implementation
// =============================================================================

/// One addressable node of the in-memory model.
#[derive(Debug, Default, Clone)]
pub struct MemNode {
    pub name: Option<String>,
    pub id: Option<String>,
    pub attrs: FxHashMap<String, String>,
    pub styles: FxHashMap<String, String>,
    pub content: String,
    /// Live properties, shadowing attributes (form state).
    pub props: FxHashMap<String, String>,
    /// Attached local files (file-selection nodes).
    pub files: Vec<PathBuf>,
}

/// In-memory document: a flat node table in document order.
#[derive(Debug)]
pub struct MemDocument {
    nodes: Vec<MemNode>,
    /// Attribute attaching local files, used when absorbing markup.
    file_attr: String,
}

impl Default for MemDocument {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            file_attr: crate::config::EventConfig::default().file_attr,
        }
    }
}

impl MemDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, returning its handle.
    pub fn push(&mut self, node: MemNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Set a live property (form state) on a node.
    pub fn set_property(&mut self, node: NodeId, name: &str, value: &str) {
        self.nodes[node].props.insert(name.to_string(), value.to_string());
    }

    /// Attach a local file to a form-like node.
    pub fn attach_file(&mut self, node: NodeId, path: impl Into<PathBuf>) {
        self.nodes[node].files.push(path.into());
    }

    /// JSON snapshot of the whole node table (for `inspect` and `show`).
    pub fn snapshot(&self) -> Value {
        let nodes: Vec<Value> = self.nodes.iter().map(Self::describe).collect();
        json!({ "nodes": nodes })
    }

    /// JSON description of one node.
    pub fn describe_node(&self, node: NodeId) -> Option<Value> {
        self.nodes.get(node).map(Self::describe)
    }

    fn describe(node: &MemNode) -> Value {
        let mut attrs: Vec<(&String, &String)> = node.attrs.iter().collect();
        attrs.sort();
        let mut styles: Vec<(&String, &String)> = node.styles.iter().collect();
        styles.sort();
        let attrs: serde_json::Map<String, Value> = attrs
            .into_iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let styles: serde_json::Map<String, Value> = styles
            .into_iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        json!({
            "name": node.name,
            "id": node.id,
            "attrs": attrs,
            "style": styles,
            "content": node.content,
            "files": node.files,
        })
    }
}

impl Document for MemDocument {
    fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name.as_deref() == Some(name))
    }

    fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.id.as_deref() == Some(id))
    }

    fn node_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node)?.name.as_deref()
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(node)?.attrs.get(name).map(String::as_str)
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.attrs.insert(name.to_string(), value.to_string());
        }
    }

    fn set_style(&mut self, node: NodeId, prop: &str, value: &str) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.styles.insert(prop.to_string(), value.to_string());
        }
    }

    fn style(&self, node: NodeId, prop: &str) -> Option<&str> {
        self.nodes.get(node)?.styles.get(prop).map(String::as_str)
    }

    fn content(&self, node: NodeId) -> &str {
        self.nodes.get(node).map(|n| n.content.as_str()).unwrap_or("")
    }

    fn set_content(&mut self, node: NodeId, markup: &str) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        n.content = markup.to_string();
        // New markup may carry addressable elements of its own, the way
        // an innerHTML assignment puts them in reach of getElementById
        load::absorb(self, markup);
    }

    fn property(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes.get(node)?.props.get(name).cloned()
    }

    fn files(&self, node: NodeId) -> &[PathBuf] {
        self.nodes.get(node).map(|n| n.files.as_slice()).unwrap_or(&[])
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> MemNode {
        MemNode {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_by_name_first_match() {
        let mut doc = MemDocument::new();
        let first = doc.push(named("dup"));
        let _second = doc.push(named("dup"));

        // Duplicate names are a documented ambiguity: first match wins
        assert_eq!(doc.find_by_name("dup"), Some(first));
    }

    #[test]
    fn test_attr_roundtrip() {
        let mut doc = MemDocument::new();
        let node = doc.push(named("field"));

        assert_eq!(doc.attr(node, "value"), None);
        doc.set_attr(node, "value", "42");
        assert_eq!(doc.attr(node, "value"), Some("42"));
    }

    #[test]
    fn test_content_write_lifts_addressable_markup() {
        let mut doc = MemDocument::new();
        let host = doc.push(named("host"));

        doc.set_content(host, r#"<div id="inner" name="inner" class="late">text</div>"#);

        let inner = doc.find_by_id("inner").unwrap();
        assert_eq!(doc.attr(inner, "class"), Some("late"));
        assert_eq!(doc.content(inner), "text");

        // Rewriting the same id refreshes the entry instead of duplicating
        doc.set_content(host, r#"<div id="inner" class="later">text2</div>"#);
        assert_eq!(doc.find_by_id("inner"), Some(inner));
        assert_eq!(doc.attr(inner, "class"), Some("later"));
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_property_shadows_nothing() {
        let mut doc = MemDocument::new();
        let node = doc.push(named("field"));
        doc.set_attr(node, "value", "attr");
        doc.set_property(node, "value", "live");

        // Properties and attributes are separate planes
        assert_eq!(doc.property(node, "value").as_deref(), Some("live"));
        assert_eq!(doc.attr(node, "value"), Some("attr"));
    }
}
