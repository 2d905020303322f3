//! Dot-path address resolution against the Document Model.
//!
//! Directive keys and callback arguments reference document state as
//! `"<node>.<attribute>"`. Resolution is read-only; failures are typed
//! but callers treat them as skip signals, never as aborts.

use thiserror::Error;

use crate::document::{Document, NodeId};

/// A resolved `(node, attribute)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub node: NodeId,
    pub attr: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address `{0}` does not split into exactly two segments")]
    Malformed(String),

    #[error("no node named `{0}`")]
    UnknownNode(String),
}

/// Resolve a `"<node>.<attribute>"` path.
///
/// Fails when the path does not split into exactly two segments or the
/// node name matches nothing. Duplicate names resolve to the first match
/// in document order (documented ambiguity, not an error).
pub fn resolve(doc: &dyn Document, path: &str) -> Result<Address, AddressError> {
    let mut parts = path.split('.');
    let (Some(name), Some(attr), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AddressError::Malformed(path.to_string()));
    };
    resolve_pair(doc, name, attr)
}

/// Resolve an already-split `(node name, attribute)` pair.
pub fn resolve_pair(doc: &dyn Document, name: &str, attr: &str) -> Result<Address, AddressError> {
    let node = doc
        .find_by_name(name)
        .ok_or_else(|| AddressError::UnknownNode(name.to_string()))?;

    Ok(Address {
        node,
        attr: attr.to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
