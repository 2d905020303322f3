//! Wire protocol types.
//!
//! Inbound envelopes are parsed into tagged [`Directive`] variants up
//! front instead of being probed field-by-field at use time; malformed
//! entries are rejected at parse time with a [`SkipReason`] so the
//! dispatcher (and tests) can account for every directive's fate.

mod chunk;
mod envelope;

pub use chunk::{ChunkFile, ChunkHeader};
pub use envelope::{
    Directive, DottedPath, FileRequest, Handshake, OutboundEnvelope, ParsedEnvelope, Rejected,
    ReturnSlot, parse_inbound,
};

use std::fmt;

use thiserror::Error;

/// Why the envelope could not be handled at all (whole message dropped).
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Why a single directive was not applied.
///
/// Skipping is best-effort delivery policy, not an error: one directive's
/// failure never aborts its siblings (except the documented tree-insert
/// halt, reported as [`SkipReason::HaltedByTreeInsert`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Key does not split into the expected segment count.
    MalformedKey,
    /// Value is not a string or does not split into two segments.
    MalformedValue,
    /// Destination node name matches nothing.
    UnknownDestination,
    /// Source node name matches nothing.
    UnknownSource,
    /// Source node does not currently expose the attribute.
    MissingSourceAttr,
    /// `style` directive without a third segment naming the property.
    MissingStyleProperty,
    /// Tree insert target id matches no node.
    UnknownTreeTarget,
    /// File trigger source has no attached local file.
    NoAttachedFile,
    /// Unreached: an earlier tree insert halted the update batch.
    HaltedByTreeInsert,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MalformedKey => "malformed key",
            Self::MalformedValue => "malformed value",
            Self::UnknownDestination => "unknown destination node",
            Self::UnknownSource => "unknown source node",
            Self::MissingSourceAttr => "source attribute absent",
            Self::MissingStyleProperty => "style property segment missing",
            Self::UnknownTreeTarget => "unknown tree target id",
            Self::NoAttachedFile => "no attached local file",
            Self::HaltedByTreeInsert => "halted by tree insert",
        };
        f.write_str(text)
    }
}

/// Percent-decode a wire value, falling back to the raw text when the
/// decoded bytes are not UTF-8.
pub fn percent_decode(value: &str) -> String {
    percent_encoding::percent_decode_str(value)
        .decode_utf8()
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}
