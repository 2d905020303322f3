//! Inbound directive dispatch.
//!
//! Applies a parsed envelope to the Document Model: value transfers
//! first, then content updates, then the file trigger - all on the turn
//! that received the message. Every directive's fate is reported as an
//! explicit [`DirectiveOutcome`] so callers and tests can account for
//! exactly what was skipped and why.
//!
//! Quirk preserved from the reference protocol: a content update landing
//! on a tree-fragment row performs the tree insert and halts the rest of
//! the update batch. Peers are assumed to send at most one tree
//! directive per envelope; we keep the halt rather than silently fixing
//! it.

use std::path::PathBuf;

use serde_json::Value;

use crate::address;
use crate::config::SyncConfig;
use crate::document::Document;
use crate::protocol::{Directive, DottedPath, FileRequest, ParsedEnvelope, Rejected, SkipReason};
use crate::tree;

/// The fate of one directive.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveOutcome {
    Applied { key: String },
    Skipped { key: String, reason: SkipReason },
}

/// A file upload the caller should start (the dispatcher mutates the
/// document; it never touches the transport).
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub request: FileRequest,
    pub path: PathBuf,
    pub chunk_size: Option<u64>,
    pub reader: Option<Value>,
}

/// Result of handling one envelope.
#[derive(Debug, Default)]
pub struct DispatchResult {
    /// Parse-time rejections first, then directives in envelope order.
    pub outcomes: Vec<DirectiveOutcome>,
    pub uploads: Vec<UploadJob>,
}

impl DispatchResult {
    /// Count of applied directives.
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DirectiveOutcome::Applied { .. }))
            .count()
    }
}

/// Apply one parsed envelope to the document.
pub fn handle(
    doc: &mut dyn Document,
    envelope: &ParsedEnvelope,
    config: &SyncConfig,
) -> DispatchResult {
    let mut result = DispatchResult::default();

    for Rejected { key, reason } in &envelope.rejected {
        result.outcomes.push(DirectiveOutcome::Skipped {
            key: key.clone(),
            reason: *reason,
        });
    }

    let mut update_halted = false;
    for directive in &envelope.directives {
        let outcome = match directive {
            Directive::ValueTransfer { key, dest, src } => {
                transfer_value(doc, key, dest, src)
            }
            Directive::ContentUpdate { key, target, value } => {
                if update_halted {
                    DirectiveOutcome::Skipped {
                        key: key.clone(),
                        reason: SkipReason::HaltedByTreeInsert,
                    }
                } else {
                    apply_update(doc, key, target, value, config, &mut update_halted)
                }
            }
            Directive::FileTrigger {
                files,
                chunk_size,
                reader,
            } => {
                trigger_files(doc, files, *chunk_size, reader.as_ref(), &mut result);
                continue;
            }
        };
        crate::debug_do! {
            if let DirectiveOutcome::Skipped { key, reason } = &outcome {
                crate::debug!("sync"; "skipped `{}`: {}", key, reason);
            }
        }
        result.outcomes.push(outcome);
    }

    result
}

/// Copy an attribute value between two resolved addresses.
///
/// An absent source attribute skips the transfer - an empty value is
/// never written.
fn transfer_value(
    doc: &mut dyn Document,
    key: &str,
    dest: &DottedPath,
    src: &DottedPath,
) -> DirectiveOutcome {
    let skipped = |reason| DirectiveOutcome::Skipped {
        key: key.to_string(),
        reason,
    };

    let Ok(dest) = address::resolve_pair(doc, &dest.node, &dest.attr) else {
        return skipped(SkipReason::UnknownDestination);
    };
    let Ok(src) = address::resolve_pair(doc, &src.node, &src.attr) else {
        return skipped(SkipReason::UnknownSource);
    };
    let Some(value) = doc.attr(src.node, &src.attr).map(str::to_string) else {
        return skipped(SkipReason::MissingSourceAttr);
    };

    doc.set_attr(dest.node, &dest.attr, &value);
    DirectiveOutcome::Applied {
        key: key.to_string(),
    }
}

/// Apply one `update` entry: style set, tree insert, content
/// replacement or attribute set, depending on the key and the target's
/// current `class`.
fn apply_update(
    doc: &mut dyn Document,
    key: &str,
    target: &DottedPath,
    value: &str,
    config: &SyncConfig,
    update_halted: &mut bool,
) -> DirectiveOutcome {
    let skipped = |reason| DirectiveOutcome::Skipped {
        key: key.to_string(),
        reason,
    };
    let applied = || DirectiveOutcome::Applied {
        key: key.to_string(),
    };

    let Some(node) = doc.find_by_name(&target.node) else {
        return skipped(SkipReason::UnknownDestination);
    };

    if target.attr == "style" {
        let Some(prop) = &target.extra else {
            return skipped(SkipReason::MissingStyleProperty);
        };
        doc.set_style(node, prop, value);
        return applied();
    }

    if doc.attr(node, "class") == Some(config.tree.marker_class.as_str()) {
        // Reference quirk: a tree insert ends the whole update batch
        *update_halted = true;
        let Some(target_id) = &target.extra else {
            return skipped(SkipReason::UnknownTreeTarget);
        };
        return match tree::insert(doc, target_id, value, &config.tree) {
            Ok(()) => applied(),
            Err(tree::TreeError::UnknownTarget(_)) => skipped(SkipReason::UnknownTreeTarget),
        };
    }

    if target.attr == "content" {
        doc.set_content(node, value);
    } else {
        doc.set_attr(node, &target.attr, value);
    }
    applied()
}

/// Resolve file-trigger descriptors to local file handles.
fn trigger_files(
    doc: &dyn Document,
    files: &[FileRequest],
    chunk_size: Option<u64>,
    reader: Option<&Value>,
    result: &mut DispatchResult,
) {
    for request in files {
        let Some(node) = doc.find_by_name(&request.source) else {
            result.outcomes.push(DirectiveOutcome::Skipped {
                key: request.source.clone(),
                reason: SkipReason::UnknownSource,
            });
            continue;
        };
        let Some(path) = doc.files(node).first() else {
            result.outcomes.push(DirectiveOutcome::Skipped {
                key: request.source.clone(),
                reason: SkipReason::NoAttachedFile,
            });
            continue;
        };
        result.uploads.push(UploadJob {
            request: request.clone(),
            path: path.clone(),
            chunk_size,
            reader: reader.cloned(),
        });
        result.outcomes.push(DirectiveOutcome::Applied {
            key: request.source.clone(),
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
