//! Tree fragment state machine.
//!
//! Tree-capable rows expand by wrapping their current content (the
//! header) together with a peer-supplied body in a synthetic two-section
//! table, and collapse by restoring the captured header. The expansion
//! state rides on a node attribute so it stays with the externally-owned
//! document.
//!
//! States: `Unset → Collapsed ⇄ Expanded`. A node is wrapped iff it is
//! `Expanded`.

use thiserror::Error;

use crate::config::TreeConfig;
use crate::document::{Document, NodeId};

/// Expansion state of one tree-capable node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandState {
    /// No prior interaction.
    Unset,
    Collapsed,
    Expanded,
}

/// Whether an interaction on a tree row needs a server round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Expanding: the body must be fetched from the peer.
    Post,
    /// Collapsing is local-only.
    NoPost,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("no node with id `{0}`")]
    UnknownTarget(String),
}

/// Current expansion state, read from the state attribute.
pub fn state_of(doc: &dyn Document, node: NodeId, config: &TreeConfig) -> ExpandState {
    match doc.attr(node, &config.state_attr) {
        Some("expanded") => ExpandState::Expanded,
        Some(_) => ExpandState::Collapsed,
        None => ExpandState::Unset,
    }
}

/// Toggle a tree row.
///
/// Expanded rows restore their stored header-only content and collapse
/// without posting. Unset and collapsed rows request their body from the
/// peer; the collapsed state itself is untouched until the insert
/// arrives.
pub fn toggle(doc: &mut dyn Document, node: NodeId, config: &TreeConfig) -> ToggleOutcome {
    match state_of(doc, node, config) {
        ExpandState::Expanded => {
            if let Some(header) = section_inner(doc.content(node), "thead") {
                doc.set_content(node, &header);
            }
            doc.set_attr(node, &config.state_attr, "collapsed");
            ToggleOutcome::NoPost
        }
        ExpandState::Unset => {
            doc.set_attr(node, &config.state_attr, "collapsed");
            ToggleOutcome::Post
        }
        ExpandState::Collapsed => ToggleOutcome::Post,
    }
}

/// Insert a peer-supplied body under the row with id `target_id`.
///
/// An expanded target collapses first, so the captured header is always
/// the row's own cells. The designated root placeholder replaces its
/// content wholesale and never wraps.
pub fn insert(
    doc: &mut dyn Document,
    target_id: &str,
    body: &str,
    config: &TreeConfig,
) -> Result<(), TreeError> {
    let node = doc
        .find_by_id(target_id)
        .ok_or_else(|| TreeError::UnknownTarget(target_id.to_string()))?;

    if state_of(doc, node, config) == ExpandState::Expanded {
        toggle(doc, node, config);
    }

    if target_id == config.root_id {
        doc.set_content(node, body);
        return Ok(());
    }

    let header = doc.content(node).to_string();
    let cols = count_cells(&header);
    let marker = &config.marker_class;
    let wrapper = format!(
        concat!(
            r#"<td class="{m}" colspan="{c}">"#,
            r#"<table class="{m}">"#,
            r#"<thead class="{m}">{h}</thead>"#,
            r#"<tbody class="{m}">{b}</tbody>"#,
            "</table></td>"
        ),
        m = marker,
        c = cols,
        h = header,
        b = body,
    );
    doc.set_content(node, &wrapper);
    doc.set_attr(node, &config.state_attr, "expanded");
    Ok(())
}

/// Inner markup of the first `section` tag, byte-exact.
///
/// The wrapper is our own construction, so a scan for the opening and
/// closing tags restores the captured header without re-serialization.
fn section_inner(content: &str, section: &str) -> Option<String> {
    let open_at = content.find(&format!("<{section}"))?;
    let inner_at = open_at + content[open_at..].find('>')? + 1;
    let close_at = inner_at + content[inner_at..].find(&format!("</{section}>"))?;
    Some(content[inner_at..close_at].to_string())
}

/// Number of cells in the header row (for the wrapper colspan).
fn count_cells(header: &str) -> usize {
    let Ok(dom) = tl::parse(header, tl::ParserOptions::default()) else {
        return 0;
    };
    dom.nodes()
        .iter()
        .filter(|node| {
            node.as_tag()
                .is_some_and(|tag| tag.name().as_utf8_str().eq_ignore_ascii_case("td"))
        })
        .count()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MemDocument, MemNode};

    const HEADER: &str = "<td>alpha</td><td>beta</td>";
    const BODY: &str = "<tr><td>child</td></tr>";

    fn row(id: &str) -> (MemDocument, NodeId) {
        let mut doc = MemDocument::new();
        let node = doc.push(MemNode {
            name: Some(id.to_string()),
            id: Some(id.to_string()),
            content: HEADER.to_string(),
            ..Default::default()
        });
        (doc, node)
    }

    #[test]
    fn test_toggle_transitions() {
        let (mut doc, node) = row("row1");
        let config = TreeConfig::default();

        // Unset -> Collapsed, should post
        assert_eq!(toggle(&mut doc, node, &config), ToggleOutcome::Post);
        assert_eq!(state_of(&doc, node, &config), ExpandState::Collapsed);

        // Collapsed -> Collapsed, should post
        assert_eq!(toggle(&mut doc, node, &config), ToggleOutcome::Post);
        assert_eq!(state_of(&doc, node, &config), ExpandState::Collapsed);

        // Expanded -> Collapsed, local only
        insert(&mut doc, "row1", BODY, &config).unwrap();
        assert_eq!(state_of(&doc, node, &config), ExpandState::Expanded);
        assert_eq!(toggle(&mut doc, node, &config), ToggleOutcome::NoPost);
        assert_eq!(state_of(&doc, node, &config), ExpandState::Collapsed);
    }

    #[test]
    fn test_insert_wraps_header_and_body() {
        let (mut doc, node) = row("row1");
        let config = TreeConfig::default();

        insert(&mut doc, "row1", BODY, &config).unwrap();
        let content = doc.content(node);
        assert!(content.starts_with(r#"<td class="tree-node" colspan="2">"#));
        assert!(content.contains(&format!(r#"<thead class="tree-node">{HEADER}</thead>"#)));
        assert!(content.contains(&format!(r#"<tbody class="tree-node">{BODY}</tbody>"#)));
    }

    #[test]
    fn test_insert_toggle_toggle_roundtrip() {
        let (mut doc, node) = row("row1");
        let config = TreeConfig::default();

        insert(&mut doc, "row1", BODY, &config).unwrap();
        toggle(&mut doc, node, &config);
        toggle(&mut doc, node, &config);

        // Header restored byte-for-byte
        assert_eq!(doc.content(node), HEADER);
    }

    #[test]
    fn test_repeated_insert_replaces_after_collapse() {
        let (mut doc, node) = row("row1");
        let config = TreeConfig::default();

        insert(&mut doc, "row1", BODY, &config).unwrap();
        insert(&mut doc, "row1", "<tr><td>other</td></tr>", &config).unwrap();

        // Exactly one level of wrapping: the second insert collapsed
        // first, so the captured header is still the original cells
        let content = doc.content(node);
        assert_eq!(content.matches("<thead").count(), 1);
        assert!(content.contains(&format!(r#"<thead class="tree-node">{HEADER}</thead>"#)));
        assert!(content.contains("other"));
    }

    #[test]
    fn test_nested_row_expands_after_insert() {
        let (mut doc, _) = row("row1");
        let config = TreeConfig::default();

        insert(
            &mut doc,
            "row1",
            r#"<tr id="child1" name="child1" class="tree-node"><td>leaf</td></tr>"#,
            &config,
        )
        .unwrap();

        // The delivered body's own rows are addressable for the next level
        let child = doc.find_by_id("child1").expect("nested row not lifted");
        assert_eq!(doc.content(child), "<td>leaf</td>");

        insert(&mut doc, "child1", "<tr><td>grandchild</td></tr>", &config).unwrap();
        assert!(doc.content(child).contains("grandchild"));
        assert_eq!(state_of(&doc, child, &config), ExpandState::Expanded);
    }

    #[test]
    fn test_root_placeholder_never_wraps() {
        let (mut doc, node) = row("tree-root");
        let config = TreeConfig::default();

        insert(&mut doc, "tree-root", BODY, &config).unwrap();
        assert_eq!(doc.content(node), BODY);
        assert_eq!(state_of(&doc, node, &config), ExpandState::Unset);
    }

    #[test]
    fn test_insert_unknown_target() {
        let (mut doc, _) = row("row1");
        let config = TreeConfig::default();
        assert_eq!(
            insert(&mut doc, "ghost", BODY, &config),
            Err(TreeError::UnknownTarget("ghost".to_string()))
        );
    }
}
