//! Initial document snapshot from an HTML file.
//!
//! The reference environment hands the sync layer a browser-parsed
//! document; here we parse an HTML file with `tl` and lift every element
//! carrying a `name` or `id` attribute into the [`MemDocument`] node
//! table. Anything else is plain markup and stays inside node content.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{Document, MemDocument, MemNode};

/// Form-like tags whose `value` attribute seeds a live property.
const FORM_TAGS: [&str; 3] = ["input", "textarea", "select"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("HTML parsing error: {0}")]
    Parse(String),
}

/// Load a document snapshot from an HTML file.
///
/// `file_attr` names the attribute that attaches local files to a node
/// (the headless stand-in for a browser file selection), e.g.
/// `data-file="a.bin;b.bin"`.
pub fn from_file(path: &Path, file_attr: &str) -> Result<MemDocument, LoadError> {
    let html = std::fs::read_to_string(path).map_err(|e| LoadError::Io(path.to_path_buf(), e))?;
    from_str(&html, file_attr)
}

/// Load a document snapshot from an HTML string.
pub fn from_str(html: &str, file_attr: &str) -> Result<MemDocument, LoadError> {
    let dom = tl::parse(html, tl::ParserOptions::default())
        .map_err(|e| LoadError::Parse(e.to_string()))?;
    let parser = dom.parser();

    let mut doc = MemDocument::new();
    doc.file_attr = file_attr.to_string();
    for handle in dom.children() {
        collect(*handle, parser, file_attr, &mut doc);
    }
    Ok(doc)
}

/// Lift addressable elements out of freshly written markup.
///
/// A content write behaves like an innerHTML assignment: elements inside
/// the new markup become addressable, so a tree body delivered by the
/// peer can itself contain expandable rows. An element whose id is
/// already in the table refreshes that entry in place, keeping existing
/// handles valid.
pub(crate) fn absorb(doc: &mut MemDocument, markup: &str) {
    let Ok(dom) = tl::parse(markup, tl::ParserOptions::default()) else {
        return;
    };
    let parser = dom.parser();
    let file_attr = doc.file_attr.clone();
    for handle in dom.children() {
        collect(*handle, parser, &file_attr, doc);
    }
}

/// Walk one tl node, lifting addressable elements into the node table.
fn collect(handle: tl::NodeHandle, parser: &tl::Parser, file_attr: &str, doc: &mut MemDocument) {
    let Some(tl::Node::Tag(tag)) = handle.get(parser) else {
        return;
    };

    let mut node = MemNode::default();
    for (key, value) in tag.attributes().iter() {
        let key: &str = key.as_ref();
        let value = value.map(|v| v.to_string()).unwrap_or_default();
        match key {
            "name" => node.name = Some(value),
            "id" => node.id = Some(value),
            "style" => parse_style(&value, &mut node),
            _ if key == file_attr => {
                node.files = value
                    .split(';')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
                    .collect();
                node.attrs.insert(key.to_string(), value);
            }
            _ => {
                node.attrs.insert(key.to_string(), value);
            }
        }
    }

    // Only elements the protocol can address become nodes
    if node.name.is_some() || node.id.is_some() {
        let tag_name = tag.name().as_utf8_str().to_lowercase();
        node.content = tag.inner_html(parser).to_string();
        if FORM_TAGS.contains(&tag_name.as_str())
            && let Some(value) = node.attrs.get("value")
        {
            node.props.insert("value".to_string(), value.clone());
        }
        match node.id.as_deref().and_then(|id| doc.find_by_id(id)) {
            // Rewritten element, same id: refresh in place
            Some(existing) => doc.nodes[existing] = node,
            None => {
                doc.push(node);
            }
        }
    }

    for child in tag.children().top().iter() {
        collect(*child, parser, file_attr, doc);
    }
}

/// Split an inline `style` attribute into the style map.
fn parse_style(style: &str, node: &mut MemNode) {
    for decl in style.split(';') {
        if let Some((prop, value)) = decl.split_once(':') {
            let prop = prop.trim();
            if !prop.is_empty() {
                node.styles.insert(prop.to_string(), value.trim().to_string());
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div name="status" class="banner">idle</div>
          <input name="field1" value="7">
          <tr id="row1" name="row1" class="tree-node"><td>alpha</td><td>beta</td></tr>
          <input name="picker" data-file="a.bin; b.bin">
          <span style="color: red; display:none">styled</span>
          <p>unaddressed markup</p>
        </body></html>
    "#;

    #[test]
    fn test_lifts_named_and_identified_elements() {
        let doc = from_str(PAGE, "data-file").unwrap();

        let status = doc.find_by_name("status").unwrap();
        assert_eq!(doc.attr(status, "class"), Some("banner"));
        assert_eq!(doc.content(status), "idle");

        let row = doc.find_by_id("row1").unwrap();
        assert_eq!(doc.content(row), "<td>alpha</td><td>beta</td>");

        // The bare <span> and <p> carry no name/id and stay out of the table
        assert_eq!(doc.find_by_name("styled"), None);
    }

    #[test]
    fn test_form_value_becomes_live_property() {
        let doc = from_str(PAGE, "data-file").unwrap();
        let field = doc.find_by_name("field1").unwrap();
        assert_eq!(doc.property(field, "value").as_deref(), Some("7"));
    }

    #[test]
    fn test_file_attribute_attaches_files() {
        let doc = from_str(PAGE, "data-file").unwrap();
        let picker = doc.find_by_name("picker").unwrap();
        let files = doc.files(picker);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0], PathBuf::from("a.bin"));
        assert_eq!(files[1], PathBuf::from("b.bin"));
    }

    #[test]
    fn test_style_attribute_parsed() {
        // Give the span a name so it is addressable
        let doc = from_str(
            &PAGE.replace("<span ", "<span name=\"styled\" "),
            "data-file",
        )
        .unwrap();
        let span = doc.find_by_name("styled").unwrap();
        assert_eq!(doc.style(span, "color"), Some("red"));
        assert_eq!(doc.style(span, "display"), Some("none"));
    }
}
