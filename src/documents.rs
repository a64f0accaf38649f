//! XML document handling
//!
//! Thin helpers over `roxmltree`: parsing with limits and positioned errors,
//! text extraction and element paths for error reporting.

use roxmltree::{Document, Node};

use crate::error::{ParseError, Result};
use crate::limits::Limits;

/// Parse an XML document, checking size and depth limits
pub fn parse_document<'input>(xml: &'input str, limits: &Limits) -> Result<Document<'input>> {
    limits.check_xml_size(xml.len())?;

    let doc = Document::parse(xml).map_err(ParseError::from)?;
    check_depth(doc.root_element(), limits)?;

    Ok(doc)
}

/// Parse an XML document, naming it in parse errors
pub fn parse_named_document<'input>(
    name: &str,
    xml: &'input str,
    limits: &Limits,
) -> Result<Document<'input>> {
    limits.check_xml_size(xml.len())?;

    let doc = Document::parse(xml)
        .map_err(|e| ParseError::from(e).with_source_name(name))?;
    check_depth(doc.root_element(), limits)?;

    Ok(doc)
}

fn check_depth(root: Node<'_, '_>, limits: &Limits) -> Result<()> {
    let mut stack = vec![(root, 1usize)];
    while let Some((node, depth)) = stack.pop() {
        limits.check_xml_depth(depth)?;
        stack.extend(node.children().filter(Node::is_element).map(|c| (c, depth + 1)));
    }
    Ok(())
}

/// 1-based (line, column) of a node's start tag
pub fn position(doc: &Document<'_>, node: Node<'_, '_>) -> (u32, u32) {
    let pos = doc.text_pos_at(node.range().start);
    (pos.row, pos.col)
}

/// Concatenation of the node's direct text children
///
/// Comments and processing instructions split text nodes; the pieces are
/// joined so `<a>x<!-- c -->y</a>` reads as `xy`.
pub fn direct_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|c| c.text())
        .collect()
}

/// Whether the node has any element children
pub fn has_element_children(node: Node<'_, '_>) -> bool {
    node.children().any(|c| c.is_element())
}

/// Namespace-stripped absolute path of an element, e.g. `/enviNFe/NFe/infNFe`
pub fn element_path(node: Node<'_, '_>) -> String {
    let mut parts: Vec<&str> = node
        .ancestors()
        .filter(Node::is_element)
        .map(|n| n.tag_name().name())
        .collect();
    parts.reverse();

    let mut path = String::new();
    for part in parts {
        path.push('/');
        path.push_str(part);
    }
    path
}
