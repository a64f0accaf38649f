//! Element order listing
//!
//! The flattened diff is blind to sibling order, but `xs:sequence` is not.
//! An outline lists every element in document order, empty ones included.

use roxmltree::{Document, Node};
use serde::Serialize;

use crate::documents::direct_text;

/// One element of a document outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineEntry {
    /// Nesting depth, 0 for the root
    pub depth: usize,
    /// Namespace-stripped tag
    pub tag: String,
    /// Non-namespaced attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Trimmed direct text, if any
    pub text: Option<String>,
}

impl std::fmt::Display for OutlineEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", "  ".repeat(self.depth), self.tag)?;
        if !self.attributes.is_empty() {
            let attrs: Vec<String> = self
                .attributes
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, v))
                .collect();
            write!(f, " [{}]", attrs.join(" "))?;
        }
        if let Some(ref text) = self.text {
            write!(f, " = {}", text)?;
        }
        Ok(())
    }
}

/// Outline of a parsed document in document order
pub fn outline(doc: &Document<'_>) -> Vec<OutlineEntry> {
    doc.root_element()
        .descendants()
        .filter(Node::is_element)
        .map(|node| {
            // ancestors() starts at the node itself
            let depth = node.ancestors().filter(Node::is_element).count() - 1;
            entry(node, depth)
        })
        .collect()
}

fn entry(node: Node<'_, '_>, depth: usize) -> OutlineEntry {
    let text = direct_text(node);
    let text = text.trim();

    OutlineEntry {
        depth,
        tag: node.tag_name().name().to_string(),
        attributes: node
            .attributes()
            .filter(|a| a.namespace().is_none())
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect(),
        text: (!text.is_empty()).then(|| text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_order_and_depth() {
        let doc = Document::parse(
            r#"<det nItem="1"><prod><cProd>001</cProd><cEAN/></prod><imposto/></det>"#,
        )
        .unwrap();

        let lines: Vec<String> = outline(&doc).iter().map(|e| e.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "det [nItem=\"1\"]",
                "  prod",
                "    cProd = 001",
                "    cEAN",
                "  imposto",
            ]
        );
    }
}
