//! Path-indexed flattening of XML documents
//!
//! Every element contributes its trimmed text under its path and each
//! non-namespaced attribute under `path@name`. Tag names are compared without
//! their namespace.
//!
//! A child whose tag occurs once among its siblings is addressed directly
//! below its parent (`infNFe/ide/cUF`). Repeated tags get an indexed segment
//! in front of their own tag, so the second `det` of an `infNFe` lives at
//! `infNFe/det[1]/det/...`.
//!
//! An element's text is all of its direct text nodes joined, so in mixed
//! content `<a>x<b/>y</a>` the value of `a` is `xy`. Tools that only read
//! the text before the first child would report `x`. NF-e payloads carry no
//! mixed content, so the two agree on real invoices.

use std::collections::{BTreeMap, HashMap};

use roxmltree::{Document, Node};
use serde::Serialize;

use crate::documents::{direct_text, parse_document};
use crate::error::Result;
use crate::limits::Limits;

/// Flattened view of a document: path key to trimmed value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlatDocument {
    entries: BTreeMap<String, String>,
}

impl FlatDocument {
    /// Create an empty flattened document
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in lexicographic order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in lexicographic key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consume into the underlying map
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.entries
    }
}

impl From<BTreeMap<String, String>> for FlatDocument {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatDocument {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Flatten a parsed document
pub fn flatten(doc: &Document<'_>) -> FlatDocument {
    let mut entries = BTreeMap::new();
    flatten_element(doc.root_element(), "", &mut entries);
    FlatDocument { entries }
}

/// Parse and flatten an XML string
pub fn flatten_str(xml: &str, limits: &Limits) -> Result<FlatDocument> {
    let doc = parse_document(xml, limits)?;
    Ok(flatten(&doc))
}

fn flatten_element(node: Node<'_, '_>, base: &str, entries: &mut BTreeMap<String, String>) {
    let tag = node.tag_name().name();
    let path = if base.is_empty() {
        tag.to_string()
    } else {
        format!("{}/{}", base, tag)
    };

    for attr in node.attributes().filter(|a| a.namespace().is_none()) {
        entries.insert(format!("{}@{}", path, attr.name()), attr.value().to_string());
    }

    let text = direct_text(node);
    let text = text.trim();
    if !text.is_empty() {
        entries.insert(path.clone(), text.to_string());
    }

    let children: Vec<Node<'_, '_>> = node.children().filter(Node::is_element).collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for child in &children {
        *counts.entry(child.tag_name().name()).or_insert(0) += 1;
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for child in children {
        let child_tag = child.tag_name().name();
        let index = seen.entry(child_tag).or_insert(0);

        if counts[child_tag] > 1 {
            let indexed = format!("{}/{}[{}]", path, child_tag, index);
            flatten_element(child, &indexed, entries);
        } else {
            flatten_element(child, &path, entries);
        }

        *index += 1;
    }
}
