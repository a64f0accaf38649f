//! Schema resource resolution
//!
//! Schema documents are never fetched by the core. Callers hand over a
//! [`SchemaResolver`] that maps reference names to content; every
//! `schemaLocation` is reduced to its basename before lookup, so a flat
//! collection keyed by file name serves the usual same-directory schema sets.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use tracing::debug;
use url::Url;

use crate::error::Result;
use crate::limits::Limits;

/// Maps schema reference names to schema content
pub trait SchemaResolver {
    /// Content registered under `name`, if any
    fn resolve(&self, name: &str) -> Option<Cow<'_, str>>;
}

impl SchemaResolver for HashMap<String, String> {
    fn resolve(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|s| Cow::Borrowed(s.as_str()))
    }
}

impl SchemaResolver for BTreeMap<String, String> {
    fn resolve(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|s| Cow::Borrowed(s.as_str()))
    }
}

impl<R: SchemaResolver + ?Sized> SchemaResolver for &R {
    fn resolve(&self, name: &str) -> Option<Cow<'_, str>> {
        (**self).resolve(name)
    }
}

/// In-memory schema set keyed by basename
#[derive(Debug, Clone, Default)]
pub struct SchemaSources {
    documents: BTreeMap<String, String>,
}

impl SchemaSources {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document; the key is reduced to its basename
    pub fn insert(&mut self, name: impl AsRef<str>, content: impl Into<String>) -> &mut Self {
        self.documents
            .insert(reference_basename(name.as_ref()).to_string(), content.into());
        self
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl AsRef<str>, content: impl Into<String>) -> Self {
        self.insert(name, content);
        self
    }

    /// Load every `*.xsd` file of a directory (not recursive)
    pub fn from_dir(dir: impl AsRef<Path>, limits: &Limits) -> Result<Self> {
        let dir = dir.as_ref();
        let mut sources = Self::new();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_xsd = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("xsd"))
                .unwrap_or(false);
            if !path.is_file() || !is_xsd {
                continue;
            }

            let content = fs::read_to_string(&path)?;
            limits.check_xml_size(content.len())?;

            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                debug!(schema = name, bytes = content.len(), "loaded schema file");
                sources.insert(name, content);
            }
        }

        Ok(sources)
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Registered names in lexicographic order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }
}

impl SchemaResolver for SchemaSources {
    fn resolve(&self, name: &str) -> Option<Cow<'_, str>> {
        self.documents
            .get(reference_basename(name))
            .map(|s| Cow::Borrowed(s.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for SchemaSources {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut sources = Self::new();
        for (name, content) in iter {
            sources.insert(name, content);
        }
        sources
    }
}

/// Reduce a `schemaLocation` (URL or path) to its basename
///
/// `http://www.w3.org/TR/xmldsig-core/xmldsig-core-schema.xsd` and
/// `../schemas/tiposBasico_v4.00.xsd` become `xmldsig-core-schema.xsd` and
/// `tiposBasico_v4.00.xsd`.
pub fn reference_basename(location: &str) -> &str {
    let trimmed = location.trim();

    let without_query = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or(trimmed);

    without_query
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(without_query)
}

/// Whether a `schemaLocation` is an absolute URL (anything but `file:`)
pub fn is_remote_location(location: &str) -> bool {
    match Url::parse(location.trim()) {
        Ok(url) => url.scheme() != "file" && url.scheme().len() > 1,
        Err(_) => false,
    }
}
