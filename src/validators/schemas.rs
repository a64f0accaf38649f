//! Schema bundles
//!
//! A [`SchemaBundle`] is a compiled multi-document schema: the primary XSD
//! and everything it includes or imports. It is built once and then shared;
//! validation only reads it.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use roxmltree::Document;
use tracing::debug;

use crate::documents::parse_named_document;
use crate::error::Result;
use crate::limits::Limits;
use crate::loaders::{reference_basename, SchemaResolver, SchemaSources};
use crate::namespaces::QName;

use super::attributes::AttributeDecl;
use super::base::{ComponentLookup, TypeDef};
use super::builders::compile_schema;
use super::document_validation::DocumentValidator;
use super::elements::ElementDecl;
use super::exceptions::ValidationReport;
use super::parsing::load_schema_documents;

/// A compiled schema set, ready to validate documents
#[derive(Debug, Clone)]
pub struct SchemaBundle {
    primary: String,
    target_namespace: Option<String>,
    documents: Vec<String>,
    elements: IndexMap<QName, Arc<ElementDecl>>,
    attributes: IndexMap<QName, Arc<AttributeDecl>>,
    types: IndexMap<QName, Arc<TypeDef>>,
    limits: Limits,
}

impl SchemaBundle {
    /// Assemble a bundle with default limits
    ///
    /// `primary_name` names the primary document in messages; every
    /// `schemaLocation` is looked up in `resolver` by basename.
    pub fn build<R: SchemaResolver + ?Sized>(
        primary_name: &str,
        primary_content: &str,
        resolver: &R,
    ) -> Result<Self> {
        Self::build_with_limits(primary_name, primary_content, resolver, Limits::default())
    }

    /// Assemble a bundle with explicit limits
    pub fn build_with_limits<R: SchemaResolver + ?Sized>(
        primary_name: &str,
        primary_content: &str,
        resolver: &R,
        limits: Limits,
    ) -> Result<Self> {
        let documents = load_schema_documents(primary_name, primary_content, resolver, &limits)?;
        let compiled = compile_schema(&documents, &limits)?;

        let target_namespace = roxmltree::Document::parse(primary_content)
            .ok()
            .and_then(|doc| doc.root_element().attribute("targetNamespace").map(str::to_string));

        let bundle = Self {
            primary: reference_basename(primary_name).to_string(),
            target_namespace,
            documents: documents.into_iter().map(|d| d.name).collect(),
            elements: compiled.elements,
            attributes: compiled.attributes,
            types: compiled.types,
            limits,
        };

        debug!(
            primary = %bundle.primary,
            documents = bundle.documents.len(),
            elements = bundle.elements.len(),
            "schema bundle assembled"
        );

        Ok(bundle)
    }

    /// Load the primary schema from a file, resolving references in `schema_dir`
    ///
    /// Without `schema_dir` the primary's own directory is used.
    pub fn from_file(
        primary: impl AsRef<Path>,
        schema_dir: Option<&Path>,
        limits: Limits,
    ) -> Result<Self> {
        let primary = primary.as_ref();
        let content = fs::read_to_string(primary)?;

        let dir = match schema_dir {
            Some(dir) => dir.to_path_buf(),
            None => primary
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| Path::new(".").to_path_buf()),
        };
        let sources = SchemaSources::from_dir(&dir, &limits)?;

        let name = primary
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("schema.xsd");
        Self::build_with_limits(name, &content, &sources, limits)
    }

    /// Basename of the primary schema
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Target namespace of the primary schema
    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Names of every loaded schema document, primary first
    pub fn document_names(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(String::as_str)
    }

    /// Global element declaration
    pub fn element(&self, name: &QName) -> Option<&Arc<ElementDecl>> {
        self.elements.get(name)
    }

    /// Names of the global elements, in declaration order
    pub fn element_names(&self) -> impl Iterator<Item = &QName> {
        self.elements.keys()
    }

    /// Limits used for validation
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Validate an already parsed document
    pub fn validate_document(&self, doc: &Document<'_>) -> ValidationReport {
        let report = DocumentValidator::new(self, doc, self.limits.max_validation_errors).run();
        debug!(
            valid = report.valid,
            errors = report.errors.len(),
            "document validated"
        );
        report
    }

    /// Parse and validate a document
    ///
    /// Malformed XML is an `Err`; schema violations are reported.
    pub fn validate_str(&self, xml: &str) -> Result<ValidationReport> {
        let doc = parse_named_document("document", xml, &self.limits)?;
        Ok(self.validate_document(&doc))
    }

    /// Whether the document is valid
    pub fn is_valid_str(&self, xml: &str) -> Result<bool> {
        self.validate_str(xml).map(|report| report.valid)
    }
}

impl ComponentLookup for SchemaBundle {
    fn global_element(&self, name: &QName) -> Option<&Arc<ElementDecl>> {
        self.elements.get(name)
    }

    fn global_attribute(&self, name: &QName) -> Option<&Arc<AttributeDecl>> {
        self.attributes.get(name)
    }

    fn type_definition(&self, name: &QName) -> Option<&TypeDef> {
        self.types.get(name).map(|def| def.as_ref())
    }
}

/// Assemble a schema bundle with default limits
pub fn build_schema<R: SchemaResolver + ?Sized>(
    primary_name: &str,
    primary_content: &str,
    resolver: &R,
) -> Result<SchemaBundle> {
    SchemaBundle::build(primary_name, primary_content, resolver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::validators::exceptions::ErrorKind;

    const PAG: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            xmlns="urn:pag" targetNamespace="urn:pag" elementFormDefault="qualified">
          <xs:include schemaLocation="tipos.xsd"/>
          <xs:element name="pag">
            <xs:complexType><xs:sequence>
              <xs:element name="tPag" type="TPag"/>
              <xs:element name="vPag" type="xs:decimal"/>
            </xs:sequence></xs:complexType>
          </xs:element>
        </xs:schema>"#;

    const TIPOS: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            xmlns="urn:pag" targetNamespace="urn:pag">
          <xs:simpleType name="TPag"><xs:restriction base="xs:string">
            <xs:pattern value="[0-9]{2}"/>
          </xs:restriction></xs:simpleType>
        </xs:schema>"#;

    fn bundle() -> SchemaBundle {
        let sources = SchemaSources::new().with("tipos.xsd", TIPOS);
        SchemaBundle::build("pag.xsd", PAG, &sources).unwrap()
    }

    #[test]
    fn test_bundle_metadata() {
        let bundle = bundle();
        assert_eq!(bundle.primary(), "pag.xsd");
        assert_eq!(bundle.target_namespace(), Some("urn:pag"));
        assert_eq!(bundle.document_names().collect::<Vec<_>>(), vec!["pag.xsd", "tipos.xsd"]);
        assert!(bundle.element(&QName::namespaced("urn:pag", "pag")).is_some());
    }

    #[test]
    fn test_validate_str() {
        let bundle = bundle();
        assert!(bundle
            .is_valid_str(r#"<pag xmlns="urn:pag"><tPag>01</tPag><vPag>10.00</vPag></pag>"#)
            .unwrap());

        let report = bundle
            .validate_str(r#"<pag xmlns="urn:pag"><tPag>1</tPag><vPag>10.00</vPag></pag>"#)
            .unwrap();
        assert!(!report.valid);
        assert_eq!(report.errors[0].kind, ErrorKind::InvalidValue);
        assert_eq!(report.errors[0].path, "/pag/tPag");
    }

    #[test]
    fn test_malformed_candidate_is_an_error() {
        assert!(matches!(bundle().validate_str("<pag><tPag>"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_bundle_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaBundle>();
    }
}
