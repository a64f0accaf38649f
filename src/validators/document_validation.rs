//! Instance document validation
//!
//! Walks a parsed document against the compiled components and collects
//! located errors in document order. Messages follow libxml2's wording so
//! reports can be compared with the tax authority's rejections.

use roxmltree::{Document, Node};

use crate::documents::{direct_text, element_path, has_element_children, position};
use crate::namespaces::{split_prefixed, QName, XSI_NAMESPACE};

use super::base::{ComponentLookup, TypeDef, TypeRef};
use super::complex_types::{ComplexType, ContentModel};
use super::elements::ElementDecl;
use super::exceptions::{ErrorKind, ValidationError, ValidationReport};
use super::models::{expected_clause, ContentMatcher, Matched};
use super::particles::Particle;
use super::simple_types::{resolve_simple, SimpleType};
use super::wildcards::{ProcessContents, Wildcard};

/// Validator for one document against one set of components
pub struct DocumentValidator<'s, 'd, 'input> {
    lookup: &'s dyn ComponentLookup,
    doc: &'d Document<'input>,
    errors: Vec<ValidationError>,
    max_errors: usize,
}

impl<'s, 'd, 'input> DocumentValidator<'s, 'd, 'input> {
    /// Create a validator that stops after `max_errors` errors
    pub fn new(
        lookup: &'s dyn ComponentLookup,
        doc: &'d Document<'input>,
        max_errors: usize,
    ) -> Self {
        Self {
            lookup,
            doc,
            errors: Vec::new(),
            max_errors: max_errors.max(1),
        }
    }

    /// Validate from the root element
    pub fn run(mut self) -> ValidationReport {
        let lookup = self.lookup;
        let root = self.doc.root_element();
        let name = QName::of_node(root);

        match lookup.global_element(&name) {
            Some(decl) => self.element(root, decl),
            None => self.report(
                root,
                ErrorKind::UnknownRoot,
                format!(
                    "Element '{}': No matching global declaration available for the validation root.",
                    name
                ),
            ),
        }

        ValidationReport::from_errors(self.errors)
    }

    fn is_full(&self) -> bool {
        self.errors.len() >= self.max_errors
    }

    fn report(&mut self, node: Node<'_, '_>, kind: ErrorKind, message: String) {
        if self.is_full() {
            return;
        }
        let (line, column) = position(self.doc, node);
        self.errors.push(
            ValidationError::new(kind, message)
                .at(line, column)
                .with_path(element_path(node)),
        );
    }

    fn element(&mut self, node: Node<'_, '_>, decl: &'s ElementDecl) {
        if self.is_full() {
            return;
        }
        let name = QName::of_node(node);

        if decl.is_abstract {
            self.report(
                node,
                ErrorKind::UnexpectedElement,
                format!("Element '{}': The element declaration is abstract.", name),
            );
            return;
        }

        let Some(type_def) = self.instance_type(node, &name, decl) else {
            return;
        };

        if let Some(nil) = node.attribute((XSI_NAMESPACE, "nil")) {
            if matches!(nil.trim(), "true" | "1") {
                self.nilled(node, &name, decl, type_def);
                return;
            }
        }

        match type_def {
            TypeDef::Simple(st) => self.simple_element(node, &name, decl, st),
            TypeDef::Complex(ct) => self.complex_element(node, &name, decl, ct),
        }
    }

    /// Declared type, or the one named by `xsi:type`
    fn instance_type(
        &mut self,
        node: Node<'_, '_>,
        name: &QName,
        decl: &'s ElementDecl,
    ) -> Option<&'s TypeDef> {
        let lookup = self.lookup;

        if let Some(value) = node.attribute((XSI_NAMESPACE, "type")) {
            let (prefix, local) = split_prefixed(value.trim());
            let namespace = match prefix {
                Some(prefix) => node.lookup_namespace_uri(Some(prefix)),
                None => node.lookup_namespace_uri(None).filter(|ns| !ns.is_empty()),
            };
            let resolved = match (prefix, namespace) {
                (Some(_), None) => None,
                _ => lookup.type_definition(&QName::new(namespace, local)),
            };
            if resolved.is_none() {
                self.report(
                    node,
                    ErrorKind::UnknownType,
                    format!(
                        "Element '{}', attribute 'xsi:type': The QName value '{}' of the xsi type attribute does not resolve to a type definition.",
                        name, value
                    ),
                );
            }
            return resolved;
        }

        let resolved = decl.type_ref.resolve(lookup);
        if resolved.is_none() {
            self.report(
                node,
                ErrorKind::UnknownType,
                format!(
                    "Element '{}': The type definition '{}' is not available.",
                    name,
                    decl.type_ref.display_name()
                ),
            );
        }
        resolved
    }

    fn nilled(
        &mut self,
        node: Node<'_, '_>,
        name: &QName,
        decl: &ElementDecl,
        type_def: &'s TypeDef,
    ) {
        if !decl.nillable {
            self.report(
                node,
                ErrorKind::Nil,
                format!("Element '{}': The element is not 'nillable'.", name),
            );
            return;
        }

        if has_element_children(node) || !direct_text(node).trim().is_empty() {
            self.report(
                node,
                ErrorKind::Nil,
                format!(
                    "Element '{}': The element cannot have character or element children, since it is nilled.",
                    name
                ),
            );
        }

        if let TypeDef::Complex(ct) = type_def {
            self.attributes(node, name, ct);
        }
    }

    fn simple_element(
        &mut self,
        node: Node<'_, '_>,
        name: &QName,
        decl: &ElementDecl,
        st: &'s SimpleType,
    ) {
        for attr in node.attributes() {
            if attr.namespace() == Some(XSI_NAMESPACE) {
                continue;
            }
            let attr_name = QName::new(attr.namespace(), attr.name());
            self.report(
                node,
                ErrorKind::UnknownAttribute,
                format!(
                    "Element '{}', attribute '{}': The attribute '{}' is not allowed.",
                    name, attr_name, attr_name
                ),
            );
        }

        if has_element_children(node) {
            self.report(
                node,
                ErrorKind::UnexpectedChildren,
                format!(
                    "Element '{}': Element content is not allowed, because the type definition is simple.",
                    name
                ),
            );
            return;
        }

        self.simple_value(node, name, decl, st);
    }

    /// Check the character data of an element against its simple type
    fn simple_value(
        &mut self,
        node: Node<'_, '_>,
        name: &QName,
        decl: &ElementDecl,
        st: &'s SimpleType,
    ) {
        let text = direct_text(node);
        let value = match (&decl.fixed, &decl.default) {
            _ if !text.is_empty() => text.as_str(),
            (Some(fixed), _) => fixed.as_str(),
            (None, Some(default)) => default.as_str(),
            (None, None) => "",
        };

        match st.validate(value, self.lookup) {
            Ok(normalized) => {
                if let Some(fixed) = &decl.fixed {
                    let expected = st.white_space(self.lookup).normalize(fixed);
                    if normalized != expected {
                        self.report(
                            node,
                            ErrorKind::FixedValue,
                            format!(
                                "Element '{}': The value '{}' does not match the fixed value constraint '{}'.",
                                name, normalized, fixed
                            ),
                        );
                    }
                }
            }
            Err(detail) => self.report(
                node,
                ErrorKind::InvalidValue,
                format!("Element '{}': {}", name, detail),
            ),
        }
    }

    fn complex_element(
        &mut self,
        node: Node<'_, '_>,
        name: &QName,
        decl: &ElementDecl,
        ct: &'s ComplexType,
    ) {
        if ct.is_abstract {
            self.report(
                node,
                ErrorKind::UnknownType,
                format!(
                    "Element '{}': The type definition '{}' is abstract.",
                    name,
                    ct.display_name()
                ),
            );
            return;
        }

        self.attributes(node, name, ct);

        match &ct.content {
            ContentModel::Empty => {
                if has_element_children(node) {
                    self.report(
                        node,
                        ErrorKind::UnexpectedChildren,
                        format!(
                            "Element '{}': Element content is not allowed, because the content type is empty.",
                            name
                        ),
                    );
                } else if !direct_text(node).trim().is_empty() {
                    self.report(
                        node,
                        ErrorKind::UnexpectedText,
                        format!(
                            "Element '{}': Character content is not allowed, because the content type is empty.",
                            name
                        ),
                    );
                }
            }
            ContentModel::Simple(type_ref) => {
                if has_element_children(node) {
                    self.report(
                        node,
                        ErrorKind::UnexpectedChildren,
                        format!(
                            "Element '{}': Element content is not allowed, because the content type is a simple type definition.",
                            name
                        ),
                    );
                    return;
                }
                match resolve_simple(type_ref, self.lookup) {
                    Some(st) => self.simple_value(node, name, decl, st),
                    None => self.report(
                        node,
                        ErrorKind::UnknownType,
                        format!(
                            "Element '{}': The type definition '{}' is not a simple type.",
                            name,
                            type_ref.display_name()
                        ),
                    ),
                }
            }
            ContentModel::Elements(particle) => {
                if !ct.mixed && !direct_text(node).trim().is_empty() {
                    self.report(
                        node,
                        ErrorKind::UnexpectedText,
                        format!(
                            "Element '{}': Character content other than whitespace is not allowed because the content type is 'element-only'.",
                            name
                        ),
                    );
                }
                self.children(node, name, particle);
            }
        }
    }

    fn children(&mut self, node: Node<'_, '_>, name: &QName, particle: &'s Particle) {
        let lookup = self.lookup;
        let mut matcher = ContentMatcher::new(particle, lookup);

        for child in node.children().filter(Node::is_element) {
            if self.is_full() {
                return;
            }
            let child_name = QName::of_node(child);
            match matcher.push(&child_name) {
                Ok(Matched::Element(decl)) => self.element(child, decl),
                Ok(Matched::Wildcard(wildcard)) => {
                    self.wildcard_element(child, wildcard.process_contents)
                }
                Err(expected) => {
                    // Content checking of this parent stops at the first stray child
                    self.report(
                        child,
                        ErrorKind::UnexpectedElement,
                        format!(
                            "Element '{}': This element is not expected.{}",
                            child_name,
                            expected_clause(&expected)
                        ),
                    );
                    return;
                }
            }
        }

        if let Err(expected) = matcher.finish() {
            self.report(
                node,
                ErrorKind::MissingElement,
                format!(
                    "Element '{}': Missing child element(s).{}",
                    name,
                    expected_clause(&expected)
                ),
            );
        }
    }

    fn wildcard_element(&mut self, node: Node<'_, '_>, process_contents: ProcessContents) {
        let name = QName::of_node(node);
        let lookup = self.lookup;

        match (process_contents, lookup.global_element(&name)) {
            (ProcessContents::Skip, _) => {}
            (_, Some(decl)) => self.element(node, decl),
            (ProcessContents::Lax, None) => {
                for child in node.children().filter(Node::is_element) {
                    self.wildcard_element(child, ProcessContents::Lax);
                }
            }
            (ProcessContents::Strict, None) => self.report(
                node,
                ErrorKind::UnexpectedElement,
                format!(
                    "Element '{}': No matching global element declaration available, but demanded by the strict wildcard.",
                    name
                ),
            ),
        }
    }

    fn attributes(&mut self, node: Node<'_, '_>, name: &QName, ct: &'s ComplexType) {
        for attr in node.attributes() {
            if attr.namespace() == Some(XSI_NAMESPACE) {
                continue;
            }
            let attr_name = QName::new(attr.namespace(), attr.name());

            if let Some(attr_use) = ct.attribute(&attr_name) {
                let (fixed, type_ref) = (attr_use.fixed(), &attr_use.decl.type_ref);
                self.attribute_value(node, name, &attr_name, attr.value(), fixed, type_ref);
                continue;
            }

            match &ct.any_attribute {
                Some(wildcard) if wildcard.matches(attr.namespace()) => {
                    self.wildcard_attribute(node, name, &attr_name, attr.value(), wildcard);
                }
                _ => self.report(
                    node,
                    ErrorKind::UnknownAttribute,
                    format!(
                        "Element '{}', attribute '{}': The attribute '{}' is not allowed.",
                        name, attr_name, attr_name
                    ),
                ),
            }
        }

        for attr_use in ct.attributes.iter().filter(|u| u.is_required()) {
            let wanted = attr_use.name();
            let present = node
                .attributes()
                .any(|a| a.namespace() == wanted.namespace() && a.name() == wanted.local_name);
            if !present {
                self.report(
                    node,
                    ErrorKind::MissingAttribute,
                    format!(
                        "Element '{}': The attribute '{}' is required but missing.",
                        name, wanted
                    ),
                );
            }
        }
    }

    fn wildcard_attribute(
        &mut self,
        node: Node<'_, '_>,
        name: &QName,
        attr_name: &QName,
        value: &str,
        wildcard: &Wildcard,
    ) {
        let lookup = self.lookup;

        match (wildcard.process_contents, lookup.global_attribute(attr_name)) {
            (ProcessContents::Skip, _) | (ProcessContents::Lax, None) => {}
            (_, Some(decl)) => {
                self.attribute_value(
                    node,
                    name,
                    attr_name,
                    value,
                    decl.fixed.as_deref(),
                    &decl.type_ref,
                )
            }
            (ProcessContents::Strict, None) => self.report(
                node,
                ErrorKind::UnknownAttribute,
                format!(
                    "Element '{}', attribute '{}': No matching global attribute declaration available, but demanded by the strict wildcard.",
                    name, attr_name
                ),
            ),
        }
    }

    fn attribute_value(
        &mut self,
        node: Node<'_, '_>,
        name: &QName,
        attr_name: &QName,
        value: &str,
        fixed: Option<&str>,
        type_ref: &TypeRef,
    ) {
        let Some(st) = resolve_simple(type_ref, self.lookup) else {
            return;
        };

        match st.validate(value, self.lookup) {
            Ok(normalized) => {
                if let Some(fixed) = fixed {
                    if normalized != st.white_space(self.lookup).normalize(fixed) {
                        self.report(
                            node,
                            ErrorKind::FixedValue,
                            format!(
                                "Element '{}', attribute '{}': The value '{}' does not match the fixed value constraint '{}'.",
                                name, attr_name, normalized, fixed
                            ),
                        );
                    }
                }
            }
            Err(detail) => self.report(
                node,
                ErrorKind::InvalidValue,
                format!("Element '{}', attribute '{}': {}", name, attr_name, detail),
            ),
        }
    }
}

/// Validate `doc` against `lookup`, collecting at most `max_errors` errors
pub fn validate_document(
    lookup: &dyn ComponentLookup,
    doc: &Document<'_>,
    max_errors: usize,
) -> ValidationReport {
    DocumentValidator::new(lookup, doc, max_errors).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::SchemaSources;
    use crate::validators::schemas::SchemaBundle;

    const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            xmlns="urn:t" targetNamespace="urn:t" elementFormDefault="qualified">
          <xs:element name="ide">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="cUF" type="xs:string" fixed="35"/>
                <xs:element name="mod" type="xs:string" minOccurs="0"/>
                <xs:element name="dhEmi" type="xs:dateTime" nillable="true"/>
                <xs:element name="obs" minOccurs="0">
                  <xs:complexType><xs:sequence>
                    <xs:any processContents="skip" maxOccurs="unbounded"/>
                  </xs:sequence></xs:complexType>
                </xs:element>
              </xs:sequence>
              <xs:attribute name="versao" type="xs:decimal" use="required"/>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#;

    fn validate(xml: &str) -> ValidationReport {
        let bundle = SchemaBundle::build("t.xsd", SCHEMA, &SchemaSources::new()).unwrap();
        bundle.validate_str(xml).unwrap()
    }

    #[test]
    fn test_valid_document() {
        let report = validate(
            r#"<ide xmlns="urn:t" versao="4.00"><cUF>35</cUF><dhEmi>2024-05-01T10:00:00-03:00</dhEmi>
                 <obs><anything xmlns="urn:other"><deep/></anything></obs></ide>"#,
        );
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn test_unknown_root() {
        let report = validate(r#"<nfeProc xmlns="urn:t"/>"#);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::UnknownRoot);
    }

    #[test]
    fn test_unexpected_element_stops_parent() {
        let report = validate(
            r#"<ide xmlns="urn:t" versao="4.00"><cUF>35</cUF><indPag>0</indPag><dhEmi>x</dhEmi></ide>"#,
        );
        assert_eq!(report.errors.len(), 1);
        let err = &report.errors[0];
        assert_eq!(err.kind, ErrorKind::UnexpectedElement);
        assert_eq!(
            err.message,
            "Element '{urn:t}indPag': This element is not expected. Expected is one of ( {urn:t}mod, {urn:t}dhEmi )."
        );
        assert_eq!(err.path, "/ide/indPag");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_missing_child_and_attribute() {
        let report = validate(r#"<ide xmlns="urn:t"><cUF>35</cUF></ide>"#);
        let kinds: Vec<ErrorKind> = report.errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::MissingAttribute, ErrorKind::MissingElement]);
        assert!(report.errors[1]
            .message
            .ends_with("Expected is one of ( {urn:t}mod, {urn:t}dhEmi )."));
    }

    #[test]
    fn test_value_fixed_and_attribute_errors() {
        let report = validate(
            r#"<ide xmlns="urn:t" versao="x" extra="1"><cUF>41</cUF><dhEmi>yesterday</dhEmi></ide>"#,
        );
        let kinds: Vec<ErrorKind> = report.errors.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::InvalidValue,
                ErrorKind::UnknownAttribute,
                ErrorKind::FixedValue,
                ErrorKind::InvalidValue,
            ]
        );
        assert!(report.errors[0].message.starts_with("Element '{urn:t}ide', attribute 'versao':"));
    }

    #[test]
    fn test_nil() {
        let nilled = r#"<ide xmlns="urn:t" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" versao="4.00">
                          <cUF>35</cUF><dhEmi xsi:nil="true"/></ide>"#;
        assert!(validate(nilled).valid);

        let not_nillable = r#"<ide xmlns="urn:t" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" versao="4.00">
                                <cUF xsi:nil="true"/><dhEmi xsi:nil="true"/></ide>"#;
        let report = validate(not_nillable);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::Nil);
    }

    #[test]
    fn test_text_in_element_only_content() {
        let report = validate(r#"<ide xmlns="urn:t" versao="4.00">stray<cUF>35</cUF><dhEmi xmlns="urn:t">2024-05-01T10:00:00</dhEmi></ide>"#);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::UnexpectedText);
    }

    #[test]
    fn test_error_limit() {
        let doc = roxmltree::Document::parse(r#"<ide xmlns="urn:t" a="1" b="2" c="3"/>"#).unwrap();
        let bundle = SchemaBundle::build("t.xsd", SCHEMA, &SchemaSources::new()).unwrap();
        let report = validate_document(&bundle, &doc, 2);
        assert_eq!(report.errors.len(), 2);
        assert!(!report.valid);
    }

    #[test]
    fn test_undeclared_default_namespace_matches_unqualified_locals() {
        let schema = r###"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:u">
              <xs:element name="r">
                <xs:complexType>
                  <xs:sequence>
                    <xs:element name="a"/>
                    <xs:any namespace="##local" processContents="skip" minOccurs="0"/>
                  </xs:sequence>
                </xs:complexType>
              </xs:element>
            </xs:schema>"###;
        let bundle = SchemaBundle::build("u.xsd", schema, &SchemaSources::new()).unwrap();

        let prefixed = bundle.validate_str(r#"<u:r xmlns:u="urn:u"><a/><b/></u:r>"#).unwrap();
        assert!(prefixed.valid, "{:?}", prefixed.errors);

        let undeclared = bundle
            .validate_str(r#"<r xmlns="urn:u"><a xmlns=""/><b xmlns=""/></r>"#)
            .unwrap();
        assert!(undeclared.valid, "{:?}", undeclared.errors);

        let qualified = bundle.validate_str(r#"<r xmlns="urn:u"><a/></r>"#).unwrap();
        assert_eq!(qualified.errors.len(), 1);
        assert_eq!(qualified.errors[0].kind, ErrorKind::UnexpectedElement);
    }
}
