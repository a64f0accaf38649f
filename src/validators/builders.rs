//! Schema compilation
//!
//! Turns loaded schema documents into owned components. Global definitions
//! are indexed first so references can point anywhere in the schema set;
//! group and attribute group references are inlined, complex derivations
//! are resolved, and every referenced name is checked to exist.

use std::sync::Arc;

use indexmap::IndexMap;
use roxmltree::{Document, Node};
use tracing::{debug, trace};

use crate::documents::parse_named_document;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::{split_prefixed, QName, XML_NAMESPACE, XSD_NAMESPACE};

use super::attributes::{merge_attribute_use, AttributeDecl, AttributeUse, Use};
use super::base::{TypeDef, TypeRef};
use super::builtins::BuiltinType;
use super::complex_types::{ComplexType, ContentModel};
use super::elements::ElementDecl;
use super::facets::Facets;
use super::parsing::SchemaDocument;
use super::particles::{parse_occurs, Occurs, Particle, Term};
use super::simple_types::{SimpleType, Variety};
use super::wildcards::{NamespaceConstraint, ProcessContents, Wildcard};

/// Owned global components of a schema set
#[derive(Debug, Default)]
pub struct CompiledSchema {
    /// Global element declarations
    pub elements: IndexMap<QName, Arc<ElementDecl>>,
    /// Global attribute declarations
    pub attributes: IndexMap<QName, Arc<AttributeDecl>>,
    /// Built-in and global type definitions
    pub types: IndexMap<QName, Arc<TypeDef>>,
}

/// Built-in types, keyed by their XSD names
pub fn builtin_types() -> IndexMap<QName, Arc<TypeDef>> {
    let mut types = IndexMap::new();
    types.insert(
        QName::xsd("anyType"),
        Arc::new(TypeDef::Complex(ComplexType::any_type())),
    );
    for builtin in BuiltinType::ALL {
        types.insert(
            QName::xsd(builtin.local_name()),
            Arc::new(TypeDef::Simple(SimpleType::builtin(builtin))),
        );
    }
    types
}

/// Compile loaded schema documents
pub fn compile_schema(documents: &[SchemaDocument], limits: &Limits) -> Result<CompiledSchema> {
    let parsed = documents
        .iter()
        .map(|d| parse_named_document(&d.name, &d.content, limits))
        .collect::<Result<Vec<_>>>()?;

    let mut compiler = Compiler::new(documents, &parsed);
    compiler.index_globals();
    compiler.compile_globals()?;

    debug!(
        documents = documents.len(),
        elements = compiler.output.elements.len(),
        types = compiler.output.types.len(),
        "compiled schema"
    );

    Ok(compiler.output)
}

/// One schema document with its compile-time settings
struct Source<'a, 'input> {
    name: &'a str,
    target_namespace: Option<&'a str>,
    chameleon: bool,
    elements_qualified: bool,
    attributes_qualified: bool,
    root: Node<'a, 'input>,
}

type Located<'a, 'input> = (usize, Node<'a, 'input>);

struct Compiler<'a, 'input> {
    sources: Vec<Source<'a, 'input>>,
    element_nodes: IndexMap<QName, Located<'a, 'input>>,
    attribute_nodes: IndexMap<QName, Located<'a, 'input>>,
    type_nodes: IndexMap<QName, Located<'a, 'input>>,
    group_nodes: IndexMap<QName, Located<'a, 'input>>,
    attribute_group_nodes: IndexMap<QName, Located<'a, 'input>>,
    type_stack: Vec<QName>,
    group_stack: Vec<QName>,
    attribute_group_stack: Vec<QName>,
    output: CompiledSchema,
}

/// Element children in the XSD namespace, annotations skipped
fn xsd_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| {
        c.is_element()
            && c.tag_name().namespace() == Some(XSD_NAMESPACE)
            && c.tag_name().name() != "annotation"
    })
}

fn is_true(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}

fn is_particle(node: Node<'_, '_>) -> bool {
    matches!(
        node.tag_name().name(),
        "sequence" | "choice" | "all" | "group"
    )
}

fn content_from(particle: Option<Particle>, mixed: bool) -> ContentModel {
    match particle {
        Some(particle) => ContentModel::Elements(particle),
        None if mixed => ContentModel::empty_elements(),
        None => ContentModel::Empty,
    }
}

impl<'a, 'input> Compiler<'a, 'input> {
    fn new(documents: &'a [SchemaDocument], parsed: &'a [Document<'input>]) -> Self {
        let sources = documents
            .iter()
            .zip(parsed)
            .map(|(meta, doc)| {
                let root = doc.root_element();
                let own_namespace = root.attribute("targetNamespace");
                Source {
                    name: meta.name.as_str(),
                    target_namespace: own_namespace.or(meta.chameleon_namespace.as_deref()),
                    chameleon: own_namespace.is_none() && meta.chameleon_namespace.is_some(),
                    elements_qualified: root.attribute("elementFormDefault") == Some("qualified"),
                    attributes_qualified: root.attribute("attributeFormDefault")
                        == Some("qualified"),
                    root,
                }
            })
            .collect();

        let output = CompiledSchema {
            types: builtin_types(),
            ..CompiledSchema::default()
        };

        Self {
            sources,
            element_nodes: IndexMap::new(),
            attribute_nodes: IndexMap::new(),
            type_nodes: IndexMap::new(),
            group_nodes: IndexMap::new(),
            attribute_group_nodes: IndexMap::new(),
            type_stack: Vec::new(),
            group_stack: Vec::new(),
            attribute_group_stack: Vec::new(),
            output,
        }
    }

    fn index_globals(&mut self) {
        for (idx, source) in self.sources.iter().enumerate() {
            for child in xsd_children(source.root) {
                let Some(name) = child.attribute("name") else {
                    continue;
                };
                let qname = QName::new(source.target_namespace, name);

                let table = match child.tag_name().name() {
                    "element" => &mut self.element_nodes,
                    "attribute" => &mut self.attribute_nodes,
                    "complexType" | "simpleType" => &mut self.type_nodes,
                    "group" => &mut self.group_nodes,
                    "attributeGroup" => &mut self.attribute_group_nodes,
                    _ => continue,
                };

                if table.contains_key(&qname) {
                    debug!(
                        component = %qname,
                        schema = source.name,
                        "duplicate global definition ignored"
                    );
                } else {
                    table.insert(qname, (idx, child));
                }
            }
        }
    }

    fn compile_globals(&mut self) -> Result<()> {
        let attributes: Vec<QName> = self.attribute_nodes.keys().cloned().collect();
        for name in &attributes {
            self.global_attribute(name)?;
        }

        let types: Vec<QName> = self.type_nodes.keys().cloned().collect();
        for name in &types {
            self.named_type(name)?;
        }

        let elements: Vec<Located<'a, 'input>> = self.element_nodes.values().copied().collect();
        for (doc, node) in elements {
            let decl = self.element(doc, node, true)?;
            trace!(element = %decl.name, "compiled global element");
            self.output.elements.insert(decl.name.clone(), decl);
        }

        Ok(())
    }

    fn schema_error(&self, doc: usize, message: impl std::fmt::Display) -> Error {
        Error::schema(format!("{} (in '{}')", message, self.sources[doc].name))
    }

    fn in_document(&self, doc: usize, err: Error) -> Error {
        match err {
            Error::Schema(message) => self.schema_error(doc, message),
            other => other,
        }
    }

    /// Resolve a lexical QName in the scope of `node`
    fn resolve_qname(&self, doc: usize, node: Node<'a, 'input>, value: &str) -> Result<QName> {
        let (prefix, local) = split_prefixed(value.trim());

        let namespace = match prefix {
            Some("xml") => Some(XML_NAMESPACE),
            Some(prefix) => Some(
                node.lookup_namespace_uri(Some(prefix)).ok_or_else(|| {
                    self.schema_error(doc, format!("namespace prefix '{}' is not bound", prefix))
                })?,
            ),
            None => node.lookup_namespace_uri(None).filter(|ns| !ns.is_empty()),
        };

        // Unqualified references in a chameleon document follow its adopted namespace
        let source = &self.sources[doc];
        let namespace = match namespace {
            None if source.chameleon => source.target_namespace,
            other => other,
        };

        Ok(QName::new(namespace, local))
    }

    fn required_qname(&self, doc: usize, node: Node<'a, 'input>, attr: &str) -> Result<QName> {
        let value = node.attribute(attr).ok_or_else(|| {
            self.schema_error(
                doc,
                format!("<xs:{}> requires a '{}' attribute", node.tag_name().name(), attr),
            )
        })?;
        self.resolve_qname(doc, node, value)
    }

    fn type_ref(&self, doc: usize, node: Node<'a, 'input>, value: &str) -> Result<TypeRef> {
        let name = self.resolve_qname(doc, node, value)?;
        if self.output.types.contains_key(&name) || self.type_nodes.contains_key(&name) {
            Ok(TypeRef::Named(name))
        } else {
            Err(self.schema_error(doc, format!("type '{}' is not defined", name)))
        }
    }

    fn named_type(&mut self, name: &QName) -> Result<Arc<TypeDef>> {
        if let Some(def) = self.output.types.get(name) {
            return Ok(def.clone());
        }

        let (doc, node) = *self
            .type_nodes
            .get(name)
            .ok_or_else(|| Error::schema(format!("type '{}' is not defined", name)))?;

        if self.type_stack.contains(name) {
            return Err(self.schema_error(doc, format!("circular derivation of type '{}'", name)));
        }

        self.type_stack.push(name.clone());
        let compiled = if node.tag_name().name() == "complexType" {
            self.complex_type(doc, node, Some(name.clone())).map(TypeDef::Complex)
        } else {
            self.simple_type(doc, node, Some(name.clone())).map(TypeDef::Simple)
        };
        self.type_stack.pop();

        let def = Arc::new(compiled?);
        trace!(type_name = %name, "compiled type");
        self.output.types.insert(name.clone(), def.clone());
        Ok(def)
    }

    fn element(
        &mut self,
        doc: usize,
        node: Node<'a, 'input>,
        global: bool,
    ) -> Result<Arc<ElementDecl>> {
        let local = node
            .attribute("name")
            .ok_or_else(|| self.schema_error(doc, "element declaration without name"))?;

        let source = &self.sources[doc];
        let qualified = global
            || match node.attribute("form") {
                Some(form) => form == "qualified",
                None => source.elements_qualified,
            };
        let name = QName::new(if qualified { source.target_namespace } else { None }, local);

        let inline = xsd_children(node)
            .find(|c| matches!(c.tag_name().name(), "complexType" | "simpleType"));

        let type_ref = match (node.attribute("type"), inline) {
            (Some(type_name), _) => self.type_ref(doc, node, type_name)?,
            (None, Some(child)) if child.tag_name().name() == "complexType" => {
                TypeRef::Inline(Arc::new(TypeDef::Complex(self.complex_type(doc, child, None)?)))
            }
            (None, Some(child)) => {
                TypeRef::Inline(Arc::new(TypeDef::Simple(self.simple_type(doc, child, None)?)))
            }
            (None, None) => TypeRef::Named(QName::xsd("anyType")),
        };

        Ok(Arc::new(ElementDecl {
            name,
            type_ref,
            nillable: is_true(node.attribute("nillable")),
            fixed: node.attribute("fixed").map(str::to_string),
            default: node.attribute("default").map(str::to_string),
            is_abstract: is_true(node.attribute("abstract")),
        }))
    }

    fn particle(&mut self, doc: usize, node: Node<'a, 'input>) -> Result<Option<Particle>> {
        let occurs = parse_occurs(node.attribute("minOccurs"), node.attribute("maxOccurs"))
            .map_err(|e| self.in_document(doc, e))?;
        if occurs.max == Some(0) {
            return Ok(None);
        }

        let term = match node.tag_name().name() {
            "element" => match node.attribute("ref") {
                Some(target) => {
                    let name = self.resolve_qname(doc, node, target)?;
                    if !self.element_nodes.contains_key(&name) {
                        return Err(
                            self.schema_error(doc, format!("element '{}' is not defined", name))
                        );
                    }
                    Term::ElementRef(name)
                }
                None => Term::Element(self.element(doc, node, false)?),
            },
            "any" => Term::Any(self.wildcard(doc, node)?),
            "sequence" => Term::Sequence(self.particles(doc, node)?),
            "choice" => Term::Choice(self.particles(doc, node)?),
            "all" => Term::All(self.particles(doc, node)?),
            "group" => return self.group_ref(doc, node, occurs),
            other => {
                return Err(self.schema_error(
                    doc,
                    format!("unexpected <xs:{}> in a content model", other),
                ))
            }
        };

        Ok(Some(Particle::new(term, occurs)))
    }

    fn particles(&mut self, doc: usize, node: Node<'a, 'input>) -> Result<Vec<Particle>> {
        let mut items = Vec::new();
        for child in xsd_children(node) {
            if let Some(particle) = self.particle(doc, child)? {
                items.push(particle);
            }
        }
        Ok(items)
    }

    fn group_ref(
        &mut self,
        doc: usize,
        node: Node<'a, 'input>,
        occurs: Occurs,
    ) -> Result<Option<Particle>> {
        let name = self.required_qname(doc, node, "ref")?;
        let (group_doc, group_node) = *self
            .group_nodes
            .get(&name)
            .ok_or_else(|| self.schema_error(doc, format!("group '{}' is not defined", name)))?;

        if self.group_stack.contains(&name) {
            return Err(self.schema_error(doc, format!("circular group reference '{}'", name)));
        }

        self.group_stack.push(name);
        let model = match xsd_children(group_node).next() {
            Some(model) => self.particle(group_doc, model),
            None => Ok(None),
        };
        self.group_stack.pop();

        Ok(model?.map(|inner| Particle::new(inner.term, occurs)))
    }

    fn wildcard(&self, doc: usize, node: Node<'a, 'input>) -> Result<Wildcard> {
        let target_namespace = self.sources[doc].target_namespace;
        let namespaces = NamespaceConstraint::parse(
            node.attribute("namespace").unwrap_or("##any"),
            target_namespace,
        )?;
        let process_contents = match node.attribute("processContents") {
            Some(value) => ProcessContents::parse(value)?,
            None => ProcessContents::Strict,
        };

        Ok(Wildcard {
            namespaces,
            process_contents,
        })
    }

    fn complex_type(
        &mut self,
        doc: usize,
        node: Node<'a, 'input>,
        name: Option<QName>,
    ) -> Result<ComplexType> {
        let mut ct = ComplexType::new(name, ContentModel::Empty);
        ct.mixed = is_true(node.attribute("mixed"));
        ct.is_abstract = is_true(node.attribute("abstract"));

        let mut particle = None;
        for child in xsd_children(node) {
            match child.tag_name().name() {
                "simpleContent" => return self.simple_content(doc, child, ct),
                "complexContent" => return self.complex_content(doc, child, ct),
                "sequence" | "choice" | "all" | "group" => particle = self.particle(doc, child)?,
                "attribute" | "attributeGroup" | "anyAttribute" => {}
                other => {
                    return Err(
                        self.schema_error(doc, format!("unexpected <xs:{}> in complexType", other))
                    )
                }
            }
        }

        let mut wildcard = None;
        self.attribute_uses(doc, node, &mut ct.attributes, &mut wildcard)?;
        ct.any_attribute = wildcard;
        ct.content = content_from(particle, ct.mixed);
        Ok(ct)
    }

    fn derivation(&self, doc: usize, node: Node<'a, 'input>) -> Result<Node<'a, 'input>> {
        xsd_children(node)
            .find(|c| matches!(c.tag_name().name(), "extension" | "restriction"))
            .ok_or_else(|| {
                self.schema_error(
                    doc,
                    format!("<xs:{}> without extension or restriction", node.tag_name().name()),
                )
            })
    }

    fn complex_content(
        &mut self,
        doc: usize,
        node: Node<'a, 'input>,
        mut ct: ComplexType,
    ) -> Result<ComplexType> {
        if let Some(mixed) = node.attribute("mixed") {
            ct.mixed = is_true(Some(mixed));
        }

        let derivation = self.derivation(doc, node)?;
        let base_name = self.required_qname(doc, derivation, "base")?;
        let base = if base_name == QName::xsd("anyType") {
            None
        } else {
            match &*self.named_type(&base_name)? {
                TypeDef::Complex(base) => Some(base.clone()),
                TypeDef::Simple(_) => {
                    return Err(self.schema_error(
                        doc,
                        format!("complexContent base '{}' is a simple type", base_name),
                    ))
                }
            }
        };

        let mut particle = None;
        for child in xsd_children(derivation).filter(|c| is_particle(*c)) {
            particle = self.particle(doc, child)?;
        }

        let extension = derivation.tag_name().name() == "extension";
        if let Some(base) = &base {
            ct.attributes = base.attributes.clone();
            if extension {
                ct.any_attribute = base.any_attribute.clone();
                ct.mixed |= base.mixed;
            }
        }

        ct.content = if extension {
            match (base.map(|b| b.content), particle) {
                (Some(ContentModel::Elements(base)), Some(own)) => ContentModel::Elements(
                    Particle::new(Term::Sequence(vec![base, own]), Occurs::once()),
                ),
                (Some(ContentModel::Elements(base)), None) => ContentModel::Elements(base),
                (Some(ContentModel::Simple(_)), _) => {
                    return Err(self.schema_error(
                        doc,
                        format!(
                            "complexContent cannot extend '{}', which has simple content",
                            base_name
                        ),
                    ))
                }
                (Some(ContentModel::Empty) | None, own) => content_from(own, ct.mixed),
            }
        } else {
            content_from(particle, ct.mixed)
        };

        let mut wildcard = None;
        self.attribute_uses(doc, derivation, &mut ct.attributes, &mut wildcard)?;
        if wildcard.is_some() {
            ct.any_attribute = wildcard;
        }

        Ok(ct)
    }

    fn simple_content(
        &mut self,
        doc: usize,
        node: Node<'a, 'input>,
        mut ct: ComplexType,
    ) -> Result<ComplexType> {
        let derivation = self.derivation(doc, node)?;
        let base_name = self.required_qname(doc, derivation, "base")?;
        let base = self.named_type(&base_name)?;

        match (derivation.tag_name().name(), &*base) {
            ("extension", TypeDef::Simple(_)) => {
                ct.content = ContentModel::Simple(TypeRef::Named(base_name));
            }
            ("extension", TypeDef::Complex(complex)) => {
                let ContentModel::Simple(content) = &complex.content else {
                    return Err(self.schema_error(
                        doc,
                        format!("simpleContent base '{}' does not have simple content", base_name),
                    ));
                };
                ct.content = ContentModel::Simple(content.clone());
                ct.attributes = complex.attributes.clone();
                ct.any_attribute = complex.any_attribute.clone();
            }
            (_, TypeDef::Complex(complex)) => {
                let ContentModel::Simple(content) = &complex.content else {
                    return Err(self.schema_error(
                        doc,
                        format!("simpleContent base '{}' does not have simple content", base_name),
                    ));
                };

                let mut restricted = content.clone();
                let mut facets = Facets::default();
                for child in xsd_children(derivation) {
                    match child.tag_name().name() {
                        "simpleType" => {
                            restricted = TypeRef::Inline(Arc::new(TypeDef::Simple(
                                self.simple_type(doc, child, None)?,
                            )))
                        }
                        "attribute" | "attributeGroup" | "anyAttribute" => {}
                        facet => facets
                            .add(facet, child.attribute("value").unwrap_or_default())
                            .map_err(|e| self.in_document(doc, e))?,
                    }
                }

                let content_type = SimpleType {
                    name: None,
                    variety: Variety::Restriction(restricted),
                    facets,
                };
                ct.content =
                    ContentModel::Simple(TypeRef::Inline(Arc::new(TypeDef::Simple(content_type))));
                ct.attributes = complex.attributes.clone();
            }
            (_, TypeDef::Simple(_)) => {
                return Err(self.schema_error(
                    doc,
                    format!(
                        "simpleContent restriction base '{}' must be a complex type",
                        base_name
                    ),
                ))
            }
        }

        let mut wildcard = None;
        self.attribute_uses(doc, derivation, &mut ct.attributes, &mut wildcard)?;
        if wildcard.is_some() {
            ct.any_attribute = wildcard;
        }

        Ok(ct)
    }

    fn simple_type(
        &mut self,
        doc: usize,
        node: Node<'a, 'input>,
        name: Option<QName>,
    ) -> Result<SimpleType> {
        let derivation = xsd_children(node).next().ok_or_else(|| {
            self.schema_error(doc, "simpleType without restriction, list or union")
        })?;

        let mut facets = Facets::default();
        let variety = match derivation.tag_name().name() {
            "restriction" => {
                let mut base = match derivation.attribute("base") {
                    Some(base) => Some(self.type_ref(doc, derivation, base)?),
                    None => None,
                };
                for child in xsd_children(derivation) {
                    match child.tag_name().name() {
                        "simpleType" => {
                            base = Some(TypeRef::Inline(Arc::new(TypeDef::Simple(
                                self.simple_type(doc, child, None)?,
                            ))))
                        }
                        facet => facets
                            .add(facet, child.attribute("value").unwrap_or_default())
                            .map_err(|e| self.in_document(doc, e))?,
                    }
                }
                let base = base
                    .ok_or_else(|| self.schema_error(doc, "simpleType restriction without base"))?;
                Variety::Restriction(base)
            }
            "list" => {
                let item = match derivation.attribute("itemType") {
                    Some(item) => self.type_ref(doc, derivation, item)?,
                    None => {
                        let inline = xsd_children(derivation)
                            .next()
                            .ok_or_else(|| self.schema_error(doc, "list without item type"))?;
                        let item = self.simple_type(doc, inline, None)?;
                        TypeRef::Inline(Arc::new(TypeDef::Simple(item)))
                    }
                };
                Variety::List(item)
            }
            "union" => {
                let mut members = Vec::new();
                let member_types = derivation.attribute("memberTypes").unwrap_or_default();
                for member in member_types.split_whitespace() {
                    members.push(self.type_ref(doc, derivation, member)?);
                }
                for inline in xsd_children(derivation) {
                    members.push(TypeRef::Inline(Arc::new(TypeDef::Simple(
                        self.simple_type(doc, inline, None)?,
                    ))));
                }
                if members.is_empty() {
                    return Err(self.schema_error(doc, "union without member types"));
                }
                Variety::Union(members)
            }
            other => {
                return Err(
                    self.schema_error(doc, format!("unexpected <xs:{}> in simpleType", other))
                )
            }
        };

        Ok(SimpleType { name, variety, facets })
    }

    fn attribute_uses(
        &mut self,
        doc: usize,
        parent: Node<'a, 'input>,
        uses: &mut Vec<AttributeUse>,
        wildcard: &mut Option<Wildcard>,
    ) -> Result<()> {
        for child in xsd_children(parent) {
            match child.tag_name().name() {
                "attribute" => {
                    let attr = self.attribute_use(doc, child)?;
                    merge_attribute_use(uses, attr);
                }
                "attributeGroup" => {
                    let name = self.required_qname(doc, child, "ref")?;
                    let (group_doc, group_node) =
                        *self.attribute_group_nodes.get(&name).ok_or_else(|| {
                            self.schema_error(
                                doc,
                                format!("attribute group '{}' is not defined", name),
                            )
                        })?;
                    if self.attribute_group_stack.contains(&name) {
                        return Err(
                            self.schema_error(doc, format!("circular attribute group '{}'", name))
                        );
                    }

                    self.attribute_group_stack.push(name);
                    let result = self.attribute_uses(group_doc, group_node, uses, wildcard);
                    self.attribute_group_stack.pop();
                    result?;
                }
                "anyAttribute" => *wildcard = Some(self.wildcard(doc, child)?),
                _ => {}
            }
        }
        Ok(())
    }

    fn attribute_use(&mut self, doc: usize, node: Node<'a, 'input>) -> Result<AttributeUse> {
        let use_ = match node.attribute("use") {
            Some(value) => Use::parse(value).map_err(|e| self.in_document(doc, e))?,
            None => Use::Optional,
        };

        let (decl, fixed) = match node.attribute("ref") {
            Some(target) => {
                let name = self.resolve_qname(doc, node, target)?;
                let decl = self.global_attribute(&name).map_err(|e| self.in_document(doc, e))?;
                (decl, node.attribute("fixed").map(str::to_string))
            }
            None => (Arc::new(self.attribute_decl(doc, node, false)?), None),
        };

        Ok(AttributeUse { decl, use_, fixed })
    }

    fn attribute_decl(
        &mut self,
        doc: usize,
        node: Node<'a, 'input>,
        global: bool,
    ) -> Result<AttributeDecl> {
        let local = node
            .attribute("name")
            .ok_or_else(|| self.schema_error(doc, "attribute declaration without name"))?;

        let source = &self.sources[doc];
        let qualified = global
            || match node.attribute("form") {
                Some(form) => form == "qualified",
                None => source.attributes_qualified,
            };
        let name = QName::new(if qualified { source.target_namespace } else { None }, local);

        let type_ref = match node.attribute("type") {
            Some(type_name) => self.type_ref(doc, node, type_name)?,
            None => match xsd_children(node).find(|c| c.tag_name().name() == "simpleType") {
                Some(inline) => {
                    let inline = self.simple_type(doc, inline, None)?;
                    TypeRef::Inline(Arc::new(TypeDef::Simple(inline)))
                }
                None => TypeRef::Named(QName::xsd("anySimpleType")),
            },
        };

        Ok(AttributeDecl {
            name,
            type_ref,
            fixed: node.attribute("fixed").map(str::to_string),
            default: node.attribute("default").map(str::to_string),
        })
    }

    fn global_attribute(&mut self, name: &QName) -> Result<Arc<AttributeDecl>> {
        if let Some(decl) = self.output.attributes.get(name) {
            return Ok(decl.clone());
        }

        let located = self.attribute_nodes.get(name).copied();
        let decl = match located {
            Some((doc, node)) => Arc::new(self.attribute_decl(doc, node, true)?),
            // xml:lang and friends without an imported xml.xsd
            None if name.namespace() == Some(XML_NAMESPACE) => Arc::new(AttributeDecl::new(
                name.clone(),
                TypeRef::Named(QName::xsd("string")),
            )),
            None => return Err(Error::schema(format!("attribute '{}' is not defined", name))),
        };

        self.output.attributes.insert(name.clone(), decl.clone());
        Ok(decl)
    }
}
