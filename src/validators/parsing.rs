//! Schema document loading
//!
//! Collects the primary schema and everything it transitively includes,
//! imports or redefines. Loading is an iterative worklist so deep include
//! chains do not recurse, and every document is loaded once per target
//! namespace, so include cycles and diamonds are harmless.

use std::collections::{HashSet, VecDeque};

use roxmltree::Node;
use tracing::debug;

use crate::documents::parse_named_document;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::loaders::{is_remote_location, reference_basename, SchemaResolver};
use crate::namespaces::XSD_NAMESPACE;

/// A loaded schema document, not yet compiled
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    /// Reference name (basename) of the document
    pub name: String,
    /// Document content
    pub content: String,
    /// Namespace adopted from the includer when the document has none
    pub chameleon_namespace: Option<String>,
}

struct Pending {
    name: String,
    content: Option<String>,
    chameleon_namespace: Option<String>,
    referenced_from: String,
}

/// Load the primary schema and its transitive references
pub fn load_schema_documents<R: SchemaResolver + ?Sized>(
    primary_name: &str,
    primary_content: &str,
    resolver: &R,
    limits: &Limits,
) -> Result<Vec<SchemaDocument>> {
    let mut loaded: Vec<SchemaDocument> = Vec::new();
    let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
    let mut queue = VecDeque::new();

    queue.push_back(Pending {
        name: reference_basename(primary_name).to_string(),
        content: Some(primary_content.to_string()),
        chameleon_namespace: None,
        referenced_from: String::new(),
    });

    while let Some(pending) = queue.pop_front() {
        let content = match pending.content {
            Some(content) => content,
            None => resolver
                .resolve(&pending.name)
                .map(|c| c.into_owned())
                .ok_or_else(|| Error::SchemaAssembly {
                    reference: pending.name.clone(),
                    referenced_from: pending.referenced_from.clone(),
                })?,
        };

        let scan = scan_references(&pending.name, &content, limits)?;

        let chameleon_namespace = match scan.target_namespace {
            Some(_) => None,
            None => pending.chameleon_namespace,
        };
        if !seen.insert((pending.name.clone(), chameleon_namespace.clone())) {
            continue;
        }
        limits.check_schema_documents(loaded.len() + 1)?;

        let effective_namespace = scan.target_namespace.or_else(|| chameleon_namespace.clone());
        debug!(
            schema = %pending.name,
            target_namespace = ?effective_namespace,
            "loaded schema document"
        );

        for location in scan.includes {
            queue.push_back(Pending {
                name: location,
                content: None,
                chameleon_namespace: effective_namespace.clone(),
                referenced_from: pending.name.clone(),
            });
        }
        for location in scan.imports {
            queue.push_back(Pending {
                name: location,
                content: None,
                chameleon_namespace: None,
                referenced_from: pending.name.clone(),
            });
        }

        loaded.push(SchemaDocument {
            name: pending.name,
            content,
            chameleon_namespace,
        });
    }

    Ok(loaded)
}

struct References {
    target_namespace: Option<String>,
    includes: Vec<String>,
    imports: Vec<String>,
}

/// Target namespace and referenced basenames of one schema document
fn scan_references(name: &str, content: &str, limits: &Limits) -> Result<References> {
    let doc = parse_named_document(name, content, limits)?;
    let root = doc.root_element();
    if !is_xsd(root, "schema") {
        return Err(Error::schema(format!(
            "'{}' is not an XML Schema document (root element is '{}')",
            name,
            root.tag_name().name()
        )));
    }

    let mut references = References {
        target_namespace: root.attribute("targetNamespace").map(str::to_string),
        includes: Vec::new(),
        imports: Vec::new(),
    };

    for child in root.children().filter(Node::is_element) {
        if child.tag_name().namespace() != Some(XSD_NAMESPACE) {
            continue;
        }

        let kind = child.tag_name().name();
        match (kind, child.attribute("schemaLocation")) {
            ("include" | "redefine", Some(location)) => {
                references.includes.push(reference_basename(location).to_string());
            }
            ("include" | "redefine", None) => {
                return Err(Error::schema(format!(
                    "xs:{} without schemaLocation in '{}'",
                    kind, name
                )));
            }
            ("import", Some(location)) => {
                if is_remote_location(location) {
                    debug!(location, "resolving remote import by basename");
                }
                references.imports.push(reference_basename(location).to_string());
            }
            ("import", None) => debug!(
                namespace = child.attribute("namespace").unwrap_or(""),
                schema = name,
                "import without schemaLocation skipped"
            ),
            _ => {}
        }
    }

    Ok(references)
}

/// Whether `node` is the XSD element `local`
pub(crate) fn is_xsd(node: Node<'_, '_>, local: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(XSD_NAMESPACE)
        && node.tag_name().name() == local
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::SchemaSources;

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    fn schema(body: &str) -> String {
        format!(r#"<xs:schema {} targetNamespace="urn:t">{}</xs:schema>"#, XS, body)
    }

    #[test]
    fn test_include_chain_and_cycle() {
        let sources = SchemaSources::new()
            .with("leiaute.xsd", schema(r#"<xs:include schemaLocation="tipos.xsd"/>"#))
            .with("tipos.xsd", schema(r#"<xs:include schemaLocation="leiaute.xsd"/>"#));

        let primary = schema(r#"<xs:include schemaLocation="../dir/leiaute.xsd"/>"#);
        let docs =
            load_schema_documents("primary.xsd", &primary, &sources, &Limits::default()).unwrap();

        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["primary.xsd", "leiaute.xsd", "tipos.xsd"]);
    }

    #[test]
    fn test_missing_include_names_referrer() {
        let primary = schema(r#"<xs:include schemaLocation="tiposBasico_v4.00.xsd"/>"#);
        let err =
            load_schema_documents("nfe.xsd", &primary, &SchemaSources::new(), &Limits::default())
                .unwrap_err();

        match err {
            Error::SchemaAssembly {
                reference,
                referenced_from,
            } => {
                assert_eq!(reference, "tiposBasico_v4.00.xsd");
                assert_eq!(referenced_from, "nfe.xsd");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_chameleon_include_adopts_namespace() {
        let sources = SchemaSources::new().with(
            "common.xsd",
            format!(r#"<xs:schema {}><xs:simpleType name="code"/></xs:schema>"#, XS),
        );
        let primary = schema(r#"<xs:include schemaLocation="common.xsd"/>"#);
        let docs = load_schema_documents("p.xsd", &primary, &sources, &Limits::default()).unwrap();

        assert_eq!(docs[1].chameleon_namespace.as_deref(), Some("urn:t"));
        assert_eq!(docs[0].chameleon_namespace, None);
    }

    #[test]
    fn test_import_by_basename_and_without_location() {
        let sources = SchemaSources::new().with(
            "xmldsig-core-schema_v1.01.xsd",
            format!(
                r#"<xs:schema {} targetNamespace="http://www.w3.org/2000/09/xmldsig#"/>"#,
                XS
            ),
        );
        let primary = schema(
            r#"<xs:import namespace="http://www.w3.org/2000/09/xmldsig#"
                          schemaLocation="http://www.w3.org/TR/xmldsig-core/xmldsig-core-schema_v1.01.xsd"/>
               <xs:import namespace="urn:elsewhere"/>"#,
        );
        let docs = load_schema_documents("p.xsd", &primary, &sources, &Limits::default()).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_document_limit() {
        let sources = SchemaSources::new().with("a.xsd", schema(""));
        let primary = schema(r#"<xs:include schemaLocation="a.xsd"/>"#);
        let limits = Limits {
            max_schema_documents: 1,
            ..Limits::default()
        };
        assert!(matches!(
            load_schema_documents("p.xsd", &primary, &sources, &limits),
            Err(Error::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_malformed_schema_is_a_parse_error() {
        let sources = SchemaSources::new().with("broken.xsd", "<xs:schema");
        let primary = schema(r#"<xs:include schemaLocation="broken.xsd"/>"#);
        let err =
            load_schema_documents("p.xsd", &primary, &sources, &Limits::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ref e) if e.source_name.as_deref() == Some("broken.xsd")
        ));
    }

    #[test]
    fn test_non_schema_root_rejected() {
        assert!(matches!(
            load_schema_documents("p.xsd", "<nope/>", &SchemaSources::new(), &Limits::default()),
            Err(Error::Schema(_))
        ));
    }
}
