//! Complex type definitions
//!
//! Derivations are flattened when the schema is compiled: an extension
//! carries the base content followed by its own, a restriction carries only
//! its own. Validation never walks a complex base chain.

use crate::namespaces::QName;

use super::attributes::AttributeUse;
use super::base::TypeRef;
use super::particles::{Occurs, Particle, Term};
use super::wildcards::{ProcessContents, Wildcard};

/// Content type of a complex type
#[derive(Debug, Clone)]
pub enum ContentModel {
    /// No children and no character data
    Empty,
    /// Character data of the given simple type
    Simple(TypeRef),
    /// Child elements matched by a particle
    Elements(Particle),
}

impl ContentModel {
    /// Element content that admits no children (mixed-only types)
    pub fn empty_elements() -> Self {
        ContentModel::Elements(Particle::new(Term::Sequence(Vec::new()), Occurs::once()))
    }
}

/// A compiled complex type
#[derive(Debug, Clone)]
pub struct ComplexType {
    /// Name of a global type
    pub name: Option<QName>,
    /// Content type
    pub content: ContentModel,
    /// Whether character data may appear between children
    pub mixed: bool,
    /// Attribute uses, base attributes included
    pub attributes: Vec<AttributeUse>,
    /// `xs:anyAttribute`
    pub any_attribute: Option<Wildcard>,
    /// `abstract="true"`
    pub is_abstract: bool,
}

impl ComplexType {
    /// Type with the given content and nothing else
    pub fn new(name: Option<QName>, content: ContentModel) -> Self {
        Self {
            name,
            content,
            mixed: false,
            attributes: Vec::new(),
            any_attribute: None,
            is_abstract: false,
        }
    }

    /// `xs:anyType`: any attributes, any mixed content, validated laxly
    pub fn any_type() -> Self {
        let any = Particle::new(
            Term::Any(Wildcard::any(ProcessContents::Lax)),
            Occurs::zero_or_more(),
        );
        Self {
            name: Some(QName::xsd("anyType")),
            content: ContentModel::Elements(Particle::new(
                Term::Sequence(vec![any]),
                Occurs::once(),
            )),
            mixed: true,
            attributes: Vec::new(),
            any_attribute: Some(Wildcard::any(ProcessContents::Lax)),
            is_abstract: false,
        }
    }

    /// Name used in messages
    pub fn display_name(&self) -> String {
        self.name
            .as_ref()
            .map(QName::to_string)
            .unwrap_or_else(|| "local complex type".to_string())
    }

    /// Attribute use declared for `name`
    pub fn attribute(&self, name: &QName) -> Option<&AttributeUse> {
        self.attributes.iter().find(|u| u.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_type_admits_everything() {
        let any = ComplexType::any_type();
        assert!(any.mixed);
        assert!(any.any_attribute.as_ref().unwrap().matches(Some("urn:x")));
        match &any.content {
            ContentModel::Elements(p) => assert!(p.is_emptiable()),
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_empty_elements_content() {
        match ContentModel::empty_elements() {
            ContentModel::Elements(p) => assert!(p.term.children().is_empty() && p.is_emptiable()),
            other => panic!("unexpected content {:?}", other),
        }
    }
}
