//! Attribute declarations and uses

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::namespaces::QName;

use super::base::TypeRef;

/// A compiled `xs:attribute` declaration
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    /// Qualified name
    pub name: QName,
    /// Declared simple type, `xs:anySimpleType` when absent
    pub type_ref: TypeRef,
    /// `fixed` value constraint
    pub fixed: Option<String>,
    /// `default` value constraint
    pub default: Option<String>,
}

impl AttributeDecl {
    /// Declaration with the given type and no value constraint
    pub fn new(name: QName, type_ref: TypeRef) -> Self {
        Self {
            name,
            type_ref,
            fixed: None,
            default: None,
        }
    }
}

/// The `use` attribute of an attribute declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Use {
    /// Attribute may be absent
    #[default]
    Optional,
    /// Attribute must be present
    Required,
    /// Attribute must not be present
    Prohibited,
}

impl Use {
    /// Parse the `use` attribute
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim() {
            "optional" => Ok(Use::Optional),
            "required" => Ok(Use::Required),
            "prohibited" => Ok(Use::Prohibited),
            other => Err(Error::schema(format!(
                "wrong value '{}' in 'use' attribute",
                other
            ))),
        }
    }
}

/// An attribute allowed on a complex type
#[derive(Debug, Clone)]
pub struct AttributeUse {
    /// Declaration, shared with the global one for `ref` uses
    pub decl: Arc<AttributeDecl>,
    /// Requirement
    pub use_: Use,
    /// `fixed` on the use overrides the declaration's
    pub fixed: Option<String>,
}

impl AttributeUse {
    /// Name of the used attribute
    pub fn name(&self) -> &QName {
        &self.decl.name
    }

    /// Whether the attribute must be present
    pub fn is_required(&self) -> bool {
        self.use_ == Use::Required
    }

    /// Effective fixed value
    pub fn fixed(&self) -> Option<&str> {
        self.fixed.as_deref().or(self.decl.fixed.as_deref())
    }
}

/// Add `attr` to `uses`, replacing an earlier use of the same name
///
/// A prohibited use removes the attribute instead.
pub fn merge_attribute_use(uses: &mut Vec<AttributeUse>, attr: AttributeUse) {
    let existing = uses.iter().position(|u| u.name() == attr.name());

    match (existing, attr.use_) {
        (Some(idx), Use::Prohibited) => {
            uses.remove(idx);
        }
        (None, Use::Prohibited) => {}
        (Some(idx), _) => uses[idx] = attr,
        (None, _) => uses.push(attr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: &str, use_: Use) -> AttributeUse {
        AttributeUse {
            decl: Arc::new(AttributeDecl::new(
                QName::local(name),
                TypeRef::Named(QName::xsd("string")),
            )),
            use_,
            fixed: None,
        }
    }

    #[test]
    fn test_use_parse() {
        assert_eq!(Use::parse("required").unwrap(), Use::Required);
        assert!(Use::parse("mandatory").is_err());
    }

    #[test]
    fn test_merge_replaces_and_prohibits() {
        let mut uses = vec![attr("versao", Use::Optional), attr("Id", Use::Required)];

        merge_attribute_use(&mut uses, attr("versao", Use::Required));
        assert!(uses[0].is_required());
        assert_eq!(uses.len(), 2);

        merge_attribute_use(&mut uses, attr("Id", Use::Prohibited));
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].name().local_name, "versao");

        merge_attribute_use(&mut uses, attr("dhEmi", Use::Optional));
        assert_eq!(uses.len(), 2);
    }
}
