//! Element declarations

use crate::namespaces::QName;

use super::base::TypeRef;

/// A compiled `xs:element` declaration
#[derive(Debug, Clone)]
pub struct ElementDecl {
    /// Qualified name; local declarations are unqualified unless the schema
    /// says otherwise
    pub name: QName,
    /// Declared type, `xs:anyType` when absent
    pub type_ref: TypeRef,
    /// `nillable="true"`
    pub nillable: bool,
    /// `fixed` value constraint
    pub fixed: Option<String>,
    /// `default` value constraint
    pub default: Option<String>,
    /// `abstract="true"`
    pub is_abstract: bool,
}

impl ElementDecl {
    /// Declaration with the given type and no constraints
    pub fn new(name: QName, type_ref: TypeRef) -> Self {
        Self {
            name,
            type_ref,
            nillable: false,
            fixed: None,
            default: None,
            is_abstract: false,
        }
    }
}
