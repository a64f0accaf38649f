//! Shared component vocabulary
//!
//! Type definitions are referenced either by name or inline. Named references
//! are resolved through a [`ComponentLookup`] when a document is validated,
//! which keeps recursive type graphs free of reference cycles.

use std::sync::Arc;

use crate::namespaces::QName;

use super::attributes::AttributeDecl;
use super::complex_types::ComplexType;
use super::elements::ElementDecl;
use super::simple_types::SimpleType;

/// A simple or complex type definition
#[derive(Debug, Clone)]
pub enum TypeDef {
    /// Simple type
    Simple(SimpleType),
    /// Complex type
    Complex(ComplexType),
}

impl TypeDef {
    /// Name of a global type
    pub fn name(&self) -> Option<&QName> {
        match self {
            TypeDef::Simple(st) => st.name.as_ref(),
            TypeDef::Complex(ct) => ct.name.as_ref(),
        }
    }

    /// The simple type, if this is one
    pub fn as_simple(&self) -> Option<&SimpleType> {
        match self {
            TypeDef::Simple(st) => Some(st),
            TypeDef::Complex(_) => None,
        }
    }

    /// The complex type, if this is one
    pub fn as_complex(&self) -> Option<&ComplexType> {
        match self {
            TypeDef::Complex(ct) => Some(ct),
            TypeDef::Simple(_) => None,
        }
    }
}

/// Reference to a type definition
#[derive(Debug, Clone)]
pub enum TypeRef {
    /// Global type, resolved on use
    Named(QName),
    /// Anonymous type
    Inline(Arc<TypeDef>),
}

impl TypeRef {
    /// Resolve against the global components
    pub fn resolve<'a>(&'a self, lookup: &'a dyn ComponentLookup) -> Option<&'a TypeDef> {
        match self {
            TypeRef::Named(name) => lookup.type_definition(name),
            TypeRef::Inline(def) => Some(def),
        }
    }

    /// Name used in messages
    pub fn display_name(&self) -> String {
        match self {
            TypeRef::Named(name) => name.to_string(),
            TypeRef::Inline(_) => "local type".to_string(),
        }
    }
}

/// Access to the global components of a compiled schema
pub trait ComponentLookup {
    /// Global element declaration
    fn global_element(&self, name: &QName) -> Option<&Arc<ElementDecl>>;

    /// Global attribute declaration
    fn global_attribute(&self, name: &QName) -> Option<&Arc<AttributeDecl>>;

    /// Global or built-in type definition
    fn type_definition(&self, name: &QName) -> Option<&TypeDef>;
}
