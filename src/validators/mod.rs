//! XML Schema validators
//!
//! Schema documents are loaded through a [`SchemaResolver`](crate::loaders::SchemaResolver),
//! compiled into owned components and bundled in a [`SchemaBundle`], which
//! validates instance documents into a [`ValidationReport`].

pub mod attributes;
pub mod base;
pub mod builders;
pub mod builtins;
pub mod complex_types;
pub mod document_validation;
pub mod elements;
pub mod exceptions;
pub mod facets;
pub mod models;
pub mod parsing;
pub mod particles;
pub mod schemas;
pub mod simple_types;
pub mod wildcards;

// Re-exports
pub use attributes::{AttributeDecl, AttributeUse, Use};
pub use base::{ComponentLookup, TypeDef, TypeRef};
pub use builders::{compile_schema, CompiledSchema};
pub use builtins::BuiltinType;
pub use complex_types::{ComplexType, ContentModel};
pub use document_validation::{validate_document, DocumentValidator};
pub use elements::ElementDecl;
pub use exceptions::{ErrorKind, ValidationError, ValidationReport};
pub use facets::{Facets, WhiteSpace};
pub use models::ContentMatcher;
pub use parsing::{load_schema_documents, SchemaDocument};
pub use particles::{Occurs, Particle, Term};
pub use schemas::{build_schema, SchemaBundle};
pub use simple_types::{SimpleType, Variety};
pub use wildcards::{NamespaceConstraint, ProcessContents, Wildcard};
