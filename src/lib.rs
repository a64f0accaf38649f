//! # nfe-xsd
//!
//! Structural comparison and XML Schema validation of NF-e (Brazilian
//! electronic invoice) XML payloads.
//!
//! Two independent components share a small foundation:
//!
//! - [`comparison`]: flatten documents into path-indexed maps and diff them
//!   against a reference document the tax authority accepted
//! - [`validators`]: assemble a multi-file XSD set from an in-memory resolver
//!   and validate documents against it, with libxml2-style messages
//!
//! ## Example
//!
//! ```rust,ignore
//! use nfe_xsd::{compare_documents, Limits, SchemaBundle, SchemaSources};
//!
//! let sources = SchemaSources::from_dir("schemas/PL_009", &Limits::default())?;
//! let bundle = SchemaBundle::build("enviNFe_v4.00.xsd", &primary, &sources)?;
//!
//! let report = bundle.validate_str(&candidate)?;
//! for error in &report.errors {
//!     println!("{}", error);
//! }
//!
//! let diff = compare_documents(&accepted, &candidate, &Limits::default())?;
//! println!("{} differences", diff.difference_count());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;

pub mod documents;
pub mod loaders;
pub mod namespaces;

pub mod comparison;
pub mod validators;

// Re-exports for convenience
pub use comparison::{
    compare_documents, diff, flatten, flatten_str, outline, DiffResult, FlatDocument,
};
pub use error::{Error, ParseError, Result};
pub use limits::Limits;
pub use loaders::{SchemaResolver, SchemaSources};
pub use validators::{build_schema, ErrorKind, SchemaBundle, ValidationError, ValidationReport};

/// Version of the nfe-xsd library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
