//! Structural comparison of XML documents
//!
//! Documents are flattened into path-indexed maps of trimmed text and
//! attribute values ([`flatten`]) and the maps are set-diffed ([`diff`]).
//! [`outline`] gives the element order view the key-based diff cannot show.

pub mod diff;
pub mod flatten;
pub mod outline;

pub use diff::{compare_documents, diff, ChangedValue, DiffResult};
pub use flatten::{flatten, flatten_str, FlatDocument};
pub use outline::{outline, OutlineEntry};
