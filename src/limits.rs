//! Limits and constraints for document and schema processing
//!
//! Guards against oversized or pathologically deep inputs. Every entry point
//! that parses XML takes its limits from a [`Limits`] value.

use crate::error::{Error, Result};

/// Processing limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum element nesting depth
    pub max_xml_depth: usize,

    /// Maximum XML document size in bytes
    pub max_xml_size: usize,

    /// Maximum number of schema documents in one bundle
    pub max_schema_documents: usize,

    /// Maximum number of validation errors collected before giving up
    pub max_validation_errors: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 256,
            max_xml_size: 50 * 1024 * 1024, // 50 MB
            max_schema_documents: 64,
            max_validation_errors: 1000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 64,
            max_xml_size: 5 * 1024 * 1024, // 5 MB
            max_schema_documents: 16,
            max_validation_errors: 100,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 4096,
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
            max_schema_documents: 1024,
            max_validation_errors: usize::MAX,
        }
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_xml_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        if size > self.max_xml_size {
            Err(Error::LimitExceeded(format!(
                "XML size {} bytes exceeds maximum {} bytes",
                size, self.max_xml_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of loaded schema documents is within limits
    pub fn check_schema_documents(&self, count: usize) -> Result<()> {
        if count > self.max_schema_documents {
            Err(Error::LimitExceeded(format!(
                "Schema document count {} exceeds maximum {}",
                count, self.max_schema_documents
            )))
        } else {
            Ok(())
        }
    }
}
