//! Error types for nfe-xsd
//!
//! Parse and schema-assembly failures are errors. A document that parses but
//! is rejected by the schema is not: it yields a
//! [`ValidationReport`](crate::validators::ValidationReport) with `valid == false`.

use std::fmt;
use thiserror::Error;

/// Result type alias using the crate Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nfe-xsd operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input is not well-formed XML
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A schema reference could not be resolved against the supplied schema set
    #[error("unresolved schema reference '{reference}' (referenced from '{referenced_from}')")]
    SchemaAssembly {
        /// Basename that was looked up
        reference: String,
        /// Schema document that mentions the reference
        referenced_from: String,
    },

    /// Schema document is structurally unusable
    #[error("schema error: {0}")]
    Schema(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Shorthand for a schema component error
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Error::Schema(message.into())
    }
}

/// XML well-formedness error with position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Name of the document (file name or schema reference)
    pub source_name: Option<String>,
    /// 1-based line
    pub line: Option<u32>,
    /// 1-based column
    pub column: Option<u32>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source_name: None,
            line: None,
            column: None,
        }
    }

    /// Set the document name
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Set the position
    pub fn with_position(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl From<roxmltree::Error> for ParseError {
    fn from(err: roxmltree::Error) -> Self {
        let pos = err.pos();
        ParseError::new(err.to_string()).with_position(pos.row, pos.col)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref name) = self.source_name {
            write!(f, "{}: ", name)?;
        }

        write!(f, "{}", self.message)?;

        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, " (line {}, column {})", line, column)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}
