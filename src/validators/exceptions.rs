//! Validation errors and reports
//!
//! Schema rejection of a well-formed document is a result, not an `Err`:
//! validation always returns a [`ValidationReport`].

use std::fmt;

use serde::Serialize;

/// Classification of a validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Root element has no global declaration
    UnknownRoot,
    /// Child element not allowed at its position
    UnexpectedElement,
    /// Required child element absent
    MissingElement,
    /// Attribute not declared for the element
    UnknownAttribute,
    /// Required attribute absent
    MissingAttribute,
    /// Value rejected by a datatype or facet
    InvalidValue,
    /// Value differs from a `fixed` constraint
    FixedValue,
    /// Character data in element-only or empty content
    UnexpectedText,
    /// Child elements where only text is allowed
    UnexpectedChildren,
    /// `xsi:nil` misuse
    Nil,
    /// `xsi:type` names an unknown or incompatible type
    UnknownType,
}

impl ErrorKind {
    /// Stable snake-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownRoot => "unknown_root",
            ErrorKind::UnexpectedElement => "unexpected_element",
            ErrorKind::MissingElement => "missing_element",
            ErrorKind::UnknownAttribute => "unknown_attribute",
            ErrorKind::MissingAttribute => "missing_attribute",
            ErrorKind::InvalidValue => "invalid_value",
            ErrorKind::FixedValue => "fixed_value",
            ErrorKind::UnexpectedText => "unexpected_text",
            ErrorKind::UnexpectedChildren => "unexpected_children",
            ErrorKind::Nil => "nil",
            ErrorKind::UnknownType => "unknown_type",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schema violation located in the candidate document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// 1-based line of the offending element
    pub line: u32,
    /// 1-based column of the offending element
    pub column: Option<u32>,
    /// Human-readable message
    pub message: String,
    /// Classification
    pub kind: ErrorKind,
    /// Namespace-stripped element path, e.g. `/enviNFe/NFe/infNFe/pag/detPag`
    pub path: String,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            line: 0,
            column: None,
            message: message.into(),
            kind,
            path: String::new(),
        }
    }

    /// Set the position
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = Some(column);
        self
    }

    /// Set the element path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(column) => write!(f, "{}:{}: {}", self.line, column, self.message),
            None => write!(f, "{}: {}", self.line, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Outcome of validating one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Whether the document satisfies the schema
    pub valid: bool,
    /// Errors in discovery order
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// Build a report from collected errors
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Whether the document is valid
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Errors of one kind
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}
