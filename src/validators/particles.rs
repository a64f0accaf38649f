//! XSD particles
//!
//! A particle pairs a term (element, wildcard or model group) with its
//! occurrence bounds. Model groups are compiled into nested particles;
//! `xs:group` references are already inlined at this point.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::namespaces::QName;

use super::elements::ElementDecl;
use super::wildcards::Wildcard;

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences (default 1)
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded, default 1)
    pub max: Option<u32>,
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default occurrence (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// Check if this particle can be absent (minOccurs == 0)
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if another occurrence is allowed after `count`
    pub fn allows_more(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count < max,
            None => true,
        }
    }
}

/// Parse minOccurs/maxOccurs attribute values
pub fn parse_occurs(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Result<Occurs> {
    let mut occurs = Occurs::once();

    if let Some(min_str) = min_occurs {
        occurs.min = min_str.trim().parse::<u32>().map_err(|_| {
            Error::schema(format!(
                "minOccurs value '{}' is not a valid non-negative integer",
                min_str
            ))
        })?;
    }

    match max_occurs.map(str::trim) {
        Some("unbounded") => occurs.max = None,
        Some(max_str) => {
            let max = max_str.parse::<u32>().map_err(|_| {
                Error::schema(format!(
                    "maxOccurs value '{}' must be a non-negative integer or 'unbounded'",
                    max_str
                ))
            })?;
            if occurs.min > max {
                return Err(Error::schema(
                    "maxOccurs must be 'unbounded' or greater than minOccurs",
                ));
            }
            occurs.max = Some(max);
        }
        None if occurs.min > 1 => {
            return Err(Error::schema("minOccurs must be lesser or equal than maxOccurs"));
        }
        None => {}
    }

    Ok(occurs)
}

/// What a particle matches
#[derive(Debug, Clone)]
pub enum Term {
    /// Local element declaration
    Element(Arc<ElementDecl>),
    /// Reference to a global element declaration
    ElementRef(QName),
    /// `xs:any`
    Any(Wildcard),
    /// `xs:sequence`
    Sequence(Vec<Particle>),
    /// `xs:choice`
    Choice(Vec<Particle>),
    /// `xs:all`
    All(Vec<Particle>),
}

impl Term {
    /// Whether the term can match an empty child sequence
    pub fn is_nullable(&self) -> bool {
        match self {
            Term::Element(_) | Term::ElementRef(_) | Term::Any(_) => false,
            Term::Sequence(items) | Term::All(items) => items.iter().all(Particle::is_emptiable),
            Term::Choice(items) => items.iter().any(Particle::is_emptiable),
        }
    }

    /// Child particles of a model group
    pub fn children(&self) -> &[Particle] {
        match self {
            Term::Sequence(items) | Term::Choice(items) | Term::All(items) => items,
            _ => &[],
        }
    }
}

/// A term with occurrence bounds
#[derive(Debug, Clone)]
pub struct Particle {
    /// Occurrence bounds
    pub occurs: Occurs,
    /// Matched term
    pub term: Term,
}

impl Particle {
    /// Create a particle
    pub fn new(term: Term, occurs: Occurs) -> Self {
        Self { occurs, term }
    }

    /// Whether the particle can match an empty child sequence
    pub fn is_emptiable(&self) -> bool {
        self.occurs.is_emptiable() || self.term.is_nullable()
    }

    /// Visit this particle and every nested particle, depth first
    pub fn for_each(&self, f: &mut dyn FnMut(&Particle)) {
        f(self);
        for child in self.term.children() {
            child.for_each(f);
        }
    }
}
