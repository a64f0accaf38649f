//! Set difference of two flattened documents

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use super::flatten::{flatten, FlatDocument};
use crate::documents::parse_named_document;
use crate::error::Result;
use crate::limits::Limits;

/// A key present in both documents with different values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedValue {
    /// Path key
    pub key: String,
    /// Value in the reference document
    pub reference: String,
    /// Value in the candidate document
    pub candidate: String,
}

/// Classification of every key of two flattened documents
///
/// `missing`, `extra` and `changed` are disjoint and sorted by key; keys
/// equal in both documents are only counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// Keys of the reference absent from the candidate, with the reference value
    pub missing: Vec<(String, String)>,
    /// Keys of the candidate absent from the reference, with the candidate value
    pub extra: Vec<(String, String)>,
    /// Keys present in both with different values
    pub changed: Vec<ChangedValue>,
    /// Number of keys present in both with equal values
    pub unchanged: usize,
}

impl DiffResult {
    /// Whether the two documents flattened to the same mapping
    pub fn is_identical(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.changed.is_empty()
    }

    /// Number of differing keys
    pub fn difference_count(&self) -> usize {
        self.missing.len() + self.extra.len() + self.changed.len()
    }

    /// Missing keys only
    pub fn missing_keys(&self) -> impl Iterator<Item = &str> {
        self.missing.iter().map(|(k, _)| k.as_str())
    }

    /// Extra keys only
    pub fn extra_keys(&self) -> impl Iterator<Item = &str> {
        self.extra.iter().map(|(k, _)| k.as_str())
    }

    /// Changed keys only
    pub fn changed_keys(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(|c| c.key.as_str())
    }
}

/// Diff a reference mapping against a candidate mapping
///
/// Both maps iterate in key order, so a single merge pass classifies every
/// key and the output comes out sorted.
pub fn diff(reference: &FlatDocument, candidate: &FlatDocument) -> DiffResult {
    let mut result = DiffResult::default();
    let mut left = reference.iter().peekable();
    let mut right = candidate.iter().peekable();

    loop {
        let order = match (left.peek(), right.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((lk, _)), Some((rk, _))) => lk.cmp(rk),
        };

        match order {
            Ordering::Less => {
                if let Some((key, value)) = left.next() {
                    result.missing.push((key.to_string(), value.to_string()));
                }
            }
            Ordering::Greater => {
                if let Some((key, value)) = right.next() {
                    result.extra.push((key.to_string(), value.to_string()));
                }
            }
            Ordering::Equal => {
                if let (Some((key, old)), Some((_, new))) = (left.next(), right.next()) {
                    if old == new {
                        result.unchanged += 1;
                    } else {
                        result.changed.push(ChangedValue {
                            key: key.to_string(),
                            reference: old.to_string(),
                            candidate: new.to_string(),
                        });
                    }
                }
            }
        }
    }

    debug!(
        missing = result.missing.len(),
        extra = result.extra.len(),
        changed = result.changed.len(),
        unchanged = result.unchanged,
        "compared flattened documents"
    );

    result
}

/// Parse, flatten and diff two XML strings
pub fn compare_documents(
    reference_xml: &str,
    candidate_xml: &str,
    limits: &Limits,
) -> Result<DiffResult> {
    let reference = parse_named_document("reference", reference_xml, limits)?;
    let candidate = parse_named_document("candidate", candidate_xml, limits)?;
    Ok(diff(&flatten(&reference), &flatten(&candidate)))
}
