//! XSD constraining facets
//!
//! One [`Facets`] value holds the facets declared by a single restriction
//! step. Patterns of the same step are alternatives; steps of a derivation
//! chain are checked one after another, so their facets combine.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Parse from the facet's `value` attribute
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "preserve" => Ok(WhiteSpace::Preserve),
            "replace" => Ok(WhiteSpace::Replace),
            "collapse" => Ok(WhiteSpace::Collapse),
            _ => Err(Error::schema(format!(
                "Invalid whiteSpace value: '{}'. Must be 'preserve', 'replace', or 'collapse'",
                s
            ))),
        }
    }

    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => s.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

/// Compiled `xs:pattern`
#[derive(Debug, Clone)]
pub struct PatternFacet {
    /// Pattern as written in the schema
    pub pattern: String,
    regex: Regex,
}

impl PatternFacet {
    /// Compile an XSD regular expression
    pub fn new(pattern: &str) -> Result<Self> {
        let translated = translate_pattern(pattern);
        let regex = Regex::new(&format!("^(?:{})$", translated)).map_err(|e| {
            Error::schema(format!("Invalid pattern '{}': {}", pattern, e))
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Whether the whole value matches
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// Translate XSD regex syntax to the `regex` crate's dialect
///
/// XSD patterns are implicitly anchored, treat `^` and `$` as literals, use
/// `-[...]` for class subtraction and have the `\i`/`\c` name escapes.
fn translate_pattern(pattern: &str) -> String {
    const NAME_START: &str = r"_:\p{L}";
    const NAME_CHAR: &str = r"\-._:\p{L}\p{N}";

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    let mut class_depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('i') if class_depth > 0 => out.push_str(NAME_START),
                Some('i') => out.push_str(&format!("[{}]", NAME_START)),
                Some('I') => out.push_str(&format!("[^{}]", NAME_START)),
                Some('c') if class_depth > 0 => out.push_str(NAME_CHAR),
                Some('c') => out.push_str(&format!("[{}]", NAME_CHAR)),
                Some('C') => out.push_str(&format!("[^{}]", NAME_CHAR)),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push_str(r"\\"),
            },
            '[' => {
                class_depth += 1;
                out.push('[');
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(']');
            }
            '-' if class_depth > 0 && chars.peek() == Some(&'[') => out.push_str("--"),
            '.' if class_depth == 0 => out.push_str(r"[^\n\r]"),
            '^' if class_depth == 0 => out.push_str(r"\^"),
            '$' if class_depth == 0 => out.push_str(r"\$"),
            other => out.push(other),
        }
    }

    out
}

/// How length facets measure a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    /// Characters
    Chars,
    /// Octets of a hex-encoded value
    HexOctets,
    /// Octets of a base64-encoded value
    Base64Octets,
    /// Items of a list
    Items,
}

impl LengthUnit {
    fn measure(&self, value: &str) -> usize {
        match self {
            LengthUnit::Chars => value.chars().count(),
            LengthUnit::HexOctets => value.len() / 2,
            LengthUnit::Base64Octets => {
                let clean: Vec<char> = value.chars().filter(|c| !c.is_whitespace()).collect();
                let padding = clean.iter().rev().take_while(|c| **c == '=').count();
                (clean.len() / 4) * 3 - padding.min(2)
            }
            LengthUnit::Items => value.split_whitespace().count(),
        }
    }
}

/// Facets declared by one restriction step
#[derive(Debug, Clone, Default)]
pub struct Facets {
    /// whiteSpace
    pub white_space: Option<WhiteSpace>,
    /// pattern (alternatives)
    pub patterns: Vec<PatternFacet>,
    /// enumeration (empty means unconstrained)
    pub enumeration: Vec<String>,
    /// length
    pub length: Option<usize>,
    /// minLength
    pub min_length: Option<usize>,
    /// maxLength
    pub max_length: Option<usize>,
    /// totalDigits
    pub total_digits: Option<u32>,
    /// fractionDigits
    pub fraction_digits: Option<u32>,
    /// minInclusive
    pub min_inclusive: Option<Decimal>,
    /// maxInclusive
    pub max_inclusive: Option<Decimal>,
    /// minExclusive
    pub min_exclusive: Option<Decimal>,
    /// maxExclusive
    pub max_exclusive: Option<Decimal>,
}

/// A facet rejected a value; the message follows libxml2's wording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetViolation(pub String);

impl fmt::Display for FacetViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Facets {
    /// Whether no facet is declared
    pub fn is_empty(&self) -> bool {
        self.white_space.is_none()
            && self.patterns.is_empty()
            && self.enumeration.is_empty()
            && self.length.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.total_digits.is_none()
            && self.fraction_digits.is_none()
            && self.min_inclusive.is_none()
            && self.max_inclusive.is_none()
            && self.min_exclusive.is_none()
            && self.max_exclusive.is_none()
    }

    /// Record one facet element (`name` is the facet's local name)
    pub fn add(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "whiteSpace" => self.white_space = Some(WhiteSpace::parse(value)?),
            "pattern" => self.patterns.push(PatternFacet::new(value)?),
            "enumeration" => self.enumeration.push(value.to_string()),
            "length" => self.length = Some(parse_number(name, value)?),
            "minLength" => self.min_length = Some(parse_number(name, value)?),
            "maxLength" => self.max_length = Some(parse_number(name, value)?),
            "totalDigits" => self.total_digits = Some(parse_number(name, value)?),
            "fractionDigits" => self.fraction_digits = Some(parse_number(name, value)?),
            "minInclusive" => self.min_inclusive = Some(parse_bound(name, value)?),
            "maxInclusive" => self.max_inclusive = Some(parse_bound(name, value)?),
            "minExclusive" => self.min_exclusive = Some(parse_bound(name, value)?),
            "maxExclusive" => self.max_exclusive = Some(parse_bound(name, value)?),
            // assertions, explicitTimezone and friends are XSD 1.1
            _ => {}
        }
        Ok(())
    }

    /// Check an already normalized value
    pub fn check(&self, value: &str, unit: LengthUnit) -> std::result::Result<(), FacetViolation> {
        if !self.patterns.is_empty() && !self.patterns.iter().any(|p| p.is_match(value)) {
            let pattern = self
                .patterns
                .iter()
                .map(|p| p.pattern.as_str())
                .collect::<Vec<_>>()
                .join("|");
            return Err(FacetViolation(format!(
                "[facet 'pattern'] The value '{}' is not accepted by the pattern '{}'.",
                value, pattern
            )));
        }

        if !self.enumeration.is_empty() && !self.enumeration.iter().any(|e| e == value) {
            let set = self
                .enumeration
                .iter()
                .map(|e| format!("'{}'", e))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(FacetViolation(format!(
                "[facet 'enumeration'] The value '{}' is not an element of the set {{{}}}.",
                value, set
            )));
        }

        self.check_length(value, unit)?;
        self.check_numeric(value)
    }

    fn check_length(
        &self,
        value: &str,
        unit: LengthUnit,
    ) -> std::result::Result<(), FacetViolation> {
        if self.length.is_none() && self.min_length.is_none() && self.max_length.is_none() {
            return Ok(());
        }

        let len = unit.measure(value);

        if let Some(expected) = self.length {
            if len != expected {
                return Err(FacetViolation(format!(
                    "[facet 'length'] The value '{}' has a length of '{}'; this differs from the allowed length of '{}'.",
                    value, len, expected
                )));
            }
        }
        if let Some(min) = self.min_length {
            if len < min {
                return Err(FacetViolation(format!(
                    "[facet 'minLength'] The value '{}' has a length of '{}'; this underruns the allowed minimum length of '{}'.",
                    value, len, min
                )));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(FacetViolation(format!(
                    "[facet 'maxLength'] The value '{}' has a length of '{}'; this exceeds the allowed maximum length of '{}'.",
                    value, len, max
                )));
            }
        }
        Ok(())
    }

    fn check_numeric(&self, value: &str) -> std::result::Result<(), FacetViolation> {
        let needs_number = self.total_digits.is_some()
            || self.fraction_digits.is_some()
            || self.min_inclusive.is_some()
            || self.max_inclusive.is_some()
            || self.min_exclusive.is_some()
            || self.max_exclusive.is_some();
        if !needs_number {
            return Ok(());
        }

        // Non-numeric values were already rejected by their datatype
        let Ok(number) = Decimal::from_str(value.trim_start_matches('+')) else {
            return Ok(());
        };

        if let Some(max_digits) = self.total_digits {
            let (total, _) = count_digits(value);
            if total > max_digits {
                return Err(FacetViolation(format!(
                    "[facet 'totalDigits'] The value '{}' has more digits than are allowed ('{}').",
                    value, max_digits
                )));
            }
        }
        if let Some(max_fraction) = self.fraction_digits {
            let (_, fraction) = count_digits(value);
            if fraction > max_fraction {
                return Err(FacetViolation(format!(
                    "[facet 'fractionDigits'] The value '{}' has more fractional digits than are allowed ('{}').",
                    value, max_fraction
                )));
            }
        }
        if let Some(ref min) = self.min_inclusive {
            if number < *min {
                return Err(FacetViolation(format!(
                    "[facet 'minInclusive'] The value '{}' is less than the minimum value allowed ('{}').",
                    value, min
                )));
            }
        }
        if let Some(ref max) = self.max_inclusive {
            if number > *max {
                return Err(FacetViolation(format!(
                    "[facet 'maxInclusive'] The value '{}' is greater than the maximum value allowed ('{}').",
                    value, max
                )));
            }
        }
        if let Some(ref min) = self.min_exclusive {
            if number <= *min {
                return Err(FacetViolation(format!(
                    "[facet 'minExclusive'] The value '{}' must be greater than '{}'.",
                    value, min
                )));
            }
        }
        if let Some(ref max) = self.max_exclusive {
            if number >= *max {
                return Err(FacetViolation(format!(
                    "[facet 'maxExclusive'] The value '{}' must be less than '{}'.",
                    value, max
                )));
            }
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(facet: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::schema(format!("Invalid {} facet value: '{}'", facet, value)))
}

fn parse_bound(facet: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim().trim_start_matches('+'))
        .map_err(|_| Error::schema(format!("Unsupported {} facet value: '{}'", facet, value)))
}

/// (significant total digits, fraction digits) of a decimal literal
fn count_digits(value: &str) -> (u32, u32) {
    let unsigned = value.trim_start_matches(['+', '-']);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    let int_digits = int_part.trim_start_matches('0');
    let frac_digits = frac_part.trim_end_matches('0');

    let total = int_digits.len() + frac_digits.len();
    (total.max(1) as u32, frac_digits.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_space_normalize() {
        assert_eq!(WhiteSpace::Preserve.normalize(" a\tb "), " a\tb ");
        assert_eq!(WhiteSpace::Replace.normalize("a\tb\nc"), "a b c");
        assert_eq!(WhiteSpace::Collapse.normalize("  a \t\n b  "), "a b");
        assert!(WhiteSpace::parse("squash").is_err());
    }

    #[test]
    fn test_pattern_is_anchored() {
        let p = PatternFacet::new("[0-9]{2}").unwrap();
        assert!(p.is_match("35"));
        assert!(!p.is_match("351"));
        assert!(!p.is_match("x35"));
    }

    #[test]
    fn test_pattern_alternation_is_grouped() {
        let p = PatternFacet::new("0|0\\.[0-9]{2}|[1-9]{1}[0-9]{0,12}(\\.[0-9]{2})?").unwrap();
        assert!(p.is_match("0"));
        assert!(p.is_match("11.70"));
        assert!(!p.is_match("11.7"));
        assert!(!p.is_match("011.70"));
    }

    #[test]
    fn test_pattern_literal_anchors_and_dot() {
        let p = PatternFacet::new("a.c").unwrap();
        assert!(p.is_match("abc"));
        assert!(!p.is_match("a\nc"));

        let dollar = PatternFacet::new("US$[0-9]+").unwrap();
        assert!(dollar.is_match("US$10"));
    }

    #[test]
    fn test_pattern_name_escapes_and_subtraction() {
        let name = PatternFacet::new(r"\i\c*").unwrap();
        assert!(name.is_match("infNFe"));
        assert!(!name.is_match("1abc"));

        let consonants = PatternFacet::new("[a-z-[aeiou]]+").unwrap();
        assert!(consonants.is_match("xyz"));
        assert!(!consonants.is_match("abc"));
    }

    #[test]
    fn test_nfe_string_pattern() {
        let t_string = PatternFacet::new("[!-ÿ]{1}[ -ÿ]{0,}[!-ÿ]{1}|[!-ÿ]{1}").unwrap();
        assert!(t_string.is_match("VENDA DE MERCADORIA"));
        assert!(t_string.is_match("X"));
        assert!(!t_string.is_match(" Venda"));
    }

    #[test]
    fn test_enumeration_and_lengths() {
        let mut facets = Facets::default();
        facets.add("enumeration", "55").unwrap();
        facets.add("enumeration", "65").unwrap();
        assert!(facets.check("55", LengthUnit::Chars).is_ok());
        let err = facets.check("57", LengthUnit::Chars).unwrap_err();
        assert!(err.0.contains("not an element of the set {'55', '65'}"));

        let mut lengths = Facets::default();
        lengths.add("minLength", "2").unwrap();
        lengths.add("maxLength", "60").unwrap();
        assert!(lengths.check("ok", LengthUnit::Chars).is_ok());
        assert!(lengths.check("x", LengthUnit::Chars).unwrap_err().0.contains("minLength"));
    }

    #[test]
    fn test_numeric_facets() {
        let mut facets = Facets::default();
        facets.add("totalDigits", "5").unwrap();
        facets.add("fractionDigits", "2").unwrap();
        facets.add("minInclusive", "0").unwrap();

        assert!(facets.check("123.45", LengthUnit::Chars).is_ok());
        assert!(facets.check("1234.5", LengthUnit::Chars).is_ok());
        assert!(facets.check("123.456", LengthUnit::Chars).is_err());
        assert!(facets.check("-1", LengthUnit::Chars).unwrap_err().0.contains("minInclusive"));
        assert!(facets.check("123456", LengthUnit::Chars).unwrap_err().0.contains("totalDigits"));
    }

    #[test]
    fn test_count_digits() {
        assert_eq!(count_digits("0.00"), (1, 0));
        assert_eq!(count_digits("11.70"), (3, 1));
        assert_eq!(count_digits("-007.5"), (2, 1));
    }

    #[test]
    fn test_octet_lengths() {
        assert_eq!(LengthUnit::HexOctets.measure("0A0B"), 2);
        assert_eq!(LengthUnit::Base64Octets.measure("QUJD"), 3);
        assert_eq!(LengthUnit::Base64Octets.measure("QUI="), 2);
        assert_eq!(LengthUnit::Items.measure("a b  c"), 3);
    }
}
