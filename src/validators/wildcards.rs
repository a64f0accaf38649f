//! XSD wildcards
//!
//! `xs:any` and `xs:anyAttribute` admit names by namespace. Namespaces are
//! resolved against the declaring schema's target namespace when the schema
//! is compiled, so a wildcard is self-contained afterwards.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// Validate strictly - element/attribute must be declared
    #[default]
    Strict,
    /// Validate if declaration found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl ProcessContents {
    /// Parse from the `processContents` attribute
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "skip" => Ok(Self::Skip),
            other => Err(Error::schema(format!(
                "wrong value '{}' in 'processContents' attribute",
                other
            ))),
        }
    }
}

impl fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Namespace constraint for wildcards
///
/// The empty string stands for "no namespace".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceConstraint {
    /// Any namespace is allowed (##any)
    #[default]
    Any,
    /// Any namespace except the target namespace and no namespace (##other)
    Other(String),
    /// Specific set of allowed namespaces
    Enumeration(BTreeSet<String>),
}

impl NamespaceConstraint {
    /// Create from the `namespace` attribute
    pub fn parse(value: &str, target_namespace: Option<&str>) -> Result<Self> {
        match value.trim() {
            "##any" => Ok(Self::Any),
            "##other" => Ok(Self::Other(target_namespace.unwrap_or("").to_string())),
            list => {
                let mut namespaces = BTreeSet::new();
                for ns in list.split_whitespace() {
                    match ns {
                        "##local" => {
                            namespaces.insert(String::new());
                        }
                        "##targetNamespace" => {
                            namespaces.insert(target_namespace.unwrap_or("").to_string());
                        }
                        s if s.starts_with("##") => {
                            return Err(Error::schema(format!(
                                "wrong value '{}' in 'namespace' attribute",
                                s
                            )));
                        }
                        uri => {
                            namespaces.insert(uri.to_string());
                        }
                    }
                }
                Ok(Self::Enumeration(namespaces))
            }
        }
    }

    /// Check if a namespace is allowed by this constraint
    pub fn is_allowed(&self, namespace: Option<&str>) -> bool {
        let namespace = namespace.unwrap_or("");
        match self {
            Self::Any => true,
            Self::Other(tns) => !namespace.is_empty() && namespace != tns,
            Self::Enumeration(set) => set.contains(namespace),
        }
    }
}

impl fmt::Display for NamespaceConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "##any"),
            Self::Other(_) => write!(f, "##other"),
            Self::Enumeration(set) => {
                let items: Vec<&str> = set
                    .iter()
                    .map(|ns| if ns.is_empty() { "##local" } else { ns.as_str() })
                    .collect();
                write!(f, "{}", items.join(" "))
            }
        }
    }
}

/// A compiled `xs:any` or `xs:anyAttribute`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Wildcard {
    /// Admitted namespaces
    pub namespaces: NamespaceConstraint,
    /// How matched items are validated
    pub process_contents: ProcessContents,
}

impl Wildcard {
    /// Wildcard admitting everything with the given processing mode
    pub fn any(process_contents: ProcessContents) -> Self {
        Self {
            namespaces: NamespaceConstraint::Any,
            process_contents,
        }
    }

    /// Whether a name in `namespace` is admitted
    pub fn matches(&self, namespace: Option<&str>) -> bool {
        self.namespaces.is_allowed(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TNS: &str = "http://www.portalfiscal.inf.br/nfe";
    const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

    #[test]
    fn test_process_contents_parse() {
        assert_eq!(ProcessContents::parse("lax").unwrap(), ProcessContents::Lax);
        assert_eq!(ProcessContents::parse(" skip ").unwrap(), ProcessContents::Skip);
        assert!(ProcessContents::parse("loose").is_err());
    }

    #[test]
    fn test_any_and_other() {
        let any = NamespaceConstraint::parse("##any", Some(TNS)).unwrap();
        assert!(any.is_allowed(None));
        assert!(any.is_allowed(Some(DSIG)));

        let other = NamespaceConstraint::parse("##other", Some(TNS)).unwrap();
        assert!(other.is_allowed(Some(DSIG)));
        assert!(!other.is_allowed(Some(TNS)));
        assert!(!other.is_allowed(None));
    }

    #[test]
    fn test_enumeration() {
        let list = NamespaceConstraint::parse("##targetNamespace ##local", Some(TNS)).unwrap();
        assert!(list.is_allowed(Some(TNS)));
        assert!(list.is_allowed(None));
        assert!(!list.is_allowed(Some(DSIG)));

        assert!(NamespaceConstraint::parse("##bogus", None).is_err());
    }

    #[test]
    fn test_wildcard_matches() {
        let wildcard = Wildcard {
            namespaces: NamespaceConstraint::parse(DSIG, Some(TNS)).unwrap(),
            process_contents: ProcessContents::Lax,
        };
        assert!(wildcard.matches(Some(DSIG)));
        assert!(!wildcard.matches(Some(TNS)));
        assert!(Wildcard::any(ProcessContents::Skip).matches(None));
    }
}
