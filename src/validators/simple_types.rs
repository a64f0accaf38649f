//! Simple type definitions
//!
//! A value is checked from the bottom of its derivation chain upwards: the
//! built-in lexical form first, then the facets of every restriction step.

use crate::namespaces::QName;

use super::base::{ComponentLookup, TypeDef, TypeRef};
use super::builtins::BuiltinType;
use super::facets::{Facets, LengthUnit, WhiteSpace};

/// Derivation chains longer than this are treated as circular
const MAX_DERIVATION_DEPTH: usize = 64;

/// How a simple type is built
#[derive(Debug, Clone)]
pub enum Variety {
    /// Built-in type
    Builtin(BuiltinType),
    /// Restriction of another simple type
    Restriction(TypeRef),
    /// Whitespace-separated list of an item type
    List(TypeRef),
    /// Union of member types
    Union(Vec<TypeRef>),
}

/// A compiled simple type
#[derive(Debug, Clone)]
pub struct SimpleType {
    /// Name of a global type
    pub name: Option<QName>,
    /// Derivation
    pub variety: Variety,
    /// Facets of this derivation step
    pub facets: Facets,
}

impl SimpleType {
    /// Built-in type definition
    pub fn builtin(builtin: BuiltinType) -> Self {
        Self {
            name: Some(QName::xsd(builtin.local_name())),
            variety: Variety::Builtin(builtin),
            facets: Facets::default(),
        }
    }

    /// Name used in messages
    pub fn display_name(&self) -> String {
        match (&self.name, &self.variety) {
            (_, Variety::Builtin(b)) => b.to_string(),
            (Some(name), _) => name.to_string(),
            (None, _) => "local type".to_string(),
        }
    }

    /// Effective white space mode
    pub fn white_space(&self, lookup: &dyn ComponentLookup) -> WhiteSpace {
        self.white_space_at(lookup, 0)
    }

    fn white_space_at(&self, lookup: &dyn ComponentLookup, depth: usize) -> WhiteSpace {
        if let Some(ws) = self.facets.white_space {
            return ws;
        }
        match &self.variety {
            Variety::Builtin(b) => b.white_space(),
            Variety::Restriction(base) if depth < MAX_DERIVATION_DEPTH => {
                match resolve_simple(base, lookup) {
                    Some(base) => base.white_space_at(lookup, depth + 1),
                    None => WhiteSpace::Collapse,
                }
            }
            _ => WhiteSpace::Collapse,
        }
    }

    fn length_unit(&self, lookup: &dyn ComponentLookup, depth: usize) -> LengthUnit {
        match &self.variety {
            Variety::Builtin(b) => b.length_unit(),
            Variety::List(_) => LengthUnit::Items,
            Variety::Union(_) => LengthUnit::Chars,
            Variety::Restriction(base) if depth < MAX_DERIVATION_DEPTH => {
                match resolve_simple(base, lookup) {
                    Some(base) => base.length_unit(lookup, depth + 1),
                    None => LengthUnit::Chars,
                }
            }
            Variety::Restriction(_) => LengthUnit::Chars,
        }
    }

    /// Check a raw value, returning the normalized value on success
    ///
    /// The error text is the libxml2-style detail without the element prefix.
    pub fn validate(&self, raw: &str, lookup: &dyn ComponentLookup) -> Result<String, String> {
        self.validate_at(raw, lookup, 0)
    }

    fn validate_at(
        &self,
        raw: &str,
        lookup: &dyn ComponentLookup,
        depth: usize,
    ) -> Result<String, String> {
        if depth >= MAX_DERIVATION_DEPTH {
            return Err(format!(
                "The derivation of type '{}' is too deep or circular.",
                self.display_name()
            ));
        }

        let value = self.white_space_at(lookup, depth).normalize(raw);

        match &self.variety {
            Variety::Builtin(builtin) => builtin.check(&value)?,
            Variety::Restriction(base) => {
                let base = resolve_simple(base, lookup).ok_or_else(|| unresolved(base))?;
                base.validate_at(&value, lookup, depth + 1)?;
            }
            Variety::List(item) => {
                let item = resolve_simple(item, lookup).ok_or_else(|| unresolved(item))?;
                for token in value.split_whitespace() {
                    item.validate_at(token, lookup, depth + 1)?;
                }
            }
            Variety::Union(members) => {
                let accepted = members.iter().any(|member| {
                    resolve_simple(member, lookup)
                        .map(|m| m.validate_at(&value, lookup, depth + 1).is_ok())
                        .unwrap_or(false)
                });
                if !accepted {
                    return Err(format!(
                        "'{}' is not a valid value of the union type '{}'.",
                        value,
                        self.display_name()
                    ));
                }
            }
        }

        self.facets
            .check(&value, self.length_unit(lookup, depth))
            .map_err(|violation| violation.0)?;

        Ok(value)
    }
}

/// Resolve a reference that must name a simple type
///
/// `xs:anyType` and complex types with simple content are not simple types;
/// the caller decides what that means.
pub fn resolve_simple<'a>(
    type_ref: &'a TypeRef,
    lookup: &'a dyn ComponentLookup,
) -> Option<&'a SimpleType> {
    match type_ref.resolve(lookup)? {
        TypeDef::Simple(st) => Some(st),
        TypeDef::Complex(_) => None,
    }
}

fn unresolved(type_ref: &TypeRef) -> String {
    format!("The type '{}' is not a simple type.", type_ref.display_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::attributes::AttributeDecl;
    use crate::validators::elements::ElementDecl;
    use indexmap::IndexMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct Types(IndexMap<QName, TypeDef>);

    impl ComponentLookup for Types {
        fn global_element(&self, _: &QName) -> Option<&Arc<ElementDecl>> {
            None
        }

        fn global_attribute(&self, _: &QName) -> Option<&Arc<AttributeDecl>> {
            None
        }

        fn type_definition(&self, name: &QName) -> Option<&TypeDef> {
            self.0.get(name)
        }
    }

    fn types() -> Types {
        let mut types = Types::default();
        for builtin in BuiltinType::ALL {
            types.0.insert(
                QName::xsd(builtin.local_name()),
                TypeDef::Simple(SimpleType::builtin(builtin)),
            );
        }
        types
    }

    fn restriction(name: &str, base: QName, facets: &[(&str, &str)]) -> SimpleType {
        let mut parsed = Facets::default();
        for (facet, value) in facets {
            parsed.add(facet, value).unwrap();
        }
        SimpleType {
            name: Some(QName::local(name)),
            variety: Variety::Restriction(TypeRef::Named(base)),
            facets: parsed,
        }
    }

    #[test]
    fn test_restriction_chain() {
        let mut lookup = types();
        let t_dec = restriction("TDec_1302", QName::xsd("string"), &[
            ("whiteSpace", "preserve"),
            ("pattern", "0|0\\.[0-9]{2}|[1-9]{1}[0-9]{0,12}(\\.[0-9]{2})?"),
        ]);
        lookup.0.insert(QName::local("TDec_1302"), TypeDef::Simple(t_dec));

        let positive = restriction(
            "TDec_1302Opc",
            QName::local("TDec_1302"),
            &[("pattern", "[1-9].*")],
        );

        assert_eq!(positive.validate("11.70", &lookup).unwrap(), "11.70");
        let err = positive.validate("0.00", &lookup).unwrap_err();
        assert!(err.contains("[1-9].*"), "{}", err);
        let err = positive.validate("11.7", &lookup).unwrap_err();
        assert!(err.contains("[facet 'pattern']"), "{}", err);
    }

    #[test]
    fn test_builtin_base_checked_first() {
        let lookup = types();
        let amount = restriction("amount", QName::xsd("decimal"), &[("maxInclusive", "100")]);

        assert!(amount.validate(" 99.5 ", &lookup).is_ok());
        assert!(amount.validate("abc", &lookup).unwrap_err().contains("atomic type 'xs:decimal'"));
        assert!(amount.validate("100.01", &lookup).unwrap_err().contains("maxInclusive"));
    }

    #[test]
    fn test_list_and_union() {
        let lookup = types();
        let list = SimpleType {
            name: None,
            variety: Variety::List(TypeRef::Named(QName::xsd("int"))),
            facets: {
                let mut f = Facets::default();
                f.add("maxLength", "3").unwrap();
                f
            },
        };
        assert!(list.validate("1 2  3", &lookup).is_ok());
        assert!(list.validate("1 x", &lookup).is_err());
        assert!(list.validate("1 2 3 4", &lookup).unwrap_err().contains("maxLength"));

        let union = SimpleType {
            name: Some(QName::local("dateOrCode")),
            variety: Variety::Union(vec![
                TypeRef::Named(QName::xsd("date")),
                TypeRef::Named(QName::xsd("boolean")),
            ]),
            facets: Facets::default(),
        };
        assert!(union.validate("2024-05-01", &lookup).is_ok());
        assert!(union.validate("true", &lookup).is_ok());
        assert!(union.validate("maybe", &lookup).unwrap_err().contains("union type 'dateOrCode'"));
    }

    #[test]
    fn test_white_space_inherited() {
        let lookup = types();
        let token = restriction("code", QName::xsd("token"), &[("length", "2")]);
        assert_eq!(token.white_space(&lookup), WhiteSpace::Collapse);
        assert_eq!(token.validate("  55 ", &lookup).unwrap(), "55");
    }

    #[test]
    fn test_circular_restriction_is_reported() {
        let mut lookup = types();
        lookup.0.insert(
            QName::local("a"),
            TypeDef::Simple(restriction("a", QName::local("b"), &[])),
        );
        lookup.0.insert(
            QName::local("b"),
            TypeDef::Simple(restriction("b", QName::local("a"), &[])),
        );
        let a = restriction("a", QName::local("b"), &[]);
        assert!(a.validate("x", &lookup).is_err());
    }
}
