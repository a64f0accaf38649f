//! XSD built-in types
//!
//! The XSD 1.0 primitive and derived simple types with their lexical
//! checks. Values reach [`BuiltinType::check`] already white space
//! normalized.

use std::fmt;

use base64::Engine;
use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::facets::{LengthUnit, WhiteSpace};

static NCNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}_][\p{L}\p{N}._\-\u{B7}]*$").unwrap());
static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}_:][\p{L}\p{N}._:\-\u{B7}]*$").unwrap());
static NMTOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}._:\-\u{B7}]+$").unwrap());
static QNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\p{L}_][\p{L}\p{N}._\-]*:)?[\p{L}_][\p{L}\p{N}._\-]*$").unwrap()
});
static LANGUAGE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").unwrap());
static DECIMAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$").unwrap());
static INTEGER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").unwrap());
static FLOAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?|-?INF|NaN)$").unwrap()
});
static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?P([0-9]+Y)?([0-9]+M)?([0-9]+D)?(T([0-9]+H)?([0-9]+M)?([0-9]+(\.[0-9]+)?S)?)?$")
        .unwrap()
});
static DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(-?[0-9]{4,}-[0-9]{2}-[0-9]{2})T([0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?)(Z|[+-][0-9]{2}:[0-9]{2})?$",
    )
    .unwrap()
});
static DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?[0-9]{4,}-[0-9]{2}-[0-9]{2})(Z|[+-][0-9]{2}:[0-9]{2})?$").unwrap()
});
static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?)(Z|[+-][0-9]{2}:[0-9]{2})?$").unwrap()
});
static GYEAR_MONTH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?[0-9]{4,}-(0[1-9]|1[0-2])(Z|[+-][0-9]{2}:[0-9]{2})?$").unwrap()
});
static GYEAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[0-9]{4,}(Z|[+-][0-9]{2}:[0-9]{2})?$").unwrap());
static GMONTH_DAY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^--(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])(Z|[+-][0-9]{2}:[0-9]{2})?$").unwrap()
});
static GDAY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^---(0[1-9]|[12][0-9]|3[01])(Z|[+-][0-9]{2}:[0-9]{2})?$").unwrap()
});
static GMONTH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--(0[1-9]|1[0-2])(Z|[+-][0-9]{2}:[0-9]{2})?$").unwrap());
static HEX_BINARY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9a-fA-F]{2})*$").unwrap());

/// Built-in simple types of XSD 1.0, named after their XSD local names
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    AnySimpleType,
    String,
    NormalizedString,
    Token,
    Language,
    Name,
    NCName,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    NmToken,
    NmTokens,
    Boolean,
    Decimal,
    Integer,
    NonPositiveInteger,
    NegativeInteger,
    Long,
    Int,
    Short,
    Byte,
    NonNegativeInteger,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    PositiveInteger,
    Float,
    Double,
    Duration,
    DateTime,
    Time,
    Date,
    GYearMonth,
    GYear,
    GMonthDay,
    GDay,
    GMonth,
    HexBinary,
    Base64Binary,
    AnyUri,
    QName,
    Notation,
}

impl BuiltinType {
    /// Every built-in type
    pub const ALL: [BuiltinType; 45] = [
        BuiltinType::AnySimpleType,
        BuiltinType::String,
        BuiltinType::NormalizedString,
        BuiltinType::Token,
        BuiltinType::Language,
        BuiltinType::Name,
        BuiltinType::NCName,
        BuiltinType::Id,
        BuiltinType::IdRef,
        BuiltinType::IdRefs,
        BuiltinType::Entity,
        BuiltinType::Entities,
        BuiltinType::NmToken,
        BuiltinType::NmTokens,
        BuiltinType::Boolean,
        BuiltinType::Decimal,
        BuiltinType::Integer,
        BuiltinType::NonPositiveInteger,
        BuiltinType::NegativeInteger,
        BuiltinType::Long,
        BuiltinType::Int,
        BuiltinType::Short,
        BuiltinType::Byte,
        BuiltinType::NonNegativeInteger,
        BuiltinType::UnsignedLong,
        BuiltinType::UnsignedInt,
        BuiltinType::UnsignedShort,
        BuiltinType::UnsignedByte,
        BuiltinType::PositiveInteger,
        BuiltinType::Float,
        BuiltinType::Double,
        BuiltinType::Duration,
        BuiltinType::DateTime,
        BuiltinType::Time,
        BuiltinType::Date,
        BuiltinType::GYearMonth,
        BuiltinType::GYear,
        BuiltinType::GMonthDay,
        BuiltinType::GDay,
        BuiltinType::GMonth,
        BuiltinType::HexBinary,
        BuiltinType::Base64Binary,
        BuiltinType::AnyUri,
        BuiltinType::QName,
        BuiltinType::Notation,
    ];

    /// Local name in the XSD namespace
    pub fn local_name(&self) -> &'static str {
        match self {
            BuiltinType::AnySimpleType => "anySimpleType",
            BuiltinType::String => "string",
            BuiltinType::NormalizedString => "normalizedString",
            BuiltinType::Token => "token",
            BuiltinType::Language => "language",
            BuiltinType::Name => "Name",
            BuiltinType::NCName => "NCName",
            BuiltinType::Id => "ID",
            BuiltinType::IdRef => "IDREF",
            BuiltinType::IdRefs => "IDREFS",
            BuiltinType::Entity => "ENTITY",
            BuiltinType::Entities => "ENTITIES",
            BuiltinType::NmToken => "NMTOKEN",
            BuiltinType::NmTokens => "NMTOKENS",
            BuiltinType::Boolean => "boolean",
            BuiltinType::Decimal => "decimal",
            BuiltinType::Integer => "integer",
            BuiltinType::NonPositiveInteger => "nonPositiveInteger",
            BuiltinType::NegativeInteger => "negativeInteger",
            BuiltinType::Long => "long",
            BuiltinType::Int => "int",
            BuiltinType::Short => "short",
            BuiltinType::Byte => "byte",
            BuiltinType::NonNegativeInteger => "nonNegativeInteger",
            BuiltinType::UnsignedLong => "unsignedLong",
            BuiltinType::UnsignedInt => "unsignedInt",
            BuiltinType::UnsignedShort => "unsignedShort",
            BuiltinType::UnsignedByte => "unsignedByte",
            BuiltinType::PositiveInteger => "positiveInteger",
            BuiltinType::Float => "float",
            BuiltinType::Double => "double",
            BuiltinType::Duration => "duration",
            BuiltinType::DateTime => "dateTime",
            BuiltinType::Time => "time",
            BuiltinType::Date => "date",
            BuiltinType::GYearMonth => "gYearMonth",
            BuiltinType::GYear => "gYear",
            BuiltinType::GMonthDay => "gMonthDay",
            BuiltinType::GDay => "gDay",
            BuiltinType::GMonth => "gMonth",
            BuiltinType::HexBinary => "hexBinary",
            BuiltinType::Base64Binary => "base64Binary",
            BuiltinType::AnyUri => "anyURI",
            BuiltinType::QName => "QName",
            BuiltinType::Notation => "NOTATION",
        }
    }

    /// Look up a built-in by its local name
    pub fn from_local_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.local_name() == name)
    }

    /// White space handling fixed by the type
    pub fn white_space(&self) -> WhiteSpace {
        match self {
            BuiltinType::String | BuiltinType::AnySimpleType => WhiteSpace::Preserve,
            BuiltinType::NormalizedString => WhiteSpace::Replace,
            _ => WhiteSpace::Collapse,
        }
    }

    /// How `length` facets measure values of this type
    pub fn length_unit(&self) -> LengthUnit {
        match self {
            BuiltinType::HexBinary => LengthUnit::HexOctets,
            BuiltinType::Base64Binary => LengthUnit::Base64Octets,
            BuiltinType::IdRefs | BuiltinType::Entities | BuiltinType::NmTokens => {
                LengthUnit::Items
            }
            _ => LengthUnit::Chars,
        }
    }

    fn is_list(&self) -> bool {
        matches!(
            self,
            BuiltinType::IdRefs | BuiltinType::Entities | BuiltinType::NmTokens
        )
    }

    /// Check the lexical form of a normalized value
    ///
    /// The error text follows libxml2's wording.
    pub fn check(&self, value: &str) -> std::result::Result<(), String> {
        if self.accepts(value) {
            Ok(())
        } else if self.is_list() {
            Err(format!(
                "'{}' is not a valid value of the list type 'xs:{}'.",
                value,
                self.local_name()
            ))
        } else {
            Err(format!(
                "'{}' is not a valid value of the atomic type 'xs:{}'.",
                value,
                self.local_name()
            ))
        }
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            BuiltinType::AnySimpleType
            | BuiltinType::String
            | BuiltinType::NormalizedString
            | BuiltinType::Token
            | BuiltinType::AnyUri => true,
            BuiltinType::Language => LANGUAGE_REGEX.is_match(value),
            BuiltinType::Name => NAME_REGEX.is_match(value),
            BuiltinType::NCName | BuiltinType::Id | BuiltinType::IdRef | BuiltinType::Entity => {
                NCNAME_REGEX.is_match(value)
            }
            BuiltinType::IdRefs | BuiltinType::Entities => is_token_list(value, &NCNAME_REGEX),
            BuiltinType::NmToken => NMTOKEN_REGEX.is_match(value),
            BuiltinType::NmTokens => is_token_list(value, &NMTOKEN_REGEX),
            BuiltinType::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            BuiltinType::Decimal => DECIMAL_REGEX.is_match(value),
            BuiltinType::Integer => INTEGER_REGEX.is_match(value),
            BuiltinType::NonPositiveInteger => integer_in_range(value, None, Some(0)),
            BuiltinType::NegativeInteger => integer_in_range(value, None, Some(-1)),
            BuiltinType::Long => {
                integer_in_range(value, Some(i64::MIN as i128), Some(i64::MAX as i128))
            }
            BuiltinType::Int => {
                integer_in_range(value, Some(i32::MIN as i128), Some(i32::MAX as i128))
            }
            BuiltinType::Short => {
                integer_in_range(value, Some(i16::MIN as i128), Some(i16::MAX as i128))
            }
            BuiltinType::Byte => {
                integer_in_range(value, Some(i8::MIN as i128), Some(i8::MAX as i128))
            }
            BuiltinType::NonNegativeInteger => integer_in_range(value, Some(0), None),
            BuiltinType::UnsignedLong => integer_in_range(value, Some(0), Some(u64::MAX as i128)),
            BuiltinType::UnsignedInt => integer_in_range(value, Some(0), Some(u32::MAX as i128)),
            BuiltinType::UnsignedShort => integer_in_range(value, Some(0), Some(u16::MAX as i128)),
            BuiltinType::UnsignedByte => integer_in_range(value, Some(0), Some(u8::MAX as i128)),
            BuiltinType::PositiveInteger => integer_in_range(value, Some(1), None),
            BuiltinType::Float | BuiltinType::Double => FLOAT_REGEX.is_match(value),
            BuiltinType::Duration => {
                DURATION_REGEX.is_match(value) && !value.ends_with('P') && !value.ends_with('T')
            }
            BuiltinType::DateTime => is_date_time(value),
            BuiltinType::Time => TIME_REGEX
                .captures(value)
                .map(|caps| {
                    is_time(&caps[1]) && caps.get(3).map_or(true, |tz| is_timezone(tz.as_str()))
                })
                .unwrap_or(false),
            BuiltinType::Date => DATE_REGEX
                .captures(value)
                .map(|caps| {
                    is_date(&caps[1]) && caps.get(2).map_or(true, |tz| is_timezone(tz.as_str()))
                })
                .unwrap_or(false),
            BuiltinType::GYearMonth => GYEAR_MONTH_REGEX.is_match(value),
            BuiltinType::GYear => GYEAR_REGEX.is_match(value),
            BuiltinType::GMonthDay => GMONTH_DAY_REGEX.is_match(value),
            BuiltinType::GDay => GDAY_REGEX.is_match(value),
            BuiltinType::GMonth => GMONTH_REGEX.is_match(value),
            BuiltinType::HexBinary => HEX_BINARY_REGEX.is_match(value),
            BuiltinType::Base64Binary => is_base64(value),
            BuiltinType::QName | BuiltinType::Notation => QNAME_REGEX.is_match(value),
        }
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.local_name())
    }
}

fn is_token_list(value: &str, item: &Regex) -> bool {
    let mut tokens = value.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(|t| item.is_match(t))
}

fn integer_in_range(value: &str, min: Option<i128>, max: Option<i128>) -> bool {
    if !INTEGER_REGEX.is_match(value) {
        return false;
    }

    match value.parse::<i128>() {
        Ok(n) => min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m),
        // Beyond i128 only the sign can still be checked
        Err(_) => {
            let negative = value.starts_with('-');
            (min.is_none() || !negative) && (max.is_none() || negative)
        }
    }
}

fn is_date(date: &str) -> bool {
    // Years beyond four digits or BCE are lexically fine but outside chrono's calendar
    if date.starts_with('-') || date.len() != 10 {
        return true;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

fn is_time(time: &str) -> bool {
    if time.starts_with("24:00:00") {
        return time[8..].trim_start_matches('.').chars().all(|c| c == '0');
    }
    NaiveTime::parse_from_str(time, "%H:%M:%S%.f").is_ok()
}

fn is_timezone(tz: &str) -> bool {
    if tz == "Z" {
        return true;
    }
    let hours: u32 = tz[1..3].parse().unwrap_or(99);
    let minutes: u32 = tz[4..6].parse().unwrap_or(99);
    minutes < 60 && (hours < 14 || (hours == 14 && minutes == 0))
}

fn is_date_time(value: &str) -> bool {
    DATETIME_REGEX
        .captures(value)
        .map(|caps| {
            is_date(&caps[1])
                && is_time(&caps[2])
                && caps.get(4).map_or(true, |tz| is_timezone(tz.as_str()))
        })
        .unwrap_or(false)
}

fn is_base64(value: &str) -> bool {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    cleaned.is_empty() || base64::engine::general_purpose::STANDARD.decode(&cleaned).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(BuiltinType::from_local_name("dateTime"), Some(BuiltinType::DateTime));
        assert_eq!(BuiltinType::from_local_name("ID"), Some(BuiltinType::Id));
        assert_eq!(BuiltinType::from_local_name("datetime"), None);
        assert!(BuiltinType::ALL
            .iter()
            .all(|b| BuiltinType::from_local_name(b.local_name()) == Some(*b)));
    }

    #[test]
    fn test_white_space_defaults() {
        assert_eq!(BuiltinType::String.white_space(), WhiteSpace::Preserve);
        assert_eq!(BuiltinType::NormalizedString.white_space(), WhiteSpace::Replace);
        assert_eq!(BuiltinType::Token.white_space(), WhiteSpace::Collapse);
        assert_eq!(BuiltinType::Decimal.white_space(), WhiteSpace::Collapse);
    }

    #[test]
    fn test_numeric_types() {
        assert!(BuiltinType::Decimal.check("11.70").is_ok());
        assert!(BuiltinType::Decimal.check(".5").is_ok());
        assert!(BuiltinType::Decimal.check("1e3").is_err());

        assert!(BuiltinType::Byte.check("-128").is_ok());
        assert!(BuiltinType::Byte.check("128").is_err());
        assert!(BuiltinType::UnsignedLong.check("18446744073709551615").is_ok());
        assert!(BuiltinType::PositiveInteger.check("0").is_err());
        let huge = "123456789012345678901234567890123456789012";
        assert!(BuiltinType::NonNegativeInteger.check(huge).is_ok());
        assert!(BuiltinType::NegativeInteger.check(huge).is_err());

        assert!(BuiltinType::Double.check("-1.5E10").is_ok());
        assert!(BuiltinType::Float.check("INF").is_ok());
        assert!(BuiltinType::Float.check("abc").is_err());
    }

    #[test]
    fn test_date_time_types() {
        assert!(BuiltinType::DateTime.check("2024-01-31T10:15:00-03:00").is_ok());
        assert!(BuiltinType::DateTime.check("2024-02-30T10:15:00-03:00").is_err());
        assert!(BuiltinType::DateTime.check("2024-01-31 10:15:00").is_err());
        assert!(BuiltinType::DateTime.check("2024-01-31T25:00:00").is_err());
        assert!(BuiltinType::Date.check("2024-02-29").is_ok());
        assert!(BuiltinType::Date.check("2023-02-29").is_err());
        assert!(BuiltinType::Time.check("24:00:00").is_ok());
        assert!(BuiltinType::Time.check("23:59:59.5Z").is_ok());
        assert!(BuiltinType::Date.check("2024-01-31+15:00").is_err());
        assert!(BuiltinType::GYearMonth.check("2024-13").is_err());
        assert!(BuiltinType::Duration.check("P1Y2M3DT4H").is_ok());
        assert!(BuiltinType::Duration.check("P").is_err());
        assert!(BuiltinType::Duration.check("P1DT").is_err());
    }

    #[test]
    fn test_binary_and_name_types() {
        assert!(BuiltinType::HexBinary.check("0A1b").is_ok());
        assert!(BuiltinType::HexBinary.check("0A1").is_err());
        assert!(BuiltinType::Base64Binary.check("QUJD").is_ok());
        assert!(BuiltinType::Base64Binary.check("QU JD").is_ok());
        assert!(BuiltinType::Base64Binary.check("Q!JD").is_err());

        assert!(BuiltinType::NCName.check("infNFe").is_ok());
        assert!(BuiltinType::NCName.check("ds:Signature").is_err());
        assert!(BuiltinType::QName.check("ds:Signature").is_ok());
        assert!(BuiltinType::Id.check("NFe3524").is_ok());
        assert!(BuiltinType::Id.check("35NFe").is_err());
        assert!(BuiltinType::NmTokens.check("a b c").is_ok());
        assert!(BuiltinType::NmTokens.check("").is_err());
        assert!(BuiltinType::Boolean.check("yes").is_err());
        assert!(BuiltinType::Language.check("pt-BR").is_ok());
    }

    #[test]
    fn test_error_wording() {
        assert_eq!(
            BuiltinType::Decimal.check("1,5").unwrap_err(),
            "'1,5' is not a valid value of the atomic type 'xs:decimal'."
        );
        assert!(BuiltinType::NmTokens
            .check("")
            .unwrap_err()
            .contains("list type 'xs:NMTOKENS'"));
    }
}
