//! Literal operands of filter comparisons

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::property::{EnumDomain, RemoteEnum};

/// An enumeration value carried by a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumLiteral {
    pub domain: EnumDomain,
    pub name: &'static str,
    pub remote: &'static str,
}

impl EnumLiteral {
    /// Enum literal carrying name and remote value
    pub fn of<E: RemoteEnum>(value: E) -> Self {
        Self {
            domain: E::DOMAIN,
            name: value.name(),
            remote: value.remote_value(),
        }
    }
}

/// A constant compared against a property
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Timestamp(DateTime<Utc>),
    Duration(Duration),
    Enum(EnumLiteral),
    List(Vec<Literal>),
}

impl Literal {
    /// Builds a list literal
    pub fn list<T: Into<Literal>>(items: impl IntoIterator<Item = T>) -> Self {
        Literal::List(items.into_iter().map(Into::into).collect())
    }

    /// Whether the literal is a list
    pub fn is_list(&self) -> bool {
        matches!(self, Literal::List(_))
    }

    /// Whether the literal is null
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Interprets the literal as a point in time.
    ///
    /// Strings are accepted in RFC 3339 form.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Literal::Timestamp(ts) => Some(*ts),
            Literal::Str(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Interprets the literal as an integer, if it is representable as one
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Literal::Int(i) => Some(*i),
            Literal::Float(f) if f.fract() == 0.0 && f.is_finite() => i64::try_from(*f as i128).ok(),
            Literal::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interprets the literal as a float, if it is representable as one
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Literal::Int(i) => Some(*i as f64),
            Literal::Float(f) if f.is_finite() => Some(*f),
            Literal::Str(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Plain textual form, used when a value falls back to string matching
    pub fn as_text(&self) -> String {
        match self {
            Literal::Null => String::new(),
            Literal::Bool(b) => b.to_string(),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::Str(s) => s.clone(),
            Literal::Timestamp(ts) => ts.to_rfc3339(),
            Literal::Duration(d) => d.as_secs().to_string(),
            Literal::Enum(e) => e.remote.to_string(),
            Literal::List(items) => items
                .iter()
                .map(Literal::as_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Str(s) => write!(f, "\"{}\"", s),
            Literal::Enum(e) => write!(f, "{}::{}", e.domain, e.name),
            Literal::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            other => f.write_str(&other.as_text()),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value.into())
    }
}

impl From<u32> for Literal {
    fn from(value: u32) -> Self {
        Literal::Int(value.into())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<DateTime<Utc>> for Literal {
    fn from(value: DateTime<Utc>) -> Self {
        Literal::Timestamp(value)
    }
}

impl From<Duration> for Literal {
    fn from(value: Duration) -> Self {
        Literal::Duration(value)
    }
}

impl From<super::property::Status> for Literal {
    fn from(value: super::property::Status) -> Self {
        Literal::Enum(EnumLiteral::of(value))
    }
}

impl From<super::property::Priority> for Literal {
    fn from(value: super::property::Priority) -> Self {
        Literal::Enum(EnumLiteral::of(value))
    }
}

impl<T: Into<Literal>> From<Vec<T>> for Literal {
    fn from(value: Vec<T>) -> Self {
        Literal::list(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::property::Status;
    use chrono::TimeZone;

    #[test]
    fn test_integer_representation() {
        assert_eq!(Literal::Int(7).as_integer(), Some(7));
        assert_eq!(Literal::Float(7.0).as_integer(), Some(7));
        assert_eq!(Literal::Float(7.5).as_integer(), None);
        assert_eq!(Literal::from("12").as_integer(), Some(12));
        assert_eq!(Literal::from("abc").as_integer(), None);
    }

    #[test]
    fn test_timestamp_from_string() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            Literal::from("2024-03-01T12:00:00Z").as_timestamp(),
            Some(expected)
        );
        assert_eq!(Literal::from("yesterday").as_timestamp(), None);
    }

    #[test]
    fn test_enum_literal_carries_domain() {
        match Literal::from(Status::Down) {
            Literal::Enum(e) => {
                assert_eq!(e.remote, "5");
                assert_eq!(e.name, "Down");
            }
            other => panic!("unexpected literal {:?}", other),
        }
    }

    #[test]
    fn test_display() {
        let list = Literal::from(vec!["a", "b"]);
        assert_eq!(list.to_string(), "[\"a\", \"b\"]");
        assert_eq!(Literal::from(Status::Up).to_string(), "Status::Up");
    }
}
