//! Remote filter triples and their serialization rules
//!
//! The remote service understands `property / operator / value` filters.
//! Filters on distinct properties are combined with AND; filters repeated on
//! the same property are combined with OR.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::literal::Literal;
use super::property::{Property, PropertyKind};

/// Wire format for timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Filter operators understood by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    /// Substring match; on arrays, "any element contains"
    Contains,
}

impl FilterOperator {
    /// Wire operator name
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "eq",
            FilterOperator::NotEquals => "neq",
            FilterOperator::GreaterThan => "above",
            FilterOperator::LessThan => "below",
            FilterOperator::Contains => "sub",
        }
    }

    /// Operator after logical negation, if the remote grammar has one
    pub fn negate(&self) -> Option<Self> {
        match self {
            FilterOperator::Equals => Some(FilterOperator::NotEquals),
            FilterOperator::NotEquals => Some(FilterOperator::Equals),
            _ => None,
        }
    }

    /// Operator after swapping its operands, if one exists
    pub fn flip(&self) -> Option<Self> {
        match self {
            FilterOperator::Equals => Some(FilterOperator::Equals),
            FilterOperator::NotEquals => Some(FilterOperator::NotEquals),
            FilterOperator::GreaterThan => Some(FilterOperator::LessThan),
            FilterOperator::LessThan => Some(FilterOperator::GreaterThan),
            FilterOperator::Contains => None,
        }
    }

    /// Wraps a serialized value in the operator's wire syntax
    pub fn encode(&self, value: &str) -> String {
        match self {
            FilterOperator::Equals => value.to_string(),
            other => format!("@{}({})", other.as_str(), value),
        }
    }

    /// Splits a wire value into its operator and serialized value
    pub fn decode(raw: &str) -> (FilterOperator, String) {
        for op in [
            FilterOperator::NotEquals,
            FilterOperator::GreaterThan,
            FilterOperator::LessThan,
            FilterOperator::Contains,
        ] {
            let prefix = format!("@{}(", op.as_str());
            if let Some(inner) = raw.strip_prefix(&prefix).and_then(|r| r.strip_suffix(')')) {
                return (op, inner.to_string());
            }
        }
        (FilterOperator::Equals, raw.to_string())
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One serialized remote filter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryFilter {
    property: Property,
    operator: FilterOperator,
    value: String,
}

impl QueryFilter {
    /// Filter with an already serialized value
    pub fn new(property: Property, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            property,
            operator,
            value: value.into(),
        }
    }

    /// Filtered property
    pub fn property(&self) -> Property {
        self.property
    }

    /// Comparison operator
    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    /// Serialized value, without operator syntax
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Value as sent on the wire
    pub fn encoded_value(&self) -> String {
        self.operator.encode(&self.value)
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.property, self.operator, self.value)
    }
}

/// Serializes a literal for a property of the given kind.
///
/// Numeric kinds fall back to the literal's string form when the literal is
/// not representable as the target number; the remote service then matches
/// it as a string. Returns `None` for literals with no scalar form.
pub fn serialize_value(kind: PropertyKind, literal: &Literal) -> Option<String> {
    if matches!(literal, Literal::Null | Literal::List(_)) {
        return None;
    }

    let value = match kind {
        PropertyKind::String | PropertyKind::StringArray => match literal {
            Literal::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
            other => other.as_text(),
        },
        PropertyKind::Bool => match literal {
            Literal::Bool(true) | Literal::Int(1) => "1".to_string(),
            Literal::Bool(false) | Literal::Int(0) => "0".to_string(),
            Literal::Str(s) if s.eq_ignore_ascii_case("true") => "1".to_string(),
            Literal::Str(s) if s.eq_ignore_ascii_case("false") => "0".to_string(),
            other => other.as_text(),
        },
        PropertyKind::Integer => match literal {
            Literal::Enum(e) => e.remote.to_string(),
            other => other
                .as_integer()
                .map(|i| i.to_string())
                .unwrap_or_else(|| other.as_text()),
        },
        PropertyKind::Float => match literal {
            Literal::Enum(e) => e.remote.to_string(),
            other => other
                .as_float()
                .map(|f| f.to_string())
                .unwrap_or_else(|| other.as_text()),
        },
        PropertyKind::Duration => match literal {
            Literal::Duration(d) => d.as_secs().to_string(),
            other => other
                .as_integer()
                .map(|i| i.to_string())
                .unwrap_or_else(|| other.as_text()),
        },
        PropertyKind::Timestamp => literal.as_timestamp()?.format(TIMESTAMP_FORMAT).to_string(),
        PropertyKind::Enumeration(_) => match literal {
            Literal::Enum(e) => e.remote.to_string(),
            other => other.as_text(),
        },
    };

    Some(value)
}
