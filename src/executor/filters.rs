//! Local predicate evaluation
//!
//! Evaluates predicate trees against fetched records with the same matching
//! rules the remote service applies:
//! - String equality and substring matching ignore case
//! - Array-valued properties match when any element matches
//! - Enumeration values match by name or by their remote representation
//! - Numeric comparisons fall back to string matching when a side is not a
//!   number
//! - Missing fields behave as null

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::model::{
    FilterOperator, Literal, Property, PropertyDescriptor, PropertyKind, TIMESTAMP_FORMAT,
};
use crate::planner::{Comparison, Expr, Operand};

/// Property to wire column lookup for one content type
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    fields: HashMap<Property, PropertyDescriptor>,
}

impl FieldMap {
    /// Column map for the given properties
    pub fn new(descriptors: &[PropertyDescriptor]) -> Self {
        Self {
            fields: descriptors.iter().map(|d| (d.property, *d)).collect(),
        }
    }

    /// Record column of a property
    pub fn column(&self, property: Property) -> Option<&'static str> {
        self.fields.get(&property).map(|d| d.column)
    }

    /// Value kind of a property
    pub fn kind(&self, property: Property) -> Option<PropertyKind> {
        self.fields.get(&property).map(|d| d.kind)
    }

    /// Reads a property from a record keyed by wire column name
    pub fn get<'v>(&self, record: &'v Value, property: Property) -> Option<&'v Value> {
        record.get(self.column(property)?)
    }
}

/// Comparable form of a record value or literal
#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Null,
    Bool(bool),
    Num(f64),
    Text(String),
    Time(DateTime<Utc>),
    Enum {
        name: &'static str,
        remote: &'static str,
    },
}

impl Scalar {
    fn from_value(kind: PropertyKind, value: &Value, out: &mut Vec<Scalar>) {
        let scalar = match value {
            Value::Null => Scalar::Null,
            Value::Array(items) => {
                for item in items {
                    Scalar::from_value(kind, item, out);
                }
                return;
            }
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => match kind {
                PropertyKind::Bool => Scalar::Bool(n.as_f64().map_or(false, |f| f != 0.0)),
                PropertyKind::String | PropertyKind::StringArray => Scalar::Text(n.to_string()),
                _ => n.as_f64().map_or(Scalar::Null, Scalar::Num),
            },
            Value::String(s) => Scalar::parse(kind, s),
            Value::Object(_) => Scalar::Text(value.to_string()),
        };
        out.push(scalar);
    }

    fn from_literal(kind: PropertyKind, literal: &Literal, out: &mut Vec<Scalar>) {
        let scalar = match literal {
            Literal::Null => Scalar::Null,
            Literal::List(items) => {
                for item in items {
                    Scalar::from_literal(kind, item, out);
                }
                return;
            }
            Literal::Bool(b) => Scalar::Bool(*b),
            Literal::Int(i) => match kind {
                PropertyKind::Bool => Scalar::Bool(*i != 0),
                _ => Scalar::Num(*i as f64),
            },
            Literal::Float(f) => Scalar::Num(*f),
            Literal::Str(s) => Scalar::parse(kind, s),
            Literal::Timestamp(ts) => Scalar::Time(*ts),
            Literal::Duration(d) => Scalar::Num(d.as_secs() as f64),
            Literal::Enum(e) => Scalar::Enum {
                name: e.name,
                remote: e.remote,
            },
        };
        out.push(scalar);
    }

    /// Interprets text according to the property kind
    fn parse(kind: PropertyKind, text: &str) -> Scalar {
        match kind {
            PropertyKind::Integer
            | PropertyKind::Float
            | PropertyKind::Duration
            | PropertyKind::Enumeration(_) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map_or_else(|| Scalar::Text(text.to_string()), Scalar::Num),
            PropertyKind::Bool => match text.trim() {
                "1" => Scalar::Bool(true),
                "0" => Scalar::Bool(false),
                t if t.eq_ignore_ascii_case("true") => Scalar::Bool(true),
                t if t.eq_ignore_ascii_case("false") => Scalar::Bool(false),
                _ => Scalar::Text(text.to_string()),
            },
            PropertyKind::Timestamp => {
                parse_timestamp(text).map_or_else(|| Scalar::Text(text.to_string()), Scalar::Time)
            }
            PropertyKind::String | PropertyKind::StringArray => Scalar::Text(text.to_string()),
        }
    }

    fn text(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Num(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some((*f as i64).to_string()),
            Scalar::Num(f) => Some(f.to_string()),
            Scalar::Text(s) => Some(s.clone()),
            Scalar::Time(ts) => Some(ts.format(TIMESTAMP_FORMAT).to_string()),
            Scalar::Enum { name, .. } => Some((*name).to_string()),
        }
    }

    fn equals(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Null, _) | (_, Scalar::Null) => false,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Num(a), Scalar::Num(b)) => a == b,
            (Scalar::Time(a), Scalar::Time(b)) => a == b,
            (Scalar::Enum { remote: a, .. }, Scalar::Enum { remote: b, .. }) => a == b,
            (Scalar::Enum { name, remote }, other) | (other, Scalar::Enum { name, remote }) => {
                match other {
                    Scalar::Num(n) => remote.parse::<f64>().map_or(false, |r| r == *n),
                    Scalar::Text(t) => {
                        t.eq_ignore_ascii_case(name) || t.eq_ignore_ascii_case(remote)
                    }
                    _ => false,
                }
            }
            (a, b) => match (a.text(), b.text()) {
                (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
                _ => false,
            },
        }
    }

    fn order(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Num(a), Scalar::Num(b)) => a.partial_cmp(b),
            (Scalar::Time(a), Scalar::Time(b)) => Some(a.cmp(b)),
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            (Scalar::Text(a), Scalar::Text(b)) => Some(a.to_lowercase().cmp(&b.to_lowercase())),
            (Scalar::Enum { remote, .. }, Scalar::Num(b)) => remote.parse::<f64>().ok()?.partial_cmp(b),
            (Scalar::Num(a), Scalar::Enum { remote, .. }) => a.partial_cmp(&remote.parse::<f64>().ok()?),
            (Scalar::Enum { remote: a, .. }, Scalar::Enum { remote: b, .. }) => {
                a.parse::<f64>().ok()?.partial_cmp(&b.parse::<f64>().ok()?)
            }
            _ => None,
        }
    }

    fn contains(&self, needle: &Scalar) -> bool {
        match (self.text(), needle.text()) {
            (Some(hay), Some(needle)) => hay.to_lowercase().contains(&needle.to_lowercase()),
            _ => false,
        }
    }
}

fn any_pair(left: &[Scalar], right: &[Scalar], f: impl Fn(&Scalar, &Scalar) -> bool) -> bool {
    left.iter().any(|l| right.iter().any(|r| f(l, r)))
}

/// Parses RFC 3339 or the remote wire format
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Evaluates a predicate tree against records
#[derive(Debug, Clone)]
pub struct RecordPredicate {
    expr: Expr,
    fields: FieldMap,
}

impl RecordPredicate {
    /// Predicate evaluated with the given column map
    pub fn new(expr: Expr, fields: FieldMap) -> Self {
        Self { expr, fields }
    }

    /// Expression evaluated
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Checks if a record satisfies the predicate
    pub fn matches(&self, record: &Value) -> bool {
        self.eval(&self.expr, record)
    }

    fn eval(&self, expr: &Expr, record: &Value) -> bool {
        match expr {
            Expr::Compare(c) => self.compare(c, record),
            Expr::And(a, b) => self.eval(a, record) && self.eval(b, record),
            Expr::Or(a, b) => self.eval(a, record) || self.eval(b, record),
            Expr::Not(inner) => !self.eval(inner, record),
            Expr::Local(f) => f(record),
        }
    }

    fn compare(&self, comparison: &Comparison, record: &Value) -> bool {
        // Literals take the kind of the property they are compared with
        let kind = comparison
            .properties()
            .first()
            .and_then(|p| self.fields.kind(*p))
            .unwrap_or(PropertyKind::String);

        let left = self.resolve(&comparison.left, kind, record);
        let right = self.resolve(&comparison.right, kind, record);

        let (l, r) = (left.as_slice(), right.as_slice());
        match comparison.operator {
            FilterOperator::Equals => any_pair(l, r, Scalar::equals),
            FilterOperator::NotEquals => !any_pair(l, r, Scalar::equals),
            FilterOperator::GreaterThan => {
                any_pair(l, r, |a, b| a.order(b) == Some(Ordering::Greater))
            }
            FilterOperator::LessThan => any_pair(l, r, |a, b| a.order(b) == Some(Ordering::Less)),
            FilterOperator::Contains => any_pair(l, r, Scalar::contains),
        }
    }

    fn resolve(&self, operand: &Operand, kind: PropertyKind, record: &Value) -> Vec<Scalar> {
        let mut out = Vec::new();
        match operand {
            Operand::Property(p) => {
                let own = self.fields.kind(*p).unwrap_or(kind);
                match self.fields.get(record, *p) {
                    Some(value) => Scalar::from_value(own, value, &mut out),
                    None => out.push(Scalar::Null),
                }
            }
            Operand::Literal(literal) => Scalar::from_literal(kind, literal, &mut out),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentType, PropertyCatalog, StandardCatalog, Status};
    use crate::planner::prop;
    use chrono::TimeZone;
    use serde_json::json;

    fn fields(content: ContentType) -> FieldMap {
        FieldMap::new(&StandardCatalog.properties(content))
    }

    fn sensors(expr: Expr) -> RecordPredicate {
        RecordPredicate::new(expr, fields(ContentType::Sensors))
    }

    fn column(property: Property) -> &'static str {
        fields(ContentType::Sensors).column(property).unwrap()
    }

    fn record(pairs: &[(Property, Value)]) -> Value {
        let mut map = serde_json::Map::new();
        for (p, v) in pairs {
            map.insert(column(*p).to_string(), v.clone());
        }
        Value::Object(map)
    }

    #[test]
    fn test_string_equality_ignores_case() {
        let rec = record(&[(Property::Name, json!("Ping"))]);
        assert!(sensors(prop(Property::Name).eq("ping")).matches(&rec));
        assert!(!sensors(prop(Property::Name).eq("http")).matches(&rec));
        assert!(sensors(prop(Property::Name).contains("IN")).matches(&rec));
    }

    #[test]
    fn test_enum_matches_name_or_remote_value() {
        let by_remote = record(&[(Property::Status, json!(5))]);
        let by_name = record(&[(Property::Status, json!("Down"))]);
        let pred = sensors(prop(Property::Status).eq(Status::Down));
        assert!(pred.matches(&by_remote));
        assert!(pred.matches(&by_name));
        assert!(!sensors(prop(Property::Status).eq(Status::Up)).matches(&by_remote));
    }

    #[test]
    fn test_array_membership() {
        let rec = record(&[(Property::Tags, json!(["pingsensor", "wan"]))]);
        assert!(sensors(prop(Property::Tags).eq("wan")).matches(&rec));
        assert!(sensors(prop(Property::Tags).contains("ping")).matches(&rec));
        assert!(sensors(prop(Property::Tags).ne("lan")).matches(&rec));
        assert!(!sensors(prop(Property::Tags).ne("wan")).matches(&rec));
    }

    #[test]
    fn test_numeric_ranges_and_lists() {
        let rec = record(&[(Property::Id, json!(42))]);
        assert!(sensors(prop(Property::Id).gt(40)).matches(&rec));
        assert!(!sensors(prop(Property::Id).lt(40)).matches(&rec));
        assert!(sensors(prop(Property::Id).one_of([1, 42])).matches(&rec));
        assert!(sensors(prop(Property::Id).eq("42")).matches(&rec));
    }

    #[test]
    fn test_missing_field_is_null() {
        let rec = json!({});
        assert!(!sensors(prop(Property::Name).eq("a")).matches(&rec));
        assert!(sensors(prop(Property::Name).ne("a")).matches(&rec));
    }

    #[test]
    fn test_timestamps_in_wire_format() {
        let logs = RecordPredicate::new(
            prop(Property::DateTime).gt(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            fields(ContentType::Logs),
        );
        assert!(logs.matches(&json!({ "datetime": "2024-03-01-12-00-00" })));
        assert!(!logs.matches(&json!({ "datetime": "2023-12-31T23:59:59Z" })));
    }

    #[test]
    fn test_compound_and_local() {
        let rec = record(&[(Property::Name, json!("ping")), (Property::Id, json!(7))]);
        let expr = (prop(Property::Name).eq("ping") | prop(Property::Name).eq("dns"))
            & !prop(Property::Id).eq(8)
            & Expr::local(|r: &Value| r.is_object());
        assert!(sensors(expr).matches(&rec));
    }
}
