//! Local ordering of fetched records
//!
//! Used when the remote service cannot honour an ordering: computed keys,
//! custom comparers, unsortable properties, a second ordering, or sorting
//! across fan-out members. The sort is stable, so ties keep the remote order.

use std::cmp::Ordering;

use serde_json::Value;

use crate::planner::{OrderKey, OrderSpec, SortDirection};

use super::filters::FieldMap;

/// Sorts buffered records by one ordering
#[derive(Debug, Clone)]
pub struct LocalSorter {
    spec: OrderSpec,
    fields: FieldMap,
}

impl LocalSorter {
    /// Sorter for one ordering
    pub fn new(spec: OrderSpec, fields: FieldMap) -> Self {
        Self { spec, fields }
    }

    /// Sorts records in place; equal keys keep their arrival order
    pub fn sort(&self, records: &mut Vec<Value>) {
        let mut keyed: Vec<(Value, Value)> = records
            .drain(..)
            .map(|record| (self.key(&record), record))
            .collect();

        keyed.sort_by(|(a, _), (b, _)| {
            let ordering = match &self.spec.comparer {
                Some(comparer) => comparer(a, b),
                None => compare_values(a, b),
            };
            match self.spec.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        records.extend(keyed.into_iter().map(|(_, record)| record));
    }

    fn key(&self, record: &Value) -> Value {
        match &self.spec.key {
            OrderKey::Property(property) => self
                .fields
                .get(record, *property)
                .cloned()
                .unwrap_or(Value::Null),
            OrderKey::Computed(f) => f(record),
        }
    }
}

/// Compares two JSON values for sorting.
///
/// Ordering rules:
/// - null < bool < number < string < array < object
/// - For same types, natural ordering; arrays compare element-wise
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let type_order = |v: &Value| -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    };

    let (a_type, b_type) = (type_order(a), type_order(b));
    if a_type != b_type {
        return a_type.cmp(&b_type);
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(x, y)| compare_values(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        // Objects are not compared
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentType, Property, PropertyCatalog, StandardCatalog};
    use crate::planner::Callback;
    use serde_json::json;
    use std::sync::Arc;

    fn fields() -> FieldMap {
        FieldMap::new(&StandardCatalog.properties(ContentType::Sensors))
    }

    fn names(records: &[Value]) -> Vec<&str> {
        records.iter().map(|r| r["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_sort_by_property_desc() {
        let mut records = vec![
            json!({"name": "b", "objid": 2}),
            json!({"name": "c", "objid": 3}),
            json!({"name": "a", "objid": 1}),
        ];
        let sorter = LocalSorter::new(
            OrderSpec::by_property(Property::Id, SortDirection::Desc),
            fields(),
        );
        sorter.sort(&mut records);
        assert_eq!(names(&records), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_stable() {
        let mut records = vec![
            json!({"name": "a", "objid": 1}),
            json!({"name": "b", "objid": 1}),
            json!({"name": "c", "objid": 0}),
        ];
        let sorter = LocalSorter::new(
            OrderSpec::by_property(Property::Id, SortDirection::Asc),
            fields(),
        );
        sorter.sort(&mut records);
        assert_eq!(names(&records), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_computed_key_with_comparer() {
        let mut records = vec![
            json!({"name": "bb"}),
            json!({"name": "a"}),
            json!({"name": "ccc"}),
        ];
        let spec = OrderSpec {
            key: OrderKey::Computed(Callback::from_arc(Arc::new(|r: &Value| r["name"].clone()))),
            direction: SortDirection::Asc,
            comparer: Some(Callback::from_arc(Arc::new(|a: &Value, b: &Value| {
                let len = |v: &Value| v.as_str().map_or(0, str::len);
                len(b).cmp(&len(a))
            }))),
        };
        LocalSorter::new(spec, fields()).sort(&mut records);
        assert_eq!(names(&records), vec!["ccc", "bb", "a"]);
    }

    #[test]
    fn test_missing_key_sorts_first() {
        let mut records = vec![json!({"name": "x", "objid": 5}), json!({"name": "y"})];
        LocalSorter::new(
            OrderSpec::by_property(Property::Id, SortDirection::Asc),
            fields(),
        )
        .sort(&mut records);
        assert_eq!(names(&records), vec!["y", "x"]);
    }

    #[test]
    fn test_type_order() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(10), &json!("1")), Ordering::Less);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 3])), Ordering::Less);
    }
}
