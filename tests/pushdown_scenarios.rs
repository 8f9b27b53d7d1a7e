//! Pushdown Scenario Tests
//!
//! End-to-end checks that fluent queries become exactly the expected remote
//! requests, and that everything the remote cannot express is either
//! rejected before any request or evaluated locally with a disclosure.

mod common;

use common::{param, sensors, MockSource};
use remotequery::model::Priority;
use remotequery::planner::Operand;
use remotequery::{
    prop, Expr, FilterOperator, Literal, Property, QueryClient, QueryConfig, RemoteQuery,
    StandardCatalog, Status,
};
use serde::Deserialize;
use serde_json::{json, Value};

fn filter_params(query: &RemoteQuery) -> Vec<(String, String)> {
    query
        .to_parameters(&StandardCatalog)
        .unwrap()
        .into_iter()
        .filter(|(k, _)| k.starts_with("filter_"))
        .collect()
}

fn pair(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

// =============================================================================
// Window and Ordering Scenarios
// =============================================================================

/// Status filter with skip/take becomes a single windowed request.
#[test]
fn test_status_skip_take_single_request() {
    let client = QueryClient::new(MockSource::new(sensors(10)));

    let records: Vec<Value> = client
        .sensors()
        .filter(prop(Property::Status).eq(Status::Down))
        .skip(1)
        .take(2)
        .iter()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(records.len(), 2);
    let requests = client.source().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(filter_params(&requests[0]), vec![pair("filter_status", "5")]);
    assert_eq!(param(&requests[0], "start").as_deref(), Some("1"));
    assert_eq!(param(&requests[0], "count").as_deref(), Some("2"));
}

/// Filtering after an ordering still narrows remotely before the sort.
#[test]
fn test_order_then_first_where_filters_remotely() {
    let source = MockSource::with_dataset(|_| vec![json!({ "objid": 42, "name": "core" })]);
    let client = QueryClient::new(source);

    let first = client
        .sensors()
        .order_by(Property::Name)
        .first_where(prop(Property::Id).eq(42))
        .unwrap();

    assert_eq!(first["objid"], json!(42));
    let requests = client.source().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(filter_params(&requests[0]), vec![pair("filter_objid", "42")]);
    assert_eq!(param(&requests[0], "sortby").as_deref(), Some("name"));
    assert_eq!(param(&requests[0], "count").as_deref(), Some("1"));
}

/// Descending order is sent with a '-' prefix.
#[test]
fn test_descending_sort_parameter() {
    let client = QueryClient::new(MockSource::new(sensors(3)));
    let plan = client.sensors().order_by_desc(Property::Id).plan().unwrap();
    assert_eq!(param(&plan.members[0], "sortby").as_deref(), Some("-objid"));
}

/// A selection sets the requested columns.
#[test]
fn test_select_sets_columns() {
    let client = QueryClient::new(MockSource::new(sensors(3)));
    let plan = client
        .sensors()
        .select([Property::Name, Property::Status])
        .plan()
        .unwrap();
    assert_eq!(param(&plan.members[0], "columns").as_deref(), Some("name,status"));
    assert!(plan.local.is_empty());
}

/// Selecting a column an earlier selection removed is rejected before any
/// request is issued.
#[test]
fn test_select_outside_earlier_selection_rejected() {
    let client = QueryClient::new(MockSource::new(sensors(3)));
    let query = client
        .sensors()
        .select([Property::Name])
        .select([Property::Status]);

    assert_eq!(query.plan().unwrap_err().code(), "QUERY_INVALID");
    assert!(query.iter().is_err());
    assert_eq!(client.source().request_count(), 0);
}

// =============================================================================
// Condition Translation
// =============================================================================

/// An AND chain over distinct properties yields one filter per comparison.
#[test]
fn test_and_chain_one_filter_per_comparison() {
    let client = QueryClient::new(MockSource::new(Vec::new()));
    let plan = client
        .sensors()
        .filter(
            prop(Property::Name).contains("ping")
                & prop(Property::Status).eq(Status::Up)
                & prop(Property::Active).eq(true),
        )
        .plan()
        .unwrap();

    assert_eq!(
        filter_params(&plan.members[0]),
        vec![
            pair("filter_name", "@sub(ping)"),
            pair("filter_status", "3"),
            pair("filter_active", "1"),
        ]
    );
}

/// An OR over one property becomes repeated filters on that property.
#[test]
fn test_same_property_or_repeats_filter() {
    let client = QueryClient::new(MockSource::new(Vec::new()));
    let plan = client
        .sensors()
        .filter(prop(Property::Name).eq("dns") | prop(Property::Name).eq("ping"))
        .plan()
        .unwrap();

    assert_eq!(
        filter_params(&plan.members[0]),
        vec![pair("filter_name", "dns"), pair("filter_name", "ping")]
    );
}

/// An OR across distinct properties is rejected before any request.
#[test]
fn test_cross_property_or_rejected() {
    let client = QueryClient::new(MockSource::new(sensors(5)));
    let err = client
        .sensors()
        .filter(prop(Property::Name).eq("a") | prop(Property::Status).eq(Status::Down))
        .count()
        .unwrap_err();

    assert_eq!(err.code(), "QUERY_ILLEGAL_DISJUNCTION");
    assert_eq!(client.source().request_count(), 0);
}

/// The same property twice under AND is rejected.
#[test]
fn test_same_property_and_rejected() {
    let client = QueryClient::new(MockSource::new(Vec::new()));
    let err = client
        .sensors()
        .filter(prop(Property::Name).eq("a"))
        .filter(prop(Property::Name).contains("b"))
        .plan()
        .unwrap_err();
    assert_eq!(err.code(), "QUERY_ILLEGAL_CONJUNCTION");
}

/// Comparing a status property with a priority value is rejected.
#[test]
fn test_enum_domain_mismatch() {
    let client = QueryClient::new(MockSource::new(Vec::new()));
    let err = client
        .sensors()
        .filter(prop(Property::Status).eq(Priority::Two))
        .plan()
        .unwrap_err();
    assert_eq!(err.code(), "QUERY_ENUM_DOMAIN_MISMATCH");
}

/// Properties missing from the content type are rejected.
#[test]
fn test_unsupported_property() {
    let client = QueryClient::new(MockSource::new(Vec::new()));
    let err = client
        .probes()
        .filter(prop(Property::Host).eq("10.0.0.1"))
        .plan()
        .unwrap_err();
    assert_eq!(err.code(), "QUERY_UNSUPPORTED_PROPERTY");
}

/// A literal on the left is normalised to property-first form.
#[test]
fn test_literal_left_is_flipped() {
    let client = QueryClient::new(MockSource::new(Vec::new()));
    let plan = client
        .sensors()
        .filter(Expr::compare(
            Operand::Literal(Literal::Int(10)),
            FilterOperator::LessThan,
            Operand::Property(Property::Id),
        ))
        .plan()
        .unwrap();
    assert_eq!(
        filter_params(&plan.members[0]),
        vec![pair("filter_objid", "@above(10)")]
    );
}

/// Negated equality flips to the remote not-equals operator.
#[test]
fn test_negated_equality() {
    let client = QueryClient::new(MockSource::new(Vec::new()));
    let plan = client
        .sensors()
        .filter(!prop(Property::Status).eq(Status::Up))
        .plan()
        .unwrap();
    assert_eq!(
        filter_params(&plan.members[0]),
        vec![pair("filter_status", "@neq(3)")]
    );
}

/// A list equality becomes one filter per value; on arrays it is membership.
#[test]
fn test_one_of_and_array_membership() {
    let client = QueryClient::new(MockSource::new(Vec::new()));
    let plan = client
        .sensors()
        .filter(prop(Property::Id).one_of([1, 2]) & prop(Property::Tags).eq("wan"))
        .plan()
        .unwrap();
    assert_eq!(
        filter_params(&plan.members[0]),
        vec![
            pair("filter_objid", "1"),
            pair("filter_objid", "2"),
            pair("filter_tags", "@sub(wan)"),
        ]
    );
}

// =============================================================================
// Local Fallback
// =============================================================================

/// Strict mode refuses negated membership on arrays.
#[test]
fn test_strict_rejects_negated_array_membership() {
    let client = QueryClient::new(MockSource::new(sensors(9)));
    let err = client
        .sensors()
        .filter(prop(Property::Tags).ne("ping"))
        .iter()
        .err()
        .unwrap();
    assert_eq!(err.code(), "QUERY_NOT_REMOTELY_EXPRESSIBLE");
    assert_eq!(client.source().request_count(), 0);
}

/// Permissive mode evaluates it locally and says so.
#[test]
fn test_permissive_evaluates_residual_locally() {
    let client = QueryClient::new(MockSource::new(sensors(9)))
        .with_config(QueryConfig::permissive())
        .unwrap();
    let query = client
        .sensors()
        .filter(prop(Property::Status).eq(Status::Up) & prop(Property::Tags).ne("ping"));

    let explain = query.explain();
    assert!(explain.accepted);
    assert!(explain.residual.is_some());
    assert!(!explain.notes.is_empty());

    let ids: Vec<u64> = query
        .iter()
        .unwrap()
        .map(|r| r.unwrap()["objid"].as_u64().unwrap())
        .collect();
    // The mock ignores remote filters, so only the residual applies here
    assert_eq!(ids, vec![1, 2, 4, 5, 7, 8]);

    let requests = client.source().requests();
    assert_eq!(filter_params(&requests[0]), vec![pair("filter_status", "3")]);
}

/// Opaque closures freeze the remote portion and run on the client.
#[test]
fn test_local_closure_then_take() {
    let client = QueryClient::new(MockSource::new(sensors(20)));
    let ids: Vec<u64> = client
        .sensors()
        .filter(Expr::local(|r: &Value| {
            r["objid"].as_u64().map_or(false, |i| i >= 5)
        }))
        .take(3)
        .iter()
        .unwrap()
        .map(|r| r.unwrap()["objid"].as_u64().unwrap())
        .collect();

    assert_eq!(ids, vec![5, 6, 7]);
    let requests = client.source().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].count(), Some(500));
}

/// Local projections reshape records after the remote portion.
#[test]
fn test_project_and_project_many() {
    let client = QueryClient::new(MockSource::new(sensors(3)));
    let names: Vec<Value> = client
        .sensors()
        .project(|r| r["name"].clone())
        .iter()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(names, vec![json!("sensor-0"), json!("sensor-1"), json!("sensor-2")]);

    let tags = client
        .sensors()
        .project_many(|r| r["tags"].as_array().cloned().unwrap_or_default())
        .count()
        .unwrap();
    assert_eq!(tags, 5);
}

// =============================================================================
// Wire Round Trip and Typed Records
// =============================================================================

/// Parameters parse back into the same filters in the same order.
#[test]
fn test_parameters_round_trip() {
    let client = QueryClient::new(MockSource::new(Vec::new()));
    let plan = client
        .sensors()
        .filter(
            prop(Property::Name).contains("ping")
                & (prop(Property::Status).eq(Status::Down) | prop(Property::Status).eq(Status::Warning))
                & prop(Property::LastValue).gt(2.5),
        )
        .plan()
        .unwrap();

    let query = &plan.members[0];
    let params = query.to_parameters(&StandardCatalog).unwrap();
    let parsed =
        RemoteQuery::filters_from_parameters(&params, query.content(), &StandardCatalog).unwrap();
    assert_eq!(parsed, query.filters());
}

#[derive(Debug, Deserialize, PartialEq)]
struct Sensor {
    objid: u64,
    name: String,
}

/// Records convert into caller types.
#[test]
fn test_typed_records() {
    let client = QueryClient::new(MockSource::new(sensors(2)));
    let typed: Vec<Sensor> = client
        .sensors()
        .iter()
        .unwrap()
        .typed::<Sensor>()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        typed,
        vec![
            Sensor {
                objid: 0,
                name: "sensor-0".to_string()
            },
            Sensor {
                objid: 1,
                name: "sensor-1".to_string()
            },
        ]
    );
}

/// Explain output shows the remote request.
#[test]
fn test_explain_display() {
    let client = QueryClient::new(MockSource::new(Vec::new()));
    let text = client
        .sensors()
        .filter(prop(Property::Status).eq(Status::Down))
        .take(5)
        .explain()
        .to_string();
    assert!(text.starts_with("=== EXPLAIN PLAN ==="));
    assert!(text.contains("sensors where [Status eq 5] start 0 count 5"));
}
