//! Async Stream Tests
//!
//! The async enumeration runs the same state machine as the blocking one:
//! same requests, same order, no prefetch, and dropping the stream cancels
//! it before the next page request.

mod common;

use std::io;

use common::{sensors, MockSource};
use futures_util::{StreamExt, TryStreamExt};
use remotequery::{prop, ExecutorError, Expr, Property, QueryClient, QueryConfig, Status};
use serde::Deserialize;
use serde_json::{json, Value};

fn paged(total: u64, page_size: u64) -> QueryClient<MockSource> {
    QueryClient::new(MockSource::new(sensors(total)))
        .with_config(QueryConfig::with_page_size(page_size))
        .unwrap()
}

/// Streaming yields the same records with the same requests as iterating.
#[tokio::test]
async fn test_stream_matches_iterator() {
    let client = paged(7, 3);
    let query = client
        .sensors()
        .filter(prop(Property::Status).eq(Status::Up))
        .skip(1)
        .take(5);

    let streamed: Vec<Value> = query.stream().unwrap().try_collect().await.unwrap();
    let streamed_requests = client.source().requests();

    let iterated: Vec<Value> = query.iter().unwrap().collect::<Result<_, _>>().unwrap();
    let all_requests = client.source().requests();

    assert_eq!(streamed, iterated);
    assert_eq!(all_requests[streamed_requests.len()..], streamed_requests[..]);
}

/// Nothing is requested until the stream is polled.
#[tokio::test]
async fn test_stream_is_lazy() {
    let client = paged(10, 2);
    let stream = client.sensors().stream().unwrap();
    assert_eq!(client.source().request_count(), 0);
    drop(stream);
    assert_eq!(client.source().request_count(), 0);
}

/// Dropping the stream mid-page cancels all further requests.
#[tokio::test]
async fn test_drop_cancels_further_requests() {
    let client = paged(100, 4);
    {
        let mut stream = client.sensors().stream().unwrap();
        for _ in 0..5 {
            stream.next().await.unwrap().unwrap();
        }
    }
    assert_eq!(client.source().request_count(), 2);
}

/// Transport errors end the stream.
#[tokio::test]
async fn test_stream_error_ends_stream() {
    let source = MockSource::new(sensors(10)).failing_on(0);
    let client = QueryClient::new(source);
    let mut stream = client.sensors().stream().unwrap();

    match stream.next().await {
        Some(Err(ExecutorError::Transport(inner))) => {
            assert!(inner.downcast_ref::<io::Error>().is_some());
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(stream.next().await.is_none());
}

/// Async reducers request as little as their blocking counterparts.
#[tokio::test]
async fn test_async_reducers() {
    let client = paged(10, 500);

    assert_eq!(client.sensors().take(4).count_async().await.unwrap(), 4);
    assert!(client.sensors().any_async().await.unwrap());
    assert_eq!(client.sensors().first_async().await.unwrap()["objid"], json!(0));

    let odd = Expr::local(|r: &Value| r["objid"].as_u64().map_or(false, |i| i % 2 == 1));
    assert_eq!(
        client.sensors().first_where_async(odd.clone()).await.unwrap()["objid"],
        json!(1)
    );
    assert_eq!(client.sensors().count_where_async(odd).await.unwrap(), 5);

    let counts: Vec<Option<u64>> = client.source().requests().iter().map(|r| r.count()).collect();
    assert_eq!(counts[..3], [Some(0), Some(1), Some(1)]);
}

#[derive(Debug, Deserialize)]
struct Sensor {
    objid: u64,
}

/// Typed streams deserialize each record.
#[tokio::test]
async fn test_typed_stream() {
    let client = paged(3, 2);
    let ids: Vec<u64> = client
        .sensors()
        .stream()
        .unwrap()
        .typed::<Sensor>()
        .map_ok(|s| s.objid)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(ids, vec![0, 1, 2]);
}

/// Independent enumerations run concurrently without sharing state.
#[tokio::test]
async fn test_concurrent_enumerations() {
    let client = paged(6, 2);
    let a = client.sensors().take(3);
    let b = client.sensors().skip(3);

    let (left, right) = futures_util::future::join(
        a.stream().unwrap().try_collect::<Vec<Value>>(),
        b.stream().unwrap().try_collect::<Vec<Value>>(),
    )
    .await;

    assert_eq!(left.unwrap().len(), 3);
    assert_eq!(right.unwrap().len(), 3);
}
