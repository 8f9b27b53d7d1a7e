//! Shared test fixtures
//!
//! `MockSource` serves an in-memory dataset, honours `start`/`count`, and
//! records every request it receives.

#![allow(dead_code)]

use std::io;
use std::sync::Mutex;

use async_trait::async_trait;
use remotequery::{AsyncPageSource, BoxError, Page, PageSource, RemoteQuery};
use serde_json::{json, Value};

type Dataset = Box<dyn Fn(&RemoteQuery) -> Vec<Value> + Send + Sync>;

pub struct MockSource {
    dataset: Dataset,
    requests: Mutex<Vec<RemoteQuery>>,
    fail_on: Option<usize>,
}

impl MockSource {
    /// Serves the same records for every request, ignoring filters
    pub fn new(records: Vec<Value>) -> Self {
        Self::with_dataset(move |_| records.clone())
    }

    /// Serves records computed from each request
    pub fn with_dataset<F>(dataset: F) -> Self
    where
        F: Fn(&RemoteQuery) -> Vec<Value> + Send + Sync + 'static,
    {
        Self {
            dataset: Box::new(dataset),
            requests: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    /// Fails the request with the given zero-based index
    pub fn failing_on(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    pub fn requests(&self) -> Vec<RemoteQuery> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn serve(&self, query: &RemoteQuery) -> Result<Page, BoxError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(query.clone());
            requests.len() - 1
        };
        if self.fail_on == Some(index) {
            return Err(Box::new(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }

        let all = (self.dataset)(query);
        let total = all.len() as u64;
        let start = query.start().min(total) as usize;
        let end = query
            .count()
            .map_or(total, |count| (query.start() + count).min(total)) as usize;
        Ok(Page::new(all[start..end.max(start)].to_vec(), total))
    }
}

impl PageSource for MockSource {
    fn fetch_page(&self, query: &RemoteQuery) -> Result<Page, BoxError> {
        self.serve(query)
    }
}

#[async_trait]
impl AsyncPageSource for MockSource {
    async fn fetch_page(&self, query: &RemoteQuery) -> Result<Page, BoxError> {
        tokio::task::yield_now().await;
        self.serve(query)
    }
}

/// `n` sensors with ids `0..n`
pub fn sensors(n: u64) -> Vec<Value> {
    (0..n)
        .map(|i| {
            json!({
                "objid": i,
                "name": format!("sensor-{}", i),
                "status": if i % 2 == 0 { 3 } else { 5 },
                "tags": if i % 3 == 0 { vec!["ping"] } else { vec!["http", "wan"] },
            })
        })
        .collect()
}

/// Wire parameter value by key
pub fn param(query: &RemoteQuery, key: &str) -> Option<String> {
    query
        .to_parameters(&remotequery::StandardCatalog)
        .unwrap()
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}
