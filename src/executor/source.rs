//! Page source collaborators
//!
//! The transport layer is external. It answers one page request at a time
//! and must be idempotent for identical requests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::planner::RemoteQuery;

use super::errors::BoxError;

/// One page of raw records
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    /// Records keyed by wire column name
    pub items: Vec<Value>,
    /// Total number of items matching the query, ignoring the window
    pub total_available: u64,
}

impl Page {
    /// Page of items with the service's total count
    pub fn new(items: Vec<Value>, total_available: u64) -> Self {
        Self {
            items,
            total_available,
        }
    }
}

/// Blocking page fetch
pub trait PageSource {
    fn fetch_page(&self, query: &RemoteQuery) -> Result<Page, BoxError>;
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn fetch_page(&self, query: &RemoteQuery) -> Result<Page, BoxError> {
        (**self).fetch_page(query)
    }
}

/// Non-blocking page fetch
#[async_trait]
pub trait AsyncPageSource: Send + Sync {
    async fn fetch_page(&self, query: &RemoteQuery) -> Result<Page, BoxError>;
}
