//! Query executor
//!
//! Runs finalized execution plans against a page source.
//!
//! Execution flow:
//! 1. Build a fresh enumeration (cursor per member, ID stack, local pipeline)
//! 2. Drain the members in order, one page request at a time
//! 3. Push each record through the residual and the local operators
//! 4. Stop requesting as soon as the consumer or a `Take` is satisfied
//!
//! Reducers read as little as possible: `count` uses `count = 0` totals
//! requests when nothing local can drop or multiply records, `any` and
//! `first` stop after the first record.

use futures_util::{StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::debug;

use crate::planner::{CountStrategy, ExecutionPlan, RemoteQuery};

use super::enumeration::Enumeration;
use super::errors::{ExecutorError, ExecutorResult};
use super::result::Records;
use super::source::{AsyncPageSource, Page, PageSource};
use super::stream::RecordStream;

/// Executes plans against a blocking page source
pub struct QueryExecutor<'a, S: PageSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: PageSource + ?Sized> QueryExecutor<'a, S> {
    /// Blocking executor over a page source
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Starts a lazy enumeration; nothing is requested until it is iterated
    pub fn execute(&self, plan: &ExecutionPlan) -> Records<'a, S> {
        Records::new(self.source, Enumeration::new(plan))
    }

    /// Number of records the plan yields
    pub fn count(&self, plan: &ExecutionPlan) -> ExecutorResult<u64> {
        match plan.count_strategy {
            CountStrategy::Totals { window } => {
                let mut total = 0u64;
                for member in &plan.members {
                    let request = totals_request(member);
                    let page = self
                        .source
                        .fetch_page(&request)
                        .map_err(ExecutorError::Transport)?;
                    total = total.saturating_add(totals_of(&page)?);
                }
                Ok(window.clamp(total))
            }
            CountStrategy::Stream => {
                let mut count = 0u64;
                for record in self.execute(plan) {
                    record?;
                    count += 1;
                }
                Ok(count)
            }
        }
    }

    /// Whether the plan yields at least one record
    pub fn any(&self, plan: &ExecutionPlan) -> ExecutorResult<bool> {
        self.execute(plan).next().transpose().map(|r| r.is_some())
    }

    /// First record; `NoElements` when there is none
    pub fn first(&self, plan: &ExecutionPlan) -> ExecutorResult<Value> {
        self.first_or_default(plan)?.ok_or(ExecutorError::NoElements)
    }

    /// First record, if any
    pub fn first_or_default(&self, plan: &ExecutionPlan) -> ExecutorResult<Option<Value>> {
        self.execute(plan).next().transpose()
    }
}

/// Executes plans against a non-blocking page source
pub struct AsyncQueryExecutor<'a, S: AsyncPageSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: AsyncPageSource + ?Sized> AsyncQueryExecutor<'a, S> {
    /// Async executor over a page source
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Starts a lazy enumeration; nothing is requested until it is polled
    pub fn execute(&self, plan: &ExecutionPlan) -> RecordStream<'a> {
        RecordStream::new(self.source, Enumeration::new(plan))
    }

    /// Number of records the plan yields
    pub async fn count(&self, plan: &ExecutionPlan) -> ExecutorResult<u64> {
        match plan.count_strategy {
            CountStrategy::Totals { window } => {
                let mut total = 0u64;
                for member in &plan.members {
                    let request = totals_request(member);
                    let page = self
                        .source
                        .fetch_page(&request)
                        .await
                        .map_err(ExecutorError::Transport)?;
                    total = total.saturating_add(totals_of(&page)?);
                }
                Ok(window.clamp(total))
            }
            CountStrategy::Stream => {
                self.execute(plan)
                    .try_fold(0u64, |count, _| async move { Ok(count + 1) })
                    .await
            }
        }
    }

    /// Whether the plan yields any record
    pub async fn any(&self, plan: &ExecutionPlan) -> ExecutorResult<bool> {
        Ok(self.first_or_default(plan).await?.is_some())
    }

    /// First record; `NoElements` when there is none
    pub async fn first(&self, plan: &ExecutionPlan) -> ExecutorResult<Value> {
        self.first_or_default(plan)
            .await?
            .ok_or(ExecutorError::NoElements)
    }

    /// First record, or `None`
    pub async fn first_or_default(&self, plan: &ExecutionPlan) -> ExecutorResult<Option<Value>> {
        self.execute(plan).next().await.transpose()
    }
}

fn totals_request(member: &RemoteQuery) -> RemoteQuery {
    let request = member.totals();
    debug!(content = %request.content(), "requesting totals");
    request
}

fn totals_of(page: &Page) -> ExecutorResult<u64> {
    if !page.items.is_empty() {
        return Err(ExecutorError::MalformedPage(format!(
            "totals request returned {} items",
            page.items.len()
        )));
    }
    Ok(page.total_available)
}
