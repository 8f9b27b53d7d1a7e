//! Enumeration state shared by the blocking and the async executors

use std::collections::VecDeque;

use serde_json::Value;

use crate::planner::{ExecutionPlan, RemoteQuery};

use super::cursor::RemoteDriver;
use super::errors::{BoxError, ExecutorResult};
use super::ids::IdStack;
use super::pipeline::LocalPipeline;
use super::source::Page;

/// What the enumeration needs next
#[derive(Debug)]
pub(crate) enum Step {
    Yield(Value),
    /// Fetch this page and hand it to [`Enumeration::accept`]
    Fetch(RemoteQuery),
    Done,
}

/// One pass over an execution plan.
///
/// A page is only requested once every record of the previous page has been
/// yielded, and never once the local pipeline can emit nothing more.
#[derive(Debug)]
pub(crate) struct Enumeration {
    driver: RemoteDriver,
    pipeline: LocalPipeline,
    ready: VecDeque<Value>,
    flushed: bool,
}

impl Enumeration {
    pub(crate) fn new(plan: &ExecutionPlan) -> Self {
        Self {
            driver: RemoteDriver::new(
                plan.members.clone(),
                IdStack::new(&plan.ids),
                plan.id_column,
            ),
            pipeline: LocalPipeline::new(plan),
            ready: VecDeque::new(),
            flushed: false,
        }
    }

    pub(crate) fn step(&mut self) -> Step {
        loop {
            if let Some(record) = self.ready.pop_front() {
                return Step::Yield(record);
            }
            if self.flushed {
                return Step::Done;
            }
            if !self.pipeline.is_done() {
                if let Some(record) = self.driver.next_buffered() {
                    self.pipeline.push(record, &mut self.ready);
                    continue;
                }
                if let Some(request) = self.driver.next_request() {
                    return Step::Fetch(request);
                }
            }
            self.pipeline.finish(&mut self.ready);
            self.flushed = true;
        }
    }

    /// Feeds a fetched page back in; an error ends the enumeration
    pub(crate) fn accept(
        &mut self,
        request: &RemoteQuery,
        result: Result<Page, BoxError>,
    ) -> ExecutorResult<()> {
        let outcome = self.driver.accept(request, result);
        if outcome.is_err() {
            self.ready.clear();
            self.flushed = true;
        }
        outcome
    }
}
