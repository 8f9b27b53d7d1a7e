//! Page cursor state machine
//!
//! One cursor drives one remote query:
//! - Start: request `count = min(page_size, remaining budget)` at `start`
//! - Page received: buffer its items, advance `start` by the items received
//! - Stop when the budget is spent, the page is short or empty, or `start`
//!   reaches the total reported by the first page
//!
//! The driver chains cursors over the fan-out members in order. Neither does
//! any I/O: callers fetch the requested page and hand the result back, which
//! keeps the blocking and the async enumerations on the same state machine.

use std::collections::VecDeque;

use serde_json::Value;
use tracing::debug;

use crate::planner::RemoteQuery;

use super::errors::{BoxError, ExecutorError, ExecutorResult};
use super::ids::IdStack;
use super::source::Page;

/// Execution state of one remote query
#[derive(Debug, Clone)]
pub struct PageCursor {
    query: RemoteQuery,
    start: u64,
    remaining: Option<u64>,
    received: u64,
    total: Option<u64>,
    finished: bool,
}

impl PageCursor {
    /// Cursor positioned at the query's start offset
    pub fn new(query: RemoteQuery) -> Self {
        Self {
            start: query.start(),
            remaining: query.count(),
            query,
            received: 0,
            total: None,
            finished: false,
        }
    }

    /// Whether no further page will be requested
    pub fn is_finished(&self) -> bool {
        self.finished || self.remaining == Some(0)
    }

    /// The next page request, or `None` when the cursor is finished
    pub fn next_request(&self) -> Option<RemoteQuery> {
        if self.is_finished() {
            return None;
        }
        let page_size = self.query.page_size();
        let count = self.remaining.map_or(page_size, |r| r.min(page_size));
        Some(self.query.page(self.start, count))
    }

    /// Records the page answering `request` and returns its items
    pub fn accept(&mut self, request: &RemoteQuery, page: Page) -> ExecutorResult<Vec<Value>> {
        let requested = request.count().unwrap_or(0);
        let received = page.items.len() as u64;
        if received > requested {
            self.finished = true;
            return Err(ExecutorError::MalformedPage(format!(
                "requested {} items at {} but received {}",
                requested,
                request.start(),
                received
            )));
        }

        let total = *self.total.get_or_insert(page.total_available);
        self.start += received;
        self.received += received;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= received;
        }

        if received == 0 || received < requested || self.start >= total {
            self.finished = true;
        }

        Ok(page.items)
    }

    /// Current start offset
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Items received so far
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Total reported by the first page
    pub fn total_available(&self) -> Option<u64> {
        self.total
    }
}

/// Drains fan-out members one after another
#[derive(Debug)]
pub(crate) struct RemoteDriver {
    members: std::vec::IntoIter<RemoteQuery>,
    member_index: usize,
    cursor: Option<PageCursor>,
    buffer: VecDeque<Value>,
    ids: IdStack,
    current_id: Option<i64>,
    id_column: Option<&'static str>,
    failed: bool,
}

impl RemoteDriver {
    pub(crate) fn new(members: Vec<RemoteQuery>, ids: IdStack, id_column: Option<&'static str>) -> Self {
        Self {
            members: members.into_iter(),
            member_index: 0,
            cursor: None,
            buffer: VecDeque::new(),
            ids,
            current_id: None,
            id_column,
            failed: false,
        }
    }

    /// Next already-fetched record, tagged with its member's ID
    pub(crate) fn next_buffered(&mut self) -> Option<Value> {
        let mut item = self.buffer.pop_front()?;
        if let (Some(column), Some(id), Value::Object(map)) =
            (self.id_column, self.current_id, &mut item)
        {
            map.entry(column).or_insert_with(|| Value::from(id));
        }
        Some(item)
    }

    /// Next page to fetch, starting the next member when the current one is
    /// finished; `None` once every member is drained or after a failure
    pub(crate) fn next_request(&mut self) -> Option<RemoteQuery> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(request) = self.cursor.as_ref().and_then(PageCursor::next_request) {
                debug!(
                    content = %request.content(),
                    member = self.member_index,
                    start = request.start(),
                    count = request.count().unwrap_or(0),
                    "requesting page"
                );
                return Some(request);
            }

            let query = self.members.next()?;
            if self.cursor.is_some() {
                self.member_index += 1;
            }
            self.current_id = self.ids.pop();
            debug!(
                content = %query.content(),
                member = self.member_index,
                id = ?self.current_id,
                "starting remote query"
            );
            self.cursor = Some(PageCursor::new(query));
        }
    }

    /// Feeds the outcome of the last requested page back in
    pub(crate) fn accept(
        &mut self,
        request: &RemoteQuery,
        result: Result<Page, BoxError>,
    ) -> ExecutorResult<()> {
        let outcome = match (self.cursor.as_mut(), result) {
            (_, Err(err)) => Err(ExecutorError::Transport(err)),
            (Some(cursor), Ok(page)) => cursor.accept(request, page),
            (None, Ok(_)) => Err(ExecutorError::MalformedPage(
                "page received without a pending request".to_string(),
            )),
        };

        match outcome {
            Ok(items) => {
                self.buffer.extend(items);
                Ok(())
            }
            Err(err) => {
                self.failed = true;
                self.buffer.clear();
                Err(err)
            }
        }
    }
}
