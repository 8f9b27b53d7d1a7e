//! Non-blocking result enumeration
//!
//! The same enumeration state as the blocking iterator, driven by awaiting
//! the page source. The only suspension point is the page fetch, and a page
//! is only requested when the consumer polls for a record that is not yet
//! buffered. Dropping the stream cancels it: nothing further is requested.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::enumeration::{Enumeration, Step};
use super::errors::{ExecutorError, ExecutorResult};
use super::source::AsyncPageSource;

/// Lazy asynchronous sequence of records; ends after the first error
pub struct RecordStream<'a> {
    inner: BoxStream<'a, ExecutorResult<Value>>,
}

impl<'a> RecordStream<'a> {
    pub(crate) fn new<S: AsyncPageSource + ?Sized>(source: &'a S, state: Enumeration) -> Self {
        let inner = stream::try_unfold((source, state), |(source, mut state)| async move {
            next_record(source, &mut state)
                .await
                .map(|record| record.map(|record| (record, (source, state))))
        });
        Self {
            inner: inner.boxed(),
        }
    }

    /// Converts each record into a caller type
    pub fn typed<T>(self) -> BoxStream<'a, ExecutorResult<T>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        self.inner
            .map(|record| {
                record.and_then(|value| serde_json::from_value(value).map_err(ExecutorError::from))
            })
            .boxed()
    }
}

async fn next_record<S: AsyncPageSource + ?Sized>(
    source: &S,
    state: &mut Enumeration,
) -> ExecutorResult<Option<Value>> {
    loop {
        match state.step() {
            Step::Yield(record) => return Ok(Some(record)),
            Step::Done => return Ok(None),
            Step::Fetch(request) => {
                let page = source.fetch_page(&request).await;
                state.accept(&request, page)?;
            }
        }
    }
}

impl Stream for RecordStream<'_> {
    type Item = ExecutorResult<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
