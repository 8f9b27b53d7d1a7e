//! Blocking result enumeration

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::enumeration::{Enumeration, Step};
use super::errors::{ExecutorError, ExecutorResult};
use super::source::PageSource;

/// Lazy sequence of records.
///
/// Pages are fetched on demand while iterating; dropping the iterator stops
/// all further requests. After an error the iterator is exhausted.
pub struct Records<'a, S: PageSource + ?Sized> {
    source: &'a S,
    state: Enumeration,
}

impl<'a, S: PageSource + ?Sized> Records<'a, S> {
    pub(crate) fn new(source: &'a S, state: Enumeration) -> Self {
        Self { source, state }
    }

    /// Converts each record into a caller type
    pub fn typed<T: DeserializeOwned>(self) -> TypedRecords<'a, S, T> {
        TypedRecords {
            inner: self,
            _marker: PhantomData,
        }
    }
}

impl<S: PageSource + ?Sized> Iterator for Records<'_, S> {
    type Item = ExecutorResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state.step() {
                Step::Yield(record) => return Some(Ok(record)),
                Step::Done => return None,
                Step::Fetch(request) => {
                    let page = self.source.fetch_page(&request);
                    if let Err(err) = self.state.accept(&request, page) {
                        return Some(Err(err));
                    }
                }
            }
        }
    }
}

/// Records deserialized into `T`
pub struct TypedRecords<'a, S: PageSource + ?Sized, T> {
    inner: Records<'a, S>,
    _marker: PhantomData<fn() -> T>,
}

impl<S: PageSource + ?Sized, T: DeserializeOwned> Iterator for TypedRecords<'_, S, T> {
    type Item = ExecutorResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.inner.next()?;
        Some(record.and_then(|value| serde_json::from_value(value).map_err(ExecutorError::from)))
    }
}
