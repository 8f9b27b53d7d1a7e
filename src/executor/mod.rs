//! Query Executor subsystem
//!
//! Consumes execution plans and streams records from a remote page source.
//!
//! # Execution Flow (strict order)
//!
//! 1. Request one page of the current member query
//! 2. Tag records of ID fan-out members with their member's ID
//! 3. Filter records through the residual predicate
//! 4. Apply the local operators in plan order
//! 5. Yield records one at a time
//! 6. Request the next page only when the previous one is fully yielded and
//!    more records can still be emitted
//!
//! # Invariants
//!
//! - At most one page request in flight per enumeration
//! - No request once `take`, `first` or `any` is satisfied
//! - Arrival order preserved except by explicit local sorts
//! - Transport errors surface unchanged and end the enumeration

mod cursor;
mod enumeration;
mod errors;
mod executor;
mod filters;
mod ids;
mod pipeline;
mod result;
mod sorter;
mod source;
mod stream;

pub use cursor::PageCursor;
pub use errors::{BoxError, ExecutorError, ExecutorResult};
pub use executor::{AsyncQueryExecutor, QueryExecutor};
pub use filters::{FieldMap, RecordPredicate};
pub use ids::IdStack;
pub use result::{Records, TypedRecords};
pub use sorter::{compare_values, LocalSorter};
pub use source::{AsyncPageSource, Page, PageSource};
pub use stream::RecordStream;
