//! remotequery - A composable query layer over a remote table-query service
//!
//! Callers build queries with a fluent API (`filter`, `select`, `project`,
//! `order_by`, `skip`, `take`, `count`, `any`, `first`). The planner pushes
//! as much of each query as the remote service can express exactly into
//! remote requests; whatever remains runs on the client, and the explain
//! output says so.

pub mod config;
pub mod error;
pub mod executor;
pub mod model;
pub mod planner;
pub mod query;

pub use config::{QueryConfig, TranslationMode};
pub use error::{QueryError, QueryResult};
pub use executor::{AsyncPageSource, BoxError, ExecutorError, Page, PageSource, RecordStream, Records};
pub use model::{
    ContentType, FilterOperator, Literal, Priority, Property, PropertyCatalog, QueryFilter,
    StandardCatalog, Status,
};
pub use planner::{prop, ExecutionPlan, ExplainPlan, Expr, PlannerError, RemoteQuery, SortDirection};
pub use query::{Query, QueryClient};
