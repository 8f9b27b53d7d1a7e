//! Fluent query API
//!
//! A [`QueryClient`] owns the page source, the catalog and the config. Each
//! [`Query`] is an immutable value: builder methods return a new query and
//! leave the original untouched, so a base query can be refined in several
//! directions. Nothing is requested until a query is enumerated or reduced,
//! and every enumeration starts over from the first page.
//!
//! ```ignore
//! let client = QueryClient::new(source);
//! let down = client
//!     .sensors()
//!     .filter(prop(Property::Status).eq(Status::Down))
//!     .order_by(Property::Name)
//!     .take(10);
//! for record in down.iter()? {
//!     println!("{}", record?);
//! }
//! ```

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::QueryConfig;
use crate::error::QueryResult;
use crate::executor::{AsyncPageSource, AsyncQueryExecutor, PageSource, QueryExecutor, RecordStream, Records};
use crate::model::{ContentType, Property, PropertyCatalog, StandardCatalog};
use crate::planner::{
    Callback, ExecutionPlan, ExplainPlan, Expr, OrderKey, OrderSpec, PlanNode, Planner,
    Projection, QueryPlan, Reducer, SortDirection,
};

/// Entry point binding a page source to a catalog and a config
#[derive(Debug)]
pub struct QueryClient<S, C = StandardCatalog> {
    source: S,
    catalog: C,
    config: QueryConfig,
}

impl<S> QueryClient<S, StandardCatalog> {
    /// Client over the standard catalog with the default config
    pub fn new(source: S) -> Self {
        Self {
            source,
            catalog: StandardCatalog,
            config: QueryConfig::default(),
        }
    }
}

impl<S, C: PropertyCatalog> QueryClient<S, C> {
    /// Client over a custom catalog
    pub fn with_catalog(source: S, catalog: C, config: QueryConfig) -> QueryResult<Self> {
        config.validate()?;
        Ok(Self {
            source,
            catalog,
            config,
        })
    }

    /// Replaces the config
    pub fn with_config(mut self, config: QueryConfig) -> QueryResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Active config
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Property catalog
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Underlying page source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Starts a query over a content type
    pub fn query(&self, content: ContentType) -> Query<'_, S, C> {
        Query {
            client: self,
            content,
            plan: QueryPlan::new(),
        }
    }

    /// Query over sensors
    pub fn sensors(&self) -> Query<'_, S, C> {
        self.query(ContentType::Sensors)
    }

    /// Query over devices
    pub fn devices(&self) -> Query<'_, S, C> {
        self.query(ContentType::Devices)
    }

    /// Query over groups
    pub fn groups(&self) -> Query<'_, S, C> {
        self.query(ContentType::Groups)
    }

    /// Query over probes
    pub fn probes(&self) -> Query<'_, S, C> {
        self.query(ContentType::Probes)
    }

    /// Query over log entries
    pub fn logs(&self) -> Query<'_, S, C> {
        self.query(ContentType::Logs)
    }

    /// Query over channels
    pub fn channels(&self) -> Query<'_, S, C> {
        self.query(ContentType::Channels)
    }
}

/// Immutable, lazily executed query
pub struct Query<'c, S, C = StandardCatalog> {
    client: &'c QueryClient<S, C>,
    content: ContentType,
    plan: QueryPlan,
}

impl<S, C> Clone for Query<'_, S, C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client,
            content: self.content,
            plan: self.plan.clone(),
        }
    }
}

impl<'c, S, C: PropertyCatalog> Query<'c, S, C> {
    fn push(&self, node: PlanNode) -> Self {
        Self {
            client: self.client,
            content: self.content,
            plan: self.plan.push(node),
        }
    }

    /// Content type queried
    pub fn content(&self) -> ContentType {
        self.content
    }

    /// Operator plan built so far
    pub fn operators(&self) -> &QueryPlan {
        &self.plan
    }

    /// Keeps records matching the predicate
    pub fn filter(&self, predicate: Expr) -> Self {
        self.push(PlanNode::Filter(predicate))
    }

    /// Narrows records to the given columns
    pub fn select(&self, columns: impl IntoIterator<Item = Property>) -> Self {
        self.push(PlanNode::Project(Projection::Columns(
            columns.into_iter().collect(),
        )))
    }

    /// Reshapes each record; always evaluated locally
    pub fn project<F>(&self, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.push(PlanNode::Project(Projection::Map(Callback::from_arc(
            Arc::new(f),
        ))))
    }

    /// Expands each record into any number of records; always local
    pub fn project_many<F>(&self, f: F) -> Self
    where
        F: Fn(&Value) -> Vec<Value> + Send + Sync + 'static,
    {
        self.push(PlanNode::ProjectMany(Callback::from_arc(Arc::new(f))))
    }

    /// Orders ascending by a property
    pub fn order_by(&self, property: Property) -> Self {
        self.push(PlanNode::OrderBy(OrderSpec::by_property(
            property,
            SortDirection::Asc,
        )))
    }

    /// Orders descending by a property
    pub fn order_by_desc(&self, property: Property) -> Self {
        self.push(PlanNode::OrderBy(OrderSpec::by_property(
            property,
            SortDirection::Desc,
        )))
    }

    /// Orders by a computed key; always local
    pub fn order_by_key<K>(&self, key: K, direction: SortDirection) -> Self
    where
        K: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.push(PlanNode::OrderBy(OrderSpec {
            key: OrderKey::Computed(Callback::from_arc(Arc::new(key))),
            direction,
            comparer: None,
        }))
    }

    /// Orders a property with a custom comparer; always local
    pub fn order_by_with<F>(&self, property: Property, direction: SortDirection, comparer: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.push(PlanNode::OrderBy(OrderSpec {
            key: OrderKey::Property(property),
            direction,
            comparer: Some(Callback::from_arc(Arc::new(comparer))),
        }))
    }

    /// Skips the first `n` records
    pub fn skip(&self, n: u64) -> Self {
        self.push(PlanNode::Skip(n))
    }

    /// Keeps at most `n` records
    pub fn take(&self, n: u64) -> Self {
        self.push(PlanNode::Take(n))
    }

    /// Finalizes the query, surfacing every planning error
    pub fn plan(&self) -> QueryResult<ExecutionPlan> {
        self.finalize(&self.plan)
    }

    /// Describes how the query would run, or why it is rejected
    pub fn explain(&self) -> ExplainPlan {
        match Planner::new(&self.client.catalog, &self.client.config).plan(self.content, &self.plan) {
            Ok(plan) => ExplainPlan::from_plan(&plan),
            Err(err) => ExplainPlan::from_error(&err),
        }
    }

    fn finalize(&self, plan: &QueryPlan) -> QueryResult<ExecutionPlan> {
        Planner::new(&self.client.catalog, &self.client.config)
            .plan(self.content, plan)
            .map_err(|err| {
                debug!(content = %self.content, code = err.code().code(), "query rejected");
                err.into()
            })
    }

    fn reduced(&self, predicate: Option<Expr>, reducer: Reducer) -> QueryResult<ExecutionPlan> {
        let plan = match predicate {
            Some(expr) => self.plan.push(PlanNode::Filter(expr)),
            None => self.plan.clone(),
        };
        self.finalize(&plan.push(PlanNode::Reduce(reducer)))
    }
}

impl<'c, S: PageSource, C: PropertyCatalog> Query<'c, S, C> {
    /// Lazily enumerates the records
    pub fn iter(&self) -> QueryResult<Records<'c, S>> {
        let plan = self.plan()?;
        Ok(QueryExecutor::new(&self.client.source).execute(&plan))
    }

    /// Number of records
    pub fn count(&self) -> QueryResult<u64> {
        self.count_plan(None)
    }

    /// Number of records matching the predicate
    pub fn count_where(&self, predicate: Expr) -> QueryResult<u64> {
        self.count_plan(Some(predicate))
    }

    /// Whether any record exists
    pub fn any(&self) -> QueryResult<bool> {
        self.any_plan(None)
    }

    /// Whether any record matches the predicate
    pub fn any_where(&self, predicate: Expr) -> QueryResult<bool> {
        self.any_plan(Some(predicate))
    }

    /// First record; fails with `NoElements` when there is none
    pub fn first(&self) -> QueryResult<Value> {
        self.first_plan(None)
    }

    /// First record matching the predicate
    pub fn first_where(&self, predicate: Expr) -> QueryResult<Value> {
        self.first_plan(Some(predicate))
    }

    /// First record, or `None`
    pub fn first_or_default(&self) -> QueryResult<Option<Value>> {
        self.first_or_default_plan(None)
    }

    /// First record matching the predicate, or `None`
    pub fn first_or_default_where(&self, predicate: Expr) -> QueryResult<Option<Value>> {
        self.first_or_default_plan(Some(predicate))
    }

    fn executor(&self) -> QueryExecutor<'c, S> {
        QueryExecutor::new(&self.client.source)
    }

    fn count_plan(&self, predicate: Option<Expr>) -> QueryResult<u64> {
        let plan = self.reduced(predicate, Reducer::Count)?;
        Ok(self.executor().count(&plan)?)
    }

    fn any_plan(&self, predicate: Option<Expr>) -> QueryResult<bool> {
        let plan = self.reduced(predicate, Reducer::Any)?;
        Ok(self.executor().any(&plan)?)
    }

    fn first_plan(&self, predicate: Option<Expr>) -> QueryResult<Value> {
        let plan = self.reduced(predicate, Reducer::First)?;
        Ok(self.executor().first(&plan)?)
    }

    fn first_or_default_plan(&self, predicate: Option<Expr>) -> QueryResult<Option<Value>> {
        let plan = self.reduced(predicate, Reducer::FirstOrDefault)?;
        Ok(self.executor().first_or_default(&plan)?)
    }
}

impl<'c, S: AsyncPageSource, C: PropertyCatalog> Query<'c, S, C> {
    /// Lazily streams the records
    pub fn stream(&self) -> QueryResult<RecordStream<'c>> {
        let plan = self.plan()?;
        Ok(AsyncQueryExecutor::new(&self.client.source).execute(&plan))
    }

    /// Number of records
    pub async fn count_async(&self) -> QueryResult<u64> {
        let plan = self.reduced(None, Reducer::Count)?;
        Ok(self.async_executor().count(&plan).await?)
    }

    /// Number of records matching the predicate
    pub async fn count_where_async(&self, predicate: Expr) -> QueryResult<u64> {
        let plan = self.reduced(Some(predicate), Reducer::Count)?;
        Ok(self.async_executor().count(&plan).await?)
    }

    /// Whether any record exists
    pub async fn any_async(&self) -> QueryResult<bool> {
        let plan = self.reduced(None, Reducer::Any)?;
        Ok(self.async_executor().any(&plan).await?)
    }

    /// Whether any record matches the predicate
    pub async fn any_where_async(&self, predicate: Expr) -> QueryResult<bool> {
        let plan = self.reduced(Some(predicate), Reducer::Any)?;
        Ok(self.async_executor().any(&plan).await?)
    }

    /// First record; fails with `NoElements` when there is none
    pub async fn first_async(&self) -> QueryResult<Value> {
        let plan = self.reduced(None, Reducer::First)?;
        Ok(self.async_executor().first(&plan).await?)
    }

    /// First record matching the predicate
    pub async fn first_where_async(&self, predicate: Expr) -> QueryResult<Value> {
        let plan = self.reduced(Some(predicate), Reducer::First)?;
        Ok(self.async_executor().first(&plan).await?)
    }

    /// First record, or `None`
    pub async fn first_or_default_async(&self) -> QueryResult<Option<Value>> {
        let plan = self.reduced(None, Reducer::FirstOrDefault)?;
        Ok(self.async_executor().first_or_default(&plan).await?)
    }

    fn async_executor(&self) -> AsyncQueryExecutor<'c, S> {
        AsyncQueryExecutor::new(&self.client.source)
    }
}
