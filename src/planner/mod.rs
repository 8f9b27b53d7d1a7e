//! Query planner subsystem
//!
//! Turns a fluent operator plan into remote queries plus a local pipeline.
//!
//! # Design Principles
//!
//! - Deterministic: same plan and catalog, same execution plan
//! - Loud: anything the remote cannot honour exactly is rejected at
//!   finalization or disclosed as a local-fallback note
//! - Order preserving: nothing is reordered across the first non-mergeable
//!   operator
//!
//! # Pipeline
//!
//! 1. `QueryPlan` tracks the structurally mergeable prefix
//! 2. `ConditionTranslator` splits merged predicates into filter groups and a
//!    residual
//! 3. A `ContentAdjuster` rewrites groups per content type and may fan out
//! 4. `Planner` assembles the `ExecutionPlan`

mod adjust;
mod ast;
mod bounds;
mod errors;
mod explain;
mod plan;
mod planner;
mod remote;
mod translate;

pub use adjust::{adjuster_for, AdjustContext, ContentAdjuster, FanOut, GenericAdjuster, LogAdjuster};
pub use ast::{
    prop, Callback, CompareFn, Comparison, Expr, KeyFn, LocalPredicate, ManyFn, MapFn, Operand,
    PropertyRef, SortDirection, SortSpec,
};
pub use bounds::Window;
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use explain::ExplainPlan;
pub use plan::{
    MergeState, OrderKey, OrderSpec, Placement, PlanNode, Projection, QueryPlan, Reducer,
};
pub use planner::{CountStrategy, ExecutionPlan, LocalOp, Planner};
pub use remote::RemoteQuery;
pub use translate::{check_conjunction, ConditionTranslator, FilterGroup, FilterTerm, Translation};
