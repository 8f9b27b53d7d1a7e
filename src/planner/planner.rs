//! Plan finalization
//!
//! Turns an operator plan into an execution plan: the remote queries of the
//! mergeable prefix (one per fan-out member) and the local pipeline applied
//! to the fetched records.
//!
//! Finalization order:
//! 1. Walk the nodes, translating merged filters and composing the window
//! 2. Run the content adjuster over the merged filter groups
//! 3. Move remote sort and window to the client for fan-outs
//! 4. Widen the fetched columns to whatever the local pipeline reads
//!
//! Every failure surfaces here, before any request is issued.

use std::fmt;

use tracing::{debug, warn};

use crate::config::QueryConfig;
use crate::model::{ContentType, Property, PropertyCatalog, PropertyDescriptor};

use super::adjust::{adjuster_for, AdjustContext};
use super::ast::{Expr, ManyFn, MapFn, SortSpec};
use super::bounds::Window;
use super::errors::{PlannerError, PlannerResult};
use super::plan::{
    MergeState, OrderKey, OrderSpec, Placement, PlanNode, Projection, QueryPlan, Reducer,
};
use super::remote::RemoteQuery;
use super::translate::{check_conjunction, ConditionTranslator, FilterGroup};

/// Operator evaluated on the client
#[derive(Debug, Clone)]
pub enum LocalOp {
    Filter(Expr),
    Select(Vec<Property>),
    Project(MapFn),
    ProjectMany(ManyFn),
    OrderBy(OrderSpec),
    Skip(u64),
    Take(u64),
}

impl LocalOp {
    fn from_node(node: &PlanNode) -> Option<Self> {
        Some(match node {
            PlanNode::Filter(expr) => LocalOp::Filter(expr.clone()),
            PlanNode::Project(Projection::Columns(columns)) => LocalOp::Select(columns.clone()),
            PlanNode::Project(Projection::Map(f)) => LocalOp::Project(f.clone()),
            PlanNode::ProjectMany(f) => LocalOp::ProjectMany(f.clone()),
            PlanNode::OrderBy(spec) => LocalOp::OrderBy(spec.clone()),
            PlanNode::Skip(n) => LocalOp::Skip(*n),
            PlanNode::Take(n) => LocalOp::Take(*n),
            PlanNode::Reduce(_) => return None,
        })
    }

    /// Whether the op changes the record shape
    fn reshapes(&self) -> bool {
        matches!(
            self,
            LocalOp::Select(_) | LocalOp::Project(_) | LocalOp::ProjectMany(_)
        )
    }
}

impl fmt::Display for LocalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalOp::Filter(expr) => write!(f, "filter {}", expr),
            LocalOp::Select(columns) => {
                let names: Vec<&str> = columns.iter().map(Property::as_str).collect();
                write!(f, "select [{}]", names.join(", "))
            }
            LocalOp::Project(_) => f.write_str("project <closure>"),
            LocalOp::ProjectMany(_) => f.write_str("project_many <closure>"),
            LocalOp::OrderBy(spec) => {
                match &spec.key {
                    OrderKey::Property(p) => write!(f, "order_by {} {}", p, spec.direction.as_str())?,
                    OrderKey::Computed(_) => {
                        write!(f, "order_by <key> {}", spec.direction.as_str())?
                    }
                }
                if spec.comparer.is_some() {
                    f.write_str(" with comparer")?;
                }
                Ok(())
            }
            LocalOp::Skip(n) => write!(f, "skip {}", n),
            LocalOp::Take(n) => write!(f, "take {}", n),
        }
    }
}

/// How `count` is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountStrategy {
    /// One `count = 0` request per member; the summed totals are clamped to
    /// the window
    Totals { window: Window },
    /// Enumerate and count
    Stream,
}

/// Finalized, immutable execution plan
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub content: ContentType,
    /// Remote queries drained in order
    pub members: Vec<RemoteQuery>,
    /// ID of each member, in member order; empty when not filtering on IDs
    pub ids: Vec<i64>,
    /// Column records are tagged with their member's ID under
    pub id_column: Option<&'static str>,
    /// Predicate part evaluated on each fetched record before `local`
    pub residual: Option<Expr>,
    pub local: Vec<LocalOp>,
    pub reducer: Option<Reducer>,
    pub count_strategy: CountStrategy,
    /// Disclosure of everything evaluated locally
    pub notes: Vec<String>,
    /// Properties of the content type, for local evaluation
    pub fields: Vec<PropertyDescriptor>,
}

impl ExecutionPlan {
    /// Whether more than one remote query is issued
    pub fn is_fan_out(&self) -> bool {
        self.members.len() > 1
    }

    /// Whether the remote answers the whole query
    pub fn is_fully_remote(&self) -> bool {
        self.residual.is_none() && self.local.is_empty()
    }
}

/// Finalizes operator plans against a catalog
pub struct Planner<'a, C: PropertyCatalog + ?Sized> {
    catalog: &'a C,
    config: &'a QueryConfig,
}

impl<'a, C: PropertyCatalog + ?Sized> Planner<'a, C> {
    /// Planner over a catalog and config
    pub fn new(catalog: &'a C, config: &'a QueryConfig) -> Self {
        Self { catalog, config }
    }

    /// Plans a query, returning an immutable execution plan or error.
    ///
    /// Deterministic: same inputs, same plan.
    pub fn plan(&self, content: ContentType, plan: &QueryPlan) -> PlannerResult<ExecutionPlan> {
        let adjuster = adjuster_for(content);
        let translator = ConditionTranslator::new(
            self.catalog,
            content,
            self.config.mode,
            adjuster.range_properties(),
        );

        let mut state = MergeState::new();
        let mut groups: Vec<FilterGroup> = Vec::new();
        let mut residual = Vec::new();
        let mut notes = Vec::new();
        let mut selected: Option<Vec<Property>> = None;
        let mut sort: Option<SortSpec> = None;
        let mut window = Window::default();
        let mut local = Vec::new();
        let mut reducer = None;

        // 1. Walk the nodes
        for (index, node) in plan.nodes().iter().enumerate() {
            if reducer.is_some() {
                return Err(PlannerError::query_invalid(format!(
                    "operator '{}' follows a terminal reducer",
                    node.kind()
                )));
            }

            if let PlanNode::Reduce(r) = node {
                reducer = Some(*r);
                if r.needs_one() {
                    if state.is_fully_remote() {
                        window = window.take(1);
                    } else {
                        local.push(LocalOp::Take(1));
                    }
                }
                continue;
            }

            let was_open = state.is_open();
            let placement = state.admit(node);

            if placement == Placement::Remote {
                match node {
                    PlanNode::Filter(expr) => {
                        let translation = translator.translate(expr)?;
                        groups.extend(translation.groups);
                        notes.extend(translation.notes);
                        if let Some(rest) = translation.residual {
                            state.mark_residual();
                            residual.push(rest);
                        }
                        continue;
                    }
                    PlanNode::Project(Projection::Columns(columns)) => {
                        selected = Some(self.select(content, selected.as_deref(), columns)?);
                        continue;
                    }
                    PlanNode::OrderBy(spec) => {
                        if let Some(remote) = spec.remote_sort() {
                            if self.sortable(content, remote.property) {
                                sort = Some(remote);
                                continue;
                            }
                            state.close();
                            notes.push(format!(
                                "order_by {} evaluated locally: not sortable remotely",
                                remote.property
                            ));
                            warn!(
                                content = %content,
                                property = %remote.property,
                                "ordering demoted to local evaluation"
                            );
                        }
                    }
                    PlanNode::Skip(n) => {
                        window = window.skip(*n);
                        continue;
                    }
                    PlanNode::Take(n) => {
                        window = window.take(*n);
                        continue;
                    }
                    _ => {}
                }
            } else if was_open {
                notes.push(format!(
                    "remote portion ends before {} (operator {})",
                    node.kind(),
                    index
                ));
            }

            if let Some(op) = LocalOp::from_node(node) {
                local.push(op);
            }
        }

        // 2. Adjust; separate filter calls are AND-ed like one conjunction
        check_conjunction(&groups, adjuster.range_properties())?;
        let supported = self.catalog.supported_properties(content);
        let ctx = AdjustContext {
            content,
            supported: &supported,
            mode: self.config.mode,
        };
        let fan_out = adjuster.adjust(&ctx, &groups)?;
        if fan_out.len() > self.config.max_fan_out {
            return Err(PlannerError::query_invalid(format!(
                "query fans out into {} requests; at most {} are allowed",
                fan_out.len(),
                self.config.max_fan_out
            )));
        }

        // 3. Fan-out: the remote cannot sort or window across members
        let mut member_sort = sort;
        let mut member_window = window;
        let mut counted_window = window;
        if fan_out.len() > 1 {
            let mut front = Vec::new();
            if let Some(s) = sort {
                front.push(LocalOp::OrderBy(OrderSpec::by_property(s.property, s.direction)));
                notes.push(format!(
                    "sort on {} applied locally across {} requests",
                    s.property,
                    fan_out.len()
                ));
            }
            if window.skip > 0 {
                front.push(LocalOp::Skip(window.skip));
            }
            if let Some(take) = window.take {
                front.push(LocalOp::Take(take));
            }
            member_window = Window {
                skip: 0,
                take: if sort.is_none() { window.reach() } else { None },
            };
            member_sort = None;
            counted_window = Window::default();
            local.splice(0..0, front);
        }

        // 4. Columns
        let residual = Expr::all(residual);
        let mut columns = selected
            .clone()
            .unwrap_or_else(|| self.catalog.default_columns(content));
        let mut widened = false;
        for property in self.locally_read(residual.as_ref(), &local) {
            if !columns.contains(&property) && self.catalog.descriptor(content, property).is_some()
            {
                columns.push(property);
                widened = true;
            }
        }
        if let (true, Some(selection)) = (widened, selected) {
            // Trim back to the caller's selection before anything reshapes
            let at = local.iter().position(LocalOp::reshapes).unwrap_or(local.len());
            local.insert(at, LocalOp::Select(selection));
        }

        let count_strategy = count_strategy(residual.is_some(), &local, counted_window);

        let members: Vec<RemoteQuery> = fan_out
            .members
            .into_iter()
            .map(|filters| {
                RemoteQuery::new(content, columns.clone(), filters)
                    .with_sort(member_sort)
                    .with_window(member_window.skip, member_window.take)
                    .with_page_size(self.config.page_size)
            })
            .collect();

        let id_column = if fan_out.ids.is_empty() {
            None
        } else {
            self.catalog.column_name(content, Property::Id)
        };

        debug!(
            content = %content,
            members = members.len(),
            local_ops = local.len(),
            residual = residual.is_some(),
            "plan finalized"
        );

        Ok(ExecutionPlan {
            content,
            members,
            ids: fan_out.ids,
            id_column,
            residual,
            local,
            reducer,
            count_strategy,
            notes,
            fields: self.catalog.properties(content),
        })
    }

    fn sortable(&self, content: ContentType, property: Property) -> bool {
        self.catalog
            .descriptor(content, property)
            .map_or(false, |d| d.sortable)
    }

    /// Validates a column selection, narrowing any earlier one
    fn select(
        &self,
        content: ContentType,
        previous: Option<&[Property]>,
        columns: &[Property],
    ) -> PlannerResult<Vec<Property>> {
        if let Some(missing) = columns
            .iter()
            .find(|p| self.catalog.descriptor(content, **p).is_none())
        {
            return Err(PlannerError::unsupported_property(*missing, content));
        }
        let mut out: Vec<Property> = Vec::with_capacity(columns.len());
        for property in columns {
            if let Some(prev) = previous {
                if !prev.contains(property) {
                    return Err(PlannerError::query_invalid(format!(
                        "select of column '{}' which an earlier select removed",
                        property
                    )));
                }
            }
            if !out.contains(property) {
                out.push(*property);
            }
        }
        if out.is_empty() {
            return Err(PlannerError::query_invalid("select with no columns"));
        }
        Ok(out)
    }

    /// Source properties the local pipeline reads before it reshapes records
    fn locally_read(&self, residual: Option<&Expr>, local: &[LocalOp]) -> Vec<Property> {
        let mut read = residual.map(Expr::properties).unwrap_or_default();
        for op in local {
            match op {
                LocalOp::Filter(expr) => read.extend(expr.properties()),
                LocalOp::OrderBy(OrderSpec {
                    key: OrderKey::Property(p),
                    ..
                }) => read.push(*p),
                LocalOp::Select(columns) => {
                    read.extend(columns.iter().copied());
                    break;
                }
                op if op.reshapes() => break,
                _ => {}
            }
        }
        read
    }
}

/// Totals are usable when nothing local can drop or multiply records
fn count_strategy(has_residual: bool, local: &[LocalOp], remote_window: Window) -> CountStrategy {
    if has_residual {
        return CountStrategy::Stream;
    }
    let mut window = remote_window;
    for op in local {
        match op {
            LocalOp::Filter(_) | LocalOp::ProjectMany(_) => return CountStrategy::Stream,
            LocalOp::Skip(n) => window = window.skip(*n),
            LocalOp::Take(n) => window = window.take(*n),
            LocalOp::Select(_) | LocalOp::Project(_) | LocalOp::OrderBy(_) => {}
        }
    }
    CountStrategy::Totals { window }
}
