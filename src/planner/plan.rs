//! Query plan nodes and the remote-mergeability boundary
//!
//! A plan is an append-only list of operator nodes. Each append returns a new
//! plan and records whether the node can still be merged into the single
//! remote query or must run on the client.
//!
//! Merge rules:
//! - The first non-mergeable node closes the remote portion; everything after
//!   it is local, even nodes that would be mergeable in isolation.
//! - Filters commute with ordering but not with skip/take.
//! - Once part of a filter is evaluated locally, skip/take cannot be sent
//!   remotely (the remote would count records the client later drops).

use std::sync::Arc;

use crate::model::Property;

use super::ast::{CompareFn, Expr, KeyFn, ManyFn, MapFn, SortDirection, SortSpec};

/// Projection applied to each record
#[derive(Debug, Clone)]
pub enum Projection {
    /// Narrows the record to the given columns; keeps the source shape
    Columns(Vec<Property>),
    /// Arbitrary reshaping closure
    Map(MapFn),
}

/// Ordering key
#[derive(Debug, Clone)]
pub enum OrderKey {
    Property(Property),
    Computed(KeyFn),
}

/// Ordering request
#[derive(Debug, Clone)]
pub struct OrderSpec {
    pub key: OrderKey,
    pub direction: SortDirection,
    pub comparer: Option<CompareFn>,
}

impl OrderSpec {
    /// Orders by a property with no custom comparer
    pub fn by_property(property: Property, direction: SortDirection) -> Self {
        Self {
            key: OrderKey::Property(property),
            direction,
            comparer: None,
        }
    }

    /// The remote sort this ordering maps to, if it maps to one
    pub fn remote_sort(&self) -> Option<SortSpec> {
        match (&self.key, &self.comparer) {
            (OrderKey::Property(property), None) => Some(SortSpec {
                property: *property,
                direction: self.direction,
            }),
            _ => None,
        }
    }
}

/// Terminal reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Count,
    Any,
    First,
    FirstOrDefault,
}

impl Reducer {
    /// Reducer name as shown in explain output
    pub fn as_str(&self) -> &'static str {
        match self {
            Reducer::Count => "count",
            Reducer::Any => "any",
            Reducer::First => "first",
            Reducer::FirstOrDefault => "first_or_default",
        }
    }

    /// Whether the reducer only ever needs the first record
    pub fn needs_one(&self) -> bool {
        !matches!(self, Reducer::Count)
    }
}

/// One operator in a plan
#[derive(Debug, Clone)]
pub enum PlanNode {
    Filter(Expr),
    Project(Projection),
    ProjectMany(ManyFn),
    OrderBy(OrderSpec),
    Skip(u64),
    Take(u64),
    Reduce(Reducer),
}

impl PlanNode {
    /// Operator name as shown in explain output
    pub fn kind(&self) -> &'static str {
        match self {
            PlanNode::Filter(_) => "filter",
            PlanNode::Project(Projection::Columns(_)) => "select",
            PlanNode::Project(Projection::Map(_)) => "project",
            PlanNode::ProjectMany(_) => "project_many",
            PlanNode::OrderBy(_) => "order_by",
            PlanNode::Skip(_) => "skip",
            PlanNode::Take(_) => "take",
            PlanNode::Reduce(r) => r.as_str(),
        }
    }
}

/// Where a node executes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Remote,
    Local,
}

/// Tracks the remote-mergeable prefix while nodes are admitted in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeState {
    open: bool,
    windowed: bool,
    sorted: bool,
    residual: bool,
}

impl Default for MergeState {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeState {
    /// State of an empty plan
    pub fn new() -> Self {
        Self {
            open: true,
            windowed: false,
            sorted: false,
            residual: false,
        }
    }

    /// Whether further nodes may still merge into the remote query
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether a merged filter left part of its predicate for the client
    pub fn has_residual(&self) -> bool {
        self.residual
    }

    /// Whether everything admitted so far runs remotely
    pub fn is_fully_remote(&self) -> bool {
        self.open && !self.residual
    }

    /// Freezes the remote portion
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Records that a merged filter left a residual predicate
    pub fn mark_residual(&mut self) {
        self.residual = true;
    }

    /// Decides the placement of the next node and updates the state
    pub fn admit(&mut self, node: &PlanNode) -> Placement {
        if !self.open {
            return Placement::Local;
        }

        let placement = match node {
            PlanNode::Filter(expr) => {
                if self.windowed || expr.is_wholly_local() {
                    Placement::Local
                } else {
                    Placement::Remote
                }
            }
            PlanNode::Project(Projection::Columns(_)) => Placement::Remote,
            PlanNode::Project(Projection::Map(_)) | PlanNode::ProjectMany(_) => Placement::Local,
            PlanNode::OrderBy(spec) => {
                if self.windowed || self.sorted || spec.remote_sort().is_none() {
                    Placement::Local
                } else {
                    self.sorted = true;
                    Placement::Remote
                }
            }
            PlanNode::Skip(_) | PlanNode::Take(_) => {
                if self.residual {
                    Placement::Local
                } else {
                    self.windowed = true;
                    Placement::Remote
                }
            }
            PlanNode::Reduce(_) => Placement::Remote,
        };

        if placement == Placement::Local {
            self.close();
        }
        placement
    }
}

/// Immutable, append-only operator list
#[derive(Debug, Clone, Default)]
pub struct QueryPlan {
    nodes: Arc<Vec<PlanNode>>,
    placements: Arc<Vec<Placement>>,
    state: MergeState,
}

impl QueryPlan {
    /// Empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new plan with `node` appended
    pub fn push(&self, node: PlanNode) -> Self {
        let mut state = self.state;
        let placement = state.admit(&node);

        let mut nodes = Vec::with_capacity(self.nodes.len() + 1);
        nodes.extend(self.nodes.iter().cloned());
        nodes.push(node);

        let mut placements = Vec::with_capacity(self.placements.len() + 1);
        placements.extend(self.placements.iter().copied());
        placements.push(placement);

        Self {
            nodes: Arc::new(nodes),
            placements: Arc::new(placements),
            state,
        }
    }

    /// Nodes in call order
    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Structural placement of the node at `index`.
    ///
    /// Finalization against a catalog may still demote remote nodes (for
    /// example an ordering on a property the remote cannot sort by).
    pub fn placement(&self, index: usize) -> Option<Placement> {
        self.placements.get(index).copied()
    }

    /// Number of leading nodes that merge into the remote query
    pub fn remote_prefix_len(&self) -> usize {
        self.placements
            .iter()
            .take_while(|p| **p == Placement::Remote)
            .count()
    }

    /// Whether the plan already ends in a reducer
    pub fn is_terminated(&self) -> bool {
        matches!(self.nodes.last(), Some(PlanNode::Reduce(_)))
    }
}
