//! Predicate and ordering AST
//!
//! Predicates are explicit expression trees so the translator can inspect
//! them. Opaque closures are still allowed through [`Expr::local`], but they
//! are always evaluated on the client.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{BitAnd, BitOr, Deref, Not};
use std::sync::Arc;

use serde_json::Value;

use crate::model::{FilterOperator, Literal, Property};

/// Shared, cheaply clonable closure
pub struct Callback<F: ?Sized>(Arc<F>);

impl<F: ?Sized> Callback<F> {
    /// Wraps a shared closure
    pub fn from_arc(f: Arc<F>) -> Self {
        Self(f)
    }
}

impl<F: ?Sized> Clone for Callback<F> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<F: ?Sized> Deref for Callback<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.0
    }
}

impl<F: ?Sized> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<closure>")
    }
}

/// Client-side record predicate
pub type LocalPredicate = Callback<dyn Fn(&Value) -> bool + Send + Sync>;
/// Record-to-record projection
pub type MapFn = Callback<dyn Fn(&Value) -> Value + Send + Sync>;
/// Record-to-many projection
pub type ManyFn = Callback<dyn Fn(&Value) -> Vec<Value> + Send + Sync>;
/// Ordering key extractor
pub type KeyFn = Callback<dyn Fn(&Value) -> Value + Send + Sync>;
/// Custom key comparer
pub type CompareFn = Callback<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// One side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Property(Property),
    Literal(Literal),
}

impl Operand {
    /// Property named by the operand, if any
    pub fn property(&self) -> Option<Property> {
        match self {
            Operand::Property(p) => Some(*p),
            Operand::Literal(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Property(p) => write!(f, "{}", p),
            Operand::Literal(l) => write!(f, "{}", l),
        }
    }
}

/// A leaf comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: Operand,
    pub operator: FilterOperator,
    pub right: Operand,
}

impl Comparison {
    /// Distinct properties referenced by either operand
    pub fn properties(&self) -> Vec<Property> {
        let mut props: Vec<Property> = [self.left.property(), self.right.property()]
            .into_iter()
            .flatten()
            .collect();
        props.dedup();
        props
    }

    /// Number of property operands, counting repeats
    pub fn property_operands(&self) -> usize {
        [self.left.property(), self.right.property()]
            .iter()
            .filter(|p| p.is_some())
            .count()
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

/// Predicate expression over a record
#[derive(Debug, Clone)]
pub enum Expr {
    Compare(Comparison),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Opaque client-side predicate
    Local(LocalPredicate),
}

impl Expr {
    /// Builds a comparison between two arbitrary operands
    pub fn compare(left: Operand, operator: FilterOperator, right: Operand) -> Self {
        Expr::Compare(Comparison {
            left,
            operator,
            right,
        })
    }

    /// Wraps a closure evaluated against each fetched record
    pub fn local<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Expr::Local(Callback(Arc::new(f)))
    }

    /// Conjunction of both expressions
    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    /// Disjunction of both expressions
    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    /// Logical negation
    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Whether any part of the expression is an opaque closure
    pub fn contains_local(&self) -> bool {
        match self {
            Expr::Compare(_) => false,
            Expr::Local(_) => true,
            Expr::Not(inner) => inner.contains_local(),
            Expr::And(a, b) | Expr::Or(a, b) => a.contains_local() || b.contains_local(),
        }
    }

    /// Whether no part of the expression could ever be sent remotely
    pub fn is_wholly_local(&self) -> bool {
        match self {
            Expr::Compare(_) => false,
            Expr::Local(_) => true,
            Expr::Not(inner) => inner.contains_local(),
            Expr::And(a, b) => a.is_wholly_local() && b.is_wholly_local(),
            Expr::Or(a, b) => a.contains_local() || b.contains_local(),
        }
    }

    /// Distinct properties referenced anywhere in the expression
    pub fn properties(&self) -> Vec<Property> {
        let mut set = BTreeSet::new();
        self.collect_properties(&mut set);
        set.into_iter().collect()
    }

    fn collect_properties(&self, set: &mut BTreeSet<Property>) {
        match self {
            Expr::Compare(c) => set.extend(c.properties()),
            Expr::Local(_) => {}
            Expr::Not(inner) => inner.collect_properties(set),
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.collect_properties(set);
                b.collect_properties(set);
            }
        }
    }

    /// Flattens nested ANDs into their conjuncts, left to right
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::And(a, b) => {
                let mut out = a.conjuncts();
                out.extend(b.conjuncts());
                out
            }
            other => vec![other],
        }
    }

    /// Flattens nested ORs into their disjuncts, left to right
    pub fn disjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::Or(a, b) => {
                let mut out = a.disjuncts();
                out.extend(b.disjuncts());
                out
            }
            other => vec![other],
        }
    }

    /// Joins expressions with AND; `None` for an empty input
    pub fn all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        exprs.into_iter().reduce(Expr::and)
    }

    /// Pushes every negation down to the leaves (De Morgan).
    ///
    /// In the result a `Not` only ever wraps a comparison or a local closure.
    pub fn to_negation_normal_form(&self) -> Expr {
        self.push_negation(false)
    }

    fn push_negation(&self, negate: bool) -> Expr {
        match (self, negate) {
            (Expr::Not(inner), _) => inner.push_negation(!negate),
            (Expr::And(a, b), false) => a.push_negation(false).and(b.push_negation(false)),
            (Expr::And(a, b), true) => a.push_negation(true).or(b.push_negation(true)),
            (Expr::Or(a, b), false) => a.push_negation(false).or(b.push_negation(false)),
            (Expr::Or(a, b), true) => a.push_negation(true).and(b.push_negation(true)),
            (leaf, false) => leaf.clone(),
            (leaf, true) => leaf.clone().negate(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare(c) => write!(f, "{}", c),
            Expr::And(a, b) => write!(f, "({} AND {})", a, b),
            Expr::Or(a, b) => write!(f, "({} OR {})", a, b),
            Expr::Not(inner) => write!(f, "NOT {}", inner),
            Expr::Local(_) => f.write_str("<local>"),
        }
    }
}

impl BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Expr) -> Expr {
        self.and(rhs)
    }
}

impl BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        self.or(rhs)
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        self.negate()
    }
}

/// Starts a comparison on a property
pub fn prop(property: Property) -> PropertyRef {
    PropertyRef(property)
}

/// Left-hand property of a comparison under construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyRef(Property);

impl PropertyRef {
    fn with(self, operator: FilterOperator, value: impl Into<Literal>) -> Expr {
        Expr::compare(
            Operand::Property(self.0),
            operator,
            Operand::Literal(value.into()),
        )
    }

    /// `property == value`
    pub fn eq(self, value: impl Into<Literal>) -> Expr {
        self.with(FilterOperator::Equals, value)
    }

    /// `property != value`
    pub fn ne(self, value: impl Into<Literal>) -> Expr {
        self.with(FilterOperator::NotEquals, value)
    }

    /// `property > value`
    pub fn gt(self, value: impl Into<Literal>) -> Expr {
        self.with(FilterOperator::GreaterThan, value)
    }

    /// `property < value`
    pub fn lt(self, value: impl Into<Literal>) -> Expr {
        self.with(FilterOperator::LessThan, value)
    }

    /// `property` contains `value`
    pub fn contains(self, value: impl Into<Literal>) -> Expr {
        self.with(FilterOperator::Contains, value)
    }

    /// Equality against any of the given values
    pub fn one_of<T: Into<Literal>>(self, values: impl IntoIterator<Item = T>) -> Expr {
        self.with(FilterOperator::Equals, Literal::list(values))
    }

    /// Compares two properties of the same record
    pub fn compare_property(self, operator: FilterOperator, other: Property) -> Expr {
        Expr::compare(Operand::Property(self.0), operator, Operand::Property(other))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Wire spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Remote sort specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub property: Property,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Ascending sort on `property`
    pub fn asc(property: Property) -> Self {
        Self {
            property,
            direction: SortDirection::Asc,
        }
    }

    /// Descending sort on `property`
    pub fn desc(property: Property) -> Self {
        Self {
            property,
            direction: SortDirection::Desc,
        }
    }
}
