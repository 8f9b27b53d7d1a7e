//! Condition translator
//!
//! Walks a predicate in negation normal form and splits it into remote
//! filter groups plus a residual predicate evaluated on the client.
//!
//! A top-level AND decomposes into independent groups. An OR becomes one
//! group only when every term references the same property, since the remote
//! service ORs filters repeated on one property and ANDs everything else.

use std::collections::HashSet;

use tracing::warn;

use crate::config::TranslationMode;
use crate::model::{
    ContentType, FilterOperator, Literal, Property, PropertyCatalog, PropertyDescriptor,
    PropertyKind, QueryFilter,
};

use super::ast::{Comparison, Expr, Operand};
use super::errors::{PlannerError, PlannerResult};

/// One validated, serialized filter candidate
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTerm {
    pub property: Property,
    pub operator: FilterOperator,
    /// Source literal, kept for adjusters that compare values
    pub literal: Literal,
    /// Serialized remote value
    pub value: String,
}

impl FilterTerm {
    /// Wire filter for the term
    pub fn to_filter(&self) -> QueryFilter {
        QueryFilter::new(self.property, self.operator, self.value.clone())
    }

    /// Same value under another property and operator
    pub fn retarget(&self, property: Property, operator: FilterOperator) -> QueryFilter {
        QueryFilter::new(property, operator, self.value.clone())
    }
}

/// Terms on one property, combined with OR
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGroup {
    pub property: Property,
    pub terms: Vec<FilterTerm>,
}

/// Result of translating one predicate
#[derive(Debug, Clone, Default)]
pub struct Translation {
    /// Remote groups in declaration order, combined with AND
    pub groups: Vec<FilterGroup>,
    /// What must run on the client
    pub residual: Option<Expr>,
    /// Disclosure of every local fallback
    pub notes: Vec<String>,
}

enum Outcome {
    Remote(FilterGroup),
    Local(String),
}

/// Translates predicates for one content type
pub struct ConditionTranslator<'a, C: PropertyCatalog + ?Sized> {
    catalog: &'a C,
    content: ContentType,
    mode: TranslationMode,
    range_properties: &'a [Property],
}

impl<'a, C: PropertyCatalog + ?Sized> ConditionTranslator<'a, C> {
    /// Translator for one content type
    pub fn new(
        catalog: &'a C,
        content: ContentType,
        mode: TranslationMode,
        range_properties: &'a [Property],
    ) -> Self {
        Self {
            catalog,
            content,
            mode,
            range_properties,
        }
    }

    /// Translates a predicate into filter groups and a residual.
    ///
    /// Errors are raised for conditions no mode can make sense of (ambiguous
    /// leaves, cross-property disjunctions, unknown properties). Conditions
    /// that are merely not expressible remotely fail in strict mode and become
    /// residual in permissive mode.
    pub fn translate(&self, expr: &Expr) -> PlannerResult<Translation> {
        let normal = expr.to_negation_normal_form();

        let mut translation = Translation::default();
        let mut residual = Vec::new();

        for conjunct in normal.conjuncts() {
            match self.conjunct(conjunct)? {
                Outcome::Remote(group) => translation.groups.push(group),
                Outcome::Local(reason) => {
                    translation
                        .notes
                        .push(format!("filter {} evaluated locally: {}", conjunct, reason));
                    residual.push(conjunct.clone());
                }
            }
        }

        check_conjunction(&translation.groups, self.range_properties)?;
        translation.residual = Expr::all(residual);
        Ok(translation)
    }

    fn conjunct(&self, expr: &Expr) -> PlannerResult<Outcome> {
        match expr {
            Expr::Local(_) => Ok(Outcome::Local("opaque predicate".to_string())),
            Expr::Compare(c) => self.leaf(c, false),
            Expr::Not(inner) => match inner.as_ref() {
                Expr::Compare(c) => self.leaf(c, true),
                _ => Ok(Outcome::Local("opaque predicate".to_string())),
            },
            Expr::Or(..) | Expr::And(..) => self.disjunction(expr),
        }
    }

    fn disjunction(&self, expr: &Expr) -> PlannerResult<Outcome> {
        if expr.contains_local() {
            return Ok(Outcome::Local("disjunction with an opaque predicate".to_string()));
        }

        let properties = expr.properties();
        if properties.len() > 1 {
            return Err(PlannerError::illegal_disjunction(&properties));
        }

        let mut merged: Option<FilterGroup> = None;
        for term in expr.disjuncts() {
            let outcome = match term {
                Expr::Compare(c) => self.leaf(c, false)?,
                Expr::Not(inner) => match inner.as_ref() {
                    Expr::Compare(c) => self.leaf(c, true)?,
                    _ => return Ok(Outcome::Local("opaque predicate".to_string())),
                },
                _ => return self.fallback(format!("nested conjunction {} inside a disjunction", term)),
            };

            match outcome {
                Outcome::Remote(group) => match merged.as_mut() {
                    Some(existing) => existing.terms.extend(group.terms),
                    None => merged = Some(group),
                },
                Outcome::Local(reason) => return Ok(Outcome::Local(reason)),
            }
        }

        match merged {
            Some(group) => Ok(Outcome::Remote(group)),
            None => Err(PlannerError::query_invalid("empty disjunction")),
        }
    }

    fn leaf(&self, comparison: &Comparison, negated: bool) -> PlannerResult<Outcome> {
        let operands = comparison.property_operands();
        let (property, operator, literal) = match (&comparison.left, &comparison.right) {
            (Operand::Property(p), Operand::Literal(l)) => (*p, comparison.operator, l),
            (Operand::Literal(l), Operand::Property(p)) => match comparison.operator.flip() {
                Some(op) => (*p, op, l),
                None => {
                    return self.fallback(format!(
                        "operator '{}' cannot take property {} as its right operand",
                        comparison.operator, p
                    ))
                }
            },
            _ => return Err(PlannerError::ambiguous_condition(operands, comparison)),
        };

        let operator = if negated {
            match operator.negate() {
                Some(op) => op,
                None => {
                    return self.fallback(format!(
                        "negated '{}' on {} has no remote form",
                        operator, property
                    ))
                }
            }
        } else {
            operator
        };

        let descriptor = self
            .catalog
            .descriptor(self.content, property)
            .ok_or_else(|| PlannerError::unsupported_property(property, self.content))?;

        check_enum_domain(&descriptor, literal)?;

        let values: Vec<&Literal> = match literal {
            Literal::List(items) => items.iter().collect(),
            other => vec![other],
        };

        if literal.is_list() {
            match operator {
                FilterOperator::Equals | FilterOperator::Contains => {}
                FilterOperator::NotEquals => {
                    return self.fallback(format!(
                        "negated membership on {} has no remote form",
                        property
                    ))
                }
                FilterOperator::GreaterThan | FilterOperator::LessThan => {
                    return Err(PlannerError::unsupported_operator(property, operator))
                }
            }
            if values.is_empty() {
                return self.fallback(format!("empty value list on {}", property));
            }
        }

        match (descriptor.kind, operator) {
            (PropertyKind::String | PropertyKind::StringArray, FilterOperator::Contains) => {}
            (_, FilterOperator::Contains) => {
                return Err(PlannerError::unsupported_operator(property, operator))
            }
            (
                PropertyKind::Bool | PropertyKind::StringArray,
                FilterOperator::GreaterThan | FilterOperator::LessThan,
            ) => return Err(PlannerError::unsupported_operator(property, operator)),
            (PropertyKind::StringArray, FilterOperator::NotEquals) => {
                return self.fallback(format!(
                    "negated array membership on {} has no remote form",
                    property
                ))
            }
            _ => {}
        }

        // Array equality is a membership test on the remote side
        let operator = if descriptor.kind.is_array() && operator == FilterOperator::Equals {
            FilterOperator::Contains
        } else {
            operator
        };

        let mut terms = Vec::with_capacity(values.len());
        for value in values {
            let serialized = match self.catalog.remote_value(&descriptor, value) {
                Some(s) => s,
                None => {
                    return self.fallback(format!(
                        "value {} has no remote form for {}",
                        value, property
                    ))
                }
            };
            terms.push(FilterTerm {
                property,
                operator,
                literal: value.clone(),
                value: serialized,
            });
        }

        Ok(Outcome::Remote(FilterGroup { property, terms }))
    }

    fn fallback(&self, reason: String) -> PlannerResult<Outcome> {
        if self.mode.is_strict() {
            return Err(PlannerError::not_remotely_expressible(reason));
        }
        warn!(content = %self.content, reason = %reason, "condition demoted to local evaluation");
        Ok(Outcome::Local(reason))
    }
}

fn check_enum_domain(descriptor: &PropertyDescriptor, literal: &Literal) -> PlannerResult<()> {
    let PropertyKind::Enumeration(expected) = descriptor.kind else {
        return Ok(());
    };
    match literal {
        Literal::Enum(e) if e.domain != expected => Err(PlannerError::enum_domain_mismatch(
            descriptor.property,
            expected,
            e.domain,
        )),
        Literal::List(items) => items
            .iter()
            .try_for_each(|item| check_enum_domain(descriptor, item)),
        _ => Ok(()),
    }
}

/// Rejects a property appearing in more than one AND group.
///
/// Range properties are exempt; their content adjuster validates them.
pub fn check_conjunction(groups: &[FilterGroup], range_properties: &[Property]) -> PlannerResult<()> {
    let mut seen = HashSet::new();
    for group in groups {
        if range_properties.contains(&group.property) {
            continue;
        }
        if !seen.insert(group.property) {
            return Err(PlannerError::illegal_conjunction(group.property));
        }
    }
    Ok(())
}
