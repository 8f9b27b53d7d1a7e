//! Content adjusters
//!
//! An adjuster rewrites the translated filter groups into the quirks of one
//! content type and returns the fan-out set: the outer list holds one entry
//! per remote request, the inner list the AND-ed filters of that request.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::TranslationMode;
use crate::model::{ContentType, FilterOperator, Property, QueryFilter};

use super::errors::{PlannerError, PlannerResult};
use super::translate::{FilterGroup, FilterTerm};

/// Inputs shared by every adjuster call
#[derive(Debug, Clone, Copy)]
pub struct AdjustContext<'a> {
    pub content: ContentType,
    /// Properties the remote can filter on for this content type
    pub supported: &'a [Property],
    pub mode: TranslationMode,
}

/// Filter sets of a logical query, one per remote request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FanOut {
    pub members: Vec<Vec<QueryFilter>>,
    /// ID each member is restricted to, in member order; empty unless the
    /// query filters on IDs
    pub ids: Vec<i64>,
}

impl FanOut {
    /// Adjustment with a single member
    pub fn single(filters: Vec<QueryFilter>) -> Self {
        Self {
            members: vec![filters],
            ids: Vec::new(),
        }
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Per-content rewrite and validation rules
pub trait ContentAdjuster: Send + Sync {
    /// Properties that may legally appear in more than one AND group because
    /// the adjuster splits them into range bounds
    fn range_properties(&self) -> &'static [Property] {
        &[]
    }

    fn adjust(&self, ctx: &AdjustContext<'_>, groups: &[FilterGroup]) -> PlannerResult<FanOut>;
}

/// Returns the adjuster for a content type
pub fn adjuster_for(content: ContentType) -> &'static dyn ContentAdjuster {
    match content {
        ContentType::Logs => &LogAdjuster,
        _ => &GenericAdjuster,
    }
}

fn check_supported(ctx: &AdjustContext<'_>, groups: &[FilterGroup]) -> PlannerResult<()> {
    match groups.iter().find(|g| !ctx.supported.contains(&g.property)) {
        Some(group) => Err(PlannerError::unsupported_property(group.property, ctx.content)),
        None => Ok(()),
    }
}

/// Passes filters through after rejecting unsupported properties
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericAdjuster;

impl ContentAdjuster for GenericAdjuster {
    fn adjust(&self, ctx: &AdjustContext<'_>, groups: &[FilterGroup]) -> PlannerResult<FanOut> {
        check_supported(ctx, groups)?;
        let filters = groups
            .iter()
            .flat_map(|g| g.terms.iter().map(FilterTerm::to_filter))
            .collect();
        Ok(FanOut::single(filters))
    }
}

/// Log rules: `DateTime` comparisons become `StartDate`/`EndDate` bounds and
/// the remote accepts a single ID per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAdjuster;

const LOG_RANGE: &[Property] = &[Property::DateTime];

impl ContentAdjuster for LogAdjuster {
    fn range_properties(&self) -> &'static [Property] {
        LOG_RANGE
    }

    fn adjust(&self, ctx: &AdjustContext<'_>, groups: &[FilterGroup]) -> PlannerResult<FanOut> {
        check_supported(ctx, groups)?;

        let mut base = Vec::new();
        let mut lower = Vec::new();
        let mut upper = Vec::new();
        let mut ids: Vec<(i64, QueryFilter)> = Vec::new();
        let mut range_at = None;
        let mut id_at = None;
        // Order in which the range and ID slots were first declared
        let mut slot_order = Vec::new();

        for group in groups {
            match group.property {
                Property::DateTime | Property::StartDate | Property::EndDate => {
                    if range_at.is_none() {
                        range_at = Some(base.len());
                        slot_order.push(Slot::Range);
                    }
                    let term = match group.terms.as_slice() {
                        [term] => term,
                        _ => return Err(PlannerError::illegal_disjunction(&[group.property])),
                    };
                    let at = term_timestamp(term)?;
                    match (group.property, term.operator) {
                        (Property::DateTime, FilterOperator::GreaterThan)
                        | (
                            Property::StartDate,
                            FilterOperator::GreaterThan | FilterOperator::Equals,
                        ) => lower.push((at, term)),
                        (Property::DateTime, FilterOperator::LessThan)
                        | (Property::EndDate, FilterOperator::LessThan | FilterOperator::Equals) => {
                            upper.push((at, term))
                        }
                        (Property::DateTime, FilterOperator::Equals) => {
                            lower.push((at, term));
                            upper.push((at, term));
                        }
                        (property, operator) => {
                            return Err(PlannerError::unsupported_operator(property, operator))
                        }
                    }
                }
                Property::Id => {
                    if id_at.is_none() {
                        id_at = Some(base.len());
                        slot_order.push(Slot::Id);
                    }
                    for term in &group.terms {
                        if term.operator != FilterOperator::Equals {
                            return Err(PlannerError::unsupported_operator(
                                Property::Id,
                                term.operator,
                            ));
                        }
                        let id = term.literal.as_integer().ok_or_else(|| {
                            PlannerError::query_invalid(format!(
                                "log ID filter value '{}' is not an integer",
                                term.value
                            ))
                        })?;
                        if !ids.iter().any(|(existing, _)| *existing == id) {
                            ids.push((id, term.to_filter()));
                        }
                    }
                }
                _ => base.extend(group.terms.iter().map(FilterTerm::to_filter)),
            }
        }

        let mut range = Vec::new();
        if let Some(term) = pick_bound(ctx.mode, lower, Bound::Lower)? {
            range.push(term.retarget(Property::StartDate, FilterOperator::Equals));
        }
        if let Some(term) = pick_bound(ctx.mode, upper, Bound::Upper)? {
            range.push(term.retarget(Property::EndDate, FilterOperator::Equals));
        }

        if ids.len() > 1 {
            if ctx.mode.is_strict() {
                return Err(PlannerError::duplicate_id_filter(Property::Id, ids.len()));
            }
            warn!(
                content = %ctx.content,
                ids = ids.len(),
                "multiple log IDs fanned out into one request per ID"
            );
        }

        let assemble = |id_filter: Option<&QueryFilter>| {
            let mut slots: Vec<(usize, Vec<QueryFilter>)> = Vec::new();
            for slot in &slot_order {
                match (slot, range_at, id_at, id_filter) {
                    (Slot::Range, Some(at), _, _) => slots.push((at, range.clone())),
                    (Slot::Id, _, Some(at), Some(filter)) => slots.push((at, vec![filter.clone()])),
                    _ => {}
                }
            }

            let mut out = Vec::with_capacity(base.len() + range.len() + 1);
            for i in 0..=base.len() {
                for (_, filters) in slots.iter().filter(|(at, _)| *at == i) {
                    out.extend(filters.iter().cloned());
                }
                if let Some(filter) = base.get(i) {
                    out.push(filter.clone());
                }
            }
            out
        };

        if ids.is_empty() {
            return Ok(FanOut::single(assemble(None)));
        }

        Ok(FanOut {
            members: ids.iter().map(|(_, filter)| assemble(Some(filter))).collect(),
            ids: ids.iter().map(|(id, _)| *id).collect(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Range,
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Lower,
    Upper,
}

impl Bound {
    fn as_str(&self) -> &'static str {
        match self {
            Bound::Lower => "lower",
            Bound::Upper => "upper",
        }
    }
}

fn term_timestamp(term: &FilterTerm) -> PlannerResult<DateTime<Utc>> {
    term.literal.as_timestamp().ok_or_else(|| {
        PlannerError::query_invalid(format!(
            "'{}' is not a timestamp for {}",
            term.literal, term.property
        ))
    })
}

/// Resolves several bounds of one kind to one.
///
/// Strict mode rejects distinct bounds; permissive mode keeps the tightest
/// (latest lower, earliest upper).
fn pick_bound<'t>(
    mode: TranslationMode,
    mut bounds: Vec<(DateTime<Utc>, &'t FilterTerm)>,
    bound: Bound,
) -> PlannerResult<Option<&'t FilterTerm>> {
    bounds.sort_by_key(|(at, _)| *at);
    bounds.dedup_by_key(|(at, _)| *at);

    if bounds.len() > 1 {
        if mode.is_strict() {
            return Err(PlannerError::duplicate_range_bound(
                Property::DateTime,
                bound.as_str(),
            ));
        }
        warn!(
            bound = bound.as_str(),
            candidates = bounds.len(),
            "duplicate log range bounds resolved to the tightest"
        );
    }

    let chosen = match bound {
        Bound::Lower => bounds.last(),
        Bound::Upper => bounds.first(),
    };
    Ok(chosen.map(|(_, term)| *term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Literal, PropertyCatalog, StandardCatalog, Status};
    use crate::planner::errors::PlannerErrorCode;
    use chrono::TimeZone;

    fn term(property: Property, operator: FilterOperator, literal: Literal) -> FilterTerm {
        let descriptor = StandardCatalog
            .descriptor(ContentType::Logs, property)
            .unwrap();
        let value = StandardCatalog.remote_value(&descriptor, &literal).unwrap();
        FilterTerm {
            property,
            operator,
            literal,
            value,
        }
    }

    fn group(terms: Vec<FilterTerm>) -> FilterGroup {
        FilterGroup {
            property: terms[0].property,
            terms,
        }
    }

    fn ts(day: u32) -> Literal {
        Literal::from(Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap())
    }

    fn run(groups: &[FilterGroup], mode: TranslationMode) -> PlannerResult<FanOut> {
        let supported = StandardCatalog.supported_properties(ContentType::Logs);
        let ctx = AdjustContext {
            content: ContentType::Logs,
            supported: &supported,
            mode,
        };
        LogAdjuster.adjust(&ctx, groups)
    }

    fn rendered(filters: &[QueryFilter]) -> Vec<String> {
        filters.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_datetime_range_splits_into_start_and_end() {
        let groups = vec![
            group(vec![term(Property::DateTime, FilterOperator::GreaterThan, ts(1))]),
            group(vec![term(Property::DateTime, FilterOperator::LessThan, ts(9))]),
        ];
        let fan_out = run(&groups, TranslationMode::Strict).unwrap();

        assert_eq!(fan_out.len(), 1);
        assert_eq!(
            rendered(&fan_out.members[0]),
            vec![
                "StartDate eq 2024-03-01-00-00-00",
                "EndDate eq 2024-03-09-00-00-00"
            ]
        );
    }

    #[test]
    fn test_datetime_equality_spans_instant() {
        let groups = vec![group(vec![term(
            Property::DateTime,
            FilterOperator::Equals,
            ts(5),
        )])];
        let fan_out = run(&groups, TranslationMode::Strict).unwrap();
        assert_eq!(fan_out.members[0].len(), 2);
        assert_eq!(fan_out.members[0][0].value(), fan_out.members[0][1].value());
    }

    #[test]
    fn test_duplicate_lower_bound_by_mode() {
        let groups = vec![
            group(vec![term(Property::DateTime, FilterOperator::GreaterThan, ts(1))]),
            group(vec![term(Property::DateTime, FilterOperator::GreaterThan, ts(3))]),
        ];

        let err = run(&groups, TranslationMode::Strict).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::DuplicateRangeBound);

        let fan_out = run(&groups, TranslationMode::Permissive).unwrap();
        assert_eq!(
            rendered(&fan_out.members[0]),
            vec!["StartDate eq 2024-03-03-00-00-00"]
        );
    }

    #[test]
    fn test_identical_bounds_are_not_duplicates() {
        let groups = vec![
            group(vec![term(Property::DateTime, FilterOperator::LessThan, ts(4))]),
            group(vec![term(Property::DateTime, FilterOperator::LessThan, ts(4))]),
        ];
        assert!(run(&groups, TranslationMode::Strict).is_ok());
    }

    #[test]
    fn test_datetime_disjunction_rejected() {
        let groups = vec![group(vec![
            term(Property::DateTime, FilterOperator::GreaterThan, ts(1)),
            term(Property::DateTime, FilterOperator::GreaterThan, ts(2)),
        ])];
        let err = run(&groups, TranslationMode::Permissive).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::IllegalDisjunction);
    }

    #[test]
    fn test_datetime_not_equals_unsupported() {
        let groups = vec![group(vec![term(
            Property::DateTime,
            FilterOperator::NotEquals,
            ts(1),
        )])];
        let err = run(&groups, TranslationMode::Strict).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::UnsupportedOperator);
    }

    #[test]
    fn test_multiple_ids_by_mode() {
        let groups = vec![
            group(vec![term(Property::Status, FilterOperator::Equals, Status::Down.into())]),
            group(vec![
                term(Property::Id, FilterOperator::Equals, Literal::Int(7)),
                term(Property::Id, FilterOperator::Equals, Literal::Int(3)),
            ]),
        ];

        let err = run(&groups, TranslationMode::Strict).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::DuplicateIdFilter);

        let fan_out = run(&groups, TranslationMode::Permissive).unwrap();
        assert_eq!(fan_out.ids, vec![7, 3]);
        assert_eq!(rendered(&fan_out.members[0]), vec!["Status eq 5", "Id eq 7"]);
        assert_eq!(rendered(&fan_out.members[1]), vec!["Status eq 5", "Id eq 3"]);
    }

    #[test]
    fn test_repeated_id_is_not_a_fan_out() {
        let groups = vec![group(vec![
            term(Property::Id, FilterOperator::Equals, Literal::Int(7)),
            term(Property::Id, FilterOperator::Equals, Literal::Int(7)),
        ])];
        let fan_out = run(&groups, TranslationMode::Strict).unwrap();
        assert_eq!(fan_out.len(), 1);
        assert_eq!(fan_out.ids, vec![7]);
    }

    #[test]
    fn test_generic_rejects_unsupported_property() {
        let supported = StandardCatalog.supported_properties(ContentType::Sensors);
        let ctx = AdjustContext {
            content: ContentType::Sensors,
            supported: &supported,
            mode: TranslationMode::Strict,
        };
        let groups = vec![FilterGroup {
            property: Property::Position,
            terms: vec![FilterTerm {
                property: Property::Position,
                operator: FilterOperator::Equals,
                literal: Literal::Int(1),
                value: "1".to_string(),
            }],
        }];
        let err = GenericAdjuster.adjust(&ctx, &groups).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::UnsupportedProperty);
    }
}
