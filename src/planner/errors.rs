//! Planner error types
//!
//! Every planner failure is a local validation error raised at plan
//! finalization, before any request leaves the client.
//!
//! Error codes:
//! - QUERY_AMBIGUOUS_CONDITION
//! - QUERY_ILLEGAL_CONJUNCTION
//! - QUERY_ILLEGAL_DISJUNCTION
//! - QUERY_UNSUPPORTED_PROPERTY
//! - QUERY_UNSUPPORTED_OPERATOR
//! - QUERY_ENUM_DOMAIN_MISMATCH
//! - QUERY_DUPLICATE_RANGE_BOUND
//! - QUERY_DUPLICATE_ID_FILTER
//! - QUERY_NOT_REMOTELY_EXPRESSIBLE
//! - QUERY_INVALID

use std::fmt;

use crate::model::{ContentType, EnumDomain, FilterOperator, Property};

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Query rejected before execution
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// A comparison references zero or several properties
    AmbiguousCondition,
    /// The same property appears twice under AND
    IllegalConjunction,
    /// An OR spans distinct properties
    IllegalDisjunction,
    /// Property has no remote filter equivalent for the content type
    UnsupportedProperty,
    /// Operator cannot be applied to the property remotely
    UnsupportedOperator,
    /// Enumeration operands from different domains
    EnumDomainMismatch,
    /// Several distinct lower or upper bounds on a range property
    DuplicateRangeBound,
    /// Several distinct ID filters where the remote accepts one
    DuplicateIdFilter,
    /// Strict mode refused to evaluate part of a predicate locally
    NotRemotelyExpressible,
    /// Malformed query structure
    QueryInvalid,
}

impl PlannerErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::AmbiguousCondition => "QUERY_AMBIGUOUS_CONDITION",
            PlannerErrorCode::IllegalConjunction => "QUERY_ILLEGAL_CONJUNCTION",
            PlannerErrorCode::IllegalDisjunction => "QUERY_ILLEGAL_DISJUNCTION",
            PlannerErrorCode::UnsupportedProperty => "QUERY_UNSUPPORTED_PROPERTY",
            PlannerErrorCode::UnsupportedOperator => "QUERY_UNSUPPORTED_OPERATOR",
            PlannerErrorCode::EnumDomainMismatch => "QUERY_ENUM_DOMAIN_MISMATCH",
            PlannerErrorCode::DuplicateRangeBound => "QUERY_DUPLICATE_RANGE_BOUND",
            PlannerErrorCode::DuplicateIdFilter => "QUERY_DUPLICATE_ID_FILTER",
            PlannerErrorCode::NotRemotelyExpressible => "QUERY_NOT_REMOTELY_EXPRESSIBLE",
            PlannerErrorCode::QueryInvalid => "QUERY_INVALID",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }

    /// Whether permissive mode resolves this condition instead of failing
    pub fn is_mode_dependent(&self) -> bool {
        matches!(
            self,
            PlannerErrorCode::DuplicateRangeBound
                | PlannerErrorCode::DuplicateIdFilter
                | PlannerErrorCode::NotRemotelyExpressible
        )
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
    property: Option<Property>,
}

impl PlannerError {
    fn new(code: PlannerErrorCode, message: String, property: Option<Property>) -> Self {
        Self {
            code,
            message,
            property,
        }
    }

    /// A comparison referencing `count` properties instead of exactly one
    pub fn ambiguous_condition(count: usize, condition: impl fmt::Display) -> Self {
        Self::new(
            PlannerErrorCode::AmbiguousCondition,
            format!(
                "Condition '{}' references {} properties; each comparison must reference exactly one",
                condition, count
            ),
            None,
        )
    }

    /// The same property twice under AND
    pub fn illegal_conjunction(property: Property) -> Self {
        Self::new(
            PlannerErrorCode::IllegalConjunction,
            format!(
                "Property '{}' is referenced more than once in one AND group; split the expression into separate queries",
                property
            ),
            Some(property),
        )
    }

    /// An OR across distinct properties
    pub fn illegal_disjunction(properties: &[Property]) -> Self {
        let names: Vec<&str> = properties.iter().map(Property::as_str).collect();
        Self::new(
            PlannerErrorCode::IllegalDisjunction,
            format!(
                "OR condition spans properties [{}]; an OR may reference a single property only",
                names.join(", ")
            ),
            properties.first().copied(),
        )
    }

    /// Property has no remote filter for the content type
    pub fn unsupported_property(property: Property, content: ContentType) -> Self {
        Self::new(
            PlannerErrorCode::UnsupportedProperty,
            format!(
                "Property '{}' cannot be filtered remotely for content '{}'",
                property, content
            ),
            Some(property),
        )
    }

    /// Operator not supported for the property
    pub fn unsupported_operator(property: Property, operator: FilterOperator) -> Self {
        Self::new(
            PlannerErrorCode::UnsupportedOperator,
            format!(
                "Operator '{}' is not supported on property '{}'",
                operator, property
            ),
            Some(property),
        )
    }

    /// Enum literal from another domain
    pub fn enum_domain_mismatch(property: Property, expected: EnumDomain, found: EnumDomain) -> Self {
        Self::new(
            PlannerErrorCode::EnumDomainMismatch,
            format!(
                "Property '{}' holds {} values but was compared against a {} value",
                property, expected, found
            ),
            Some(property),
        )
    }

    /// Second lower or upper bound on a range property
    pub fn duplicate_range_bound(property: Property, bound: &str) -> Self {
        Self::new(
            PlannerErrorCode::DuplicateRangeBound,
            format!(
                "Property '{}' has more than one distinct {} bound",
                property, bound
            ),
            Some(property),
        )
    }

    /// Several IDs where only one is allowed
    pub fn duplicate_id_filter(property: Property, count: usize) -> Self {
        Self::new(
            PlannerErrorCode::DuplicateIdFilter,
            format!(
                "Property '{}' is filtered on {} distinct values but the remote accepts one",
                property, count
            ),
            Some(property),
        )
    }

    /// Condition with no exact remote form
    pub fn not_remotely_expressible(reason: impl Into<String>) -> Self {
        Self::new(
            PlannerErrorCode::NotRemotelyExpressible,
            reason.into(),
            None,
        )
    }

    /// Structurally invalid query
    pub fn query_invalid(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::QueryInvalid, reason.into(), None)
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending property if applicable
    pub fn property(&self) -> Option<Property> {
        self.property
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PlannerErrorCode::IllegalDisjunction.code(),
            "QUERY_ILLEGAL_DISJUNCTION"
        );
        assert_eq!(
            PlannerErrorCode::DuplicateIdFilter.code(),
            "QUERY_DUPLICATE_ID_FILTER"
        );
        assert_eq!(
            PlannerErrorCode::NotRemotelyExpressible.code(),
            "QUERY_NOT_REMOTELY_EXPRESSIBLE"
        );
    }

    #[test]
    fn test_mode_dependent_codes() {
        assert!(PlannerErrorCode::DuplicateRangeBound.is_mode_dependent());
        assert!(!PlannerErrorCode::IllegalConjunction.is_mode_dependent());
        assert!(!PlannerErrorCode::UnsupportedProperty.is_mode_dependent());
    }

    #[test]
    fn test_error_display() {
        let err = PlannerError::unsupported_property(Property::Position, ContentType::Sensors);
        let display = format!("{}", err);
        assert!(display.contains("REJECT"));
        assert!(display.contains("QUERY_UNSUPPORTED_PROPERTY"));
        assert!(display.contains("Position"));
        assert_eq!(err.property(), Some(Property::Position));
    }

    #[test]
    fn test_disjunction_lists_properties() {
        let err = PlannerError::illegal_disjunction(&[Property::Name, Property::Status]);
        assert!(err.message().contains("Name, Status"));
    }
}
