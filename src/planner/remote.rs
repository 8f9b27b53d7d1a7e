//! Remote query descriptor and its wire parameters

use std::fmt;

use crate::model::{ContentType, FilterOperator, Property, PropertyCatalog, QueryFilter};

use super::ast::{SortDirection, SortSpec};
use super::errors::{PlannerError, PlannerResult};

/// One table query understood by the remote service.
///
/// Immutable once built; page requests are derived copies with their own
/// `start` and `count`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteQuery {
    content: ContentType,
    columns: Vec<Property>,
    filters: Vec<QueryFilter>,
    sort: Option<SortSpec>,
    start: u64,
    count: Option<u64>,
    page_size: u64,
}

impl RemoteQuery {
    /// Query without sort or window
    pub fn new(content: ContentType, columns: Vec<Property>, filters: Vec<QueryFilter>) -> Self {
        Self {
            content,
            columns,
            filters,
            sort: None,
            start: 0,
            count: None,
            page_size: 500,
        }
    }

    /// Sets the remote sort
    pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the first record offset and the optional record budget
    pub fn with_window(mut self, start: u64, count: Option<u64>) -> Self {
        self.start = start;
        self.count = count;
        self
    }

    /// Sets the page size used for enumeration
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Request for one page of this query
    pub fn page(&self, start: u64, count: u64) -> Self {
        Self {
            start,
            count: Some(count),
            ..self.clone()
        }
    }

    /// Request reading only the total number of matching items
    pub fn totals(&self) -> Self {
        self.page(0, 0)
    }

    /// Content type queried
    pub fn content(&self) -> ContentType {
        self.content
    }

    /// Columns requested
    pub fn columns(&self) -> &[Property] {
        &self.columns
    }

    /// Filters sent, in order
    pub fn filters(&self) -> &[QueryFilter] {
        &self.filters
    }

    /// Remote sort, if any
    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    /// First item offset
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Item budget; `None` reads to the end
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    /// Records per page request
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Ordered wire parameters
    pub fn to_parameters<C: PropertyCatalog + ?Sized>(
        &self,
        catalog: &C,
    ) -> PlannerResult<Vec<(String, String)>> {
        let column = |property: Property| {
            catalog
                .column_name(self.content, property)
                .ok_or_else(|| PlannerError::unsupported_property(property, self.content))
        };

        let mut params = vec![("content".to_string(), self.content.as_str().to_string())];

        let columns = self
            .columns
            .iter()
            .map(|p| column(*p))
            .collect::<PlannerResult<Vec<_>>>()?;
        params.push(("columns".to_string(), columns.join(",")));

        for filter in &self.filters {
            params.push((
                format!("filter_{}", column(filter.property())?),
                filter.encoded_value(),
            ));
        }

        if let Some(sort) = self.sort {
            let name = column(sort.property)?;
            let value = match sort.direction {
                SortDirection::Asc => name.to_string(),
                SortDirection::Desc => format!("-{}", name),
            };
            params.push(("sortby".to_string(), value));
        }

        params.push(("start".to_string(), self.start.to_string()));
        if let Some(count) = self.count {
            params.push(("count".to_string(), count.to_string()));
        }

        Ok(params)
    }

    /// Parses the filters back out of wire parameters, in parameter order
    pub fn filters_from_parameters<C: PropertyCatalog + ?Sized>(
        params: &[(String, String)],
        content: ContentType,
        catalog: &C,
    ) -> PlannerResult<Vec<QueryFilter>> {
        params
            .iter()
            .filter_map(|(key, value)| key.strip_prefix("filter_").map(|column| (column, value)))
            .map(|(column, value)| {
                let property = catalog.property_for_column(content, column).ok_or_else(|| {
                    PlannerError::query_invalid(format!(
                        "unknown filter column '{}' for content '{}'",
                        column, content
                    ))
                })?;
                let (operator, raw): (FilterOperator, String) = FilterOperator::decode(value);
                Ok(QueryFilter::new(property, operator, raw))
            })
            .collect()
    }
}

impl fmt::Display for RemoteQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.content)?;
        if !self.filters.is_empty() {
            let filters: Vec<String> = self.filters.iter().map(|x| x.to_string()).collect();
            write!(f, " where [{}]", filters.join(", "))?;
        }
        if let Some(sort) = self.sort {
            write!(f, " sort {} {}", sort.property, sort.direction.as_str())?;
        }
        write!(f, " start {}", self.start)?;
        if let Some(count) = self.count {
            write!(f, " count {}", count)?;
        }
        Ok(())
    }
}
