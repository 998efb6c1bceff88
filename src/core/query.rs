//! Collection queries, list parameters and pagination utilities

use crate::core::error::{AppResult, ValidationError};
use crate::core::field::{compare_values, lookup_path, sort_order, values_equal};
use crate::core::document::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison operator of a query constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "array-contains")]
    ArrayContains,
    #[serde(rename = "in")]
    In,
}

impl Operator {
    /// Parse the textual operator (`==`, `array-contains`, ...)
    pub fn parse(op: &str) -> AppResult<Self> {
        let parsed = match op {
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessThanOrEqual,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterThanOrEqual,
            "array-contains" => Operator::ArrayContains,
            "in" => Operator::In,
            other => {
                return Err(ValidationError::InvalidQuery {
                    message: format!("unsupported operator '{other}'"),
                }
                .into());
            }
        };
        Ok(parsed)
    }
}

/// A single `field op value` constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConstraint {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl QueryConstraint {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Evaluate the constraint against a stored document
    ///
    /// A missing field never matches, whatever the operator.
    pub fn matches(&self, document: &Value) -> bool {
        let Some(actual) = lookup_path(document, &self.field) else {
            return false;
        };
        let ordering = || compare_values(actual, &self.value);
        match self.op {
            Operator::Equal => values_equal(actual, &self.value),
            Operator::NotEqual => !actual.is_null() && !values_equal(actual, &self.value),
            Operator::LessThan => ordering() == Some(Ordering::Less),
            Operator::LessThanOrEqual => {
                matches!(ordering(), Some(Ordering::Less | Ordering::Equal))
            }
            Operator::GreaterThan => ordering() == Some(Ordering::Greater),
            Operator::GreaterThanOrEqual => {
                matches!(ordering(), Some(Ordering::Greater | Ordering::Equal))
            }
            Operator::ArrayContains => actual
                .as_array()
                .is_some_and(|items| items.iter().any(|item| values_equal(item, &self.value))),
            Operator::In => self
                .value
                .as_array()
                .is_some_and(|options| options.iter().any(|o| values_equal(actual, o))),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Ordering clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    /// Parse `field`, `field:asc` or `field:desc`
    pub fn parse(expr: &str) -> Self {
        match expr.split_once(':') {
            Some((field, dir)) if dir.eq_ignore_ascii_case("desc") => Self {
                field: field.to_string(),
                direction: Direction::Desc,
            },
            Some((field, _)) => Self {
                field: field.to_string(),
                direction: Direction::Asc,
            },
            None => Self {
                field: expr.to_string(),
                direction: Direction::Asc,
            },
        }
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ord = sort_order(lookup_path(a, &self.field), lookup_path(b, &self.field));
        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

/// A structured query against one collection
///
/// # Example
/// ```rust,ignore
/// let query = Query::new()
///     .where_eq("barcode", "4006381333931")
///     .limit(1);
/// let products = service.query(&query).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub filters: Vec<QueryConstraint>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.filters.push(QueryConstraint::new(field, op, value));
        self
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, Operator::Equal, value)
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a stored document satisfies every constraint
    pub fn matches(&self, document: &Value) -> bool {
        self.filters.iter().all(|c| c.matches(document))
    }

    /// Evaluate the query locally over `(id, fields)` pairs
    ///
    /// Used by backends without native query support.
    pub fn apply(&self, documents: Vec<(String, Value)>) -> Vec<(String, Value)> {
        let mut matched: Vec<(String, Value)> = documents
            .into_iter()
            .filter(|(_, doc)| self.matches(doc))
            .collect();

        if !self.order_by.is_empty() {
            matched.sort_by(|(_, a), (_, b)| {
                self.order_by
                    .iter()
                    .map(|o| o.compare(a, b))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// Query parameters for list endpoints
///
/// # Example
/// ```rust,ignore
/// // GET /clients?search=acme&page=2&limit=10&sort=name:asc
/// pub async fn list_clients(
///     Query(params): Query<QueryParams>,
/// ) -> Json<PaginatedResponse<Client>> { ... }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    /// Page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Case-insensitive free-text search
    pub search: Option<String>,

    /// Sort expression: `field`, `field:asc` or `field:desc`
    pub sort: Option<String>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            search: None,
            sort: None,
        }
    }
}

impl QueryParams {
    /// Get page number, ensuring minimum of 1
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    /// Get limit, clamped to 1..=100
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, 100)
    }

    /// Search, sort and paginate a full collection
    pub fn apply<T: Document>(&self, documents: Vec<T>) -> PaginatedResponse<T> {
        let mut documents: Vec<T> = match self.search.as_deref() {
            Some(term) => documents
                .into_iter()
                .filter(|d| d.matches_search(term))
                .collect(),
            None => documents,
        };

        if let Some(sort) = self.sort.as_deref().filter(|s| !s.is_empty()) {
            let order = OrderBy::parse(sort);
            let mut keyed: Vec<(Value, T)> = documents
                .into_iter()
                .map(|d| (serde_json::to_value(&d).unwrap_or(Value::Null), d))
                .collect();
            keyed.sort_by(|(a, _), (b, _)| order.compare(a, b));
            documents = keyed.into_iter().map(|(_, d)| d).collect();
        }

        PaginatedResponse::paginate(documents, self.page(), self.limit())
    }
}

/// Paginated response structure
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    /// Slice one page out of the full result set
    pub fn paginate(items: Vec<T>, page: usize, limit: usize) -> Self {
        let total = items.len();
        let pagination = PaginationMeta::new(page, limit, total);
        let data = items
            .into_iter()
            .skip((pagination.page - 1).saturating_mul(pagination.limit))
            .take(pagination.limit)
            .collect();
        Self { data, pagination }
    }
}

/// Pagination metadata
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: usize,
    pub limit: usize,
    /// Total number of items (after search)
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };
        let start = (page - 1).saturating_mul(limit);

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start.saturating_add(limit) < total,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Vec<(String, Value)> {
        vec![
            ("a".into(), json!({"name": "Bolt", "stock": 3, "tags": ["metal"]})),
            ("b".into(), json!({"name": "Anchor", "stock": 12, "tags": []})),
            ("c".into(), json!({"name": "Chain", "stock": 5.0, "client": {"name": "Acme"}})),
            ("d".into(), json!({"name": "Drill"})),
        ]
    }

    fn ids(result: Vec<(String, Value)>) -> Vec<String> {
        result.into_iter().map(|(id, _)| id).collect()
    }

    #[test]
    fn test_numeric_range_filters() {
        let q = Query::new().filter("stock", Operator::LessThanOrEqual, 5);
        assert_eq!(ids(q.apply(docs())), vec!["a", "c"]);

        let q = Query::new().filter("stock", Operator::GreaterThan, 5);
        assert_eq!(ids(q.apply(docs())), vec!["b"]);
    }

    #[test]
    fn test_missing_field_never_matches() {
        let q = Query::new().filter("stock", Operator::NotEqual, 3);
        assert_eq!(ids(q.apply(docs())), vec!["b", "c"]);
    }

    #[test]
    fn test_mismatched_types_never_match() {
        let q = Query::new().filter("stock", Operator::GreaterThan, "1");
        assert!(q.apply(docs()).is_empty());
    }

    #[test]
    fn test_array_contains_and_in() {
        let q = Query::new().filter("tags", Operator::ArrayContains, "metal");
        assert_eq!(ids(q.apply(docs())), vec!["a"]);

        let q = Query::new().filter("name", Operator::In, json!(["Drill", "Bolt"]));
        assert_eq!(ids(q.apply(docs())), vec!["a", "d"]);
    }

    #[test]
    fn test_dotted_path_filter() {
        let q = Query::new().where_eq("client.name", "Acme");
        assert_eq!(ids(q.apply(docs())), vec!["c"]);
    }

    #[test]
    fn test_order_and_limit() {
        let q = Query::new().order_by("name", Direction::Desc).limit(2);
        assert_eq!(ids(q.apply(docs())), vec!["d", "c"]);
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!(Operator::parse("array-contains").unwrap(), Operator::ArrayContains);
        assert!(Operator::parse("~=").is_err());
    }

    #[test]
    fn test_order_by_parse() {
        assert_eq!(OrderBy::parse("total:desc").direction, Direction::Desc);
        assert_eq!(OrderBy::parse("total:asc").direction, Direction::Asc);
        assert_eq!(OrderBy::parse("total").field, "total");
    }

    #[test]
    fn test_query_params_defaults() {
        let params = QueryParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn test_query_params_clamping() {
        let params = QueryParams {
            page: 0,
            limit: 1000,
            ..Default::default()
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 100);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(1, 20, 145);
        assert_eq!(meta.total, 145);
        assert_eq!(meta.total_pages, 8);
        assert!(!meta.has_prev);
        assert!(meta.has_next);
    }

    #[test]
    fn test_paginate_last_page() {
        let page = PaginatedResponse::paginate((1..=25).collect::<Vec<_>>(), 3, 10);
        assert_eq!(page.data, vec![21, 22, 23, 24, 25]);
        assert!(!page.pagination.has_next);
        assert!(page.pagination.has_prev);
    }

    #[test]
    fn test_paginate_far_past_the_end() {
        let page = PaginatedResponse::paginate((1..=25).collect::<Vec<_>>(), usize::MAX, 100);
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.page, usize::MAX);
        assert_eq!(page.pagination.total, 25);
        assert!(!page.pagination.has_next);
        assert!(page.pagination.has_prev);
    }
}
