//! Listing parameters: paging arithmetic, sort resolution and result metadata.
//!
//! The sort key arrives straight from the query string. It only ever reaches
//! SQL text after [`SortSafelist::resolve`] has mapped it onto one of the
//! allowed column names, so the `ORDER BY` clause can be formatted safely.

use garde::Validate;
use greenlight_types::Violations;
use serde::{Deserialize, Serialize};

use crate::{error::Result, Error, Order};

pub const MOVIE_SORT_COLUMNS: &[&str] = &["id", "title", "year", "runtime"];
pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Columns a listing may be sorted by. Each column is accepted bare
/// (ascending) or prefixed with `-` (descending).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSafelist(Vec<String>);

impl SortSafelist {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SortSafelist(columns.into_iter().map(Into::into).collect())
    }

    pub fn movies() -> Self {
        Self::new(MOVIE_SORT_COLUMNS.iter().copied())
    }

    pub fn resolve(&self, sort: &str) -> Option<Order> {
        let (column, descending) = match sort.strip_prefix('-') {
            Some(column) => (column, true),
            None => (sort, false),
        };
        let column = self.0.iter().find(|c| c.as_str() == column)?.clone();
        if descending {
            Some(Order::Desc(column))
        } else {
            Some(Order::Asc(column))
        }
    }
}

impl Default for SortSafelist {
    fn default() -> Self {
        Self::movies()
    }
}

fn check_page(value: &i64, _ctx: &SortSafelist) -> garde::Result {
    if *value <= 0 {
        Err(garde::Error::new("must be greater than zero"))
    } else if *value > MAX_PAGE {
        Err(garde::Error::new("must be a maximum of 10 million"))
    } else {
        Ok(())
    }
}

fn check_page_size(value: &i64, _ctx: &SortSafelist) -> garde::Result {
    if *value <= 0 {
        Err(garde::Error::new("must be greater than zero"))
    } else if *value > MAX_PAGE_SIZE {
        Err(garde::Error::new("must be a maximum of 100"))
    } else {
        Ok(())
    }
}

fn check_sort(value: &str, ctx: &SortSafelist) -> garde::Result {
    match ctx.resolve(value) {
        Some(_) => Ok(()),
        None => Err(garde::Error::new("invalid sort value")),
    }
}

#[derive(Debug, Clone, Validate)]
#[garde(context(SortSafelist))]
pub struct Filters {
    #[garde(custom(check_page))]
    pub page: i64,
    #[garde(custom(check_page_size))]
    pub page_size: i64,
    #[garde(custom(check_sort))]
    pub sort: String,
    #[garde(skip)]
    pub sort_safelist: SortSafelist,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: "id".to_string(),
            sort_safelist: SortSafelist::movies(),
        }
    }
}

impl Filters {
    pub fn new(page: i64, page_size: i64, sort: impl Into<String>) -> Self {
        Self {
            page,
            page_size,
            sort: sort.into(),
            ..Default::default()
        }
    }

    pub fn with_sort_safelist(mut self, sort_safelist: SortSafelist) -> Self {
        self.sort_safelist = sort_safelist;
        self
    }

    /// Resolved `ORDER BY` term, never built from unchecked input.
    pub fn order(&self) -> Result<Order> {
        self.sort_safelist
            .resolve(&self.sort)
            .ok_or_else(|| Error::InvalidOrderByField(self.sort.clone()))
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

pub fn validate_filters(filters: &Filters) -> Violations {
    match filters.validate_with(&filters.sort_safelist) {
        Ok(()) => Violations::new(),
        Err(report) => report.into(),
    }
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

/// Position of a result page within the whole matching set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

impl Metadata {
    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records <= 0 || page_size <= 0 {
            return Metadata::default();
        }
        Metadata {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_offset() {
        let filters = Filters::new(1, 20, "id");
        assert_eq!(filters.limit(), 20);
        assert_eq!(filters.offset(), 0);

        let filters = Filters::new(3, 7, "id");
        assert_eq!(filters.limit(), 7);
        assert_eq!(filters.offset(), 14);
    }

    #[test]
    fn test_resolve_sort() {
        let filters = Filters::new(1, 20, "-year");
        assert_eq!(filters.order().unwrap(), Order::Desc("year".to_string()));
        assert_eq!(filters.order().unwrap().to_string(), "year DESC");

        let filters = Filters::new(1, 20, "title");
        assert_eq!(filters.order().unwrap().to_string(), "title ASC");
    }

    #[test]
    fn test_reject_unknown_sort() {
        for sort in ["created_at", "--id", "id; DROP TABLE movies", "", "-", "Title"] {
            let filters = Filters::new(1, 20, sort);
            assert!(
                matches!(filters.order(), Err(Error::InvalidOrderByField(_))),
                "{sort} should be rejected"
            );
        }
    }

    #[test]
    fn test_custom_safelist() {
        let filters =
            Filters::new(1, 20, "-runtime").with_sort_safelist(SortSafelist::new(["id"]));
        assert!(filters.order().is_err());
        let violations = validate_filters(&filters);
        assert_eq!(violations.get("sort"), Some("invalid sort value"));
    }

    #[test]
    fn test_validate_filters() {
        assert!(validate_filters(&Filters::default()).is_empty());
        assert!(validate_filters(&Filters::new(MAX_PAGE, MAX_PAGE_SIZE, "-id")).is_empty());

        let violations = validate_filters(&Filters::new(0, 20, "id"));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations.get("page"), Some("must be greater than zero"));

        let violations = validate_filters(&Filters::new(MAX_PAGE + 1, 20, "id"));
        assert_eq!(violations.get("page"), Some("must be a maximum of 10 million"));

        let violations = validate_filters(&Filters::new(1, 101, "id"));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations.get("page_size"), Some("must be a maximum of 100"));

        let violations = validate_filters(&Filters::new(-1, 0, "bogus"));
        assert_eq!(violations.len(), 3);
    }

    #[test]
    fn test_metadata() {
        assert_eq!(Metadata::calculate(0, 1, 20), Metadata::default());

        let metadata = Metadata::calculate(21, 2, 10);
        assert_eq!(metadata.current_page, 2);
        assert_eq!(metadata.page_size, 10);
        assert_eq!(metadata.first_page, 1);
        assert_eq!(metadata.last_page, 3);
        assert_eq!(metadata.total_records, 21);

        assert_eq!(Metadata::calculate(20, 1, 10).last_page, 2);
        assert_eq!(Metadata::calculate(1, 1, 100).last_page, 1);
    }

    #[test]
    fn test_empty_metadata_serializes_empty() {
        let json = serde_json::to_string(&Metadata::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
