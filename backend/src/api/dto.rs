//! Shared Data Transfer Objects (DTOs) for API handlers.
//!
//! List endpoints take [`PaginationQuery`] alongside their own filter query
//! and answer with `{ "items": [...], "pagination": {...} }`.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination metadata for list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
    /// Total number of items across all pages
    pub total: i64,
    /// Total number of pages
    pub total_pages: u32,
}

impl Pagination {
    /// Build pagination metadata for a page of a result set of `total` rows.
    pub fn from_query_and_total(query: &PaginationQuery, total: i64) -> Self {
        let per_page = query.per_page();
        let total = total.max(0);
        let total_pages = ((total + i64::from(per_page) - 1) / i64::from(per_page)) as u32;

        Self {
            page: query.page(),
            per_page,
            total,
            total_pages,
        }
    }
}

/// Query parameters for paginated list requests.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    /// Requested page number (default: 1)
    pub page: Option<u32>,
    /// Requested items per page (default: 20, max: 100)
    pub per_page: Option<u32>,
}

impl PaginationQuery {
    /// Page number, at least 1.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to `1..=MAX_PER_PAGE`.
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page())
    }
}

/// Generic message response
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<u32>, per_page: Option<u32>) -> PaginationQuery {
        PaginationQuery { page, per_page }
    }

    // -----------------------------------------------------------------------
    // PaginationQuery
    // -----------------------------------------------------------------------

    #[test]
    fn test_pagination_query_defaults() {
        let q = PaginationQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), 20);
        assert_eq!(q.offset(), 0);
        assert_eq!(q.limit(), 20);
    }

    #[test]
    fn test_pagination_query_page_zero_is_first_page() {
        let q = query(Some(0), Some(10));
        assert_eq!(q.page(), 1);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_pagination_query_per_page_clamped() {
        assert_eq!(query(None, Some(500)).per_page(), MAX_PER_PAGE);
        assert_eq!(query(None, Some(0)).per_page(), 1);
    }

    #[test]
    fn test_pagination_query_offset() {
        let q = query(Some(3), Some(25));
        assert_eq!(q.offset(), 50);
        assert_eq!(q.limit(), 25);
    }

    #[test]
    fn test_pagination_query_from_query_string() {
        let q: PaginationQuery = parse_query("page=2&per_page=5");
        assert_eq!(q.page(), 2);
        assert_eq!(q.per_page(), 5);
    }

    fn parse_query(qs: &str) -> PaginationQuery {
        let uri: axum::http::Uri = format!("/items?{qs}").parse().unwrap();
        axum::extract::Query::<PaginationQuery>::try_from_uri(&uri)
            .unwrap()
            .0
    }

    // -----------------------------------------------------------------------
    // Pagination::from_query_and_total
    // -----------------------------------------------------------------------

    #[test]
    fn test_pagination_rounds_up_pages() {
        let p = Pagination::from_query_and_total(&query(Some(1), Some(10)), 25);
        assert_eq!(p.total, 25);
        assert_eq!(p.total_pages, 3);
    }

    #[test]
    fn test_pagination_exact_multiple() {
        let p = Pagination::from_query_and_total(&query(Some(2), Some(10)), 20);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 2);
    }

    #[test]
    fn test_pagination_empty_result() {
        let p = Pagination::from_query_and_total(&PaginationQuery::default(), 0);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.page, 1);
    }

    #[test]
    fn test_pagination_serialization() {
        let p = Pagination::from_query_and_total(&query(Some(1), Some(20)), 41);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["page"], 1);
        assert_eq!(json["per_page"], 20);
        assert_eq!(json["total"], 41);
        assert_eq!(json["total_pages"], 3);
    }
}
