//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 100;

/// A page request with 1-indexed page number and page size.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    pub page: Option<u64>,
    /// Number of items per page.
    pub limit: Option<u64>,
}

impl PageRequest {
    /// Returns the effective page number (at least 1).
    #[must_use]
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Returns the effective page size, clamped to the maximum.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Returns the row offset for this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.page() - 1) * self.limit()
    }
}

/// A page of results with total counts.
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    /// Current page (1-indexed).
    pub page: u64,
    /// Page size.
    pub limit: u64,
    /// Total number of pages.
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    /// Builds a page response from items and counts.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let limit = request.limit();
        Self {
            items,
            total,
            page: request.page(),
            limit,
            total_pages: total.div_ceil(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, 1, 50, 0)]
    #[case(Some(3), Some(20), 3, 20, 40)]
    #[case(Some(0), Some(500), 1, 100, 0)]
    fn test_page_request_clamping(
        #[case] page: Option<u64>,
        #[case] limit: Option<u64>,
        #[case] expected_page: u64,
        #[case] expected_limit: u64,
        #[case] expected_offset: u64,
    ) {
        let req = PageRequest { page, limit };
        assert_eq!(req.page(), expected_page);
        assert_eq!(req.limit(), expected_limit);
        assert_eq!(req.offset(), expected_offset);
    }

    #[test]
    fn test_page_response_total_pages() {
        let req = PageRequest {
            page: Some(1),
            limit: Some(10),
        };
        let resp = PageResponse::new(vec![1, 2, 3], 25, req);
        assert_eq!(resp.total_pages, 3);
        assert_eq!(resp.total, 25);
    }
}
