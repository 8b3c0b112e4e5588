//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::PaginationConfig;
use crate::error::AppError;
use crate::result::AppResult;

/// Query-string key for the page index.
pub const PAGE_PARAM: &str = "page";
/// Query-string key for the page size.
pub const SIZE_PARAM: &str = "size";

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-based).
    pub page: u64,
    /// Number of items per page.
    pub page_size: u64,
}

impl PageRequest {
    /// Create a new page request, clamping the page to at least 1 and the
    /// size to `[1, max_size]`.
    pub fn new(page: u64, page_size: u64, max_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, max_size.max(1)),
        }
    }

    /// Read `page` and `size` from query-string pairs.
    pub fn from_query(pairs: &[(String, String)], limits: &PaginationConfig) -> AppResult<Self> {
        let mut page = 1;
        let mut size = limits.default_size;
        for (key, value) in pairs {
            match key.as_str() {
                PAGE_PARAM => page = parse_positive(key, value)?,
                SIZE_PARAM => size = parse_positive(key, value)?,
                _ => {}
            }
        }
        Ok(Self::new(page, size, limits.max_size))
    }

    /// Calculate the SQL `OFFSET` value.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Return the SQL `LIMIT` value.
    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        let limits = PaginationConfig::default();
        Self::new(1, limits.default_size, limits.max_size)
    }
}

fn parse_positive(key: &str, value: &str) -> AppResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| AppError::validation(format!("'{key}' must be a positive integer, got '{value}'")))
}

/// Paginated response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PageResponse<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Current page number (1-based).
    pub page: u64,
    /// Number of items per page.
    pub page_size: u64,
    /// Total number of items across all pages.
    pub total_items: u64,
    /// Total number of pages; zero when nothing matched.
    pub total_pages: u64,
    /// Whether there is a next page.
    pub has_next: bool,
    /// Whether there is a previous page.
    pub has_previous: bool,
}

impl<T> PageResponse<T> {
    /// Create a new paginated response.
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(request.page_size.max(1));
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total_items,
            total_pages,
            has_next: request.page < total_pages,
            has_previous: request.page > 1,
        }
    }

    /// Convert every item, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}
