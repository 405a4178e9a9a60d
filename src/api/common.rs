//! Common API utilities and shared types
//!
//! Pagination query parsing and the paged response envelope.

use serde::{Deserialize, Serialize};

use crate::models::{ListParams, PagedResult, MAX_PAGE_SIZE};

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for list endpoints
pub fn default_page_size() -> u32 {
    20
}

/// Basic pagination query parameters
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::with_max(self.page, self.page_size, MAX_PAGE_SIZE)
    }
}

/// Paged list response
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub results: Vec<T>,
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> From<PagedResult<T>> for PageResponse<T> {
    fn from(paged: PagedResult<T>) -> Self {
        let total_pages = paged.total_pages();
        let has_next = paged.has_next();
        let has_prev = paged.has_prev();
        Self {
            results: paged.items,
            count: paged.total,
            page: paged.page,
            page_size: paged.per_page,
            total_pages,
            has_next,
            has_prev,
        }
    }
}

/// Treat blank query strings as absent
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
